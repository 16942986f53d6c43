//! ALU operations for the Z80.

#![allow(clippy::verbose_bit_mask)] // Clearer to read mask comparisons.

use crate::flags::{parity, sz53, sz53p, CF, HF, NF, PF, SF, XF, YF, ZF};

/// Result of an 8-bit ALU operation with flags.
#[derive(Debug, Clone, Copy)]
pub struct AluResult {
    pub value: u8,
    pub flags: u8,
}

/// Result of a 16-bit ALU operation with flags.
#[derive(Debug, Clone, Copy)]
pub struct Alu16Result {
    pub value: u16,
    pub flags: u8,
}

/// Add two bytes with optional carry, returning result and flags.
#[must_use]
pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let result16 = u16::from(a) + u16::from(b) + u16::from(c);
    let result = result16 as u8;

    let mut flags = sz53(result);
    if (a & 0x0F) + (b & 0x0F) + c > 0x0F {
        flags |= HF;
    }
    // Overflow: both operands same sign, result different sign
    if ((a ^ b) & 0x80 == 0) && ((a ^ result) & 0x80 != 0) {
        flags |= PF;
    }
    if result16 > 0xFF {
        flags |= CF;
    }

    AluResult { value: result, flags }
}

/// Subtract two bytes with optional borrow, returning result and flags.
#[must_use]
pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = u8::from(carry);
    let result = a.wrapping_sub(b).wrapping_sub(c);

    let mut flags = NF | sz53(result);
    if (a & 0x0F) < (b & 0x0F) + c {
        flags |= HF;
    }
    // Overflow: operands different sign, result same sign as subtrahend
    if ((a ^ b) & 0x80 != 0) && ((b ^ result) & 0x80 == 0) {
        flags |= PF;
    }
    if u16::from(a) < u16::from(b) + u16::from(c) {
        flags |= CF;
    }

    AluResult { value: result, flags }
}

/// Compare: SUB flags, but X/Y come from the operand, not the result.
#[must_use]
pub fn cp8(a: u8, b: u8) -> u8 {
    let r = sub8(a, b, false);
    (r.flags & !(YF | XF)) | (b & (YF | XF))
}

/// AND operation (sets H).
#[must_use]
pub fn and8(a: u8, b: u8) -> AluResult {
    let result = a & b;
    AluResult { value: result, flags: sz53p(result) | HF }
}

/// OR operation.
#[must_use]
pub fn or8(a: u8, b: u8) -> AluResult {
    let result = a | b;
    AluResult { value: result, flags: sz53p(result) }
}

/// XOR operation.
#[must_use]
pub fn xor8(a: u8, b: u8) -> AluResult {
    let result = a ^ b;
    AluResult { value: result, flags: sz53p(result) }
}

/// INC r (carry flag untouched by the caller).
#[must_use]
pub fn inc8(value: u8) -> AluResult {
    let result = value.wrapping_add(1);
    let mut flags = sz53(result);
    if value & 0x0F == 0x0F {
        flags |= HF;
    }
    if value == 0x7F {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// DEC r (carry flag untouched by the caller).
#[must_use]
pub fn dec8(value: u8) -> AluResult {
    let result = value.wrapping_sub(1);
    let mut flags = NF | sz53(result);
    if value & 0x0F == 0 {
        flags |= HF;
    }
    if value == 0x80 {
        flags |= PF;
    }
    AluResult { value: result, flags }
}

/// ADD HL/IX/IY, rr: S, Z and PV are preserved from the old flags.
#[must_use]
pub fn add16(a: u16, b: u16, old_flags: u8) -> Alu16Result {
    let result32 = u32::from(a) + u32::from(b);
    let result = result32 as u16;
    let high = (result >> 8) as u8;

    let mut flags = old_flags & (SF | ZF | PF);
    flags |= high & (YF | XF);
    if (a & 0x0FFF) + (b & 0x0FFF) > 0x0FFF {
        flags |= HF;
    }
    if result32 > 0xFFFF {
        flags |= CF;
    }

    Alu16Result { value: result, flags }
}

/// ADC HL, rr with the full flag set.
#[must_use]
pub fn adc16(a: u16, b: u16, carry: bool) -> Alu16Result {
    let c = u32::from(carry);
    let result32 = u32::from(a) + u32::from(b) + c;
    let result = result32 as u16;
    let high = (result >> 8) as u8;

    let mut flags = high & (SF | YF | XF);
    if result == 0 {
        flags |= ZF;
    }
    if u32::from(a & 0x0FFF) + u32::from(b & 0x0FFF) + c > 0x0FFF {
        flags |= HF;
    }
    if ((a ^ b) & 0x8000 == 0) && ((a ^ result) & 0x8000 != 0) {
        flags |= PF;
    }
    if result32 > 0xFFFF {
        flags |= CF;
    }

    Alu16Result { value: result, flags }
}

/// SBC HL, rr with the full flag set.
#[must_use]
pub fn sbc16(a: u16, b: u16, carry: bool) -> Alu16Result {
    let c = u32::from(carry);
    let result = a.wrapping_sub(b).wrapping_sub(carry as u16);
    let high = (result >> 8) as u8;

    let mut flags = NF | (high & (SF | YF | XF));
    if result == 0 {
        flags |= ZF;
    }
    if u32::from(a & 0x0FFF) < u32::from(b & 0x0FFF) + c {
        flags |= HF;
    }
    if ((a ^ b) & 0x8000 != 0) && ((b ^ result) & 0x8000 == 0) {
        flags |= PF;
    }
    if u32::from(a) < u32::from(b) + c {
        flags |= CF;
    }

    Alu16Result { value: result, flags }
}

/// RLC: rotate left, bit 7 to carry and bit 0.
#[must_use]
pub fn rlc8(value: u8) -> AluResult {
    let result = value.rotate_left(1);
    let mut flags = sz53p(result);
    if value & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// RRC: rotate right, bit 0 to carry and bit 7.
#[must_use]
pub fn rrc8(value: u8) -> AluResult {
    let result = value.rotate_right(1);
    let mut flags = sz53p(result);
    if value & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// RL: rotate left through carry.
#[must_use]
pub fn rl8(value: u8, carry: bool) -> AluResult {
    let result = (value << 1) | u8::from(carry);
    let mut flags = sz53p(result);
    if value & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// RR: rotate right through carry.
#[must_use]
pub fn rr8(value: u8, carry: bool) -> AluResult {
    let result = (value >> 1) | (u8::from(carry) << 7);
    let mut flags = sz53p(result);
    if value & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// SLA: shift left arithmetic.
#[must_use]
pub fn sla8(value: u8) -> AluResult {
    let result = value << 1;
    let mut flags = sz53p(result);
    if value & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// SRA: shift right arithmetic (bit 7 preserved).
#[must_use]
pub fn sra8(value: u8) -> AluResult {
    let result = (value >> 1) | (value & 0x80);
    let mut flags = sz53p(result);
    if value & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// SLL: undocumented shift left with bit 0 set.
#[must_use]
pub fn sll8(value: u8) -> AluResult {
    let result = (value << 1) | 0x01;
    let mut flags = sz53p(result);
    if value & 0x80 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// SRL: shift right logical.
#[must_use]
pub fn srl8(value: u8) -> AluResult {
    let result = value >> 1;
    let mut flags = sz53p(result);
    if value & 0x01 != 0 {
        flags |= CF;
    }
    AluResult { value: result, flags }
}

/// BIT n, r flags. X/Y come from the tested value for register operands.
#[must_use]
pub fn bit8(bit: u8, value: u8) -> u8 {
    let masked = value & (1 << bit);
    let mut flags = HF | (value & (YF | XF));
    if masked == 0 {
        flags |= ZF | PF;
    }
    if masked & 0x80 != 0 {
        flags |= SF;
    }
    flags
}

/// BIT n, (HL)/(IX+d) flags: X/Y come from the high byte of WZ.
#[must_use]
pub fn bit8_wz(bit: u8, value: u8, wh: u8) -> u8 {
    (bit8(bit, value) & !(YF | XF)) | (wh & (YF | XF))
}

/// DAA, given the accumulator and the relevant flags.
#[must_use]
pub fn daa(a: u8, flags: u8) -> AluResult {
    let mut correction = 0u8;
    let mut carry = flags & CF != 0;
    if flags & HF != 0 || a & 0x0F > 0x09 {
        correction |= 0x06;
    }
    if carry || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }

    let result = if flags & NF != 0 {
        a.wrapping_sub(correction)
    } else {
        a.wrapping_add(correction)
    };

    let mut f = sz53(result) | (flags & NF);
    if parity(result) {
        f |= PF;
    }
    if carry {
        f |= CF;
    }
    // H reflects the BCD nibble carry/borrow
    if flags & NF == 0 {
        if a & 0x0F > 0x09 || flags & HF != 0 && (a & 0x0F) + (correction & 0x0F) > 0x0F {
            f |= HF;
        }
    } else if flags & HF != 0 && a & 0x0F < 0x06 {
        f |= HF;
    }

    AluResult { value: result, flags: f }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add8_sets_carry_and_overflow() {
        let r = add8(0x7F, 0x01, false);
        assert_eq!(r.value, 0x80);
        assert_ne!(r.flags & PF, 0);
        assert_ne!(r.flags & SF, 0);
        assert_eq!(r.flags & CF, 0);

        let r = add8(0xFF, 0x01, false);
        assert_eq!(r.value, 0x00);
        assert_ne!(r.flags & ZF, 0);
        assert_ne!(r.flags & CF, 0);
    }

    #[test]
    fn sub8_sets_borrow() {
        let r = sub8(0x00, 0x01, false);
        assert_eq!(r.value, 0xFF);
        assert_ne!(r.flags & CF, 0);
        assert_ne!(r.flags & NF, 0);
        assert_ne!(r.flags & HF, 0);
    }

    #[test]
    fn cp8_takes_xy_from_operand() {
        let flags = cp8(0x00, 0x28);
        assert_eq!(flags & (YF | XF), YF | XF);
    }

    #[test]
    fn add16_preserves_szp() {
        let r = add16(0x0FFF, 0x0001, SF | ZF | PF);
        assert_eq!(r.value, 0x1000);
        assert_eq!(r.flags & (SF | ZF | PF), SF | ZF | PF);
        assert_ne!(r.flags & HF, 0);
    }

    #[test]
    fn sbc16_full_flags() {
        let r = sbc16(0x0000, 0x0001, false);
        assert_eq!(r.value, 0xFFFF);
        assert_ne!(r.flags & CF, 0);
        assert_ne!(r.flags & SF, 0);
        assert_ne!(r.flags & NF, 0);
    }

    #[test]
    fn rotates_move_carry() {
        let r = rlc8(0x81);
        assert_eq!(r.value, 0x03);
        assert_ne!(r.flags & CF, 0);

        let r = rr8(0x01, true);
        assert_eq!(r.value, 0x80);
        assert_ne!(r.flags & CF, 0);
    }

    #[test]
    fn sra_preserves_sign() {
        let r = sra8(0x81);
        assert_eq!(r.value, 0xC0);
        assert_ne!(r.flags & CF, 0);
    }

    #[test]
    fn bit_test_flags() {
        let flags = bit8(7, 0x80);
        assert_ne!(flags & SF, 0);
        assert_eq!(flags & ZF, 0);

        let flags = bit8(0, 0x00);
        assert_ne!(flags & ZF, 0);
        assert_ne!(flags & PF, 0);
    }

    #[test]
    fn daa_corrects_addition() {
        // 0x15 + 0x27 = 0x3C, DAA -> 0x42
        let r = add8(0x15, 0x27, false);
        let d = daa(r.value, r.flags);
        assert_eq!(d.value, 0x42);
    }
}
