//! Opcode handler tables.
//!
//! Each page is a 256-entry array of handler function pointers, built once
//! when the CPU is constructed. Handlers decode register operands from the
//! opcode byte the dispatcher stored on the CPU, so one handler can serve a
//! whole opcode row.

pub(crate) mod bit;
pub(crate) mod extended;
pub(crate) mod indexed;
pub(crate) mod indexed_bit;
pub(crate) mod standard;

use machine_core::{MemoryBus, PortBus};

use crate::alu;
use crate::cpu::Z80;
use crate::flags::{CF, ZF};

/// Read an 8-bit register by its opcode encoding (0 b, 1 c, 2 d, 3 e, 4 h,
/// 5 l, 7 a). Encoding 6 is the (HL) column, which has dedicated handlers.
pub(crate) fn get_reg8<M: MemoryBus, P: PortBus>(cpu: &Z80<M, P>, idx: u8) -> u8 {
    match idx & 0x07 {
        0 => cpu.regs.b,
        1 => cpu.regs.c,
        2 => cpu.regs.d,
        3 => cpu.regs.e,
        4 => cpu.regs.h,
        5 => cpu.regs.l,
        _ => cpu.regs.a,
    }
}

pub(crate) fn set_reg8<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, idx: u8, value: u8) {
    match idx & 0x07 {
        0 => cpu.regs.b = value,
        1 => cpu.regs.c = value,
        2 => cpu.regs.d = value,
        3 => cpu.regs.e = value,
        4 => cpu.regs.h = value,
        5 => cpu.regs.l = value,
        _ => cpu.regs.a = value,
    }
}

/// Like [`get_reg8`], but H/L refer to the halves of the active index
/// register (the DD/FD pages).
pub(crate) fn get_reg8_indexed<M: MemoryBus, P: PortBus>(cpu: &Z80<M, P>, idx: u8) -> u8 {
    match idx & 0x07 {
        4 => (cpu.index_reg() >> 8) as u8,
        5 => cpu.index_reg() as u8,
        other => get_reg8(cpu, other),
    }
}

pub(crate) fn set_reg8_indexed<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, idx: u8, value: u8) {
    match idx & 0x07 {
        4 => {
            let reg = (cpu.index_reg() & 0x00FF) | (u16::from(value) << 8);
            cpu.set_index_reg(reg);
        }
        5 => {
            let reg = (cpu.index_reg() & 0xFF00) | u16::from(value);
            cpu.set_index_reg(reg);
        }
        other => set_reg8(cpu, other, value),
    }
}

/// Apply an ALU row operation (bits 5-3 of the opcode) to the accumulator.
/// 0 add, 1 adc, 2 sub, 3 sbc, 4 and, 5 xor, 6 or, 7 cp.
pub(crate) fn alu_on_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, op: u8, value: u8) {
    let a = cpu.regs.a;
    let carry = cpu.regs.f & CF != 0;
    match op & 0x07 {
        0 => {
            let r = alu::add8(a, value, false);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        1 => {
            let r = alu::add8(a, value, carry);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        2 => {
            let r = alu::sub8(a, value, false);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        3 => {
            let r = alu::sub8(a, value, carry);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        4 => {
            let r = alu::and8(a, value);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        5 => {
            let r = alu::xor8(a, value);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        6 => {
            let r = alu::or8(a, value);
            cpu.regs.a = r.value;
            cpu.regs.f = r.flags;
        }
        _ => cpu.regs.f = alu::cp8(a, value),
    }
}

/// Test a jump/call/return condition (bits 5-3 of the opcode):
/// 0 NZ, 1 Z, 2 NC, 3 C, 4 PO, 5 PE, 6 P, 7 M.
pub(crate) fn condition<M: MemoryBus, P: PortBus>(cpu: &Z80<M, P>, idx: u8) -> bool {
    let f = cpu.regs.f;
    match idx & 0x07 {
        0 => f & ZF == 0,
        1 => f & ZF != 0,
        2 => f & CF == 0,
        3 => f & CF != 0,
        4 => f & crate::flags::PF == 0,
        5 => f & crate::flags::PF != 0,
        6 => f & crate::flags::SF == 0,
        _ => f & crate::flags::SF != 0,
    }
}

/// Apply a CB-page shift/rotate (bits 5-3 of the opcode) to a value.
pub(crate) fn shift_rotate(op: u8, value: u8, carry: bool) -> alu::AluResult {
    match op & 0x07 {
        0 => alu::rlc8(value),
        1 => alu::rrc8(value),
        2 => alu::rl8(value, carry),
        3 => alu::rr8(value, carry),
        4 => alu::sla8(value),
        5 => alu::sra8(value),
        6 => alu::sll8(value),
        _ => alu::srl8(value),
    }
}
