//! Z80N (ZX Spectrum Next) extended instructions.
//!
//! The Next layers its instruction set onto the ED page. A Z80N CPU is the
//! base CPU with these slots overwritten in a copy of the extended table;
//! every slot not listed here keeps its base behavior.

use machine_core::{MemoryBus, PortBus};

use crate::cpu::{Op, Z80};
use crate::flags::{sz53p, HF};

/// ED 23: SWAPNIB - swap the nibbles of A.
fn swapnib<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.a = cpu.regs.a.rotate_left(4);
}

/// ED 24: MIRROR A - reverse the bit order of A.
fn mirror_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.a = cpu.regs.a.reverse_bits();
}

/// ED 27: TEST n - AND with A, flags only.
fn test_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.fetch_code_byte();
    cpu.regs.f = sz53p(cpu.regs.a & value) | HF;
}

/// ED 28: BSLA DE,B - shift DE left by the low four bits of B.
fn bsla<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let count = cpu.regs.b & 0x0F;
    cpu.regs.set_de(cpu.regs.de().wrapping_shl(u32::from(count)));
}

/// ED 29: BSRA DE,B - shift right, keeping the original sign bit.
fn bsra<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let count = cpu.regs.b & 0x0F;
    let de = cpu.regs.de();
    cpu.regs.set_de((de >> count) | (de & 0x8000));
}

/// ED 2A: BSRL DE,B - logical shift right.
fn bsrl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let count = cpu.regs.b & 0x0F;
    cpu.regs.set_de(cpu.regs.de() >> count);
}

/// ED 2B: BSRF DE,B - shift right, filling with ones.
fn bsrf<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let count = cpu.regs.b & 0x0F;
    cpu.regs.set_de(!((!cpu.regs.de()) >> count));
}

/// ED 2C: BRLC DE,B - rotate DE left by the low four bits of B.
fn brlc<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let count = u32::from(cpu.regs.b & 0x0F);
    cpu.regs.set_de(cpu.regs.de().rotate_left(count));
}

/// ED 30: MUL D,E - unsigned multiply into DE, no flags.
fn mul_d_e<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let product = u16::from(cpu.regs.d) * u16::from(cpu.regs.e);
    cpu.regs.set_de(product);
}

/// ED 31/32/33: ADD HL/DE/BC,A - no flags.
fn add_rr_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let a = u16::from(cpu.regs.a);
    match cpu.opcode {
        0x31 => {
            let v = cpu.regs.hl().wrapping_add(a);
            cpu.regs.set_hl(v);
        }
        0x32 => {
            let v = cpu.regs.de().wrapping_add(a);
            cpu.regs.set_de(v);
        }
        _ => {
            let v = cpu.regs.bc().wrapping_add(a);
            cpu.regs.set_bc(v);
        }
    }
}

/// ED 34/35/36: ADD HL/DE/BC,nn - no flags.
fn add_rr_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let op = cpu.opcode;
    let value = cpu.fetch_code_word();
    cpu.tact_plus(2);
    match op {
        0x34 => {
            let v = cpu.regs.hl().wrapping_add(value);
            cpu.regs.set_hl(v);
        }
        0x35 => {
            let v = cpu.regs.de().wrapping_add(value);
            cpu.regs.set_de(v);
        }
        _ => {
            let v = cpu.regs.bc().wrapping_add(value);
            cpu.regs.set_bc(v);
        }
    }
}

/// ED 8A: PUSH nn.
fn push_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.fetch_code_word();
    cpu.regs.sp = cpu.regs.sp.wrapping_sub(1);
    let sp = cpu.regs.sp;
    cpu.write_memory(sp, (value >> 8) as u8);
    cpu.regs.sp = cpu.regs.sp.wrapping_sub(1);
    let sp = cpu.regs.sp;
    cpu.write_memory(sp, value as u8);
}

/// ED 93: PIXELDN - move HL one pixel row down in screen layout.
fn pixeldn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let next = if hl & 0x0700 != 0x0700 {
        hl.wrapping_add(0x100)
    } else if hl & 0xE0 != 0xE0 {
        (hl & 0xF8FF).wrapping_add(0x20)
    } else {
        (hl & 0xF81F).wrapping_add(0x0800)
    };
    cpu.regs.set_hl(next);
}

/// ED 94: PIXELAD - compute the screen address of the pixel at (D,E).
fn pixelad<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let d = u16::from(cpu.regs.d);
    let e = u16::from(cpu.regs.e);
    let addr =
        0x4000 | ((d & 0xC0) << 5) | ((d & 0x07) << 8) | ((d & 0x38) << 2) | (e >> 3);
    cpu.regs.set_hl(addr);
}

/// ED 95: SETAE - A = a one-bit mask for pixel E within its byte.
fn setae<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.a = 0x80 >> (cpu.regs.e & 0x07);
}

/// ED 98: JP (C) - jump within the 16K bank using the port value.
fn jp_in_c<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bc = cpu.regs.bc();
    let value = cpu.read_port(bc);
    cpu.tact_plus(1);
    cpu.regs.pc = (cpu.regs.pc & 0xC000) | (u16::from(value) << 6);
}

/// Overlay the Z80N instructions onto a copy of the base extended table.
pub(crate) fn apply_overrides<M: MemoryBus, P: PortBus>(table: &mut [Op<M, P>; 256]) {
    use crate::ops::standard::nop;

    table[0x23] = swapnib;
    table[0x24] = mirror_a;
    table[0x27] = test_n;
    table[0x28] = bsla;
    table[0x29] = bsra;
    table[0x2A] = bsrl;
    table[0x2B] = bsrf;
    table[0x2C] = brlc;
    table[0x2D] = nop;
    table[0x2E] = nop;
    table[0x2F] = nop;
    table[0x30] = mul_d_e;
    table[0x31] = add_rr_a;
    table[0x32] = add_rr_a;
    table[0x33] = add_rr_a;
    table[0x34] = add_rr_nn;
    table[0x35] = add_rr_nn;
    table[0x36] = add_rr_nn;
    table[0x8A] = push_nn;
    table[0x93] = pixeldn;
    table[0x94] = pixelad;
    table[0x95] = setae;
    table[0x98] = jp_in_c;
}
