//! The CB-prefixed bit manipulation page.
//!
//! The page is uniform: four quadrants (shift/rotate, BIT, RES, SET), each
//! decoding the operand register from the low three opcode bits, with the
//! (HL) column getting its own memory-cycle handlers.

use machine_core::{MemoryBus, PortBus};

use super::{get_reg8, set_reg8, shift_rotate};
use crate::alu;
use crate::cpu::{Op, Z80};
use crate::flags::CF;

fn shift_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let op = cpu.opcode >> 3;
    let idx = cpu.opcode;
    let carry = cpu.regs.f & CF != 0;
    let r = shift_rotate(op, get_reg8(cpu, idx), carry);
    set_reg8(cpu, idx, r.value);
    cpu.regs.f = r.flags;
}

fn shift_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let op = cpu.opcode >> 3;
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(1, hl);
    let carry = cpu.regs.f & CF != 0;
    let r = shift_rotate(op, value, carry);
    cpu.write_memory(hl, r.value);
    cpu.regs.f = r.flags;
}

fn bit_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let value = get_reg8(cpu, cpu.opcode);
    cpu.regs.f = alu::bit8(bit, value) | (cpu.regs.f & CF);
}

fn bit_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(1, hl);
    cpu.regs.f = alu::bit8_wz(bit, value, cpu.regs.wh()) | (cpu.regs.f & CF);
}

fn res_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let value = get_reg8(cpu, cpu.opcode) & !(1 << bit);
    set_reg8(cpu, cpu.opcode, value);
}

fn res_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl) & !(1 << bit);
    cpu.tact_plus_with_address(1, hl);
    cpu.write_memory(hl, value);
}

fn set_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let value = get_reg8(cpu, cpu.opcode) | (1 << bit);
    set_reg8(cpu, cpu.opcode, value);
}

fn set_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl) | (1 << bit);
    cpu.tact_plus_with_address(1, hl);
    cpu.write_memory(hl, value);
}

pub(crate) fn table<M: MemoryBus, P: PortBus>() -> [Op<M, P>; 256] {
    core::array::from_fn(|i| {
        let memory_column = i & 0x07 == 6;
        match (i >> 6, memory_column) {
            (0, false) => shift_r,
            (0, true) => shift_hli,
            (1, false) => bit_r,
            (1, true) => bit_hli,
            (2, false) => res_r,
            (2, true) => res_hli,
            (3, false) => set_r,
            _ => set_hli,
        }
    })
}
