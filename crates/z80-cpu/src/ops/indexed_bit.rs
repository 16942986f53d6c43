//! The DDCB/FDCB-prefixed indexed bit page.
//!
//! By the time a handler runs, the dispatcher has already resolved the
//! effective address (IX/IY plus displacement) into WZ. Every operation
//! works on memory at WZ; the undocumented forms also copy the result into
//! the register encoded in the low three opcode bits.

use machine_core::{MemoryBus, PortBus};

use super::{set_reg8, shift_rotate};
use crate::alu;
use crate::cpu::{Op, Z80};
use crate::flags::CF;

fn shift_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let op = cpu.opcode >> 3;
    let addr = cpu.regs.wz;
    let value = cpu.read_memory(addr);
    cpu.tact_plus_with_address(1, addr);
    let carry = cpu.regs.f & CF != 0;
    let r = shift_rotate(op, value, carry);
    cpu.write_memory(addr, r.value);
    cpu.regs.f = r.flags;
    let reg = cpu.opcode & 0x07;
    if reg != 6 {
        set_reg8(cpu, reg, r.value);
    }
}

fn bit_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let addr = cpu.regs.wz;
    let value = cpu.read_memory(addr);
    cpu.tact_plus_with_address(1, addr);
    cpu.regs.f = alu::bit8_wz(bit, value, cpu.regs.wh()) | (cpu.regs.f & CF);
}

fn res_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let addr = cpu.regs.wz;
    let value = cpu.read_memory(addr) & !(1 << bit);
    cpu.tact_plus_with_address(1, addr);
    cpu.write_memory(addr, value);
    let reg = cpu.opcode & 0x07;
    if reg != 6 {
        set_reg8(cpu, reg, value);
    }
}

fn set_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bit = (cpu.opcode >> 3) & 0x07;
    let addr = cpu.regs.wz;
    let value = cpu.read_memory(addr) | (1 << bit);
    cpu.tact_plus_with_address(1, addr);
    cpu.write_memory(addr, value);
    let reg = cpu.opcode & 0x07;
    if reg != 6 {
        set_reg8(cpu, reg, value);
    }
}

pub(crate) fn table<M: MemoryBus, P: PortBus>() -> [Op<M, P>; 256] {
    core::array::from_fn(|i| match i >> 6 {
        0 => shift_xi,
        1 => bit_xi,
        2 => res_xi,
        _ => set_xi,
    })
}
