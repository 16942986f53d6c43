//! The DD/FD-prefixed indexed page.
//!
//! Built by copying the standard table and overwriting the slots where the
//! index register takes over from HL. Handlers use the CPU's active prefix
//! to pick IX or IY, so one table serves both prefixes.

use machine_core::{MemoryBus, PortBus};

use super::{alu_on_a, get_reg8, get_reg8_indexed, set_reg8, set_reg8_indexed};
use crate::alu;
use crate::cpu::{Op, Z80};
use crate::flags::CF;

/// Fetch the displacement byte and compute the effective (IX/IY + d)
/// address into WZ, with the five internal tacts the indexed forms spend.
fn effective_address<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) -> u16 {
    let distance = cpu.fetch_code_byte();
    cpu.tact_plus_with_address(5, cpu.regs.pc);
    cpu.regs.wz = cpu
        .index_reg()
        .wrapping_add(i16::from(distance as i8) as u16);
    cpu.regs.wz
}

fn add_ix_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    cpu.tact_plus_with_address(7, cpu.regs.ir());
    let reg = cpu.index_reg();
    let other = match idx {
        0 => cpu.regs.bc(),
        1 => cpu.regs.de(),
        2 => reg,
        _ => cpu.regs.sp,
    };
    cpu.regs.wz = reg.wrapping_add(1);
    let r = alu::add16(reg, other, cpu.regs.f);
    cpu.set_index_reg(r.value);
    cpu.regs.f = r.flags;
}

fn ld_ix_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.fetch_code_word();
    cpu.set_index_reg(value);
}

fn ld_nni_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    let value = cpu.index_reg();
    cpu.write_memory(addr, value as u8);
    let wz = cpu.regs.wz;
    cpu.write_memory(wz, (value >> 8) as u8);
}

fn ld_ix_nni<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    let low = u16::from(cpu.read_memory(addr));
    let wz = cpu.regs.wz;
    let high = u16::from(cpu.read_memory(wz));
    cpu.set_index_reg((high << 8) | low);
}

fn inc_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    let value = cpu.index_reg().wrapping_add(1);
    cpu.set_index_reg(value);
}

fn dec_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    let value = cpu.index_reg().wrapping_sub(1);
    cpu.set_index_reg(value);
}

fn inc_xr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let r = alu::inc8(get_reg8_indexed(cpu, idx));
    set_reg8_indexed(cpu, idx, r.value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
}

fn dec_xr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let r = alu::dec8(get_reg8_indexed(cpu, idx));
    set_reg8_indexed(cpu, idx, r.value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
}

fn ld_xr_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let value = cpu.fetch_code_byte();
    set_reg8_indexed(cpu, idx, value);
}

fn inc_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = effective_address(cpu);
    let value = cpu.read_memory(addr);
    cpu.tact_plus_with_address(1, addr);
    let r = alu::inc8(value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
    cpu.write_memory(addr, r.value);
}

fn dec_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = effective_address(cpu);
    let value = cpu.read_memory(addr);
    cpu.tact_plus_with_address(1, addr);
    let r = alu::dec8(value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
    cpu.write_memory(addr, r.value);
}

fn ld_xi_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let distance = cpu.fetch_code_byte();
    let value = cpu.fetch_code_byte();
    cpu.tact_plus_with_address(2, cpu.regs.pc);
    cpu.regs.wz = cpu
        .index_reg()
        .wrapping_add(i16::from(distance as i8) as u16);
    let wz = cpu.regs.wz;
    cpu.write_memory(wz, value);
}

/// LD r,r' with H/L mapped to the index register halves.
fn ld_xr_xr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = get_reg8_indexed(cpu, cpu.opcode);
    set_reg8_indexed(cpu, cpu.opcode >> 3, value);
}

/// LD r,(IX+d): the destination is the real register, never XH/XL.
fn ld_r_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = effective_address(cpu);
    let value = cpu.read_memory(addr);
    set_reg8(cpu, cpu.opcode >> 3, value);
}

/// LD (IX+d),r: the source is the real register, never XH/XL.
fn ld_xi_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = effective_address(cpu);
    let value = get_reg8(cpu, cpu.opcode);
    cpu.write_memory(addr, value);
}

fn alu_a_xr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = get_reg8_indexed(cpu, cpu.opcode);
    alu_on_a(cpu, cpu.opcode >> 3, value);
}

fn alu_a_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = effective_address(cpu);
    let value = cpu.read_memory(addr);
    alu_on_a(cpu, cpu.opcode >> 3, value);
}

fn pop_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.pop16();
    cpu.set_index_reg(value);
}

fn push_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.index_reg();
    cpu.push16(value);
}

fn ex_spi_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let sp = cpu.regs.sp;
    let sp1 = sp.wrapping_add(1);
    let low = cpu.read_memory(sp);
    let high = cpu.read_memory(sp1);
    cpu.tact_plus_with_address(1, sp1);
    let reg = cpu.index_reg();
    cpu.write_memory(sp1, (reg >> 8) as u8);
    cpu.write_memory(sp, reg as u8);
    cpu.tact_plus_with_address(2, sp);
    cpu.regs.wz = (u16::from(high) << 8) | u16::from(low);
    let wz = cpu.regs.wz;
    cpu.set_index_reg(wz);
}

fn jp_xi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.pc = cpu.index_reg();
}

fn ld_sp_ix<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    cpu.regs.sp = cpu.index_reg();
}

/// Build the indexed table: the standard table with the index-register
/// slots overridden.
pub(crate) fn table<M: MemoryBus, P: PortBus>() -> [Op<M, P>; 256] {
    let mut t = super::standard::table();

    t[0x09] = add_ix_rr;
    t[0x19] = add_ix_rr;
    t[0x21] = ld_ix_nn;
    t[0x22] = ld_nni_ix;
    t[0x23] = inc_ix;
    t[0x24] = inc_xr;
    t[0x25] = dec_xr;
    t[0x26] = ld_xr_n;
    t[0x29] = add_ix_rr;
    t[0x2A] = ld_ix_nni;
    t[0x2B] = dec_ix;
    t[0x2C] = inc_xr;
    t[0x2D] = dec_xr;
    t[0x2E] = ld_xr_n;
    t[0x34] = inc_xi;
    t[0x35] = dec_xi;
    t[0x36] = ld_xi_n;
    t[0x39] = add_ix_rr;

    // LD r,r' rows: redirect everything touching H, L or (HL)
    for op in 0x40..0x80usize {
        if op == 0x76 {
            continue;
        }
        let src = op & 0x07;
        let dst = (op >> 3) & 0x07;
        if src == 6 {
            t[op] = ld_r_xi;
        } else if dst == 6 {
            t[op] = ld_xi_r;
        } else if src == 4 || src == 5 || dst == 4 || dst == 5 {
            t[op] = ld_xr_xr;
        }
    }

    // ALU rows: XH, XL and (IX+d) columns
    for row in 0..8usize {
        let base = 0x80 + row * 8;
        t[base + 4] = alu_a_xr;
        t[base + 5] = alu_a_xr;
        t[base + 6] = alu_a_xi;
    }

    t[0xE1] = pop_ix;
    t[0xE3] = ex_spi_ix;
    t[0xE5] = push_ix;
    t[0xE9] = jp_xi;
    t[0xF9] = ld_sp_ix;

    t
}
