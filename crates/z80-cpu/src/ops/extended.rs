//! The ED-prefixed extended page.
//!
//! Undefined slots route to the CPU's unknown-opcode policy handler. The
//! Z80N variant overlays its extra instructions on a copy of this table.

use machine_core::{MemoryBus, PortBus};

use crate::alu;
use crate::cpu::{Op, Z80};
use crate::flags::{parity, sz53, sz53p, CF, HF, NF, PF, SF, XF, YF, ZF};

use super::standard::nop;

pub(crate) fn unknown<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.unknown_opcode();
}

fn get_rr<M: MemoryBus, P: PortBus>(cpu: &Z80<M, P>, idx: u8) -> u16 {
    match idx & 0x03 {
        0 => cpu.regs.bc(),
        1 => cpu.regs.de(),
        2 => cpu.regs.hl(),
        _ => cpu.regs.sp,
    }
}

fn set_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, idx: u8, value: u16) {
    match idx & 0x03 {
        0 => cpu.regs.set_bc(value),
        1 => cpu.regs.set_de(value),
        2 => cpu.regs.set_hl(value),
        _ => cpu.regs.sp = value,
    }
}

fn in_r_c<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_add(1);
    let value = cpu.read_port(bc);
    cpu.regs.f = sz53p(value) | (cpu.regs.f & CF);
    let reg = (cpu.opcode >> 3) & 0x07;
    // 0x70 is IN (C): flags only, the value is discarded
    if reg != 6 {
        super::set_reg8(cpu, reg, value);
    }
}

fn out_c_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_add(1);
    let reg = (cpu.opcode >> 3) & 0x07;
    // 0x71 is OUT (C),0
    let value = if reg == 6 { 0 } else { super::get_reg8(cpu, reg) };
    cpu.write_port(bc, value);
}

fn sbc_hl_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    cpu.tact_plus_with_address(7, cpu.regs.ir());
    let hl = cpu.regs.hl();
    cpu.regs.wz = hl.wrapping_add(1);
    let r = alu::sbc16(hl, get_rr(cpu, idx), cpu.regs.f & CF != 0);
    cpu.regs.set_hl(r.value);
    cpu.regs.f = r.flags;
}

fn adc_hl_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    cpu.tact_plus_with_address(7, cpu.regs.ir());
    let hl = cpu.regs.hl();
    cpu.regs.wz = hl.wrapping_add(1);
    let r = alu::adc16(hl, get_rr(cpu, idx), cpu.regs.f & CF != 0);
    cpu.regs.set_hl(r.value);
    cpu.regs.f = r.flags;
}

fn ld_nni_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    let value = get_rr(cpu, idx);
    cpu.write_memory(addr, value as u8);
    let wz = cpu.regs.wz;
    cpu.write_memory(wz, (value >> 8) as u8);
}

fn ld_rr_nni<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    let low = u16::from(cpu.read_memory(addr));
    let wz = cpu.regs.wz;
    let high = u16::from(cpu.read_memory(wz));
    set_rr(cpu, idx, (high << 8) | low);
}

fn neg<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let r = alu::sub8(0, cpu.regs.a, false);
    cpu.regs.a = r.value;
    cpu.regs.f = r.flags;
}

fn retn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.iff1 = cpu.iff2;
    cpu.ret_core();
}

fn im_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let y = (cpu.opcode >> 3) & 0x03;
    cpu.interrupt_mode = match y {
        2 => 1,
        3 => 2,
        _ => 0,
    };
}

fn ld_i_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    cpu.regs.i = cpu.regs.a;
}

fn ld_r_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    cpu.regs.r = cpu.regs.a;
}

fn ld_a_i<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    cpu.regs.a = cpu.regs.i;
    cpu.regs.f = sz53(cpu.regs.a) | if cpu.iff2 { PF } else { 0 } | (cpu.regs.f & CF);
}

fn ld_a_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    cpu.regs.a = cpu.regs.r;
    cpu.regs.f = sz53(cpu.regs.a) | if cpu.iff2 { PF } else { 0 } | (cpu.regs.f & CF);
}

fn rrd<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.tact_plus_with_address(4, hl);
    let a = cpu.regs.a;
    cpu.write_memory(hl, (a << 4) | (tmp >> 4));
    cpu.regs.a = (a & 0xF0) | (tmp & 0x0F);
    cpu.regs.f = sz53p(cpu.regs.a) | (cpu.regs.f & CF);
    cpu.regs.wz = hl.wrapping_add(1);
}

fn rld<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.tact_plus_with_address(4, hl);
    let a = cpu.regs.a;
    cpu.write_memory(hl, (tmp << 4) | (a & 0x0F));
    cpu.regs.a = (a & 0xF0) | (tmp >> 4);
    cpu.regs.f = sz53p(cpu.regs.a) | (cpu.regs.f & CF);
    cpu.regs.wz = hl.wrapping_add(1);
}

// ----------------------------------------------------------------------
// Block transfer, compare and I/O instructions

/// Flags shared by LDI/LDD/LDIR/LDDR. `tmp` is the moved byte plus A.
fn block_transfer_flags<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, tmp: u8) {
    cpu.regs.f = (cpu.regs.f & (CF | ZF | SF))
        | if cpu.regs.bc() != 0 { PF } else { 0 }
        | (tmp & XF)
        | if tmp & 0x02 != 0 { YF } else { 0 };
}

/// Flags shared by CPI/CPD/CPIR/CPDR, computed before WZ is adjusted.
fn block_compare_flags<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, value: u8) {
    let a = cpu.regs.a;
    let mut diff = a.wrapping_sub(value);
    let half_borrow = (a ^ value ^ diff) & 0x10 != 0;
    cpu.regs.f = (cpu.regs.f & CF)
        | NF
        | if cpu.regs.bc() != 0 { PF } else { 0 }
        | if half_borrow { HF } else { 0 }
        | if diff == 0 { ZF } else { 0 }
        | (diff & SF);
    if half_borrow {
        diff = diff.wrapping_sub(1);
    }
    cpu.regs.f |= (diff & XF) | if diff & 0x02 != 0 { YF } else { 0 };
}

/// Flags shared by the block I/O instructions.
fn block_io_flags<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>, tmp: u8, tmp2: u8) {
    let mut f = sz53(cpu.regs.b);
    if tmp & 0x80 != 0 {
        f |= NF;
    }
    if tmp2 < tmp {
        f |= HF | CF;
    }
    if parity((tmp2 & 0x07) ^ cpu.regs.b) {
        f |= PF;
    }
    cpu.regs.f = f;
}

fn ldi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    let de = cpu.regs.de();
    cpu.write_memory(de, tmp);
    cpu.tact_plus_with_address(2, de);
    cpu.regs.set_de(de.wrapping_add(1));
    cpu.regs.set_hl(hl.wrapping_add(1));
    block_transfer_flags(cpu, tmp.wrapping_add(cpu.regs.a));
}

fn ldd<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    let de = cpu.regs.de();
    cpu.write_memory(de, tmp);
    cpu.tact_plus_with_address(2, de);
    cpu.regs.set_de(de.wrapping_sub(1));
    cpu.regs.set_hl(hl.wrapping_sub(1));
    block_transfer_flags(cpu, tmp.wrapping_add(cpu.regs.a));
}

fn ldir<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    let de = cpu.regs.de();
    cpu.write_memory(de, tmp);
    cpu.tact_plus_with_address(2, de);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_transfer_flags(cpu, tmp.wrapping_add(cpu.regs.a));
    if cpu.regs.bc() != 0 {
        cpu.tact_plus_with_address(5, de);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
        cpu.regs.wz = cpu.regs.pc.wrapping_add(1);
    }
    cpu.regs.set_hl(hl.wrapping_add(1));
    cpu.regs.set_de(de.wrapping_add(1));
}

fn lddr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    let de = cpu.regs.de();
    cpu.write_memory(de, tmp);
    cpu.tact_plus_with_address(2, de);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_transfer_flags(cpu, tmp.wrapping_add(cpu.regs.a));
    if cpu.regs.bc() != 0 {
        cpu.tact_plus_with_address(5, de);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
        cpu.regs.wz = cpu.regs.pc.wrapping_add(1);
    }
    cpu.regs.set_hl(hl.wrapping_sub(1));
    cpu.regs.set_de(de.wrapping_sub(1));
}

fn cpi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(5, hl);
    cpu.regs.set_hl(hl.wrapping_add(1));
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_compare_flags(cpu, value);
    cpu.regs.wz = cpu.regs.wz.wrapping_add(1);
}

fn cpd<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(5, hl);
    cpu.regs.set_hl(hl.wrapping_sub(1));
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_compare_flags(cpu, value);
    cpu.regs.wz = cpu.regs.wz.wrapping_sub(1);
}

fn cpir<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(5, hl);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_compare_flags(cpu, value);
    if cpu.regs.f & (PF | ZF) == PF {
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
        cpu.regs.wz = cpu.regs.pc.wrapping_add(1);
    } else {
        cpu.regs.wz = cpu.regs.wz.wrapping_add(1);
    }
    cpu.regs.set_hl(hl.wrapping_add(1));
}

fn cpdr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(5, hl);
    cpu.regs.set_bc(cpu.regs.bc().wrapping_sub(1));
    block_compare_flags(cpu, value);
    if cpu.regs.f & (PF | ZF) == PF {
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
        cpu.regs.wz = cpu.regs.pc.wrapping_add(1);
    } else {
        cpu.regs.wz = cpu.regs.wz.wrapping_sub(1);
    }
    cpu.regs.set_hl(hl.wrapping_sub(1));
}

fn ini<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let bc = cpu.regs.bc();
    let tmp = cpu.read_port(bc);
    let hl = cpu.regs.hl();
    cpu.write_memory(hl, tmp);
    cpu.regs.wz = bc.wrapping_add(1);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    cpu.regs.set_hl(hl.wrapping_add(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.c).wrapping_add(1);
    block_io_flags(cpu, tmp, tmp2);
}

fn ind<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let bc = cpu.regs.bc();
    let tmp = cpu.read_port(bc);
    let hl = cpu.regs.hl();
    cpu.write_memory(hl, tmp);
    cpu.regs.wz = bc.wrapping_sub(1);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    cpu.regs.set_hl(hl.wrapping_sub(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.c).wrapping_sub(1);
    block_io_flags(cpu, tmp, tmp2);
}

fn inir<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let bc = cpu.regs.bc();
    let tmp = cpu.read_port(bc);
    let hl = cpu.regs.hl();
    cpu.write_memory(hl, tmp);
    cpu.regs.wz = bc.wrapping_add(1);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let tmp2 = tmp.wrapping_add(cpu.regs.c).wrapping_add(1);
    block_io_flags(cpu, tmp, tmp2);
    if cpu.regs.b != 0 {
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    }
    cpu.regs.set_hl(hl.wrapping_add(1));
}

fn indr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let bc = cpu.regs.bc();
    let tmp = cpu.read_port(bc);
    let hl = cpu.regs.hl();
    cpu.write_memory(hl, tmp);
    cpu.regs.wz = bc.wrapping_sub(1);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let tmp2 = tmp.wrapping_add(cpu.regs.c).wrapping_sub(1);
    block_io_flags(cpu, tmp, tmp2);
    if cpu.regs.b != 0 {
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    }
    cpu.regs.set_hl(hl.wrapping_sub(1));
}

fn outi<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_add(1);
    cpu.write_port(bc, tmp);
    cpu.regs.set_hl(hl.wrapping_add(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.l);
    block_io_flags(cpu, tmp, tmp2);
}

fn outd<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_sub(1);
    cpu.write_port(bc, tmp);
    cpu.regs.set_hl(hl.wrapping_sub(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.l);
    block_io_flags(cpu, tmp, tmp2);
}

fn otir<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_add(1);
    cpu.write_port(bc, tmp);
    cpu.regs.set_hl(hl.wrapping_add(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.l);
    block_io_flags(cpu, tmp, tmp2);
    if cpu.regs.b != 0 {
        let hl = cpu.regs.hl();
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    }
}

fn otdr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let hl = cpu.regs.hl();
    let tmp = cpu.read_memory(hl);
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_sub(1);
    cpu.write_port(bc, tmp);
    cpu.regs.set_hl(hl.wrapping_sub(1));
    let tmp2 = tmp.wrapping_add(cpu.regs.l);
    block_io_flags(cpu, tmp, tmp2);
    if cpu.regs.b != 0 {
        let hl = cpu.regs.hl();
        cpu.tact_plus_with_address(5, hl);
        cpu.regs.pc = cpu.regs.pc.wrapping_sub(2);
    }
}

/// Build the base extended table: documented ED instructions, with every
/// undefined slot routed to the unknown-opcode policy handler.
pub(crate) fn table<M: MemoryBus, P: PortBus>() -> [Op<M, P>; 256] {
    let mut t: [Op<M, P>; 256] = [unknown; 256];

    for base in (0x40..0x80u16).step_by(8) {
        let base = base as usize;
        t[base] = in_r_c;
        t[base + 1] = out_c_r;
        t[base + 2] = if base & 0x08 == 0 { sbc_hl_rr } else { adc_hl_rr };
        t[base + 3] = if base & 0x08 == 0 { ld_nni_rr } else { ld_rr_nni };
        t[base + 4] = neg;
        t[base + 5] = retn;
        t[base + 6] = im_n;
    }
    t[0x47] = ld_i_a;
    t[0x4F] = ld_r_a;
    t[0x57] = ld_a_i;
    t[0x5F] = ld_a_r;
    t[0x67] = rrd;
    t[0x6F] = rld;
    t[0x77] = nop;
    t[0x7F] = nop;

    t[0xA0] = ldi;
    t[0xA1] = cpi;
    t[0xA2] = ini;
    t[0xA3] = outi;
    t[0xA8] = ldd;
    t[0xA9] = cpd;
    t[0xAA] = ind;
    t[0xAB] = outd;
    t[0xB0] = ldir;
    t[0xB1] = cpir;
    t[0xB2] = inir;
    t[0xB3] = otir;
    t[0xB8] = lddr;
    t[0xB9] = cpdr;
    t[0xBA] = indr;
    t[0xBB] = otdr;

    t
}
