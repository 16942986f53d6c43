//! The standard (unprefixed) opcode page.

use machine_core::{MemoryBus, PortBus};

use super::{alu_on_a, condition, get_reg8, set_reg8};
use crate::alu;
use crate::cpu::{Op, Z80};
use crate::flags::{CF, HF, NF, PF, SF, XF, YF, ZF};

/// Register pair by its opcode encoding (bits 5-4): 0 BC, 1 DE, 2 HL, 3 SP.
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

pub(crate) fn nop<M: MemoryBus, P: PortBus>(_cpu: &mut Z80<M, P>) {}

fn ld_rr_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 4;
    let value = cpu.fetch_code_word();
    set_rr(cpu, idx, value);
}

fn ld_bci_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bc = cpu.regs.bc();
    let a = cpu.regs.a;
    cpu.write_memory(bc, a);
    cpu.regs.wz = (bc.wrapping_add(1) & 0x00FF) | (u16::from(a) << 8);
}

fn ld_dei_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let de = cpu.regs.de();
    let a = cpu.regs.a;
    cpu.write_memory(de, a);
    cpu.regs.wz = (de.wrapping_add(1) & 0x00FF) | (u16::from(a) << 8);
}

fn inc_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 4;
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    let value = get_rr(cpu, idx).wrapping_add(1);
    set_rr(cpu, idx, value);
}

fn dec_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 4;
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    let value = get_rr(cpu, idx).wrapping_sub(1);
    set_rr(cpu, idx, value);
}

fn inc_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let r = alu::inc8(get_reg8(cpu, idx));
    set_reg8(cpu, idx, r.value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
}

fn dec_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let r = alu::dec8(get_reg8(cpu, idx));
    set_reg8(cpu, idx, r.value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
}

fn ld_r_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 3;
    let value = cpu.fetch_code_byte();
    set_reg8(cpu, idx, value);
}

fn rlca<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let carry = cpu.regs.a & 0x80 != 0;
    cpu.regs.a = cpu.regs.a.rotate_left(1);
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF)) | (cpu.regs.a & (YF | XF)) | u8::from(carry);
}

fn rrca<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let carry = cpu.regs.a & 0x01 != 0;
    cpu.regs.a = cpu.regs.a.rotate_right(1);
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF)) | (cpu.regs.a & (YF | XF)) | u8::from(carry);
}

fn rla<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let carry = cpu.regs.a & 0x80 != 0;
    cpu.regs.a = (cpu.regs.a << 1) | (cpu.regs.f & CF);
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF)) | (cpu.regs.a & (YF | XF)) | u8::from(carry);
}

fn rra<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let carry = cpu.regs.a & 0x01 != 0;
    cpu.regs.a = (cpu.regs.a >> 1) | ((cpu.regs.f & CF) << 7);
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF)) | (cpu.regs.a & (YF | XF)) | u8::from(carry);
}

fn ex_af<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.exchange_af();
}

fn add_hl_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = cpu.opcode >> 4;
    cpu.tact_plus_with_address(7, cpu.regs.ir());
    let hl = cpu.regs.hl();
    cpu.regs.wz = hl.wrapping_add(1);
    let r = alu::add16(hl, get_rr(cpu, idx), cpu.regs.f);
    cpu.regs.set_hl(r.value);
    cpu.regs.f = r.flags;
}

fn ld_a_bci<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let bc = cpu.regs.bc();
    cpu.regs.wz = bc.wrapping_add(1);
    cpu.regs.a = cpu.read_memory(bc);
}

fn ld_a_dei<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let de = cpu.regs.de();
    cpu.regs.wz = de.wrapping_add(1);
    cpu.regs.a = cpu.read_memory(de);
}

fn djnz<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    let distance = cpu.fetch_code_byte();
    cpu.regs.b = cpu.regs.b.wrapping_sub(1);
    if cpu.regs.b != 0 {
        cpu.relative_jump(distance);
    }
}

fn jr_e<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let distance = cpu.fetch_code_byte();
    cpu.relative_jump(distance);
}

fn jr_cc_e<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    // 0x20/0x28/0x30/0x38 map to NZ/Z/NC/C
    let cc = (cpu.opcode >> 3) & 0x03;
    let distance = cpu.fetch_code_byte();
    if condition(cpu, cc) {
        cpu.relative_jump(distance);
    }
}

fn ld_nni_hl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    let l = cpu.regs.l;
    let h = cpu.regs.h;
    cpu.write_memory(addr, l);
    let wz = cpu.regs.wz;
    cpu.write_memory(wz, h);
}

fn ld_hl_nni<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    cpu.regs.l = cpu.read_memory(addr);
    let wz = cpu.regs.wz;
    cpu.regs.h = cpu.read_memory(wz);
}

fn daa<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let r = alu::daa(cpu.regs.a, cpu.regs.f);
    cpu.regs.a = r.value;
    cpu.regs.f = r.flags;
}

fn cpl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.a = !cpu.regs.a;
    cpu.regs.f =
        (cpu.regs.f & (SF | ZF | PF | CF)) | HF | NF | (cpu.regs.a & (YF | XF));
}

fn ld_nni_a<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    let a = cpu.regs.a;
    cpu.write_memory(addr, a);
    cpu.regs.wz = (addr.wrapping_add(1) & 0x00FF) | (u16::from(a) << 8);
}

fn ld_a_nni<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let addr = cpu.fetch_code_word();
    cpu.regs.wz = addr.wrapping_add(1);
    cpu.regs.a = cpu.read_memory(addr);
}

fn inc_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(1, hl);
    let r = alu::inc8(value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
    cpu.write_memory(hl, r.value);
}

fn dec_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    cpu.tact_plus_with_address(1, hl);
    let r = alu::dec8(value);
    cpu.regs.f = r.flags | (cpu.regs.f & CF);
    cpu.write_memory(hl, r.value);
}

fn ld_hli_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = cpu.fetch_code_byte();
    let hl = cpu.regs.hl();
    cpu.write_memory(hl, value);
}

fn scf<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF)) | CF | (cpu.regs.a & (YF | XF));
}

fn ccf<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let old_carry = cpu.regs.f & CF != 0;
    cpu.regs.f = (cpu.regs.f & (SF | ZF | PF))
        | (cpu.regs.a & (YF | XF))
        | if old_carry { HF } else { CF };
}

fn ld_r_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = get_reg8(cpu, cpu.opcode);
    set_reg8(cpu, cpu.opcode >> 3, value);
}

fn ld_r_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    set_reg8(cpu, cpu.opcode >> 3, value);
}

fn ld_hli_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = get_reg8(cpu, cpu.opcode);
    cpu.write_memory(hl, value);
}

fn halt<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.enter_halted_state();
}

fn alu_a_r<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let value = get_reg8(cpu, cpu.opcode);
    alu_on_a(cpu, cpu.opcode >> 3, value);
}

fn alu_a_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let hl = cpu.regs.hl();
    let value = cpu.read_memory(hl);
    alu_on_a(cpu, cpu.opcode >> 3, value);
}

fn alu_a_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let op = cpu.opcode >> 3;
    let value = cpu.fetch_code_byte();
    alu_on_a(cpu, op, value);
}

fn ret_cc<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(1, cpu.regs.ir());
    if condition(cpu, cpu.opcode >> 3) {
        cpu.ret_core();
    }
}

fn ret<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.ret_core();
}

fn pop_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    let value = cpu.pop16();
    // Encoding 3 is AF on this row, not SP
    if idx == 3 {
        cpu.regs.set_af(value);
    } else {
        set_rr(cpu, idx, value);
    }
}

fn push_rr<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let idx = (cpu.opcode >> 4) & 0x03;
    let value = if idx == 3 { cpu.regs.af() } else { get_rr(cpu, idx) };
    cpu.push16(value);
}

fn jp_cc_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let cc = cpu.opcode >> 3;
    cpu.regs.wz = cpu.fetch_code_word();
    if condition(cpu, cc) {
        cpu.regs.pc = cpu.regs.wz;
    }
}

fn jp_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.wz = cpu.fetch_code_word();
    cpu.regs.pc = cpu.regs.wz;
}

fn call_cc_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let cc = cpu.opcode >> 3;
    cpu.regs.wz = cpu.fetch_code_word();
    if condition(cpu, cc) {
        cpu.call_core();
    }
}

fn call_nn<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.wz = cpu.fetch_code_word();
    cpu.call_core();
}

fn rst_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let target = u16::from(cpu.opcode & 0x38);
    cpu.rst_core(target);
}

fn out_na<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let low = u16::from(cpu.fetch_code_byte());
    let a = cpu.regs.a;
    let port = (u16::from(a) << 8) | low;
    cpu.write_port(port, a);
    cpu.regs.wz = (port.wrapping_add(1) & 0x00FF) | (u16::from(a) << 8);
}

fn in_a_n<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let low = u16::from(cpu.fetch_code_byte());
    let port = (u16::from(cpu.regs.a) << 8) | low;
    cpu.regs.wz = port.wrapping_add(1);
    cpu.regs.a = cpu.read_port(port);
}

fn exx<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.exchange_main();
}

fn ex_spi_hl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let sp = cpu.regs.sp;
    let sp1 = sp.wrapping_add(1);
    let low = cpu.read_memory(sp);
    let high = cpu.read_memory(sp1);
    cpu.tact_plus_with_address(1, sp1);
    let h = cpu.regs.h;
    let l = cpu.regs.l;
    cpu.write_memory(sp1, h);
    cpu.write_memory(sp, l);
    cpu.tact_plus_with_address(2, sp);
    cpu.regs.wz = (u16::from(high) << 8) | u16::from(low);
    let wz = cpu.regs.wz;
    cpu.regs.set_hl(wz);
}

fn jp_hli<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.regs.pc = cpu.regs.hl();
}

fn ex_de_hl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    let de = cpu.regs.de();
    let hl = cpu.regs.hl();
    cpu.regs.set_de(hl);
    cpu.regs.set_hl(de);
}

fn di<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.iff1 = false;
    cpu.iff2 = false;
}

fn ei<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.iff1 = true;
    cpu.iff2 = true;
    cpu.set_ei_backlog();
}

fn ld_sp_hl<M: MemoryBus, P: PortBus>(cpu: &mut Z80<M, P>) {
    cpu.tact_plus_with_address(2, cpu.regs.ir());
    cpu.regs.sp = cpu.regs.hl();
}

/// Build the standard opcode table. The 0xCB/0xDD/0xED/0xFD slots are never
/// dispatched (the prefix tracker intercepts them); they hold `nop` only to
/// keep the table total.
#[rustfmt::skip]
pub(crate) fn table<M: MemoryBus, P: PortBus>() -> [Op<M, P>; 256] {
    [
        // 0x00
        nop,      ld_rr_nn, ld_bci_a, inc_rr,   inc_r,    dec_r,    ld_r_n,   rlca,
        ex_af,    add_hl_rr, ld_a_bci, dec_rr,  inc_r,    dec_r,    ld_r_n,   rrca,
        // 0x10
        djnz,     ld_rr_nn, ld_dei_a, inc_rr,   inc_r,    dec_r,    ld_r_n,   rla,
        jr_e,     add_hl_rr, ld_a_dei, dec_rr,  inc_r,    dec_r,    ld_r_n,   rra,
        // 0x20
        jr_cc_e,  ld_rr_nn, ld_nni_hl, inc_rr,  inc_r,    dec_r,    ld_r_n,   daa,
        jr_cc_e,  add_hl_rr, ld_hl_nni, dec_rr, inc_r,    dec_r,    ld_r_n,   cpl,
        // 0x30
        jr_cc_e,  ld_rr_nn, ld_nni_a, inc_rr,   inc_hli,  dec_hli,  ld_hli_n, scf,
        jr_cc_e,  add_hl_rr, ld_a_nni, dec_rr,  inc_r,    dec_r,    ld_r_n,   ccf,
        // 0x40
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        // 0x50
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        // 0x60
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        // 0x70
        ld_hli_r, ld_hli_r, ld_hli_r, ld_hli_r, ld_hli_r, ld_hli_r, halt,     ld_hli_r,
        ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_r,   ld_r_hli, ld_r_r,
        // 0x80
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        // 0x90
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        // 0xA0
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        // 0xB0
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_r,  alu_a_hli, alu_a_r,
        // 0xC0
        ret_cc,   pop_rr,   jp_cc_nn, jp_nn,    call_cc_nn, push_rr, alu_a_n, rst_n,
        ret_cc,   ret,      jp_cc_nn, nop,      call_cc_nn, call_nn, alu_a_n, rst_n,
        // 0xD0
        ret_cc,   pop_rr,   jp_cc_nn, out_na,   call_cc_nn, push_rr, alu_a_n, rst_n,
        ret_cc,   exx,      jp_cc_nn, in_a_n,   call_cc_nn, nop,     alu_a_n, rst_n,
        // 0xE0
        ret_cc,   pop_rr,   jp_cc_nn, ex_spi_hl, call_cc_nn, push_rr, alu_a_n, rst_n,
        ret_cc,   jp_hli,   jp_cc_nn, ex_de_hl, call_cc_nn, nop,     alu_a_n, rst_n,
        // 0xF0
        ret_cc,   pop_rr,   jp_cc_nn, di,       call_cc_nn, push_rr, alu_a_n, rst_n,
        ret_cc,   ld_sp_hl, jp_cc_nn, ei,       call_cc_nn, nop,     alu_a_n, rst_n,
    ]
}
