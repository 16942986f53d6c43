//! Instruction-level tests: semantics and tact counts.
//!
//! Each test loads a short program into flat RAM, runs it one instruction
//! at a time, and asserts registers, memory, and the CPU tact counter.

use machine_core::{MemoryBus, PortBus};
use z80_cpu::{CpuFault, Prefix, UnknownOpcodePolicy, Z80, ZF};

/// Flat 64K RAM with the default 3-tact access delay.
struct TestMemory {
    ram: Vec<u8>,
}

impl TestMemory {
    fn new() -> Self {
        Self {
            ram: vec![0; 0x1_0000],
        }
    }

    fn load(&mut self, address: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.ram[usize::from(address) + i] = byte;
        }
    }

    fn peek(&self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }
}

impl MemoryBus for TestMemory {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }
}

/// Ports that return a fixed value and log writes.
#[derive(Default)]
struct TestPorts {
    input: u8,
    writes: Vec<(u16, u8)>,
}

impl PortBus for TestPorts {
    fn read(&mut self, _port: u16) -> u8 {
        self.input
    }

    fn write(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
}

type TestCpu = Z80<TestMemory, TestPorts>;

/// A CPU with the program loaded at address 0 and flags cleared.
fn cpu_with(program: &[u8]) -> TestCpu {
    let mut memory = TestMemory::new();
    memory.load(0x0000, program);
    let mut cpu = Z80::new(memory, TestPorts::default());
    cpu.regs.f = 0;
    cpu
}

fn run_instructions(cpu: &mut TestCpu, count: usize) {
    for _ in 0..count {
        cpu.execute_instruction();
    }
}

#[test]
fn nop_takes_four_tacts() {
    let mut cpu = cpu_with(&[0x00]);

    cpu.execute_instruction();

    assert_eq!(cpu.regs.pc, 0x0001);
    assert_eq!(cpu.tacts(), 4);
}

#[test]
fn ld_a_n() {
    let mut cpu = cpu_with(&[0x3E, 0x42]); // LD A,0x42

    cpu.execute_instruction();

    assert_eq!(cpu.regs.a, 0x42);
    assert_eq!(cpu.tacts(), 7);
}

#[test]
fn ld_bc_nn() {
    let mut cpu = cpu_with(&[0x01, 0x34, 0x12]); // LD BC,0x1234

    cpu.execute_instruction();

    assert_eq!(cpu.regs.bc(), 0x1234);
    assert_eq!(cpu.tacts(), 10);
}

#[test]
fn push_pop_round_trip() {
    let mut cpu = cpu_with(&[
        0x01, 0x34, 0x12, // LD BC,0x1234
        0x31, 0x00, 0x80, // LD SP,0x8000
        0xC5, // PUSH BC
        0x01, 0x00, 0x00, // LD BC,0x0000
        0xD1, // POP DE
    ]);

    run_instructions(&mut cpu, 5);

    assert_eq!(cpu.regs.de(), 0x1234);
    assert_eq!(cpu.regs.sp, 0x8000);
    assert_eq!(cpu.memory().peek(0x7FFF), 0x12);
    assert_eq!(cpu.memory().peek(0x7FFE), 0x34);
}

#[test]
fn push_takes_eleven_tacts_pop_ten() {
    let mut cpu = cpu_with(&[0xC5, 0xC1]); // PUSH BC / POP BC
    cpu.regs.sp = 0x8000;

    cpu.execute_instruction();
    assert_eq!(cpu.tacts(), 11);

    cpu.execute_instruction();
    assert_eq!(cpu.tacts(), 21);
}

#[test]
fn call_and_ret() {
    let mut cpu = cpu_with(&[
        0x31, 0x00, 0x80, // LD SP,0x8000
        0xCD, 0x10, 0x00, // CALL 0x0010
        0x3E, 0x99, // LD A,0x99
    ]);
    cpu.memory_mut().load(0x0010, &[0x3E, 0x42, 0xC9]); // LD A,0x42 / RET

    cpu.execute_instruction(); // LD SP
    let before_call = cpu.tacts();
    cpu.execute_instruction(); // CALL
    assert_eq!(cpu.tacts() - before_call, 17);
    assert_eq!(cpu.regs.pc, 0x0010);
    assert_eq!(cpu.regs.sp, 0x7FFE);

    cpu.execute_instruction(); // LD A,0x42
    assert!(!cpu.ret_executed());

    let before_ret = cpu.tacts();
    cpu.execute_instruction(); // RET
    assert_eq!(cpu.tacts() - before_ret, 10);
    assert_eq!(cpu.regs.pc, 0x0006);
    assert_eq!(cpu.regs.sp, 0x8000);
    assert!(cpu.ret_executed());

    cpu.execute_instruction(); // LD A,0x99
    assert_eq!(cpu.regs.a, 0x99);
    assert!(!cpu.ret_executed());
}

#[test]
fn conditional_call_not_taken_takes_ten_tacts() {
    let mut cpu = cpu_with(&[0xC4, 0x00, 0x90]); // CALL NZ,0x9000
    cpu.regs.f = ZF; // Z set, NZ fails

    cpu.execute_instruction();

    assert_eq!(cpu.regs.pc, 0x0003);
    assert_eq!(cpu.tacts(), 10);
}

#[test]
fn djnz_loops_until_b_reaches_zero() {
    let mut cpu = cpu_with(&[
        0x06, 0x03, // LD B,3
        0x3C, // INC A
        0x10, 0xFD, // DJNZ -3
    ]);
    cpu.regs.a = 0;

    cpu.execute_instruction(); // LD B,3
    for _ in 0..3 {
        cpu.execute_instruction(); // INC A
        let before = cpu.tacts();
        cpu.execute_instruction(); // DJNZ
        let expected = if cpu.regs.b == 0 { 8 } else { 13 };
        assert_eq!(cpu.tacts() - before, expected);
    }

    assert_eq!(cpu.regs.a, 3);
    assert_eq!(cpu.regs.pc, 0x0005);
}

#[test]
fn jr_takes_twelve_tacts() {
    let mut cpu = cpu_with(&[0x18, 0x05]); // JR +5

    cpu.execute_instruction();

    assert_eq!(cpu.regs.pc, 0x0007);
    assert_eq!(cpu.regs.wz, 0x0007);
    assert_eq!(cpu.tacts(), 12);
}

#[test]
fn inc_hl_indirect_takes_eleven_tacts() {
    let mut cpu = cpu_with(&[0x34]); // INC (HL)
    cpu.regs.set_hl(0x8000);
    cpu.memory_mut().load(0x8000, &[0x7F]);

    cpu.execute_instruction();

    assert_eq!(cpu.memory().peek(0x8000), 0x80);
    assert_eq!(cpu.tacts(), 11);
    // 0x7F + 1 overflows into the sign bit
    assert_ne!(cpu.regs.f & 0x80, 0);
    assert_ne!(cpu.regs.f & 0x04, 0); // PV: overflow
}

#[test]
fn ex_sp_hl_takes_nineteen_tacts() {
    let mut cpu = cpu_with(&[0xE3]); // EX (SP),HL
    cpu.regs.sp = 0x8000;
    cpu.regs.set_hl(0x1234);
    cpu.memory_mut().load(0x8000, &[0x78, 0x56]);

    cpu.execute_instruction();

    assert_eq!(cpu.regs.hl(), 0x5678);
    assert_eq!(cpu.memory().peek(0x8000), 0x34);
    assert_eq!(cpu.memory().peek(0x8001), 0x12);
    assert_eq!(cpu.tacts(), 19);
}

#[test]
fn add_hl_bc_takes_eleven_tacts_and_keeps_sign_flags() {
    let mut cpu = cpu_with(&[0x09]); // ADD HL,BC
    cpu.regs.set_hl(0x0FFF);
    cpu.regs.set_bc(0x0001);
    cpu.regs.f = ZF;

    cpu.execute_instruction();

    assert_eq!(cpu.regs.hl(), 0x1000);
    assert_eq!(cpu.tacts(), 11);
    // Z survives a 16-bit add; H comes from bit 11
    assert_ne!(cpu.regs.f & ZF, 0);
    assert_ne!(cpu.regs.f & 0x10, 0);
}

#[test]
fn daa_adjusts_bcd_addition() {
    let mut cpu = cpu_with(&[
        0x3E, 0x15, // LD A,0x15
        0xC6, 0x27, // ADD A,0x27
        0x27, // DAA
    ]);

    run_instructions(&mut cpu, 3);

    assert_eq!(cpu.regs.a, 0x42);
}

#[test]
fn cb_set_and_bit() {
    let mut cpu = cpu_with(&[
        0xCB, 0xC7, // SET 0,A
        0xCB, 0x47, // BIT 0,A
    ]);
    cpu.regs.a = 0;

    cpu.execute_instruction();
    assert_eq!(cpu.regs.a, 0x01);
    assert_eq!(cpu.tacts(), 8);

    cpu.execute_instruction();
    assert_eq!(cpu.regs.f & ZF, 0);
}

#[test]
fn sbc_hl_de_takes_fifteen_tacts() {
    let mut cpu = cpu_with(&[0xED, 0x52]); // SBC HL,DE
    cpu.regs.set_hl(0x4000);
    cpu.regs.set_de(0x4000);

    cpu.execute_instruction();

    assert_eq!(cpu.regs.hl(), 0x0000);
    assert_ne!(cpu.regs.f & ZF, 0);
    assert_eq!(cpu.tacts(), 15);
}

#[test]
fn ld_nn_dd_and_back() {
    let mut cpu = cpu_with(&[
        0xED, 0x43, 0x00, 0x90, // LD (0x9000),BC
        0xED, 0x5B, 0x00, 0x90, // LD DE,(0x9000)
    ]);
    cpu.regs.set_bc(0xBEEF);

    run_instructions(&mut cpu, 2);

    assert_eq!(cpu.memory().peek(0x9000), 0xEF);
    assert_eq!(cpu.memory().peek(0x9001), 0xBE);
    assert_eq!(cpu.regs.de(), 0xBEEF);
    assert_eq!(cpu.tacts(), 40); // 20 + 20
}

#[test]
fn ldir_repeats_until_bc_zero() {
    let mut cpu = cpu_with(&[0xED, 0xB0]); // LDIR
    cpu.regs.set_hl(0x8000);
    cpu.regs.set_de(0x9000);
    cpu.regs.set_bc(0x0002);
    cpu.memory_mut().load(0x8000, &[0xAA, 0xBB]);

    cpu.execute_instruction();
    // Repeating iteration: 21 tacts, PC rewound onto the ED prefix
    assert_eq!(cpu.tacts(), 21);
    assert_eq!(cpu.regs.pc, 0x0000);
    assert_eq!(cpu.regs.bc(), 1);

    cpu.execute_instruction();
    // Final iteration: 16 tacts, PC moves on
    assert_eq!(cpu.tacts(), 37);
    assert_eq!(cpu.regs.pc, 0x0002);
    assert_eq!(cpu.regs.bc(), 0);
    assert_eq!(cpu.memory().peek(0x9000), 0xAA);
    assert_eq!(cpu.memory().peek(0x9001), 0xBB);
}

#[test]
fn cpir_stops_on_match() {
    let mut cpu = cpu_with(&[0xED, 0xB1]); // CPIR
    cpu.regs.a = 0xBB;
    cpu.regs.set_hl(0x8000);
    cpu.regs.set_bc(0x0004);
    cpu.memory_mut().load(0x8000, &[0xAA, 0xBB, 0xCC, 0xDD]);

    cpu.execute_instruction(); // no match at 0x8000, repeats
    cpu.execute_instruction(); // match at 0x8001

    assert_eq!(cpu.regs.hl(), 0x8002);
    assert_eq!(cpu.regs.bc(), 2);
    assert_ne!(cpu.regs.f & ZF, 0);
    assert_eq!(cpu.regs.pc, 0x0002);
}

#[test]
fn in_and_out_through_ports() {
    let mut cpu = cpu_with(&[
        0xDB, 0xFE, // IN A,(0xFE)
        0xD3, 0x10, // OUT (0x10),A
    ]);
    cpu.regs.a = 0x12;
    cpu.ports_mut().input = 0x5C;

    cpu.execute_instruction();
    assert_eq!(cpu.regs.a, 0x5C);
    assert_eq!(cpu.tacts(), 11);
    assert_eq!(cpu.last_io_read_port(), Some(0x12FE));

    cpu.execute_instruction();
    assert_eq!(cpu.ports().writes, vec![(0x5C10, 0x5C)]);
    assert_eq!(cpu.last_io_write_port(), Some(0x5C10));
}

#[test]
fn out_c_b_writes_register() {
    let mut cpu = cpu_with(&[0xED, 0x41]); // OUT (C),B
    cpu.regs.set_bc(0x3310);

    cpu.execute_instruction();

    assert_eq!(cpu.ports().writes, vec![(0x3310, 0x33)]);
    assert_eq!(cpu.tacts(), 12);
}

#[test]
fn ld_ix_d_n_takes_nineteen_tacts() {
    let mut cpu = cpu_with(&[0xDD, 0x36, 0x01, 0xAB]); // LD (IX+1),0xAB
    cpu.regs.ix = 0x8FFF;

    cpu.execute_instruction();

    assert_eq!(cpu.memory().peek(0x9000), 0xAB);
    assert_eq!(cpu.tacts(), 19);
}

#[test]
fn indexed_bit_timing() {
    let mut cpu = cpu_with(&[
        0xDD, 0xCB, 0x02, 0x7E, // BIT 7,(IX+2)
        0xFD, 0xCB, 0xFE, 0xC6, // SET 0,(IY-2)
    ]);
    cpu.regs.ix = 0x8000;
    cpu.regs.iy = 0x8004;
    cpu.memory_mut().load(0x8002, &[0x80]);

    cpu.execute_instruction();
    assert_eq!(cpu.regs.f & ZF, 0); // bit 7 is set
    assert_eq!(cpu.tacts(), 20);

    cpu.execute_instruction();
    assert_eq!(cpu.memory().peek(0x8002), 0x81);
    assert_eq!(cpu.tacts(), 43); // 20 + 23
}

#[test]
fn dd_prefix_chains_resolve_to_the_last_one() {
    // DD FD 21 : the FD wins, so IY is loaded
    let mut cpu = cpu_with(&[0xDD, 0xFD, 0x21, 0x34, 0x12]);

    cpu.execute_cpu_cycle();
    assert_eq!(cpu.prefix(), Prefix::Dd);
    cpu.execute_cpu_cycle();
    assert_eq!(cpu.prefix(), Prefix::Fd);
    cpu.execute_instruction();

    assert_eq!(cpu.regs.iy, 0x1234);
    assert_eq!(cpu.regs.ix, 0);
}

#[test]
fn halt_rewinds_pc_and_burns_four_tacts_per_cycle() {
    let mut cpu = cpu_with(&[0x76]); // HALT

    cpu.execute_instruction();
    assert!(cpu.is_halted());
    assert_eq!(cpu.regs.pc, 0x0000);

    let before = cpu.tacts();
    cpu.execute_instruction();
    assert_eq!(cpu.tacts() - before, 4);
    assert!(cpu.is_halted());
}

#[test]
fn nmi_leaves_halt_and_jumps_to_0066() {
    let mut cpu = cpu_with(&[0x76]); // HALT
    cpu.regs.sp = 0x8000;
    cpu.iff1 = true;

    cpu.execute_instruction();
    assert!(cpu.is_halted());

    cpu.sig_nmi = true;
    let before = cpu.tacts();
    cpu.execute_cpu_cycle();

    assert_eq!(cpu.regs.pc, 0x0066);
    assert!(!cpu.is_halted());
    assert!(!cpu.iff1);
    assert!(cpu.iff2); // pre-NMI interrupt state preserved
    assert_eq!(cpu.tacts() - before, 11);
    // The pushed return address points past the HALT
    assert_eq!(cpu.memory().peek(0x7FFE), 0x01);
    assert_eq!(cpu.memory().peek(0x7FFF), 0x00);
}

#[test]
fn im1_interrupt_jumps_to_0038() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.pc = 0x4123;
    cpu.iff1 = true;
    cpu.interrupt_mode = 1;
    cpu.sig_int = true;

    cpu.execute_cpu_cycle();

    assert_eq!(cpu.regs.pc, 0x0038);
    assert!(!cpu.iff1);
    assert!(!cpu.iff2);
    assert_eq!(cpu.tacts(), 13);
    assert_eq!(cpu.memory().peek(0x7FFE), 0x23);
    assert_eq!(cpu.memory().peek(0x7FFF), 0x41);
}

#[test]
fn im2_interrupt_reads_vector_from_i_page() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.sp = 0x8000;
    cpu.regs.i = 0x40;
    cpu.iff1 = true;
    cpu.interrupt_mode = 2;
    cpu.sig_int = true;
    cpu.memory_mut().load(0x40FF, &[0x34, 0x12]);

    cpu.execute_cpu_cycle();

    assert_eq!(cpu.regs.pc, 0x1234);
    assert_eq!(cpu.tacts(), 19);
}

#[test]
fn ei_shadows_the_following_instruction() {
    let mut cpu = cpu_with(&[0xFB, 0x00, 0x00]); // EI / NOP / NOP
    cpu.regs.sp = 0x8000;
    cpu.interrupt_mode = 1;

    cpu.execute_instruction(); // EI
    assert!(cpu.iff1);

    cpu.sig_int = true;
    cpu.execute_cpu_cycle();
    // Still shadowed: the NOP after EI runs instead of the interrupt
    assert_eq!(cpu.regs.pc, 0x0002);

    cpu.execute_cpu_cycle();
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn interrupts_wait_for_prefix_resolution() {
    let mut cpu = cpu_with(&[0xDD, 0x21, 0x34, 0x12]); // LD IX,0x1234
    cpu.regs.sp = 0x8000;
    cpu.iff1 = true;
    cpu.interrupt_mode = 1;

    cpu.execute_cpu_cycle(); // DD prefix
    cpu.sig_int = true;
    cpu.execute_cpu_cycle(); // must finish the instruction first

    assert_eq!(cpu.regs.ix, 0x1234);
    assert_eq!(cpu.regs.pc, 0x0004);

    cpu.execute_cpu_cycle();
    assert_eq!(cpu.regs.pc, 0x0038);
}

#[test]
fn reset_signal_is_sensed_mid_instruction() {
    let mut cpu = cpu_with(&[0xDD, 0x21, 0x34, 0x12]);

    cpu.execute_cpu_cycle(); // DD prefix
    cpu.sig_rst = true;
    cpu.execute_cpu_cycle();

    assert_eq!(cpu.regs.pc, 0x0000);
    assert_eq!(cpu.prefix(), Prefix::None);
    assert_eq!(cpu.tacts(), 0);
    assert_eq!(cpu.regs.ix, 0);
}

#[test]
fn refresh_register_increments_per_m1_keeping_bit_7() {
    let mut cpu = cpu_with(&[0x00, 0x00, 0xDD, 0x21, 0x34, 0x12]);
    cpu.regs.r = 0xFE;

    run_instructions(&mut cpu, 2); // two NOPs
    assert_eq!(cpu.regs.r, 0x80); // 0xFE -> 0xFF -> wraps within 7 bits

    cpu.execute_instruction(); // DD-prefixed: only the DD fetch is M1
    assert_eq!(cpu.regs.r, 0x81);
}

#[test]
fn ld_a_i_copies_iff2_into_pv() {
    let mut cpu = cpu_with(&[0xED, 0x57, 0xED, 0x57]); // LD A,I twice
    cpu.regs.i = 0x5A;

    cpu.iff2 = true;
    cpu.execute_instruction();
    assert_eq!(cpu.regs.a, 0x5A);
    assert_ne!(cpu.regs.f & 0x04, 0);
    assert_eq!(cpu.tacts(), 9);

    cpu.iff2 = false;
    cpu.execute_instruction();
    assert_eq!(cpu.regs.f & 0x04, 0);
}

#[test]
fn rld_rotates_through_memory_nibbles() {
    let mut cpu = cpu_with(&[0xED, 0x6F]); // RLD
    cpu.regs.a = 0x7A;
    cpu.regs.set_hl(0x8000);
    cpu.memory_mut().load(0x8000, &[0x31]);

    cpu.execute_instruction();

    assert_eq!(cpu.regs.a, 0x73);
    assert_eq!(cpu.memory().peek(0x8000), 0x1A);
    assert_eq!(cpu.tacts(), 18);
}

#[test]
fn call_instruction_length_classifies_opcodes() {
    let mut cpu = cpu_with(&[0xCD]); // CALL nn
    assert_eq!(cpu.get_call_instruction_length(), 3);

    cpu.memory_mut().load(0x0000, &[0xC4]); // CALL NZ,nn
    assert_eq!(cpu.get_call_instruction_length(), 3);

    cpu.memory_mut().load(0x0000, &[0xFF]); // RST 38
    assert_eq!(cpu.get_call_instruction_length(), 1);

    cpu.memory_mut().load(0x0000, &[0x76]); // HALT
    assert_eq!(cpu.get_call_instruction_length(), 1);

    cpu.memory_mut().load(0x0000, &[0xED, 0xB0]); // LDIR
    assert_eq!(cpu.get_call_instruction_length(), 2);

    cpu.memory_mut().load(0x0000, &[0xED, 0xA0]); // LDI does not repeat
    assert_eq!(cpu.get_call_instruction_length(), 0);

    cpu.memory_mut().load(0x0000, &[0x3E]); // LD A,n
    assert_eq!(cpu.get_call_instruction_length(), 0);

    // Classification must not touch the tact counter or access logs
    assert_eq!(cpu.tacts(), 0);
}

#[test]
fn access_logs_cover_one_instruction() {
    let mut cpu = cpu_with(&[
        0x32, 0x00, 0x90, // LD (0x9000),A
        0x3A, 0x00, 0x90, // LD A,(0x9000)
    ]);

    cpu.execute_instruction();
    assert_eq!(cpu.last_memory_writes(), &[0x9000]);
    // The log includes the code fetches of this instruction
    assert_eq!(cpu.last_memory_reads(), &[0x0000, 0x0001, 0x0002]);

    cpu.execute_instruction();
    assert_eq!(cpu.last_memory_writes(), &[]);
    assert_eq!(cpu.last_memory_reads(), &[0x0003, 0x0004, 0x0005, 0x9000]);
}

#[test]
fn unknown_ed_opcode_is_a_nop_by_default() {
    let mut cpu = cpu_with(&[0xED, 0x00]);

    cpu.execute_instruction();

    assert_eq!(cpu.fault(), None);
    assert_eq!(cpu.regs.pc, 0x0002);
    assert_eq!(cpu.tacts(), 8);
}

#[test]
fn unknown_ed_opcode_faults_under_fault_policy() {
    let mut cpu = cpu_with(&[0xED, 0x00]);
    cpu.unknown_opcode_policy = UnknownOpcodePolicy::Fault;

    cpu.execute_instruction();

    assert_eq!(
        cpu.fault(),
        Some(CpuFault {
            opcode: 0x00,
            prefix: Prefix::Ed,
            pc: 0x0000,
        })
    );

    cpu.clear_fault();
    assert_eq!(cpu.fault(), None);
}

#[test]
fn frame_tacts_wrap_at_the_frame_size() {
    let mut cpu = cpu_with(&[0x00; 16]);
    cpu.set_tacts_in_frame(10);

    run_instructions(&mut cpu, 3); // 12 tacts

    assert_eq!(cpu.frames(), 1);
    assert_eq!(cpu.frame_tacts(), 2);
    assert_eq!(cpu.tacts(), 12);
}

#[test]
fn clock_multiplier_scales_the_frame() {
    let mut cpu = cpu_with(&[0x00; 16]);
    cpu.set_tacts_in_frame(10);
    cpu.set_clock_multiplier(2);

    run_instructions(&mut cpu, 3); // 12 tacts, frame budget is 20

    assert_eq!(cpu.frames(), 0);
    assert_eq!(cpu.frame_tacts(), 12);
    assert_eq!(cpu.current_frame_tact(), 6);
}

#[test]
fn hard_reset_clears_what_the_reset_line_leaves_alone() {
    let mut cpu = cpu_with(&[0x00]);
    cpu.regs.set_bc(0x1234);
    cpu.regs.ix = 0x5678;

    cpu.reset();
    assert_eq!(cpu.regs.bc(), 0x1234);
    assert_eq!(cpu.regs.ix, 0x5678);
    assert_eq!(cpu.regs.sp, 0xFFFF);

    cpu.hard_reset();
    assert_eq!(cpu.regs.bc(), 0x0000);
    assert_eq!(cpu.regs.ix, 0x0000);
    assert_eq!(cpu.regs.sp, 0xFFFF);
}

/// RAM whose address bus is contended by one tact on every access.
struct ContendedMemory {
    ram: Vec<u8>,
}

impl MemoryBus for ContendedMemory {
    fn read(&mut self, address: u16) -> u8 {
        self.ram[usize::from(address)]
    }

    fn write(&mut self, address: u16, value: u8) {
        self.ram[usize::from(address)] = value;
    }

    fn address_bus_delay(&self, _address: u16) -> u32 {
        1
    }
}

#[test]
fn delayed_address_bus_stretches_internal_cycles() {
    let mut ram = vec![0u8; 0x1_0000];
    ram[0] = 0x18; // JR +2
    ram[1] = 0x02;
    let mut cpu = Z80::new(ContendedMemory { ram }, TestPorts::default());

    cpu.execute_instruction();
    assert_eq!(cpu.tacts(), 12);

    cpu.regs.pc = 0x0000;
    cpu.delayed_address_bus = true;
    cpu.execute_instruction();

    // The five internal tacts of a taken JR each pay the bus delay
    assert_eq!(cpu.tacts(), 12 + 17);
    assert_eq!(cpu.regs.pc, 0x0004);
}
