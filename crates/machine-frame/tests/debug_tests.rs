//! Debug loop tests: stepping modes, execution breakpoints with re-trigger
//! suppression, and memory/IO breakpoints.

use machine_core::{
    BreakpointInfo, DebugStepMode, DebugSupport, FrameTerminationMode, MemoryBus, PortBus,
};
use machine_frame::{BreakpointStore, Machine, NullHooks};
use z80_cpu::Z80;

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

#[derive(Default)]
struct TestPorts {
    writes: Vec<(u16, u8)>,
}

impl PortBus for TestPorts {
    fn read(&mut self, _port: u16) -> u8 {
        0xFF
    }

    fn write(&mut self, port: u16, value: u8) {
        self.writes.push((port, value));
    }
}

fn machine_with(program: &[u8]) -> Machine<TestMemory, TestPorts, NullHooks> {
    let mut memory = TestMemory::new();
    memory.load(0x0000, program);
    let mut cpu = Z80::new(memory, TestPorts::default());
    cpu.set_tacts_in_frame(100_000);
    cpu.regs.f = 0;
    Machine::new(cpu, NullHooks)
}

fn memory_read_at(address: u16) -> BreakpointInfo {
    BreakpointInfo {
        exec: false,
        memory_read: true,
        ..BreakpointInfo::exec_at(address)
    }
}

fn memory_write_at(address: u16) -> BreakpointInfo {
    BreakpointInfo {
        exec: false,
        memory_write: true,
        ..BreakpointInfo::exec_at(address)
    }
}

#[test]
fn step_into_stops_after_each_instruction() {
    let mut machine = machine_with(&[0x00, 0x00, 0x00]); // NOPs
    machine.context.debug_step_mode = DebugStepMode::StepInto;
    let mut store = BreakpointStore::new();

    for expected_pc in 1..=3 {
        let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();
        assert_eq!(mode, FrameTerminationMode::DebugEvent);
        assert_eq!(machine.cpu.regs.pc, expected_pc);
    }
    assert_eq!(machine.cpu.tacts(), 12);
}

#[test]
fn step_into_treats_a_prefixed_instruction_as_one_step() {
    let mut machine = machine_with(&[0xDD, 0x21, 0x34, 0x12]); // LD IX,nn
    machine.context.debug_step_mode = DebugStepMode::StepInto;
    let mut store = BreakpointStore::new();

    machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(machine.cpu.regs.pc, 0x0004);
    assert_eq!(machine.cpu.regs.ix, 0x1234);
}

#[test]
fn step_over_steps_a_plain_instruction() {
    let mut machine = machine_with(&[0x00, 0x00]);
    machine.context.debug_step_mode = DebugStepMode::StepOver;
    let mut store = BreakpointStore::new();

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0001);
}

#[test]
fn step_over_runs_a_callee_to_completion() {
    let mut machine = machine_with(&[0xCD, 0x00, 0x90, 0x00]); // CALL 9000h; NOP
    machine.cpu.memory_mut().load(0x9000, &[0x3E, 0x42, 0xC9]); // LD A,42h; RET
    machine.cpu.regs.sp = 0x8000;
    machine.context.debug_step_mode = DebugStepMode::StepOver;
    let mut store = BreakpointStore::new();

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0003); // past the CALL
    assert_eq!(machine.cpu.regs.a, 0x42); // the callee ran
    assert_eq!(store.imminent_breakpoint(), None);
}

#[test]
fn step_out_stops_at_the_callers_return_address() {
    // LD SP,8000h; CALL 9000h; NOP
    let mut machine = machine_with(&[0x31, 0x00, 0x80, 0xCD, 0x00, 0x90, 0x00]);
    // Callee with a nested call: LD A,42h; CALL 9100h; RET
    machine
        .cpu
        .memory_mut()
        .load(0x9000, &[0x3E, 0x42, 0xCD, 0x00, 0x91, 0xC9]);
    machine.cpu.memory_mut().load(0x9100, &[0x06, 0x07, 0xC9]); // LD B,7; RET

    // Run into the callee first
    machine.context.frame_termination_mode = FrameTerminationMode::UntilExecutionPoint;
    machine.context.termination_point = Some(0x9000);
    let mode = machine.execute_machine_frame(None).unwrap();
    assert_eq!(mode, FrameTerminationMode::UntilExecutionPoint);
    assert_eq!(machine.cpu.regs.pc, 0x9000);

    // Now step out; the nested call must not fool the stop condition
    machine.context.frame_termination_mode = FrameTerminationMode::Normal;
    machine.context.debug_step_mode = DebugStepMode::StepOut;
    machine.mark_step_out_address();
    let mut store = BreakpointStore::new();

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0006); // return address of CALL 9000h
    assert_eq!(machine.cpu.regs.a, 0x42);
    assert_eq!(machine.cpu.regs.b, 0x07);
}

#[test]
fn breakpoint_stops_and_retriggers_on_the_next_pass() {
    // Four NOPs then JP 0000h: execution loops through address 2 forever
    let mut machine = machine_with(&[0x00, 0x00, 0x00, 0x00, 0xC3, 0x00, 0x00]);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo::exec_at(0x0002));

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();
    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0002);
    assert_eq!(store.last_breakpoint(), Some(0x0002));

    // Resuming runs past the breakpoint and stops again on the next lap
    let tacts_before = machine.cpu.tacts();
    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();
    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0002);
    assert!(machine.cpu.tacts() > tacts_before);
}

#[test]
fn startup_breakpoint_suspends_once_then_lets_execution_proceed() {
    let mut machine = machine_with(&[0x00, 0xC3, 0x00, 0x00]); // NOP; JP 0000h
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo::exec_at(0x0000));

    // First call suspends before anything executes
    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();
    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0000);
    assert_eq!(machine.cpu.tacts(), 0);
    assert_eq!(store.last_startup_breakpoint(), Some(0x0000));

    // Second call executes the loop body before stopping at 0 again
    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();
    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0000);
    assert_eq!(machine.cpu.tacts(), 14); // NOP + JP
}

#[test]
fn disabled_breakpoint_never_triggers() {
    let mut machine = machine_with(&[0x00, 0x00, 0x00, 0x00]);
    machine.cpu.set_tacts_in_frame(40);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo::exec_at(0x0002));
    store.enable_breakpoint(0x0002, None, false);

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::Normal);
}

#[test]
fn memory_write_breakpoint_stops_after_the_store() {
    // LD A,55h; LD (4000h),A
    let mut machine = machine_with(&[0x3E, 0x55, 0x32, 0x00, 0x40]);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(memory_write_at(0x4000));

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0005);
    assert_eq!(machine.cpu.memory().peek(0x4000), 0x55);
}

#[test]
fn memory_read_breakpoint_sees_opcode_fetches() {
    let mut machine = machine_with(&[0x00, 0x00, 0x00, 0x00]);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(memory_read_at(0x0002));

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    // Fetching the opcode at address 2 is itself a memory read
    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0003);
}

#[test]
fn io_read_breakpoint_honors_the_port_mask() {
    // LD A,7Fh; IN A,(FEh): reads port 7FFEh
    let mut machine = machine_with(&[0x3E, 0x7F, 0xDB, 0xFE]);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo {
        exec: false,
        io_read: true,
        mask: Some(0x00FF),
        ..BreakpointInfo::exec_at(0x00FE)
    });

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0004);
}

#[test]
fn io_write_breakpoint_matches_the_full_port_address() {
    // LD BC,1234h; LD A,99h; OUT (C),A
    let mut machine = machine_with(&[0x01, 0x34, 0x12, 0x3E, 0x99, 0xED, 0x79]);
    machine.context.debug_step_mode = DebugStepMode::StopAtBreakpoint;
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo {
        exec: false,
        io_write: true,
        ..BreakpointInfo::exec_at(0x1234)
    });

    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::DebugEvent);
    assert_eq!(machine.cpu.regs.pc, 0x0007);
    assert_eq!(machine.cpu.ports().writes, vec![(0x1234, 0x99)]);
}

#[test]
fn debug_checks_are_skipped_outside_debug_modes() {
    let mut machine = machine_with(&[0x00, 0x00, 0x00, 0x00]);
    machine.cpu.set_tacts_in_frame(40);
    let mut store = BreakpointStore::new();
    store.add_breakpoint(BreakpointInfo::exec_at(0x0002));

    // NoDebug mode: the store is handed over but never consulted
    let mode = machine.execute_machine_frame(Some(&mut store)).unwrap();

    assert_eq!(mode, FrameTerminationMode::Normal);
    assert_eq!(store.last_breakpoint(), None);
}
