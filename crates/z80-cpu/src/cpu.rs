//! The Z80 execution engine: prefix tracker, tact engine, interrupt
//! processing, and the memory/port plumbing every handler goes through.

use machine_core::{MemoryBus, PortBus};

use crate::fault::CpuFault;
use crate::ops;
use crate::registers::Registers;
use crate::z80n;

/// Upper bound for the step-out return-address stack. When a program pushes
/// more nested calls than this, the oldest entry is dropped.
pub const MAX_STEP_OUT_STACK_SIZE: usize = 256;

/// Opcode prefix state.
///
/// Exactly one value is current at any instant. An instruction is complete
/// only when the prefix returns to `None` after a cycle, so callers run
/// `execute_cpu_cycle()` in a loop until that holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Prefix {
    #[default]
    None,
    /// Extended instruction page.
    Ed,
    /// Bit manipulation page.
    Cb,
    /// IX-indexed page.
    Dd,
    /// IY-indexed page.
    Fd,
    /// IX-indexed bit page (displacement already consumed).
    DdCb,
    /// IY-indexed bit page.
    FdCb,
}

/// What to do when an opcode with no defined semantics is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownOpcodePolicy {
    /// Treat the opcode as a NOP of the page's base timing.
    #[default]
    Nop,
    /// Record a fault; the frame runner aborts the frame with it.
    Fault,
}

/// Per-opcode handler. Tables of these are built once at construction and
/// never mutated afterward.
pub(crate) type Op<M, P> = fn(&mut Z80<M, P>);

/// A Z80 CPU bound to a memory bus and a port bus.
///
/// The CPU owns its collaborators; hosts reach them through
/// [`Z80::memory`]/[`Z80::ports`] accessors between instructions.
pub struct Z80<M: MemoryBus, P: PortBus> {
    pub regs: Registers,

    memory: M,
    ports: P,

    // Interrupt state
    pub iff1: bool,
    pub iff2: bool,
    pub interrupt_mode: u8,

    // Signal lines, sampled at the top of each cycle
    pub sig_int: bool,
    pub sig_nmi: bool,
    pub sig_rst: bool,

    halted: bool,
    snoozed: bool,

    prefix: Prefix,
    pub(crate) opcode: u8,
    op_start_address: u16,
    /// EI delays interrupt acceptance by one instruction.
    ei_backlog: u8,
    ret_executed: bool,

    // Timing state
    tacts: u64,
    frames: u64,
    frame_tacts: u32,
    current_frame_tact: u32,
    tacts_in_frame: u32,
    clock_multiplier: u32,
    tacts_in_current_frame: u32,
    /// When set, internal cycles consult the bus's address-bus contention.
    pub delayed_address_bus: bool,

    // Per-instruction access log, cleared at each M1 cycle
    last_memory_reads: Vec<u16>,
    last_memory_writes: Vec<u16>,
    last_io_read_port: Option<u16>,
    last_io_write_port: Option<u16>,

    // Step-out bookkeeping
    step_out_stack: Vec<u16>,
    step_out_address: Option<u16>,

    pub unknown_opcode_policy: UnknownOpcodePolicy,
    fault: Option<CpuFault>,

    // Dispatch tables
    standard_ops: [Op<M, P>; 256],
    bit_ops: [Op<M, P>; 256],
    extended_ops: [Op<M, P>; 256],
    indexed_ops: [Op<M, P>; 256],
    indexed_bit_ops: [Op<M, P>; 256],
}

impl<M: MemoryBus, P: PortBus> Z80<M, P> {
    /// Create a base Z80 wired to the given buses.
    pub fn new(memory: M, ports: P) -> Self {
        Self::with_extended_table(memory, ports, ops::extended::table())
    }

    /// Create a Z80N (Spectrum Next) CPU: the base extended table with the
    /// Next opcode slots overridden.
    pub fn new_z80n(memory: M, ports: P) -> Self {
        let mut table = ops::extended::table();
        z80n::apply_overrides(&mut table);
        Self::with_extended_table(memory, ports, table)
    }

    fn with_extended_table(memory: M, ports: P, extended_ops: [Op<M, P>; 256]) -> Self {
        let mut cpu = Self {
            regs: Registers::default(),
            memory,
            ports,
            iff1: false,
            iff2: false,
            interrupt_mode: 0,
            sig_int: false,
            sig_nmi: false,
            sig_rst: false,
            halted: false,
            snoozed: false,
            prefix: Prefix::None,
            opcode: 0,
            op_start_address: 0,
            ei_backlog: 0,
            ret_executed: false,
            tacts: 0,
            frames: 0,
            frame_tacts: 0,
            current_frame_tact: 0,
            tacts_in_frame: 1_000_000,
            clock_multiplier: 1,
            tacts_in_current_frame: 1_000_000,
            delayed_address_bus: false,
            last_memory_reads: Vec::new(),
            last_memory_writes: Vec::new(),
            last_io_read_port: None,
            last_io_write_port: None,
            step_out_stack: Vec::new(),
            step_out_address: None,
            unknown_opcode_policy: UnknownOpcodePolicy::default(),
            fault: None,
            standard_ops: ops::standard::table(),
            bit_ops: ops::bit::table(),
            extended_ops,
            indexed_ops: ops::indexed::table(),
            indexed_bit_ops: ops::indexed_bit::table(),
        };
        cpu.reset();
        cpu
    }

    /// Reset to power-on state (registers the RESET line touches).
    pub fn reset(&mut self) {
        self.regs.set_af(0xFFFF);
        self.regs.af_alt = 0xFFFF;
        self.regs.i = 0;
        self.regs.r = 0;
        self.regs.pc = 0;
        self.regs.sp = 0xFFFF;
        self.regs.wz = 0;

        self.sig_int = false;
        self.sig_nmi = false;
        self.sig_rst = false;
        self.halted = false;
        self.snoozed = false;
        self.interrupt_mode = 0;
        self.iff1 = false;
        self.iff2 = false;

        self.opcode = 0;
        self.op_start_address = 0;
        self.prefix = Prefix::None;
        self.ei_backlog = 0;
        self.ret_executed = false;
        self.step_out_stack.clear();
        self.step_out_address = None;
        self.fault = None;

        self.tacts = 0;
        self.frames = 0;
        self.frame_tacts = 0;
        self.current_frame_tact = 0;
        self.set_clock_multiplier(1);

        self.last_memory_reads.clear();
        self.last_memory_writes.clear();
        self.last_io_read_port = None;
        self.last_io_write_port = None;
    }

    /// Full reset, also clearing registers the RESET line leaves alone.
    pub fn hard_reset(&mut self) {
        self.regs = Registers::default();
        self.reset();
        self.regs.set_bc(0);
        self.regs.set_de(0);
        self.regs.set_hl(0);
        self.regs.bc_alt = 0;
        self.regs.de_alt = 0;
        self.regs.hl_alt = 0;
        self.regs.ix = 0;
        self.regs.iy = 0;
    }

    // ------------------------------------------------------------------
    // State accessors

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }

    #[must_use]
    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    #[must_use]
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    #[must_use]
    pub fn is_snoozed(&self) -> bool {
        self.snoozed
    }

    pub fn snooze(&mut self) {
        self.snoozed = true;
    }

    pub fn awake(&mut self) {
        self.snoozed = false;
    }

    #[must_use]
    pub fn ret_executed(&self) -> bool {
        self.ret_executed
    }

    #[must_use]
    pub fn fault(&self) -> Option<CpuFault> {
        self.fault
    }

    pub fn clear_fault(&mut self) {
        self.fault = None;
    }

    #[must_use]
    pub fn tacts(&self) -> u64 {
        self.tacts
    }

    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    #[must_use]
    pub fn frame_tacts(&self) -> u32 {
        self.frame_tacts
    }

    #[must_use]
    pub fn current_frame_tact(&self) -> u32 {
        self.current_frame_tact
    }

    #[must_use]
    pub fn tacts_in_frame(&self) -> u32 {
        self.tacts_in_frame
    }

    /// Set the tact count of a machine frame (at multiplier 1).
    pub fn set_tacts_in_frame(&mut self, tacts: u32) {
        self.tacts_in_frame = tacts;
        self.tacts_in_current_frame = tacts * self.clock_multiplier;
    }

    #[must_use]
    pub fn clock_multiplier(&self) -> u32 {
        self.clock_multiplier
    }

    /// Apply a new clock multiplier. The frame runner only calls this at a
    /// frame boundary so a frame never mixes two clock rates.
    pub fn set_clock_multiplier(&mut self, multiplier: u32) {
        self.clock_multiplier = multiplier.max(1);
        self.tacts_in_current_frame = self.tacts_in_frame * self.clock_multiplier;
    }

    #[must_use]
    pub fn last_memory_reads(&self) -> &[u16] {
        &self.last_memory_reads
    }

    #[must_use]
    pub fn last_memory_writes(&self) -> &[u16] {
        &self.last_memory_writes
    }

    #[must_use]
    pub fn last_io_read_port(&self) -> Option<u16> {
        self.last_io_read_port
    }

    #[must_use]
    pub fn last_io_write_port(&self) -> Option<u16> {
        self.last_io_write_port
    }

    #[must_use]
    pub fn step_out_address(&self) -> Option<u16> {
        self.step_out_address
    }

    /// Snapshot the current call depth when a step-out operation starts:
    /// the top of the step-out stack is where the enclosing subroutine
    /// returns to.
    pub fn mark_step_out_address(&mut self) {
        self.step_out_address = self.step_out_stack.last().copied();
        log::debug!(
            "step-out address marked: {:?} (depth {})",
            self.step_out_address,
            self.step_out_stack.len()
        );
    }

    /// Pop the step-out stack after a completed RET.
    pub fn pop_step_out_stack(&mut self) {
        self.step_out_stack.pop();
    }

    pub(crate) fn push_step_out_stack(&mut self, return_address: u16) {
        self.step_out_stack.push(return_address);
        if self.step_out_stack.len() > MAX_STEP_OUT_STACK_SIZE {
            self.step_out_stack.remove(0);
        }
    }

    // ------------------------------------------------------------------
    // Tact engine

    /// The single timing integration point: every bus operation and internal
    /// cycle lands here.
    pub fn tact_plus(&mut self, n: u32) {
        self.tacts += u64::from(n);
        self.frame_tacts += n;
        if self.frame_tacts >= self.tacts_in_current_frame {
            self.frames += 1;
            self.frame_tacts -= self.tacts_in_current_frame;
        }
        self.current_frame_tact = self.frame_tacts / self.clock_multiplier;
        let current = self.current_frame_tact;
        self.memory.on_tact_advanced(current);
    }

    /// Internal cycles that keep an address on the bus, interleaving the
    /// bus's contention delay with each tact.
    pub(crate) fn tact_plus_with_address(&mut self, n: u32, address: u16) {
        for _ in 0..n {
            if self.delayed_address_bus {
                let delay = self.memory.address_bus_delay(address);
                if delay > 0 {
                    self.tact_plus(delay);
                }
            }
            self.tact_plus(1);
        }
    }

    // ------------------------------------------------------------------
    // Memory and port plumbing

    /// Timed memory read: contention delay, access log, then the bus.
    pub(crate) fn read_memory(&mut self, address: u16) -> u8 {
        let delay = self.memory.read_delay(address);
        self.tact_plus(delay);
        self.last_memory_reads.push(address);
        self.memory.read(address)
    }

    /// Timed memory write.
    pub(crate) fn write_memory(&mut self, address: u16, value: u8) {
        let delay = self.memory.write_delay(address);
        self.tact_plus(delay);
        self.last_memory_writes.push(address);
        self.memory.write(address, value);
    }

    /// Timed port read.
    pub(crate) fn read_port(&mut self, port: u16) -> u8 {
        let delay = self.ports.read_delay(port);
        self.tact_plus(delay);
        self.last_io_read_port = Some(port);
        self.ports.read(port)
    }

    /// Timed port write.
    pub(crate) fn write_port(&mut self, port: u16, value: u8) {
        let delay = self.ports.write_delay(port);
        self.tact_plus(delay);
        self.last_io_write_port = Some(port);
        self.ports.write(port, value);
    }

    /// Read the byte at PC and step past it.
    pub(crate) fn fetch_code_byte(&mut self) -> u8 {
        let value = self.read_memory(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        value
    }

    /// Read a little-endian word at PC and step past it.
    pub(crate) fn fetch_code_word(&mut self) -> u16 {
        let low = u16::from(self.fetch_code_byte());
        let high = u16::from(self.fetch_code_byte());
        (high << 8) | low
    }

    /// Refresh cycle: R increments within its low seven bits.
    pub(crate) fn refresh_memory(&mut self) {
        self.regs.r = (self.regs.r.wrapping_add(1) & 0x7F) | (self.regs.r & 0x80);
    }

    // ------------------------------------------------------------------
    // Instruction cores shared between pages

    /// Push PC to the stack (with the internal tact of PUSH-class cycles).
    pub(crate) fn push_pc(&mut self) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.tact_plus(1);
        self.write_memory(self.regs.sp, (self.regs.pc >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, self.regs.pc as u8);
    }

    /// Push an arbitrary word (PUSH qq).
    pub(crate) fn push16(&mut self, value: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.tact_plus(1);
        self.write_memory(self.regs.sp, (value >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, value as u8);
    }

    /// Pop a word (POP qq).
    pub(crate) fn pop16(&mut self) -> u16 {
        let low = u16::from(self.read_memory(self.regs.sp));
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let high = u16::from(self.read_memory(self.regs.sp));
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (high << 8) | low
    }

    /// The core of CALL: the target is already in WZ.
    pub(crate) fn call_core(&mut self) {
        self.push_step_out_stack(self.regs.pc);
        self.tact_plus_with_address(1, self.regs.pc);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, (self.regs.pc >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, self.regs.pc as u8);
        self.regs.pc = self.regs.wz;
    }

    /// The core of RST.
    pub(crate) fn rst_core(&mut self, target: u16) {
        self.push_step_out_stack(self.regs.pc);
        self.tact_plus_with_address(1, self.regs.ir());
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, (self.regs.pc >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        self.write_memory(self.regs.sp, self.regs.pc as u8);
        self.regs.wz = target;
        self.regs.pc = target;
    }

    /// The core of RET/RET cc (once the condition has passed).
    pub(crate) fn ret_core(&mut self) {
        self.regs.wz = self.pop16();
        self.regs.pc = self.regs.wz;
        self.ret_executed = true;
    }

    /// Taken relative jump: five internal tacts at PC, then the hop.
    pub(crate) fn relative_jump(&mut self, distance: u8) {
        self.tact_plus_with_address(5, self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(i16::from(distance as i8) as u16);
        self.regs.wz = self.regs.pc;
    }

    /// The index register selected by the active DD/FD prefix.
    pub(crate) fn index_reg(&self) -> u16 {
        match self.prefix {
            Prefix::Dd | Prefix::DdCb => self.regs.ix,
            _ => self.regs.iy,
        }
    }

    pub(crate) fn set_index_reg(&mut self, value: u16) {
        match self.prefix {
            Prefix::Dd | Prefix::DdCb => self.regs.ix = value,
            _ => self.regs.iy = value,
        }
    }

    /// Schedule EI's one-instruction interrupt shadow.
    pub(crate) fn set_ei_backlog(&mut self) {
        self.ei_backlog = 2;
    }

    pub(crate) fn enter_halted_state(&mut self) {
        self.halted = true;
        self.regs.pc = self.regs.pc.wrapping_sub(1);
    }

    fn remove_from_halted_state(&mut self) {
        if self.halted {
            self.regs.pc = self.regs.pc.wrapping_add(1);
            self.halted = false;
        }
    }

    /// Handler for opcodes with no defined semantics.
    pub(crate) fn unknown_opcode(&mut self) {
        if self.unknown_opcode_policy == UnknownOpcodePolicy::Fault {
            self.fault = Some(CpuFault {
                opcode: self.opcode,
                prefix: self.prefix,
                pc: self.op_start_address,
            });
        }
    }

    // ------------------------------------------------------------------
    // Instruction cycle

    /// Execute one dispatch step.
    ///
    /// One call handles one opcode byte: either a prefix introducer (which
    /// only moves the prefix tracker) or a terminal opcode (which runs its
    /// handler and returns the tracker to `None`). Interrupt and reset
    /// signals are sampled first; they are only honored on instruction
    /// boundaries.
    pub fn execute_cpu_cycle(&mut self) {
        self.ret_executed = false;
        if self.ei_backlog > 0 {
            self.ei_backlog -= 1;
        }

        // RESET is sensed in any phase of instruction execution
        if self.sig_rst {
            self.reset();
            self.sig_rst = false;
            return;
        }
        if self.sig_nmi && self.prefix == Prefix::None {
            self.process_nmi();
            return;
        }
        if self.sig_int && self.prefix == Prefix::None && self.iff1 && self.ei_backlog == 0 {
            self.process_int();
            return;
        }

        if self.halted {
            // A halted CPU only refreshes memory, four tacts at a time
            self.refresh_memory();
            self.tact_plus(4);
            return;
        }

        let m1_active = self.prefix == Prefix::None;
        if m1_active {
            self.last_memory_reads.clear();
            self.last_memory_writes.clear();
            self.last_io_read_port = None;
            self.last_io_write_port = None;
            self.op_start_address = self.regs.pc;
        }
        self.opcode = self.read_memory(self.regs.pc);
        if m1_active {
            self.refresh_memory();
            self.tact_plus(1);
        }
        self.regs.pc = self.regs.pc.wrapping_add(1);

        match self.prefix {
            Prefix::None => match self.opcode {
                0xCB => self.prefix = Prefix::Cb,
                0xED => self.prefix = Prefix::Ed,
                0xDD => self.prefix = Prefix::Dd,
                0xFD => self.prefix = Prefix::Fd,
                _ => {
                    self.standard_ops[self.opcode as usize](self);
                    self.prefix = Prefix::None;
                }
            },
            Prefix::Cb => {
                self.bit_ops[self.opcode as usize](self);
                self.tact_plus(1);
                self.prefix = Prefix::None;
            }
            Prefix::Ed => {
                self.extended_ops[self.opcode as usize](self);
                self.tact_plus(1);
                self.prefix = Prefix::None;
            }
            Prefix::Dd | Prefix::Fd => match self.opcode {
                0xDD => self.prefix = Prefix::Dd,
                0xFD => self.prefix = Prefix::Fd,
                0xCB => {
                    self.prefix = if self.prefix == Prefix::Dd {
                        Prefix::DdCb
                    } else {
                        Prefix::FdCb
                    };
                }
                _ => {
                    self.indexed_ops[self.opcode as usize](self);
                    self.tact_plus(1);
                    self.prefix = Prefix::None;
                }
            },
            Prefix::DdCb | Prefix::FdCb => {
                // The byte just fetched is the displacement; the real opcode
                // follows it.
                self.regs.wz = self
                    .index_reg()
                    .wrapping_add(i16::from(self.opcode as i8) as u16);
                self.opcode = self.read_memory(self.regs.pc);
                self.tact_plus_with_address(2, self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                self.indexed_bit_ops[self.opcode as usize](self);
                self.tact_plus(1);
                self.prefix = Prefix::None;
            }
        }
    }

    /// Run cycles until the current instruction completes.
    pub fn execute_instruction(&mut self) {
        loop {
            self.execute_cpu_cycle();
            if self.prefix == Prefix::None {
                break;
            }
        }
    }

    /// Length of the instruction at PC if it is CALL-like (something
    /// StepOver should run past), 0 otherwise. Peeks memory without timing
    /// or access-log side effects.
    #[must_use]
    pub fn get_call_instruction_length(&mut self) -> u16 {
        let opcode = self.memory.read(self.regs.pc);

        // CALL nn
        if opcode == 0xCD {
            return 3;
        }
        // CALL cc, nn
        if opcode & 0xC7 == 0xC4 {
            return 3;
        }
        // RST n
        if opcode & 0xC7 == 0xC7 {
            return 1;
        }
        // HALT
        if opcode == 0x76 {
            return 1;
        }
        if opcode != 0xED {
            return 0;
        }

        // Block I/O and transfer instructions repeat until done
        let second = self.memory.read(self.regs.pc.wrapping_add(1));
        if second & 0xB4 == 0xB0 { 2 } else { 0 }
    }

    fn process_nmi(&mut self) {
        // Acknowledging the NMI takes four tacts
        self.tact_plus(4);
        self.remove_from_halted_state();

        // IFF2 preserves the pre-NMI interrupt enable state
        self.iff2 = self.iff1;
        self.iff1 = false;

        self.push_pc();
        self.refresh_memory();
        self.regs.pc = 0x0066;
    }

    fn process_int(&mut self) {
        // Acknowledging a maskable interrupt takes six tacts
        self.tact_plus(6);
        self.remove_from_halted_state();

        self.iff1 = false;
        self.iff2 = false;

        self.push_pc();
        self.refresh_memory();

        if self.interrupt_mode == 2 {
            // Vector high byte from I, low byte 0xFF from the open bus
            let addr = (u16::from(self.regs.i) << 8) | 0xFF;
            let low = self.read_memory(addr);
            self.regs.set_wl(low);
            let high = self.read_memory(addr.wrapping_add(1));
            self.regs.set_wh(high);
        } else {
            // IM 0 and IM 1 both land on RST 38 with nothing on the bus
            self.regs.wz = 0x0038;
        }
        self.regs.pc = self.regs.wz;
    }
}
