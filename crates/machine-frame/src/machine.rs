//! The machine frame runner.
//!
//! Two loop variants share the same frame bookkeeping: a lean loop for
//! normal execution and a debug loop that additionally checks memory/IO
//! breakpoints and runs the stepping state machine after every completed
//! instruction. Both return to the host at each frame boundary; the host
//! owns pacing and cancellation.

use machine_core::{
    DebugStepMode, DebugSupport, ExecutionContext, FrameTerminationMode, MemoryBus, PortBus,
};
use z80_cpu::{CpuFault, Prefix, Z80};

/// Tacts a snoozed CPU burns per loop iteration instead of executing.
const SNOOZE_QUANTUM: u32 = 16;

/// Host callbacks invoked by the frame loops.
///
/// All methods have defaults so a host only overrides what its hardware
/// needs. The hooks are where a concrete machine raises its frame
/// interrupt, prepares devices for a new frame, and samples device state
/// after each instruction.
pub trait MachineHooks<M: MemoryBus, P: PortBus> {
    /// Should the INT line be active at this frame tact? Sampled once per
    /// instruction, before it executes.
    fn should_raise_interrupt(&mut self, frame_tact: u32) -> bool {
        let _ = frame_tact;
        false
    }

    /// A new machine frame is starting. `clock_multiplier_changed` is true
    /// when a staged multiplier was just applied.
    fn on_init_new_frame(&mut self, cpu: &mut Z80<M, P>, clock_multiplier_changed: bool) {
        let _ = (cpu, clock_multiplier_changed);
    }

    /// An instruction (or snooze quantum) just completed.
    fn after_instruction_executed(&mut self, cpu: &mut Z80<M, P>) {
        let _ = cpu;
    }

    /// May the runner apply a staged clock multiplier at the next frame
    /// boundary?
    fn allow_cpu_clock_change(&self) -> bool {
        true
    }

    /// The CPU is snoozed; burn time without executing.
    fn on_snooze(&mut self, cpu: &mut Z80<M, P>) {
        cpu.tact_plus(SNOOZE_QUANTUM);
    }
}

/// Hooks that do nothing; the machine free-runs with no interrupt source.
pub struct NullHooks;

impl<M: MemoryBus, P: PortBus> MachineHooks<M, P> for NullHooks {}

/// A queued-event handler; runs against the CPU when its tact comes due.
pub type MachineEvent<M, P> = fn(&mut Z80<M, P>);

struct QueuedEvent<M: MemoryBus, P: PortBus> {
    due_tact: u64,
    handler: MachineEvent<M, P>,
}

/// A Z80 machine: CPU plus frame bookkeeping, queued events, and hooks.
pub struct Machine<M: MemoryBus, P: PortBus, H: MachineHooks<M, P>> {
    pub cpu: Z80<M, P>,
    /// Execution settings, mutated by the host between frames.
    pub context: ExecutionContext,
    hooks: H,
    /// Multiplier to apply at the next frame boundary.
    target_clock_multiplier: u32,
    frame_completed: bool,
    /// Tacts the previous frame ran past its boundary.
    frame_overflow: u32,
    next_frame_start_tact: u64,
    events: Vec<QueuedEvent<M, P>>,
}

impl<M: MemoryBus, P: PortBus, H: MachineHooks<M, P>> Machine<M, P, H> {
    pub fn new(cpu: Z80<M, P>, hooks: H) -> Self {
        let target_clock_multiplier = cpu.clock_multiplier();
        Self {
            cpu,
            context: ExecutionContext::new(),
            hooks,
            target_clock_multiplier,
            // The first frame call sets up frame bookkeeping
            frame_completed: true,
            frame_overflow: 0,
            next_frame_start_tact: 0,
            events: Vec::new(),
        }
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    #[must_use]
    pub fn frame_overflow(&self) -> u32 {
        self.frame_overflow
    }

    #[must_use]
    pub fn target_clock_multiplier(&self) -> u32 {
        self.target_clock_multiplier
    }

    /// Stage a clock multiplier; it takes effect at the next frame boundary
    /// so a frame never mixes two clock rates.
    pub fn set_target_clock_multiplier(&mut self, multiplier: u32) {
        self.target_clock_multiplier = multiplier.max(1);
    }

    /// Snapshot the CPU's step-out return address. The host calls this when
    /// a step-out operation starts, before running frames in
    /// [`DebugStepMode::StepOut`].
    pub fn mark_step_out_address(&mut self) {
        self.cpu.mark_step_out_address();
    }

    /// Schedule a handler to run once the CPU's tact counter reaches
    /// `due_tact`. Events fire between instructions, in due order.
    pub fn queue_event(&mut self, due_tact: u64, handler: MachineEvent<M, P>) {
        let at = self
            .events
            .partition_point(|event| event.due_tact <= due_tact);
        self.events.insert(at, QueuedEvent { due_tact, handler });
    }

    /// Reset the machine: CPU reset plus frame and event bookkeeping.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.frame_completed = true;
        self.frame_overflow = 0;
        self.next_frame_start_tact = 0;
        self.events.clear();
        self.context.last_termination_reason = None;
    }

    /// Run one machine frame.
    ///
    /// Returns when the frame's tact budget is exhausted
    /// ([`FrameTerminationMode::Normal`]), when a breakpoint or step
    /// condition suspends the loop ([`FrameTerminationMode::DebugEvent`]),
    /// or when the configured termination point is reached. A suspended
    /// frame resumes where it left off on the next call.
    ///
    /// # Errors
    ///
    /// An unsupported opcode under [`z80_cpu::UnknownOpcodePolicy::Fault`]
    /// aborts the frame with the recorded [`CpuFault`].
    pub fn execute_machine_frame(
        &mut self,
        debug: Option<&mut dyn DebugSupport>,
    ) -> Result<FrameTerminationMode, CpuFault> {
        let mode = match debug {
            Some(debug) if self.context.is_debugging() => self.execute_debug_frame(debug),
            _ => self.execute_normal_frame(),
        }?;
        self.context.last_termination_reason = Some(mode);
        Ok(mode)
    }

    fn execute_normal_frame(&mut self) -> Result<FrameTerminationMode, CpuFault> {
        loop {
            if self.frame_completed {
                self.start_new_frame();
            }

            self.cpu.sig_int = self
                .hooks
                .should_raise_interrupt(self.cpu.current_frame_tact());

            self.run_instruction()?;
            self.consume_events();
            self.hooks.after_instruction_executed(&mut self.cpu);

            if self.test_termination_point() {
                return Ok(FrameTerminationMode::UntilExecutionPoint);
            }

            self.frame_completed = self.cpu.tacts() >= self.next_frame_start_tact;
            if self.frame_completed {
                break;
            }
        }
        self.finish_frame();
        Ok(FrameTerminationMode::Normal)
    }

    fn execute_debug_frame(
        &mut self,
        debug: &mut dyn DebugSupport,
    ) -> Result<FrameTerminationMode, CpuFault> {
        let mut instructions_executed: u64 = 0;

        // A breakpoint at the resume PC may stop the loop before anything
        // runs; remembering where that happened lets the very next call run
        // past it instead of stopping forever.
        if debug.last_startup_breakpoint() != Some(self.cpu.regs.pc)
            && self.check_breakpoints(debug, instructions_executed)
        {
            let pc = self.cpu.regs.pc;
            debug.set_last_startup_breakpoint(Some(pc));
            log::debug!("suspended at startup breakpoint {pc:#06x}");
            return Ok(FrameTerminationMode::DebugEvent);
        }
        debug.set_last_startup_breakpoint(None);

        loop {
            if self.frame_completed {
                self.start_new_frame();
            }

            self.cpu.sig_int = self
                .hooks
                .should_raise_interrupt(self.cpu.current_frame_tact());

            instructions_executed += 1;
            self.run_instruction()?;
            self.consume_events();
            self.hooks.after_instruction_executed(&mut self.cpu);

            if self.memory_io_breakpoint_hit(debug) {
                return Ok(FrameTerminationMode::DebugEvent);
            }
            if self.test_termination_point() {
                return Ok(FrameTerminationMode::UntilExecutionPoint);
            }
            if self.check_breakpoints(debug, instructions_executed) {
                log::debug!("suspended at {:#06x}", self.cpu.regs.pc);
                return Ok(FrameTerminationMode::DebugEvent);
            }

            self.frame_completed = self.cpu.tacts() >= self.next_frame_start_tact;
            if self.frame_completed {
                break;
            }
        }
        self.finish_frame();
        Ok(FrameTerminationMode::Normal)
    }

    /// Frame-boundary bookkeeping: apply a staged clock multiplier and
    /// compute where the new frame ends. The overflow of the previous frame
    /// counts against this one, so the long-run frame rate is exact.
    fn start_new_frame(&mut self) {
        let current_frame_start = self.cpu.tacts() - u64::from(self.frame_overflow);

        let mut clock_multiplier_changed = false;
        if self.hooks.allow_cpu_clock_change()
            && self.cpu.clock_multiplier() != self.target_clock_multiplier
        {
            self.cpu.set_clock_multiplier(self.target_clock_multiplier);
            clock_multiplier_changed = true;
            log::debug!("clock multiplier set to {}", self.target_clock_multiplier);
        }
        self.hooks
            .on_init_new_frame(&mut self.cpu, clock_multiplier_changed);
        self.frame_completed = false;

        self.next_frame_start_tact = current_frame_start
            + u64::from(self.cpu.tacts_in_frame()) * u64::from(self.cpu.clock_multiplier());
    }

    fn finish_frame(&mut self) {
        self.frame_overflow = (self.cpu.tacts() - self.next_frame_start_tact) as u32;
    }

    /// Run one complete instruction (cycling through any prefixes), or one
    /// snooze quantum when the CPU is snoozed.
    fn run_instruction(&mut self) -> Result<(), CpuFault> {
        loop {
            if self.cpu.is_snoozed() {
                self.hooks.on_snooze(&mut self.cpu);
            } else {
                self.cpu.execute_cpu_cycle();
            }
            if self.cpu.prefix() == Prefix::None {
                break;
            }
        }
        if let Some(fault) = self.cpu.fault() {
            return Err(fault);
        }
        if self.cpu.ret_executed() {
            self.cpu.pop_step_out_stack();
        }
        Ok(())
    }

    fn consume_events(&mut self) {
        while let Some(event) = self.events.first() {
            if event.due_tact > self.cpu.tacts() {
                break;
            }
            let event = self.events.remove(0);
            (event.handler)(&mut self.cpu);
        }
    }

    /// Did the last instruction touch an address or port with an enabled
    /// memory/IO breakpoint?
    fn memory_io_breakpoint_hit(&self, debug: &dyn DebugSupport) -> bool {
        for &address in self.cpu.last_memory_reads() {
            if debug.has_memory_read_bp(address) {
                log::debug!("memory-read breakpoint at {address:#06x}");
                return true;
            }
        }
        for &address in self.cpu.last_memory_writes() {
            if debug.has_memory_write_bp(address) {
                log::debug!("memory-write breakpoint at {address:#06x}");
                return true;
            }
        }
        if let Some(port) = self.cpu.last_io_read_port() {
            if debug.has_io_read_bp(port) {
                log::debug!("IO-read breakpoint at port {port:#06x}");
                return true;
            }
        }
        if let Some(port) = self.cpu.last_io_write_port() {
            if debug.has_io_write_bp(port) {
                log::debug!("IO-write breakpoint at port {port:#06x}");
                return true;
            }
        }
        false
    }

    fn test_termination_point(&self) -> bool {
        if self.context.frame_termination_mode != FrameTerminationMode::UntilExecutionPoint {
            return false;
        }
        let Some(point) = self.context.termination_point else {
            return false;
        };
        if self.cpu.regs.pc != point {
            return false;
        }
        match self.context.termination_partition {
            None => true,
            partition => self.cpu.memory().partition(point) == partition,
        }
    }

    /// The stepping state machine, run after each completed instruction
    /// (and once before the loop, which is what plants StepOver's imminent
    /// breakpoint when the machine is paused at a CALL-like instruction).
    /// Returns true when the loop must suspend.
    fn check_breakpoints(
        &mut self,
        debug: &mut dyn DebugSupport,
        instructions_executed: u64,
    ) -> bool {
        let pc = self.cpu.regs.pc;

        if self.context.debug_step_mode == DebugStepMode::StepInto {
            if instructions_executed > 0 {
                debug.set_imminent_breakpoint(None);
                return true;
            }
            return false;
        }

        // Exec breakpoint test shared by the remaining modes. The
        // last-breakpoint clause keeps a breakpoint from re-triggering while
        // PC still sits at the address it already stopped at.
        let partition = self.cpu.memory().partition(pc);
        if debug.should_stop_at(pc, partition)
            && (instructions_executed > 0 || debug.last_breakpoint() != Some(pc))
        {
            debug.set_last_breakpoint(Some(pc));
            debug.set_imminent_breakpoint(None);
            return true;
        }

        match self.context.debug_step_mode {
            DebugStepMode::StepOver => {
                if let Some(imminent) = debug.imminent_breakpoint() {
                    // A callee is in flight; run it to completion
                    if imminent == pc {
                        debug.set_imminent_breakpoint(None);
                        return true;
                    }
                } else {
                    let mut just_created = false;
                    let length = self.cpu.get_call_instruction_length();
                    if length > 0 {
                        debug.set_imminent_breakpoint(Some(pc.wrapping_add(length)));
                        just_created = true;
                    }
                    if instructions_executed > 0
                        && (debug.imminent_breakpoint().is_none() || just_created)
                    {
                        debug.set_imminent_breakpoint(None);
                        return true;
                    }
                }
                false
            }
            DebugStepMode::StepOut => {
                if self.cpu.step_out_address() == Some(pc) {
                    debug.set_imminent_breakpoint(None);
                    return true;
                }
                false
            }
            _ => false,
        }
    }
}
