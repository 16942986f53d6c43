//! Frame execution context shared between the host and the frame runner.

/// Why the last machine frame returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameTerminationMode {
    /// The frame's tact budget was exhausted.
    #[default]
    Normal,
    /// A breakpoint or step condition suspended the loop.
    DebugEvent,
    /// The configured termination point was reached.
    UntilExecutionPoint,
}

/// Debugger stepping behavior for the next frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DebugStepMode {
    /// Run without any breakpoint checks.
    #[default]
    NoDebug,
    /// Run until an enabled execution breakpoint matches PC.
    StopAtBreakpoint,
    /// Stop after one completed instruction.
    StepInto,
    /// Stop after one instruction, running CALL-like callees to completion.
    StepOver,
    /// Run until the enclosing subroutine returns.
    StepOut,
}

/// Per-machine execution settings and outcome.
///
/// Created once per machine, mutated by the host between frames. The frame
/// runner only writes `last_termination_reason` mid-frame; `canceled` is the
/// host's cooperative cancellation flag, checked between frames.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionContext {
    pub frame_termination_mode: FrameTerminationMode,
    pub debug_step_mode: DebugStepMode,
    /// Partition the termination point must be mapped into, if any.
    pub termination_partition: Option<u8>,
    /// PC value that terminates the frame in `UntilExecutionPoint` mode.
    pub termination_point: Option<u16>,
    pub last_termination_reason: Option<FrameTerminationMode>,
    pub canceled: bool,
}

impl ExecutionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the frame runner must take breakpoints into account.
    #[must_use]
    pub fn is_debugging(&self) -> bool {
        self.frame_termination_mode == FrameTerminationMode::DebugEvent
            || self.debug_step_mode != DebugStepMode::NoDebug
    }
}
