//! Core traits and types for Z80-family machine emulation.
//!
//! The CPU core talks to the outside world through the bus traits defined
//! here; the frame runner talks to the debugger through [`DebugSupport`].
//! Nothing in this crate owns hardware state.

mod bus;
mod debug;
mod execution;

pub use bus::{MemoryBus, PortBus};
pub use debug::{
    BreakpointInfo, DebugSupport, DIS_EXEC_BP, DIS_IOR_BP, DIS_IOW_BP, DIS_MR_BP, DIS_MW_BP,
    EXEC_BP, IO_READ_BP, IO_WRITE_BP, MEM_READ_BP, MEM_WRITE_BP, PART_BP,
};
pub use execution::{DebugStepMode, ExecutionContext, FrameTerminationMode};
