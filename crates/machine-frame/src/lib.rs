//! Frame-quantized execution for Z80-family machines.
//!
//! A [`Machine`] owns a CPU and runs it in machine frames: fixed tact
//! budgets corresponding to one video refresh. The host calls
//! [`Machine::execute_machine_frame`] once per frame and owns the real-time
//! pacing between calls. When debugging, the frame loop consults a
//! [`machine_core::DebugSupport`] collaborator ([`BreakpointStore`] is the
//! stock implementation) and suspends early on breakpoints and step
//! conditions.

mod breakpoints;
mod machine;

pub use breakpoints::BreakpointStore;
pub use machine::{Machine, MachineEvent, MachineHooks, NullHooks};
