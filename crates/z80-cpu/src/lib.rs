//! Z80 CPU core.
//!
//! `execute_cpu_cycle()` performs one dispatch step; an instruction is
//! complete only when the prefix tracker returns to [`Prefix::None`].
//! All timing flows through the CPU's tact engine, one tact at a time.

mod alu;
mod cpu;
mod fault;
mod flags;
mod ops;
mod registers;
mod z80n;

pub use cpu::{Prefix, UnknownOpcodePolicy, Z80, MAX_STEP_OUT_STACK_SIZE};
pub use fault::CpuFault;
pub use flags::{CF, HF, NF, PF, SF, XF, YF, ZF};
pub use registers::Registers;
