//! Fatal CPU conditions.

use crate::cpu::Prefix;
use thiserror::Error;

/// An opcode with no defined semantics was fetched while the unknown-opcode
/// policy is set to fault.
///
/// Continuing past an unknown instruction would leave emulated state
/// undefined, so the frame runner aborts the frame and surfaces this to the
/// host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unsupported opcode {opcode:#04x} (prefix {prefix:?}) at {pc:#06x}")]
pub struct CpuFault {
    /// The offending opcode byte.
    pub opcode: u8,
    /// Prefix state at the time of the fetch.
    pub prefix: Prefix,
    /// Address of the byte following the opcode fetch.
    pub pc: u16,
}
