//! Debugger collaboration contract.
//!
//! The frame runner never owns breakpoints; it queries them through
//! [`DebugSupport`] and stores its stepping session state (last breakpoint,
//! imminent breakpoint, startup suppression) through the same trait.

use serde::{Deserialize, Serialize};

/// Breakpoint flag bits, one word per 16-bit address.
///
/// A flat 64K flag array makes the per-instruction breakpoint probe a single
/// indexed load, which is what keeps the debug loop fast enough to run every
/// frame.
pub const EXEC_BP: u16 = 0x0001;
/// Execution breakpoint bound to a memory partition.
pub const PART_BP: u16 = 0x0002;
pub const MEM_READ_BP: u16 = 0x0008;
pub const MEM_WRITE_BP: u16 = 0x0010;
pub const IO_READ_BP: u16 = 0x0020;
pub const IO_WRITE_BP: u16 = 0x0040;
/// Disable bits: the breakpoint definition is retained but never triggers.
pub const DIS_EXEC_BP: u16 = 0x0080;
pub const DIS_MR_BP: u16 = 0x0100;
pub const DIS_MW_BP: u16 = 0x0200;
pub const DIS_IOR_BP: u16 = 0x0400;
pub const DIS_IOW_BP: u16 = 0x0800;

/// A single breakpoint definition.
///
/// Uniqueness key is `(address, partition)`. A disabled breakpoint is kept in
/// the collection but never triggers. `mask` only applies to I/O breakpoints:
/// the breakpoint matches every port where `port & mask == address & mask`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakpointInfo {
    pub address: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<u8>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<u16>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub exec: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub memory_read: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub memory_write: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub io_read: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub io_write: bool,
}

impl BreakpointInfo {
    /// An enabled execution breakpoint at the given address.
    #[must_use]
    pub fn exec_at(address: u16) -> Self {
        Self {
            address,
            partition: None,
            disabled: false,
            mask: None,
            exec: true,
            memory_read: false,
            memory_write: false,
            io_read: false,
            io_write: false,
        }
    }
}

/// Breakpoint queries and stepping session state used by the debug loop.
pub trait DebugSupport {
    /// Does an enabled execution breakpoint match this address (honoring
    /// partitioned breakpoints against the currently mapped partition)?
    fn should_stop_at(&self, address: u16, current_partition: Option<u8>) -> bool;

    /// Does an enabled memory-read breakpoint cover this address?
    fn has_memory_read_bp(&self, address: u16) -> bool;

    /// Does an enabled memory-write breakpoint cover this address?
    fn has_memory_write_bp(&self, address: u16) -> bool;

    /// Does an enabled I/O-read breakpoint cover this port?
    fn has_io_read_bp(&self, port: u16) -> bool;

    /// Does an enabled I/O-write breakpoint cover this port?
    fn has_io_write_bp(&self, port: u16) -> bool;

    /// Address of the execution breakpoint the loop last stopped at.
    fn last_breakpoint(&self) -> Option<u16>;
    fn set_last_breakpoint(&mut self, address: Option<u16>);

    /// Single-use breakpoint planted by StepOver/StepOut.
    fn imminent_breakpoint(&self) -> Option<u16>;
    fn set_imminent_breakpoint(&mut self, address: Option<u16>);

    /// PC at which the loop last stopped, used to suppress an immediate
    /// re-trigger when the host resumes without moving PC.
    fn last_startup_breakpoint(&self) -> Option<u16>;
    fn set_last_startup_breakpoint(&mut self, address: Option<u16>);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_breakpoint_omits_defaults() {
        let json = serde_json::to_string(&BreakpointInfo::exec_at(0x8000)).unwrap();

        assert_eq!(json, r#"{"address":32768,"exec":true}"#);
    }

    #[test]
    fn deserialization_fills_in_defaults() {
        let bp: BreakpointInfo = serde_json::from_str(r#"{"address":32768,"exec":true}"#).unwrap();

        assert_eq!(bp, BreakpointInfo::exec_at(0x8000));
    }
}
