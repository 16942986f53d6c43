//! Breakpoint collection with flat flag-word lookup.
//!
//! Definitions live in a list keyed by `(address, partition)`; a 64K array
//! of flag words is rebuilt from the list on every mutation so the per-
//! instruction probes in the debug loop are single indexed loads.

use machine_core::{
    BreakpointInfo, DebugSupport, DIS_EXEC_BP, DIS_IOR_BP, DIS_IOW_BP, DIS_MR_BP, DIS_MW_BP,
    EXEC_BP, IO_READ_BP, IO_WRITE_BP, MEM_READ_BP, MEM_WRITE_BP, PART_BP,
};

/// The stock [`DebugSupport`] implementation.
///
/// Also carries the stepping session state the debug loop reads and writes
/// between frames (last breakpoint, imminent breakpoint, startup
/// suppression).
pub struct BreakpointStore {
    /// One flag word per 16-bit address/port.
    flags: Vec<u16>,
    breakpoints: Vec<BreakpointInfo>,
    last_breakpoint: Option<u16>,
    imminent_breakpoint: Option<u16>,
    last_startup_breakpoint: Option<u16>,
}

impl Default for BreakpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BreakpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: vec![0; 0x1_0000],
            breakpoints: Vec::new(),
            last_breakpoint: None,
            imminent_breakpoint: None,
            last_startup_breakpoint: None,
        }
    }

    #[must_use]
    pub fn breakpoints(&self) -> &[BreakpointInfo] {
        &self.breakpoints
    }

    /// Add a breakpoint, replacing any existing definition with the same
    /// `(address, partition)` key.
    pub fn add_breakpoint(&mut self, breakpoint: BreakpointInfo) {
        self.breakpoints.retain(|existing| {
            existing.address != breakpoint.address || existing.partition != breakpoint.partition
        });
        self.breakpoints.push(breakpoint);
        self.rebuild_flags();
    }

    /// Remove the breakpoint with the given key. Returns whether one
    /// existed.
    pub fn remove_breakpoint(&mut self, address: u16, partition: Option<u8>) -> bool {
        let before = self.breakpoints.len();
        self.breakpoints
            .retain(|bp| bp.address != address || bp.partition != partition);
        let removed = self.breakpoints.len() != before;
        if removed {
            self.rebuild_flags();
        }
        removed
    }

    /// Enable or disable the breakpoint with the given key without
    /// forgetting its definition. Returns whether one existed.
    pub fn enable_breakpoint(
        &mut self,
        address: u16,
        partition: Option<u8>,
        enabled: bool,
    ) -> bool {
        let Some(bp) = self
            .breakpoints
            .iter_mut()
            .find(|bp| bp.address == address && bp.partition == partition)
        else {
            return false;
        };
        bp.disabled = !enabled;
        self.rebuild_flags();
        true
    }

    /// Drop every breakpoint definition. Session state is untouched.
    pub fn clear(&mut self) {
        self.breakpoints.clear();
        self.flags.fill(0);
    }

    /// Serialize the breakpoint list to JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying serializer error.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.breakpoints)
    }

    /// Build a store from a JSON breakpoint list produced by
    /// [`BreakpointStore::to_json`].
    ///
    /// # Errors
    ///
    /// Returns the underlying deserializer error for malformed input.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let breakpoints: Vec<BreakpointInfo> = serde_json::from_str(json)?;
        let mut store = Self::new();
        store.breakpoints = breakpoints;
        store.rebuild_flags();
        Ok(store)
    }

    fn rebuild_flags(&mut self) {
        self.flags.fill(0);
        for bp in &self.breakpoints {
            let slot = usize::from(bp.address);
            if bp.exec {
                if bp.partition.is_some() {
                    // Partitioned hits are resolved against the definition
                    // list; the flag only marks that a lookup is needed
                    self.flags[slot] |= PART_BP;
                } else {
                    self.flags[slot] |= EXEC_BP;
                    if bp.disabled {
                        self.flags[slot] |= DIS_EXEC_BP;
                    }
                }
            }
            if bp.memory_read {
                self.flags[slot] |= MEM_READ_BP;
                if bp.disabled {
                    self.flags[slot] |= DIS_MR_BP;
                }
            }
            if bp.memory_write {
                self.flags[slot] |= MEM_WRITE_BP;
                if bp.disabled {
                    self.flags[slot] |= DIS_MW_BP;
                }
            }
            if bp.io_read || bp.io_write {
                // An IO breakpoint with a mask covers every port that
                // matches it under the mask
                let mask = bp.mask.unwrap_or(0xFFFF);
                let want = bp.address & mask;
                for port in 0..=0xFFFFu16 {
                    if port & mask != want {
                        continue;
                    }
                    let slot = usize::from(port);
                    if bp.io_read {
                        self.flags[slot] |= IO_READ_BP;
                        if bp.disabled {
                            self.flags[slot] |= DIS_IOR_BP;
                        }
                    }
                    if bp.io_write {
                        self.flags[slot] |= IO_WRITE_BP;
                        if bp.disabled {
                            self.flags[slot] |= DIS_IOW_BP;
                        }
                    }
                }
            }
        }
    }
}

impl DebugSupport for BreakpointStore {
    fn should_stop_at(&self, address: u16, current_partition: Option<u8>) -> bool {
        let flag = self.flags[usize::from(address)];
        if flag & EXEC_BP != 0 && flag & DIS_EXEC_BP == 0 {
            return true;
        }
        if flag & PART_BP != 0 {
            return self.breakpoints.iter().any(|bp| {
                bp.exec
                    && !bp.disabled
                    && bp.address == address
                    && bp.partition.is_some()
                    && bp.partition == current_partition
            });
        }
        false
    }

    fn has_memory_read_bp(&self, address: u16) -> bool {
        let flag = self.flags[usize::from(address)];
        flag & MEM_READ_BP != 0 && flag & DIS_MR_BP == 0
    }

    fn has_memory_write_bp(&self, address: u16) -> bool {
        let flag = self.flags[usize::from(address)];
        flag & MEM_WRITE_BP != 0 && flag & DIS_MW_BP == 0
    }

    fn has_io_read_bp(&self, port: u16) -> bool {
        let flag = self.flags[usize::from(port)];
        flag & IO_READ_BP != 0 && flag & DIS_IOR_BP == 0
    }

    fn has_io_write_bp(&self, port: u16) -> bool {
        let flag = self.flags[usize::from(port)];
        flag & IO_WRITE_BP != 0 && flag & DIS_IOW_BP == 0
    }

    fn last_breakpoint(&self) -> Option<u16> {
        self.last_breakpoint
    }

    fn set_last_breakpoint(&mut self, address: Option<u16>) {
        self.last_breakpoint = address;
    }

    fn imminent_breakpoint(&self) -> Option<u16> {
        self.imminent_breakpoint
    }

    fn set_imminent_breakpoint(&mut self, address: Option<u16>) {
        self.imminent_breakpoint = address;
    }

    fn last_startup_breakpoint(&self) -> Option<u16> {
        self.last_startup_breakpoint
    }

    fn set_last_startup_breakpoint(&mut self, address: Option<u16>) {
        self.last_startup_breakpoint = address;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_read_bp(address: u16, mask: Option<u16>) -> BreakpointInfo {
        BreakpointInfo {
            address,
            partition: None,
            disabled: false,
            mask,
            exec: false,
            memory_read: false,
            memory_write: false,
            io_read: true,
            io_write: false,
        }
    }

    #[test]
    fn exec_breakpoint_hits_its_address_only() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(BreakpointInfo::exec_at(0x8000));

        assert!(store.should_stop_at(0x8000, None));
        assert!(!store.should_stop_at(0x8001, None));
    }

    #[test]
    fn disabled_breakpoint_is_retained_but_silent() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(BreakpointInfo::exec_at(0x8000));
        assert!(store.enable_breakpoint(0x8000, None, false));

        assert!(!store.should_stop_at(0x8000, None));
        assert_eq!(store.breakpoints().len(), 1);

        assert!(store.enable_breakpoint(0x8000, None, true));
        assert!(store.should_stop_at(0x8000, None));
    }

    #[test]
    fn partitioned_breakpoint_requires_matching_partition() {
        let mut store = BreakpointStore::new();
        let mut bp = BreakpointInfo::exec_at(0x4000);
        bp.partition = Some(3);
        store.add_breakpoint(bp);

        assert!(store.should_stop_at(0x4000, Some(3)));
        assert!(!store.should_stop_at(0x4000, Some(2)));
        assert!(!store.should_stop_at(0x4000, None));
    }

    #[test]
    fn same_key_replaces_existing_definition() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(BreakpointInfo::exec_at(0x8000));
        let mut replacement = BreakpointInfo::exec_at(0x8000);
        replacement.disabled = true;
        store.add_breakpoint(replacement);

        assert_eq!(store.breakpoints().len(), 1);
        assert!(!store.should_stop_at(0x8000, None));
    }

    #[test]
    fn masked_io_breakpoint_covers_matching_ports() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(io_read_bp(0x00FE, Some(0x00FF)));

        assert!(store.has_io_read_bp(0x00FE));
        assert!(store.has_io_read_bp(0x7FFE));
        assert!(store.has_io_read_bp(0xFDFE));
        assert!(!store.has_io_read_bp(0x00FD));
        assert!(!store.has_io_write_bp(0x00FE));
    }

    #[test]
    fn removal_clears_flags() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(io_read_bp(0x00FE, Some(0x00FF)));
        assert!(store.remove_breakpoint(0x00FE, None));

        assert!(!store.has_io_read_bp(0x7FFE));
        assert!(!store.remove_breakpoint(0x00FE, None));
    }

    #[test]
    fn breakpoint_list_round_trips_through_json() {
        let mut store = BreakpointStore::new();
        store.add_breakpoint(BreakpointInfo::exec_at(0x8000));
        let mut partitioned = BreakpointInfo::exec_at(0x4000);
        partitioned.partition = Some(1);
        partitioned.disabled = true;
        store.add_breakpoint(partitioned);
        store.add_breakpoint(io_read_bp(0x00FE, Some(0x00FF)));

        let json = store.to_json().unwrap();
        let restored = BreakpointStore::from_json(&json).unwrap();

        assert_eq!(restored.breakpoints(), store.breakpoints());
        assert!(restored.should_stop_at(0x8000, None));
        assert!(!restored.should_stop_at(0x4000, Some(1)));
        assert!(restored.has_io_read_bp(0x7FFE));
    }
}
