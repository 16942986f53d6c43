//! Memory and port bus interfaces.

/// Byte-addressed memory seen by the CPU.
///
/// Banking, paging and contention live behind this trait. The CPU never
/// interprets addresses; it reads and writes bytes and asks the bus how many
/// wait tacts each access costs. Delay values are consumed by the CPU's tact
/// engine, so every wait state still flows through the single timing
/// integration point.
pub trait MemoryBus {
    /// Read a byte from the given address.
    fn read(&mut self, address: u16) -> u8;

    /// Write a byte to the given address.
    fn write(&mut self, address: u16, value: u8);

    /// Tacts consumed by a read of this address before data is latched.
    fn read_delay(&self, address: u16) -> u32 {
        let _ = address;
        3
    }

    /// Tacts consumed by a write to this address.
    fn write_delay(&self, address: u16) -> u32 {
        let _ = address;
        3
    }

    /// Extra contention tacts when the address bus carries this address
    /// during an internal CPU cycle. Only consulted when the CPU has its
    /// delayed-address-bus mode enabled.
    fn address_bus_delay(&self, address: u16) -> u32 {
        let _ = address;
        0
    }

    /// Memory partition (bank) currently mapped at the address, if the bus
    /// is banked. Partitioned breakpoints compare against this.
    fn partition(&self, address: u16) -> Option<u8> {
        let _ = address;
        None
    }

    /// Called once per tact-counter advance so devices sharing the bus can
    /// follow the clock.
    fn on_tact_advanced(&mut self, current_frame_tact: u32) {
        let _ = current_frame_tact;
    }
}

/// I/O port space seen by the CPU.
///
/// Same shape as [`MemoryBus`]: the device decodes the port address, the CPU
/// only accounts for the timing. The default four tacts match the Z80 I/O
/// machine cycle.
pub trait PortBus {
    /// Read a byte from the given port.
    fn read(&mut self, port: u16) -> u8;

    /// Write a byte to the given port.
    fn write(&mut self, port: u16, value: u8);

    /// Tacts consumed by a port read.
    fn read_delay(&self, port: u16) -> u32 {
        let _ = port;
        4
    }

    /// Tacts consumed by a port write.
    fn write_delay(&self, port: u16) -> u32 {
        let _ = port;
        4
    }
}
