//! Z80 register file.

/// Z80 register set.
///
/// 8-bit registers are stored as `u8`, 16-bit registers as `u16`, so every
/// write truncates to the register width by construction. Pair accessors
/// compose `(high << 8) | low`; there are no flag side effects on plain
/// register assignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    // Main registers
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,

    // Alternate set, stored as full pairs (only ever swapped wholesale)
    pub af_alt: u16,
    pub bc_alt: u16,
    pub de_alt: u16,
    pub hl_alt: u16,

    // Index registers
    pub ix: u16,
    pub iy: u16,

    // Other registers
    pub sp: u16,
    pub pc: u16,
    pub i: u8,
    pub r: u8,

    /// WZ/MEMPTR - internal temporary register.
    /// Affects undocumented X/Y flags in BIT instructions and some jumps.
    pub wz: u16,
}

impl Registers {
    /// Get AF register pair.
    #[must_use]
    pub const fn af(&self) -> u16 {
        (self.a as u16) << 8 | self.f as u16
    }

    /// Get BC register pair.
    #[must_use]
    pub const fn bc(&self) -> u16 {
        (self.b as u16) << 8 | self.c as u16
    }

    /// Get DE register pair.
    #[must_use]
    pub const fn de(&self) -> u16 {
        (self.d as u16) << 8 | self.e as u16
    }

    /// Get HL register pair.
    #[must_use]
    pub const fn hl(&self) -> u16 {
        (self.h as u16) << 8 | self.l as u16
    }

    /// Get IR register pair (refresh address during internal cycles).
    #[must_use]
    pub const fn ir(&self) -> u16 {
        (self.i as u16) << 8 | self.r as u16
    }

    /// Set AF register pair.
    pub const fn set_af(&mut self, value: u16) {
        self.a = (value >> 8) as u8;
        self.f = value as u8;
    }

    /// Set BC register pair.
    pub const fn set_bc(&mut self, value: u16) {
        self.b = (value >> 8) as u8;
        self.c = value as u8;
    }

    /// Set DE register pair.
    pub const fn set_de(&mut self, value: u16) {
        self.d = (value >> 8) as u8;
        self.e = value as u8;
    }

    /// Set HL register pair.
    pub const fn set_hl(&mut self, value: u16) {
        self.h = (value >> 8) as u8;
        self.l = value as u8;
    }

    /// High byte of IX.
    #[must_use]
    pub const fn xh(&self) -> u8 {
        (self.ix >> 8) as u8
    }

    /// Low byte of IX.
    #[must_use]
    pub const fn xl(&self) -> u8 {
        self.ix as u8
    }

    /// High byte of IY.
    #[must_use]
    pub const fn yh(&self) -> u8 {
        (self.iy >> 8) as u8
    }

    /// Low byte of IY.
    #[must_use]
    pub const fn yl(&self) -> u8 {
        self.iy as u8
    }

    /// High byte of WZ.
    #[must_use]
    pub const fn wh(&self) -> u8 {
        (self.wz >> 8) as u8
    }

    /// Low byte of WZ.
    #[must_use]
    pub const fn wl(&self) -> u8 {
        self.wz as u8
    }

    pub const fn set_xh(&mut self, value: u8) {
        self.ix = (self.ix & 0x00FF) | (value as u16) << 8;
    }

    pub const fn set_xl(&mut self, value: u8) {
        self.ix = (self.ix & 0xFF00) | value as u16;
    }

    pub const fn set_yh(&mut self, value: u8) {
        self.iy = (self.iy & 0x00FF) | (value as u16) << 8;
    }

    pub const fn set_yl(&mut self, value: u8) {
        self.iy = (self.iy & 0xFF00) | value as u16;
    }

    pub const fn set_wh(&mut self, value: u8) {
        self.wz = (self.wz & 0x00FF) | (value as u16) << 8;
    }

    pub const fn set_wl(&mut self, value: u8) {
        self.wz = (self.wz & 0xFF00) | value as u16;
    }

    /// EX AF, AF'
    pub const fn exchange_af(&mut self) {
        let af = self.af();
        self.set_af(self.af_alt);
        self.af_alt = af;
    }

    /// EXX - swap BC/DE/HL with the alternate set.
    pub const fn exchange_main(&mut self) {
        let bc = self.bc();
        let de = self.de();
        let hl = self.hl();
        self.set_bc(self.bc_alt);
        self.set_de(self.de_alt);
        self.set_hl(self.hl_alt);
        self.bc_alt = bc;
        self.de_alt = de;
        self.hl_alt = hl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_set_then_half_read() {
        let mut regs = Registers::default();
        regs.set_af(0x1C3D);
        assert_eq!(regs.a, 0x1C);
        assert_eq!(regs.f, 0x3D);
        assert_eq!(regs.af(), 0x1C3D);
    }

    #[test]
    fn half_write_after_pair_write() {
        let mut regs = Registers::default();
        regs.set_af(0x1C3D);
        regs.a = 0x2F;
        assert_eq!(regs.f, 0x3D);
        assert_eq!(regs.af(), 0x2F3D);
    }

    #[test]
    fn index_halves_compose() {
        let mut regs = Registers::default();
        regs.ix = 0x12EA;
        assert_eq!(regs.xh(), 0x12);
        assert_eq!(regs.xl(), 0xEA);
        regs.set_xh(0x23);
        assert_eq!(regs.ix, 0x23EA);
        regs.set_xl(0x01);
        assert_eq!(regs.ix, 0x2301);
    }

    #[test]
    fn wz_halves_compose() {
        let mut regs = Registers::default();
        regs.set_wh(0xAB);
        regs.set_wl(0xCD);
        assert_eq!(regs.wz, 0xABCD);
    }

    #[test]
    fn exchange_af_swaps_pairs() {
        let mut regs = Registers::default();
        regs.set_af(0x1234);
        regs.af_alt = 0x5678;
        regs.exchange_af();
        assert_eq!(regs.af(), 0x5678);
        assert_eq!(regs.af_alt, 0x1234);
    }

    #[test]
    fn exchange_main_swaps_three_pairs() {
        let mut regs = Registers::default();
        regs.set_bc(0x1111);
        regs.set_de(0x2222);
        regs.set_hl(0x3333);
        regs.bc_alt = 0xAAAA;
        regs.de_alt = 0xBBBB;
        regs.hl_alt = 0xCCCC;
        regs.exchange_main();
        assert_eq!(regs.bc(), 0xAAAA);
        assert_eq!(regs.de(), 0xBBBB);
        assert_eq!(regs.hl(), 0xCCCC);
        assert_eq!(regs.bc_alt, 0x1111);
        assert_eq!(regs.de_alt, 0x2222);
        assert_eq!(regs.hl_alt, 0x3333);
    }
}
