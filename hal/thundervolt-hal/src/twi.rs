//! Two-wire interface (TWI) peripheral register blocks
//!
//! Models the tinyAVR-style TWI peripheral: a master half driven by the
//! transfer engine and a target half driven by the responder. Chip HALs
//! implement [`TwiMaster`] / [`TwiTarget`] over their memory-mapped
//! registers; host tests implement them over plain arrays.

/// Master-side registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MasterReg {
    /// Control A (enable)
    CtrlA,
    /// Control B (command, acknowledge action)
    CtrlB,
    /// Status flags and bus state
    Status,
    /// Baud rate divider
    Baud,
    /// Address register, writing starts a transaction
    Addr,
    /// Data register
    Data,
}

/// Target-side registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetReg {
    /// Control A (enable, interrupt enables)
    CtrlA,
    /// Control B (command, acknowledge action)
    CtrlB,
    /// Status flags
    Status,
    /// Own address, shifted left by one
    Addr,
    /// Data register
    Data,
}

/// Master control A bits
pub mod mctrla {
    /// Enable the master
    pub const ENABLE: u8 = 1 << 0;
}

/// Master control B bits
pub mod mctrlb {
    /// Acknowledge action: send NACK
    pub const ACKACT_NACK: u8 = 1 << 2;
    /// Command field
    pub const MCMD_MASK: u8 = 0x03;
    /// Byte read/write operation
    pub const MCMD_RECVTRANS: u8 = 0x02;
    /// Issue a stop
    pub const MCMD_STOP: u8 = 0x03;
}

/// Master status bits
pub mod mstatus {
    /// Read interrupt flag
    pub const RIF: u8 = 1 << 7;
    /// Write interrupt flag
    pub const WIF: u8 = 1 << 6;
    /// Last byte was not acknowledged
    pub const RXACK: u8 = 1 << 4;
    /// Arbitration lost
    pub const ARBLOST: u8 = 1 << 3;
    /// Illegal bus condition
    pub const BUSERR: u8 = 1 << 2;
    /// Bus state field
    pub const BUSSTATE_MASK: u8 = 0x03;
    /// Bus idle
    pub const BUSSTATE_IDLE: u8 = 0x01;
    /// Bus owned by this master
    pub const BUSSTATE_OWNER: u8 = 0x02;
}

/// Target control A bits
pub mod sctrla {
    /// Data interrupt enable
    pub const DIEN: u8 = 1 << 7;
    /// Address/stop interrupt enable
    pub const APIEN: u8 = 1 << 6;
    /// Stop interrupt enable
    pub const PIEN: u8 = 1 << 5;
    /// Smart mode: acknowledge on data register access
    pub const SMEN: u8 = 1 << 1;
    /// Enable the target
    pub const ENABLE: u8 = 1 << 0;
}

/// Target control B bits
pub mod sctrlb {
    /// Complete the transaction
    pub const SCMD_COMPTRANS: u8 = 0x02;
    /// Respond to the current interrupt
    pub const SCMD_RESPONSE: u8 = 0x03;
}

/// Target status bits
pub mod sstatus {
    /// Data interrupt flag
    pub const DIF: u8 = 1 << 7;
    /// Address or stop interrupt flag
    pub const APIF: u8 = 1 << 6;
    /// Controller did not acknowledge the last byte
    pub const RXACK: u8 = 1 << 4;
    /// Collision detected
    pub const COLL: u8 = 1 << 3;
    /// Illegal bus condition
    pub const BUSERR: u8 = 1 << 2;
    /// Controller is reading from us
    pub const DIR: u8 = 1 << 1;
    /// Set with APIF: address match, clear with APIF: stop
    pub const AP: u8 = 1 << 0;
}

/// Master half of a TWI peripheral
pub trait TwiMaster {
    /// Read a master register
    fn read(&mut self, reg: MasterReg) -> u8;

    /// Write a master register
    fn write(&mut self, reg: MasterReg, value: u8);

    /// Read-modify-write: set the bits of `mask`
    fn set_bits(&mut self, reg: MasterReg, mask: u8) {
        let value = self.read(reg);
        self.write(reg, value | mask);
    }
}

/// Target half of a TWI peripheral
pub trait TwiTarget {
    /// Read a target register
    fn read(&mut self, reg: TargetReg) -> u8;

    /// Write a target register
    fn write(&mut self, reg: TargetReg, value: u8);
}
