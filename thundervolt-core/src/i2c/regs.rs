//! Register access helpers
//!
//! Convenience operations over any [`I2cBus`] for devices with an 8-bit
//! register pointer. Every helper is a single transfer: a register write is
//! one message carrying the pointer and the data, a register read writes the
//! pointer and then reads after a repeated start.

use thundervolt_hal::i2c::{BusError, I2cBus, Message};

/// Register access extension for I2C buses
///
/// Implemented for every [`I2cBus`].
pub trait RegisterAccess: I2cBus {
    /// Probe for a device
    ///
    /// Sends a zero-length write. Returns `true` if the address was
    /// acknowledged; any failure reads as absent.
    fn detect(&mut self, address: u8) -> bool {
        let mut msgs = [Message::write(&[]).with_stop()];
        self.transfer(address, &mut msgs).is_ok()
    }

    /// Write `bytes` as one message
    fn write(&mut self, address: u8, bytes: &[u8]) -> Result<(), BusError> {
        let mut msgs = [Message::write(bytes).with_stop()];
        self.transfer(address, &mut msgs)
    }

    /// Read into `buf` as one message
    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), BusError> {
        let mut msgs = [Message::read(buf).with_stop()];
        self.transfer(address, &mut msgs)
    }

    /// Write `bytes`, then read into `buf` after a repeated start
    fn write_read(&mut self, address: u8, bytes: &[u8], buf: &mut [u8]) -> Result<(), BusError> {
        let mut msgs = [
            Message::write(bytes),
            Message::read(buf).with_restart().with_stop(),
        ];
        self.transfer(address, &mut msgs)
    }

    /// Read an 8-bit register
    fn read_byte(&mut self, address: u8, reg: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.write_read(address, &[reg], &mut buf)?;
        Ok(buf[0])
    }

    /// Write an 8-bit register
    fn write_byte(&mut self, address: u8, reg: u8, value: u8) -> Result<(), BusError> {
        self.write(address, &[reg, value])
    }

    /// Read a 16-bit little-endian register
    fn read_word_le(&mut self, address: u8, reg: u8) -> Result<u16, BusError> {
        let mut buf = [0u8; 2];
        self.write_read(address, &[reg], &mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Write a 16-bit little-endian register
    fn write_word_le(&mut self, address: u8, reg: u8, value: u16) -> Result<(), BusError> {
        let [lo, hi] = value.to_le_bytes();
        self.write(address, &[reg, lo, hi])
    }

    /// Read a 16-bit big-endian register
    fn read_word_be(&mut self, address: u8, reg: u8) -> Result<u16, BusError> {
        let mut buf = [0u8; 2];
        self.write_read(address, &[reg], &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Write a 16-bit big-endian register
    fn write_word_be(&mut self, address: u8, reg: u8, value: u16) -> Result<(), BusError> {
        let [hi, lo] = value.to_be_bytes();
        self.write(address, &[reg, hi, lo])
    }

    /// Read a 24-bit big-endian register
    fn read_u24_be(&mut self, address: u8, reg: u8) -> Result<u32, BusError> {
        let mut buf = [0u8; 3];
        self.write_read(address, &[reg], &mut buf)?;
        Ok(u32::from_be_bytes([0, buf[0], buf[1], buf[2]]))
    }

    /// Update the bits of `mask` in an 8-bit register
    ///
    /// The new value is `(old & !mask) | (value & mask)`. The write is
    /// skipped when the register already holds it, so this must not be used
    /// on registers where writing has side effects.
    fn update_byte(&mut self, address: u8, reg: u8, mask: u8, value: u8) -> Result<(), BusError> {
        let old = self.read_byte(address, reg)?;
        let new = (old & !mask) | (value & mask);
        if new == old {
            return Ok(());
        }
        self.write_byte(address, reg, new)
    }

    /// Update the bits of `mask` in a 16-bit big-endian register
    ///
    /// Always writes, for registers with write-triggered bits.
    fn modify_word_be(
        &mut self,
        address: u8,
        reg: u8,
        mask: u16,
        value: u16,
    ) -> Result<(), BusError> {
        let old = self.read_word_be(address, reg)?;
        self.write_word_be(address, reg, (old & !mask) | (value & mask))
    }
}

impl<B: I2cBus + ?Sized> RegisterAccess for B {}
