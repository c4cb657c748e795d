//! I2C bus abstractions
//!
//! Defines the message-framing contract shared by every bus transport and
//! every device driver above it. A transfer is an ordered list of
//! [`Message`]s sent to one 7-bit address as a single transaction.

use core::ops::{BitAnd, BitOr, BitOrAssign};

/// Highest valid 7-bit target address
pub const MAX_ADDRESS: u8 = 0x7F;

/// Bus speed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Standard mode (100 kHz)
    #[default]
    Standard,
    /// Fast mode (400 kHz)
    Fast,
}

impl Mode {
    /// SCL frequency in Hz
    pub const fn frequency(self) -> u32 {
        match self {
            Mode::Standard => 100_000,
            Mode::Fast => 400_000,
        }
    }

    /// Half of the SCL period in nanoseconds
    pub const fn half_period_ns(self) -> u32 {
        match self {
            Mode::Standard => 5_000,
            Mode::Fast => 1_250,
        }
    }

    /// Quarter of the SCL period in nanoseconds
    pub const fn quarter_period_ns(self) -> u32 {
        self.half_period_ns() / 2
    }
}

/// Message flags
///
/// Direction is carried in bit 0 (`READ`), framing requests in the
/// remaining bits. `WRITE` is the absence of `READ`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Flags(u8);

impl Flags {
    /// Write message to the bus
    pub const WRITE: Self = Self(0);
    /// Read message from the bus
    pub const READ: Self = Self(1 << 0);
    /// Send a stop condition after this message
    pub const STOP: Self = Self(1 << 1);
    /// Send a (repeated) start condition before this message
    pub const RESTART: Self = Self(1 << 2);

    /// No flags set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw flag bits
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every bit of `other` is set
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Clear the bits of `other`
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Check for a read message
    pub const fn is_read(self) -> bool {
        self.contains(Self::READ)
    }
}

impl BitOr for Flags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Flags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Flags {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Acknowledge bit of the ninth clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Ack {
    /// Receiver pulled SDA low
    Ack,
    /// Receiver left SDA high
    Nack,
}

impl Ack {
    /// Build from the sampled SDA level of the ninth clock
    pub const fn from_sda(high: bool) -> Self {
        if high {
            Ack::Nack
        } else {
            Ack::Ack
        }
    }

    /// SDA level that encodes this acknowledge
    pub const fn sda_level(self) -> bool {
        matches!(self, Ack::Nack)
    }
}

/// Data buffer of a message, borrowed from the caller
#[derive(Debug, PartialEq, Eq)]
pub enum Buffer<'a> {
    /// Bytes to clock out
    Write(&'a [u8]),
    /// Storage for bytes clocked in
    Read(&'a mut [u8]),
}

/// A single message of a transfer
#[derive(Debug, PartialEq, Eq)]
pub struct Message<'a> {
    buffer: Buffer<'a>,
    flags: Flags,
}

impl<'a> Message<'a> {
    /// Write message without framing flags
    pub fn write(bytes: &'a [u8]) -> Self {
        Self {
            buffer: Buffer::Write(bytes),
            flags: Flags::WRITE,
        }
    }

    /// Read message without framing flags
    pub fn read(buf: &'a mut [u8]) -> Self {
        Self {
            buffer: Buffer::Read(buf),
            flags: Flags::READ,
        }
    }

    /// Request a stop condition after this message
    pub fn with_stop(mut self) -> Self {
        self.flags |= Flags::STOP;
        self
    }

    /// Request a repeated start before this message
    pub fn with_restart(mut self) -> Self {
        self.flags |= Flags::RESTART;
        self
    }

    /// Flags including the direction bit
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Check for a read message
    pub fn is_read(&self) -> bool {
        self.flags.is_read()
    }

    /// Number of bytes to transfer
    pub fn len(&self) -> usize {
        match &self.buffer {
            Buffer::Write(bytes) => bytes.len(),
            Buffer::Read(buf) => buf.len(),
        }
    }

    /// Check for a zero-length message
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Access the data buffer
    pub fn buffer_mut(&mut self) -> &mut Buffer<'a> {
        &mut self.buffer
    }
}

/// Errors from I2C transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// `transfer` called before `configure`
    NotConfigured,
    /// Address or data byte not acknowledged
    Nack,
    /// Another controller won arbitration
    ArbitrationLost,
    /// Peripheral reported a bus error
    Bus,
    /// Clock stretching or a status poll exceeded its budget
    Timeout,
    /// Address does not fit in 7 bits
    InvalidAddress,
    /// More messages than the adapter can frame at once
    TooManyMessages,
}

impl embedded_hal::i2c::Error for BusError {
    fn kind(&self) -> embedded_hal::i2c::ErrorKind {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

        match self {
            BusError::Nack => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Unknown),
            BusError::ArbitrationLost => ErrorKind::ArbitrationLoss,
            BusError::Bus => ErrorKind::Bus,
            _ => ErrorKind::Other,
        }
    }
}

/// I2C bus controller
///
/// Implemented by the transfer engine for every transport, and consumed by
/// all device drivers. Callers must hold `&mut` access for the duration of a
/// transfer, which keeps START/STOP framing from interleaving.
pub trait I2cBus {
    /// Configure bus timing
    ///
    /// Must be called before the first transfer. Never talks to a target.
    fn configure(&mut self, mode: Mode) -> Result<(), BusError>;

    /// Send `messages` to `address` as one transaction
    ///
    /// # Arguments
    /// * `address` - 7-bit I2C address
    /// * `messages` - Messages in wire order
    fn transfer(&mut self, address: u8, messages: &mut [Message<'_>]) -> Result<(), BusError>;
}

impl<B: I2cBus + ?Sized> I2cBus for &mut B {
    fn configure(&mut self, mode: Mode) -> Result<(), BusError> {
        (**self).configure(mode)
    }

    fn transfer(&mut self, address: u8, messages: &mut [Message<'_>]) -> Result<(), BusError> {
        (**self).transfer(address, messages)
    }
}
