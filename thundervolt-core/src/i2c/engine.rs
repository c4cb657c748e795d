//! Transfer engine
//!
//! Implements the message-framing algorithm once, on top of a small set of
//! wire primitives each transport provides. The engine owns all decisions
//! about start, repeated start, stop and acknowledge; transports only move
//! bits and report what the target answered.

use thundervolt_hal::i2c::{Ack, Buffer, BusError, Flags, I2cBus, Message, Mode, MAX_ADDRESS};

/// Wire primitives of a bus transport
///
/// Transports report arbitration loss, bus errors and timeouts as errors and
/// leave the bus in whatever state those conditions require. A missing
/// acknowledge is not an error at this level: it is returned as
/// [`Ack::Nack`] and the engine decides how to end the transaction.
pub trait Transport {
    /// Calibrate timing and prepare the bus for `mode`
    fn configure(&mut self, mode: Mode) -> Result<(), BusError>;

    /// Emit a start (or repeated start) condition and send the address byte
    ///
    /// `address_byte` is the 7-bit address shifted left with the direction
    /// bit in bit 0.
    fn start(&mut self, address_byte: u8, repeated: bool) -> Result<Ack, BusError>;

    /// Emit a stop condition
    fn stop(&mut self) -> Result<(), BusError>;

    /// Prepare for the data bytes of a write message
    fn begin_write(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    /// Clock out one data byte and sample the acknowledge
    fn send_byte(&mut self, byte: u8) -> Result<Ack, BusError>;

    /// Clock in one data byte and answer it with `ack`
    fn recv_byte(&mut self, ack: Ack) -> Result<u8, BusError>;

    /// Run a whole transfer with exclusive access to the bus
    fn exclusive<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R
    where
        Self: Sized,
    {
        f(self)
    }
}

/// I2C controller
///
/// Pairs a [`Transport`] with the configured state and implements
/// [`I2cBus`] for it.
#[derive(Debug)]
pub struct Controller<T> {
    transport: T,
    configured: bool,
}

impl<T: Transport> Controller<T> {
    /// Wrap an unconfigured transport
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            configured: false,
        }
    }

    /// Check whether `configure` has succeeded
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Access the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably access the transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Release the transport
    pub fn release(self) -> T {
        self.transport
    }
}

impl<T: Transport> I2cBus for Controller<T> {
    fn configure(&mut self, mode: Mode) -> Result<(), BusError> {
        self.transport.configure(mode)?;
        self.configured = true;
        debug!("i2c: configured for {} Hz", mode.frequency());
        Ok(())
    }

    fn transfer(&mut self, address: u8, messages: &mut [Message<'_>]) -> Result<(), BusError> {
        if !self.configured {
            return Err(BusError::NotConfigured);
        }

        if messages.is_empty() {
            return Ok(());
        }

        if address > MAX_ADDRESS {
            return Err(BusError::InvalidAddress);
        }

        self.transport
            .exclusive(|transport| run(transport, address, messages))
    }
}

/// Stop the bus after a missing acknowledge
fn abort_nack<T: Transport>(transport: &mut T) -> Result<(), BusError> {
    transport.stop()?;
    Err(BusError::Nack)
}

fn run<T: Transport>(
    transport: &mut T,
    address: u8,
    messages: &mut [Message<'_>],
) -> Result<(), BusError> {
    // Always begin with a start condition
    let mut flags = Flags::RESTART;
    let count = messages.len();

    for index in 0..count {
        if flags.contains(Flags::STOP) {
            transport.stop()?;
        }

        let next_restarts = messages
            .get(index + 1)
            .map_or(false, |next| next.flags().contains(Flags::RESTART));
        let message = &mut messages[index];

        // Forget the previous message's flags, except a pending start
        flags = (flags & Flags::RESTART) | message.flags();

        if flags.contains(Flags::RESTART) {
            let address_byte = (address << 1) | (flags & Flags::READ).bits();
            if transport.start(address_byte, index > 0)? == Ack::Nack {
                warn!("i2c: address {=u8:#x} not acknowledged", address);
                return abort_nack(transport);
            }
            flags.remove(Flags::RESTART);
        }

        // The final byte before the bus changes hands is not acknowledged
        let turnaround = index + 1 == count || flags.contains(Flags::STOP) || next_restarts;

        match message.buffer_mut() {
            Buffer::Read(buf) => {
                let len = buf.len();
                for (i, byte) in buf.iter_mut().enumerate() {
                    let ack = if turnaround && i + 1 == len {
                        Ack::Nack
                    } else {
                        Ack::Ack
                    };
                    *byte = transport.recv_byte(ack)?;
                }
            }
            Buffer::Write(bytes) => {
                transport.begin_write()?;
                for &byte in bytes.iter() {
                    if transport.send_byte(byte)? == Ack::Nack {
                        warn!("i2c: write to {=u8:#x} not acknowledged", address);
                        return abort_nack(transport);
                    }
                }
            }
        }
    }

    // A transfer always ends with a stop, even without a STOP flag
    transport.stop()
}
