//! embedded-hal adapter
//!
//! Lets a [`Controller`] stand in wherever an `embedded_hal::i2c::I2c` (or
//! the async variant) is expected. Operations are framed the embedded-hal
//! way: adjacent operations of the same direction are joined, a direction
//! change gets a repeated start.

use heapless::Vec;
use thundervolt_hal::i2c::{BusError, I2cBus, Message};

use super::engine::{Controller, Transport};

/// Maximum operations per embedded-hal transaction
pub const MAX_OPERATIONS: usize = 16;

impl<T: Transport> embedded_hal::i2c::ErrorType for Controller<T> {
    type Error = BusError;
}

impl<T: Transport> embedded_hal::i2c::I2c for Controller<T> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [embedded_hal::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        use embedded_hal::i2c::Operation;

        let mut messages: Vec<Message<'_>, MAX_OPERATIONS> = Vec::new();
        let mut previous_read = None;

        for operation in operations.iter_mut() {
            let (message, read) = match operation {
                Operation::Read(buf) => (Message::read(buf), true),
                Operation::Write(bytes) => (Message::write(bytes), false),
            };
            let message = match previous_read {
                Some(previous) if previous != read => message.with_restart(),
                _ => message,
            };
            previous_read = Some(read);
            messages
                .push(message)
                .map_err(|_| BusError::TooManyMessages)?;
        }

        I2cBus::transfer(self, address, &mut messages)
    }
}

impl<T: Transport> embedded_hal_async::i2c::I2c for Controller<T> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [embedded_hal_async::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        embedded_hal::i2c::I2c::transaction(self, address, operations)
    }
}
