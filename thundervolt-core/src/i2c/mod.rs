//! I2C controller side
//!
//! The transfer engine shared by all transports, register access helpers,
//! and the embedded-hal adapter.

pub mod adapter;
pub mod engine;
pub mod regs;

pub use engine::{Controller, Transport};
pub use regs::RegisterAccess;
pub use thundervolt_hal::i2c::{Ack, BusError, Flags, I2cBus, Message, Mode};
