//! Thundervolt Hardware Abstraction Layer
//!
//! This crate defines hardware abstraction traits that chip-specific code
//! implements for the I2C transports and the board register file. Everything
//! above it (transfer engine, drivers, responder) only sees these traits, so
//! the same logic runs on the microcontroller and in host tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  thundervolt-drivers (chips, board)     │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  thundervolt-core (engine, responder)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  thundervolt-hal (this crate - traits)  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::FlexPin`] - Bidirectional digital lines
//! - [`timer::TickCounter`] - Free-running timebase
//! - [`twi::TwiMaster`], [`twi::TwiTarget`] - TWI peripheral registers
//! - [`i2c::I2cBus`] - I2C transfers
//! - [`storage::ByteStore`] - Persistent bytes

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod storage;
pub mod timer;
pub mod twi;

// Re-export key traits at crate root for convenience
pub use gpio::{FlexPin, InputPin, OutputPin};
pub use i2c::{Ack, BusError, Flags, I2cBus, Message, Mode};
pub use storage::ByteStore;
pub use timer::TickCounter;
pub use twi::{TwiMaster, TwiTarget};
