//! Bus transports and device drivers
//!
//! Concrete implementations on top of thundervolt-core:
//!
//! - I2C transports (bit-banged GPIO, TWI peripheral, simulated bus)
//! - Regulators (TPS6286x, TPS6381x)
//! - Temperature sensor (TMP1075) and power monitor (INA700)
//! - Thundervolt board driver, register file and power-on sequence

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod board;
pub mod bus;
pub mod error;
pub mod monitor;
pub mod regulator;
pub mod sensor;

pub use error::DriverError;
