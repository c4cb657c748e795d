//! I2C bus transports
//!
//! Each transport implements [`thundervolt_core::i2c::Transport`]; wrap it
//! in a [`thundervolt_core::i2c::Controller`] to get an `I2cBus`.

pub mod bitbang;
pub mod sim;
pub mod twi;

pub use bitbang::{BitBang, DriveMode};
pub use sim::{Reg16BeDevice, Reg8Device, SimBus, SimEvent, SimTarget};
pub use twi::{TwiMasterBus, TwiTargetPort};
