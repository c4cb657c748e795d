//! Thundervolt board support
//!
//! [`Thundervolt`] drives the board from a host or test bench;
//! [`BoardRegisters`] and [`startup::apply`] are the board firmware's side.

pub mod registers;
pub mod startup;
pub mod thundervolt;

pub use registers::{BoardRegisters, StartupSettings};
pub use thundervolt::{HardwareRevision, Rail, RailRegulator, Thundervolt};
