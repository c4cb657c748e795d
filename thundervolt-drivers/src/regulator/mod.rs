//! Programmable voltage regulators

pub mod tps6286x;
pub mod tps6381x;

pub use tps6286x::{ChipType, Tps6286x};
pub use tps6381x::{Range, Tps6381x};
