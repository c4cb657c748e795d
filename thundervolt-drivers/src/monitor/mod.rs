//! Power monitors

pub mod ina700;

pub use ina700::Ina700;
