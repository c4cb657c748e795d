//! Configuration types
//!
//! Board-agnostic bus configuration. Values are plain data so a board crate
//! can build them as `const` items or deserialize them with the `serde`
//! feature.

pub mod bus;

pub use bus::*;
