//! Temperature sensors

pub mod tmp1075;

pub use tmp1075::Tmp1075;
