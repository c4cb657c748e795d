//! Target-mode responder
//!
//! Lets the board answer as an I2C peripheral. The peripheral driver turns
//! hardware status into [`Event`]s and applies the returned [`Response`];
//! everything in between is plain, testable logic.

pub mod events;
pub mod machine;
pub mod register_file;

pub use events::{Event, Response};
pub use machine::{Responder, State};
pub use register_file::{RegisterError, RegisterFile, SharedRegisterFile};
