//! Board-agnostic core logic for the Thundervolt power-control firmware
//!
//! This crate contains all logic that does not depend on a specific bus
//! implementation:
//!
//! - I2C transfer engine, shared by every transport
//! - Register access helpers for byte and word registers
//! - Target-mode responder state machine
//! - Bus configuration types

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

#[macro_use]
mod fmt;

pub mod config;
pub mod i2c;
pub mod target;
