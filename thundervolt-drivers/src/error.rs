//! Driver error type

use thundervolt_hal::i2c::BusError;

/// Errors from device drivers
///
/// Argument validation happens before any bus traffic, so every variant
/// except [`DriverError::Bus`] means nothing was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Transfer failed
    Bus(BusError),
    /// Device did not identify itself as expected
    NotPresent,
    /// Rail number out of range
    InvalidRail,
    /// Voltage outside the allowed window
    InvalidVoltage,
    /// Unknown regulator chip option
    InvalidScale,
    /// Feature not available on this hardware revision
    NotSupported,
    /// Hardware revision register holds an unknown value
    UnknownRevision,
}

impl From<BusError> for DriverError {
    fn from(err: BusError) -> Self {
        DriverError::Bus(err)
    }
}
