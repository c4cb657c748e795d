//! Events reported by the target-mode peripheral, and the answers to them

/// Bus events seen by a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    /// Our address was matched after a start or repeated start
    AddressMatch,
    /// Stop condition
    Stop,
    /// Illegal bus condition
    BusError,
    /// Collision while driving the bus
    Collision,
    /// Controller wrote a byte to us
    DataWritten(u8),
    /// Controller wants a byte; `nacked` is set when it did not acknowledge
    /// the previous one
    DataRequested {
        /// The previously sent byte was not acknowledged
        nacked: bool,
    },
}

/// How the peripheral should answer an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Response {
    /// Acknowledge and continue
    Ack,
    /// Send this byte and continue
    Send(u8),
    /// Release the bus and wait for the next transaction
    Complete,
}
