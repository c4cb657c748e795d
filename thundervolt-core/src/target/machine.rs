//! Target-mode responder state machine
//!
//! Exposes a register file over I2C. A transaction writes the register
//! pointer as its first byte; later written bytes land in consecutive
//! registers, and reads return consecutive registers from the pointer.

use super::events::{Event, Response};
use super::register_file::RegisterFile;

/// Responder states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// No transaction in progress
    #[default]
    Idle,
    /// Address matched, no data yet
    NewTransaction,
    /// Register pointer received
    ReceivedAddress,
    /// At least one register written
    ReceivedData,
    /// At least one register sent
    SentData,
}

impl State {
    /// Check if a transaction is in progress
    pub fn is_active(&self) -> bool {
        !matches!(self, State::Idle)
    }

    /// Process an event and return the next state
    pub fn transition(self, event: Event) -> Self {
        use State::*;

        match (self, event) {
            (_, Event::AddressMatch) => NewTransaction,
            (_, Event::Stop | Event::BusError | Event::Collision) => Idle,

            // First written byte is the register pointer
            (NewTransaction, Event::DataWritten(_)) => ReceivedAddress,
            (_, Event::DataWritten(_)) => ReceivedData,

            // Controller NACKed our last byte: the read is over
            (SentData, Event::DataRequested { nacked: true }) => Idle,
            (_, Event::DataRequested { .. }) => SentData,
        }
    }
}

/// Target-mode responder
///
/// Holds the transaction state and the register pointer. The register file
/// is passed to every call so it can live in a shared cell.
#[derive(Debug, Clone, Default)]
pub struct Responder {
    state: State,
    pointer: u8,
}

impl Responder {
    /// Create an idle responder with the pointer at register 0
    pub const fn new() -> Self {
        Self {
            state: State::Idle,
            pointer: 0,
        }
    }

    /// Current state
    pub fn state(&self) -> State {
        self.state
    }

    /// Current register pointer
    pub fn pointer(&self) -> u8 {
        self.pointer
    }

    /// Handle one peripheral event
    pub fn handle<R: RegisterFile + ?Sized>(&mut self, event: Event, regs: &mut R) -> Response {
        let next = self.state.transition(event);

        let response = match (self.state, event) {
            (_, Event::AddressMatch) => Response::Ack,
            (_, Event::Stop) => Response::Complete,
            (_, Event::BusError | Event::Collision) => {
                warn!("i2c target: transaction aborted");
                Response::Complete
            }
            (State::NewTransaction, Event::DataWritten(byte)) => {
                self.pointer = byte;
                Response::Ack
            }
            (_, Event::DataWritten(byte)) => {
                if regs.write_register(self.pointer, byte).is_err() {
                    trace!("i2c target: write to {=u8} ignored", self.pointer);
                }
                self.pointer = self.pointer.wrapping_add(1);
                Response::Ack
            }
            (State::SentData, Event::DataRequested { nacked: true }) => Response::Complete,
            (_, Event::DataRequested { .. }) => {
                let byte = regs.read_register(self.pointer).unwrap_or(0);
                self.pointer = self.pointer.wrapping_add(1);
                Response::Send(byte)
            }
        };

        self.state = next;
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::RegisterError;

    /// 13 writable registers
    fn regs() -> [u8; 13] {
        [0; 13]
    }

    #[test]
    fn test_idle_to_new_transaction() {
        assert_eq!(State::Idle.transition(Event::AddressMatch), State::NewTransaction);
    }

    #[test]
    fn test_abort_from_any_state() {
        let states = [
            State::NewTransaction,
            State::ReceivedAddress,
            State::ReceivedData,
            State::SentData,
        ];

        for state in states {
            for event in [Event::Stop, Event::BusError, Event::Collision] {
                assert_eq!(state.transition(event), State::Idle);
            }
        }
    }

    #[test]
    fn test_write_sequence() {
        let mut responder = Responder::new();
        let mut regs = regs();

        assert_eq!(responder.handle(Event::AddressMatch, &mut regs), Response::Ack);
        assert_eq!(
            responder.handle(Event::DataWritten(0x05), &mut regs),
            Response::Ack
        );
        assert_eq!(responder.state(), State::ReceivedAddress);
        assert_eq!(responder.pointer(), 0x05);

        responder.handle(Event::DataWritten(0xAA), &mut regs);
        responder.handle(Event::DataWritten(0xBB), &mut regs);
        assert_eq!(responder.state(), State::ReceivedData);

        assert_eq!(responder.handle(Event::Stop, &mut regs), Response::Complete);
        assert_eq!(responder.state(), State::Idle);
        assert_eq!(regs[5], 0xAA);
        assert_eq!(regs[6], 0xBB);
        assert_eq!(responder.pointer(), 7);
    }

    #[test]
    fn test_read_after_repeated_start() {
        let mut responder = Responder::new();
        let mut regs = regs();
        regs[2] = 0xE8;
        regs[3] = 0x03;

        responder.handle(Event::AddressMatch, &mut regs);
        responder.handle(Event::DataWritten(0x02), &mut regs);
        // Repeated start keeps the pointer
        responder.handle(Event::AddressMatch, &mut regs);
        assert_eq!(
            responder.handle(Event::DataRequested { nacked: false }, &mut regs),
            Response::Send(0xE8)
        );
        assert_eq!(
            responder.handle(Event::DataRequested { nacked: false }, &mut regs),
            Response::Send(0x03)
        );
        assert_eq!(
            responder.handle(Event::DataRequested { nacked: true }, &mut regs),
            Response::Complete
        );
        assert_eq!(responder.state(), State::Idle);
        assert_eq!(responder.pointer(), 4);
    }

    #[test]
    fn test_out_of_bounds_read_sends_zero() {
        let mut responder = Responder::new();
        let mut regs = [0xFFu8; 13];

        responder.handle(Event::AddressMatch, &mut regs);
        responder.handle(Event::DataWritten(0x20), &mut regs);
        responder.handle(Event::AddressMatch, &mut regs);
        assert_eq!(
            responder.handle(Event::DataRequested { nacked: false }, &mut regs),
            Response::Send(0x00)
        );
        assert_eq!(regs.read_register(0x20), Err(RegisterError::OutOfBounds));
    }

    #[test]
    fn test_out_of_bounds_write_is_acked() {
        let mut responder = Responder::new();
        let mut regs = regs();

        responder.handle(Event::AddressMatch, &mut regs);
        responder.handle(Event::DataWritten(0x0C), &mut regs);
        assert_eq!(
            responder.handle(Event::DataWritten(0x11), &mut regs),
            Response::Ack
        );
        assert_eq!(
            responder.handle(Event::DataWritten(0x22), &mut regs),
            Response::Ack
        );
        assert_eq!(regs[12], 0x11);
        assert_eq!(responder.pointer(), 0x0E);
    }

    #[test]
    fn test_nack_on_first_request_still_sends() {
        let mut responder = Responder::new();
        let mut regs = regs();
        regs[0] = 0x42;

        responder.handle(Event::AddressMatch, &mut regs);
        assert_eq!(
            responder.handle(Event::DataRequested { nacked: true }, &mut regs),
            Response::Send(0x42)
        );
    }

    #[test]
    fn test_bus_error_completes() {
        let mut responder = Responder::new();
        let mut regs = regs();

        responder.handle(Event::AddressMatch, &mut regs);
        assert_eq!(
            responder.handle(Event::Collision, &mut regs),
            Response::Complete
        );
        assert!(!responder.state().is_active());
    }
}
