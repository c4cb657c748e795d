//! TWI peripheral transport and target port
//!
//! [`TwiMasterBus`] runs the transfer engine's wire primitives on the master
//! half of a TWI peripheral. [`TwiTargetPort`] turns the target half's
//! status into responder events and writes the responses back.

use embedded_hal::delay::DelayNs;
use thundervolt_core::config::TwiConfig;
use thundervolt_core::i2c::Transport;
use thundervolt_core::target::{Event, RegisterFile, Responder, Response};
use thundervolt_hal::i2c::{Ack, BusError, Mode};
use thundervolt_hal::twi::{
    mctrla, mctrlb, mstatus, sctrla, sctrlb, sstatus, MasterReg, TargetReg, TwiMaster, TwiTarget,
};

/// Master-mode TWI transport
pub struct TwiMasterBus<P, D> {
    regs: P,
    delay: D,
    config: TwiConfig,
}

impl<P: TwiMaster, D: DelayNs> TwiMasterBus<P, D> {
    /// Create a transport over a master register block
    pub fn new(regs: P, delay: D, config: TwiConfig) -> Self {
        Self { regs, delay, config }
    }

    /// Access the register block
    pub fn regs(&self) -> &P {
        &self.regs
    }

    /// Release the register block and delay
    pub fn release(self) -> (P, D) {
        (self.regs, self.delay)
    }

    /// Poll status until `done` holds, bounded by the poll limit
    fn poll(&mut self, done: impl Fn(u8) -> bool) -> Result<u8, BusError> {
        let mut polls: u32 = 0;
        loop {
            let status = self.regs.read(MasterReg::Status);
            if done(status) {
                return Ok(status);
            }
            polls = polls.saturating_add(1);
            if let Some(limit) = self.config.poll_limit {
                if polls >= limit {
                    warn!("i2c: twi status poll timed out, status {=u8:#x}", status);
                    return Err(BusError::Timeout);
                }
            }
        }
    }

    /// Wait for any flag of `mask`
    fn wait(&mut self, mask: u8) -> Result<u8, BusError> {
        self.poll(|status| status & mask != 0)
    }

    fn wait_idle(&mut self) -> Result<(), BusError> {
        self.poll(|status| status & mstatus::BUSSTATE_MASK == mstatus::BUSSTATE_IDLE)
            .map(|_| ())
    }
}

impl<P: TwiMaster, D: DelayNs> Transport for TwiMasterBus<P, D> {
    fn configure(&mut self, mode: Mode) -> Result<(), BusError> {
        let baud = self.config.baud(mode);
        self.regs.write(MasterReg::Baud, baud);
        self.regs.write(MasterReg::CtrlA, mctrla::ENABLE);
        self.regs.write(MasterReg::Status, mstatus::BUSSTATE_IDLE);
        self.delay.delay_ms(self.config.settle_ms);
        debug!("i2c: twi baud {=u8}", baud);
        Ok(())
    }

    fn start(&mut self, address_byte: u8, _repeated: bool) -> Result<Ack, BusError> {
        // Writing the address issues a start, or a repeated start while we
        // own the bus
        self.regs.write(MasterReg::Addr, address_byte);
        let status = self.wait(mstatus::WIF | mstatus::RIF)?;

        if status & mstatus::ARBLOST != 0 {
            warn!("i2c: twi arbitration lost");
            self.wait_idle()?;
            return Err(BusError::ArbitrationLost);
        }

        Ok(Ack::from_sda(status & mstatus::RXACK != 0))
    }

    fn stop(&mut self) -> Result<(), BusError> {
        self.regs.set_bits(MasterReg::CtrlB, mctrlb::MCMD_STOP);
        self.wait_idle()
    }

    fn begin_write(&mut self) -> Result<(), BusError> {
        self.regs.write(MasterReg::CtrlB, mctrlb::MCMD_RECVTRANS);
        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<Ack, BusError> {
        self.regs.write(MasterReg::Data, byte);
        let status = self.wait(mstatus::WIF)?;

        if status & mstatus::ARBLOST != 0 {
            warn!("i2c: twi arbitration lost");
            return Err(BusError::ArbitrationLost);
        }
        if status & mstatus::BUSERR != 0 {
            warn!("i2c: twi bus error");
            return Err(BusError::Bus);
        }

        Ok(Ack::from_sda(status & mstatus::RXACK != 0))
    }

    fn recv_byte(&mut self, ack: Ack) -> Result<u8, BusError> {
        self.wait(mstatus::RIF)?;
        let byte = self.regs.read(MasterReg::Data);
        match ack {
            Ack::Ack => self.regs.write(MasterReg::CtrlB, mctrlb::MCMD_RECVTRANS),
            Ack::Nack => self.regs.write(MasterReg::CtrlB, mctrlb::ACKACT_NACK),
        }
        Ok(byte)
    }
}

/// Target-mode TWI port
pub struct TwiTargetPort<P> {
    regs: P,
}

impl<P: TwiTarget> TwiTargetPort<P> {
    /// Wrap a target register block
    pub fn new(regs: P) -> Self {
        Self { regs }
    }

    /// Access the register block
    pub fn regs(&self) -> &P {
        &self.regs
    }

    /// Release the register block
    pub fn release(self) -> P {
        self.regs
    }

    /// Answer to `address` with data, address and stop interrupts enabled
    pub fn enable(&mut self, address: u8) {
        self.regs.write(TargetReg::Addr, address << 1);
        self.regs.write(
            TargetReg::CtrlA,
            sctrla::DIEN | sctrla::APIEN | sctrla::PIEN | sctrla::SMEN | sctrla::ENABLE,
        );
        debug!("i2c target: listening on {=u8:#x}", address);
    }

    /// Decode the pending peripheral event, if any
    pub fn poll_event(&mut self) -> Option<Event> {
        let status = self.regs.read(TargetReg::Status);

        if status & (sstatus::COLL | sstatus::BUSERR) != 0 {
            // Error flags are cleared by writing them back
            self.regs
                .write(TargetReg::Status, status & (sstatus::COLL | sstatus::BUSERR));
            return Some(if status & sstatus::COLL != 0 {
                Event::Collision
            } else {
                Event::BusError
            });
        }

        if status & sstatus::APIF != 0 {
            return Some(if status & sstatus::AP != 0 {
                Event::AddressMatch
            } else {
                Event::Stop
            });
        }

        if status & sstatus::DIF != 0 {
            return Some(if status & sstatus::DIR != 0 {
                Event::DataRequested {
                    nacked: status & sstatus::RXACK != 0,
                }
            } else {
                Event::DataWritten(self.regs.read(TargetReg::Data))
            });
        }

        None
    }

    /// Apply a responder decision
    pub fn respond(&mut self, response: Response) {
        match response {
            Response::Ack => self.regs.write(TargetReg::CtrlB, sctrlb::SCMD_RESPONSE),
            Response::Send(byte) => {
                self.regs.write(TargetReg::Data, byte);
                self.regs.write(TargetReg::CtrlB, sctrlb::SCMD_RESPONSE);
            }
            Response::Complete => self.regs.write(TargetReg::CtrlB, sctrlb::SCMD_COMPTRANS),
        }
    }

    /// Handle one pending event, typically from the TWI interrupt
    ///
    /// Returns the event handled, or `None` if nothing was pending.
    pub fn service<R: RegisterFile + ?Sized>(
        &mut self,
        responder: &mut Responder,
        regs: &mut R,
    ) -> Option<Event> {
        let event = self.poll_event()?;
        let response = responder.handle(event, regs);
        self.respond(response);
        Some(event)
    }
}
