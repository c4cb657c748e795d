//! Bit-banged I2C transport
//!
//! Drives SCL and SDA as general purpose pins. SDA is open-drain by
//! emulation: a one releases the line (input), a zero drives it low. SCL is
//! driven push-pull unless a pull-up is detected during `configure`, in
//! which case it is released for a one and polled until high, which lets
//! targets stretch the clock.
//!
//! Every bit follows the same shape: present SDA, wait a quarter period,
//! raise SCL, hold for half a period, lower SCL, wait a quarter period.

use thundervolt_core::config::{BitBangConfig, BitTiming};
use thundervolt_core::i2c::Transport;
use thundervolt_hal::gpio::FlexPin;
use thundervolt_hal::i2c::{Ack, BusError, Mode};
use thundervolt_hal::timer::TickCounter;

/// SCL drive discipline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriveMode {
    /// SCL driven both ways; no clock stretching
    #[default]
    PushPull,
    /// SCL released for high; clock stretching honoured
    OpenDrain,
}

/// Bit-banged I2C transport
pub struct BitBang<SCL, SDA, C> {
    scl: SCL,
    sda: SDA,
    clock: C,
    config: BitBangConfig,
    timing: BitTiming,
    drive: DriveMode,
}

impl<SCL, SDA, C> BitBang<SCL, SDA, C>
where
    SCL: FlexPin,
    SDA: FlexPin,
    C: TickCounter,
{
    /// Create a transport over two pins and a tick counter
    ///
    /// Timing is not valid until `configure` runs.
    pub fn new(scl: SCL, sda: SDA, clock: C, config: BitBangConfig) -> Self {
        Self {
            scl,
            sda,
            clock,
            config,
            timing: BitTiming::default(),
            drive: DriveMode::PushPull,
        }
    }

    /// Detected SCL drive discipline
    pub fn drive_mode(&self) -> DriveMode {
        self.drive
    }

    /// Current bit timing
    pub fn timing(&self) -> BitTiming {
        self.timing
    }

    /// Release the pins and tick counter
    pub fn release(self) -> (SCL, SDA, C) {
        (self.scl, self.sda, self.clock)
    }

    fn quarter(&self) {
        self.clock.delay_ticks(self.timing.quarter_ticks);
    }

    fn half(&self) {
        self.clock.delay_ticks(self.timing.half_ticks);
    }

    /// Let both lines float high
    fn release_lines(&mut self) {
        self.sda.set_as_input();
        self.scl.set_as_input();
    }

    fn set_scl(&mut self, high: bool) -> Result<(), BusError> {
        if !high {
            self.scl.set_low();
            self.scl.set_as_output();
            return Ok(());
        }

        match self.drive {
            DriveMode::PushPull => {
                self.scl.set_high();
                self.scl.set_as_output();
            }
            DriveMode::OpenDrain => {
                self.scl.set_as_input();

                // Wait for the target to release a stretched clock
                let start = self.clock.now();
                while self.scl.is_low() {
                    if let Some(limit) = self.config.stretch_timeout_ticks {
                        if self.clock.elapsed_since(start) >= limit {
                            warn!("i2c: clock stretch timeout");
                            self.release_lines();
                            return Err(BusError::Timeout);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn set_sda(&mut self, high: bool) {
        if high {
            self.sda.set_as_input();
        } else {
            self.sda.set_low();
            self.sda.set_as_output();
        }
    }

    fn get_sda(&mut self) -> bool {
        self.sda.set_as_input();
        self.sda.is_high()
    }

    fn start_condition(&mut self) -> Result<(), BusError> {
        self.set_sda(false);
        self.quarter();
        self.set_scl(false)?;
        self.quarter();
        Ok(())
    }

    fn repeated_start_condition(&mut self) -> Result<(), BusError> {
        self.set_sda(true);
        self.quarter();
        self.set_scl(true)?;
        self.quarter();
        self.start_condition()
    }

    fn stop_condition(&mut self) -> Result<(), BusError> {
        self.set_sda(false);
        self.quarter();
        self.set_scl(true)?;
        self.half();
        self.set_sda(true);
        self.half();
        Ok(())
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), BusError> {
        self.set_sda(bit);
        self.quarter();
        self.set_scl(true)?;
        self.half();
        self.set_scl(false)?;
        self.quarter();
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, BusError> {
        self.set_sda(true);
        self.quarter();
        self.set_scl(true)?;
        self.half();
        let bit = self.get_sda();
        self.set_scl(false)?;
        self.quarter();
        Ok(bit)
    }

    fn write_byte(&mut self, byte: u8) -> Result<Ack, BusError> {
        for i in (0..8).rev() {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(Ack::from_sda(self.read_bit()?))
    }

    /// Check whether SCL has a pull-up
    ///
    /// Releases SCL and samples it repeatedly; a single low sample means
    /// nothing pulls the line up. The pin direction is restored afterwards.
    fn probe_open_drain(&mut self) -> bool {
        let was_output = self.scl.is_output();

        self.scl.set_as_input();
        self.quarter();

        let mut open_drain = true;
        for _ in 0..self.config.probe_samples {
            if self.scl.is_low() {
                open_drain = false;
                break;
            }
            self.quarter();
        }

        if was_output {
            self.scl.set_as_output();
        } else {
            self.scl.set_as_input();
        }

        open_drain
    }
}

impl<SCL, SDA, C> Transport for BitBang<SCL, SDA, C>
where
    SCL: FlexPin,
    SDA: FlexPin,
    C: TickCounter,
{
    fn configure(&mut self, mode: Mode) -> Result<(), BusError> {
        self.timing = self.config.timing(mode);

        // Drive the lines ourselves until the probe says otherwise; a
        // previous open-drain result would wait on a pull-up that may be gone
        self.drive = DriveMode::PushPull;
        // Bring both lines high in case something left them low
        self.stop_condition()?;

        self.drive = if self.probe_open_drain() {
            DriveMode::OpenDrain
        } else {
            DriveMode::PushPull
        };
        debug!(
            "i2c: bit-bang half {} quarter {} ticks, {}",
            self.timing.half_ticks,
            self.timing.quarter_ticks,
            self.drive
        );
        Ok(())
    }

    fn start(&mut self, address_byte: u8, repeated: bool) -> Result<Ack, BusError> {
        if repeated {
            self.repeated_start_condition()?;
        } else {
            self.start_condition()?;
        }
        self.write_byte(address_byte)
    }

    fn stop(&mut self) -> Result<(), BusError> {
        self.stop_condition()
    }

    fn send_byte(&mut self, byte: u8) -> Result<Ack, BusError> {
        self.write_byte(byte)
    }

    fn recv_byte(&mut self, ack: Ack) -> Result<u8, BusError> {
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.read_bit()?);
        }
        self.write_bit(ack.sda_level())?;
        Ok(byte)
    }

    fn exclusive<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        critical_section::with(|_| f(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::vec::Vec;
    use thundervolt_core::i2c::{Controller, I2cBus, RegisterAccess};
    use thundervolt_hal::gpio::{InputPin, OutputPin};

    /// What the emulated target saw on the wire
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum WireEvent {
        Start,
        Stop,
        Address(u8),
        Written(u8),
        Read(u8),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    enum Phase {
        #[default]
        Idle,
        Address,
        Data,
        AckOut,
        Transmit,
        AckIn,
        Ignore,
    }

    /// Byte-register target decoded from line edges
    #[derive(Debug, Default)]
    struct Target {
        address: u8,
        regs: [u8; 8],
        pointer: u8,
        first_write: bool,
        phase: Phase,
        shift: u8,
        bits: u8,
        reading: bool,
        nacked: bool,
        sda_low: bool,
        /// SCL reads left before a stretched clock is released
        hold: u32,
        /// Reads to stretch after each address acknowledge
        stretch: u32,
        /// Never release a stretched clock
        stuck: bool,
        nack_writes: bool,
        events: Vec<WireEvent>,
    }

    impl Target {
        fn start(&mut self) {
            self.events.push(WireEvent::Start);
            self.phase = Phase::Address;
            self.shift = 0;
            self.bits = 0;
            self.first_write = true;
            self.sda_low = false;
        }

        fn stop(&mut self) {
            self.events.push(WireEvent::Stop);
            self.phase = Phase::Idle;
            self.sda_low = false;
        }

        fn rising(&mut self, sda: bool) {
            match self.phase {
                Phase::Address | Phase::Data => {
                    self.shift = (self.shift << 1) | u8::from(sda);
                    self.bits += 1;
                }
                Phase::Transmit => self.bits += 1,
                Phase::AckIn => self.nacked = sda,
                _ => {}
            }
        }

        fn load_tx(&mut self) {
            let byte = self.regs[self.pointer as usize % self.regs.len()];
            self.pointer = self.pointer.wrapping_add(1);
            self.events.push(WireEvent::Read(byte));
            self.shift = byte;
            self.bits = 0;
            self.phase = Phase::Transmit;
            self.sda_low = byte & 0x80 == 0;
        }

        fn falling(&mut self) {
            match self.phase {
                Phase::Address if self.bits == 8 => {
                    self.events.push(WireEvent::Address(self.shift));
                    if self.shift >> 1 == self.address {
                        self.reading = self.shift & 1 == 1;
                        self.sda_low = true;
                        self.phase = Phase::AckOut;
                        self.hold = if self.stuck { 1 } else { self.stretch };
                    } else {
                        self.phase = Phase::Ignore;
                    }
                }
                Phase::Data if self.bits == 8 => {
                    let byte = self.shift;
                    self.events.push(WireEvent::Written(byte));
                    if self.first_write {
                        self.pointer = byte;
                        self.first_write = false;
                    } else {
                        let index = self.pointer as usize % self.regs.len();
                        self.regs[index] = byte;
                        self.pointer = self.pointer.wrapping_add(1);
                    }
                    self.sda_low = !self.nack_writes;
                    self.phase = Phase::AckOut;
                }
                Phase::AckOut => {
                    self.sda_low = false;
                    if self.reading {
                        self.load_tx();
                    } else {
                        self.phase = Phase::Data;
                        self.shift = 0;
                        self.bits = 0;
                    }
                }
                Phase::Transmit => {
                    if self.bits == 8 {
                        self.sda_low = false;
                        self.phase = Phase::AckIn;
                    } else {
                        self.sda_low = self.shift & (0x80 >> self.bits) == 0;
                    }
                }
                Phase::AckIn => {
                    if self.nacked {
                        self.phase = Phase::Ignore;
                    } else {
                        self.load_tx();
                    }
                }
                _ => {}
            }
        }
    }

    #[derive(Debug, Default)]
    struct Line {
        output: bool,
        latch: bool,
    }

    /// Two pulled-up lines plus one target
    #[derive(Debug)]
    struct Wire {
        scl: Line,
        sda: Line,
        scl_pull_up: bool,
        prev_scl: bool,
        prev_sda: bool,
        target: Target,
    }

    impl Wire {
        fn new(address: u8, scl_pull_up: bool) -> Rc<RefCell<Self>> {
            let wire = Wire {
                scl: Line::default(),
                sda: Line::default(),
                scl_pull_up,
                prev_scl: scl_pull_up,
                prev_sda: true,
                target: Target {
                    address,
                    ..Target::default()
                },
            };
            Rc::new(RefCell::new(wire))
        }

        fn scl_level(&self) -> bool {
            if self.scl.output {
                self.scl.latch
            } else {
                self.scl_pull_up && self.target.hold == 0
            }
        }

        fn sda_level(&self) -> bool {
            let driven_low = self.sda.output && !self.sda.latch;
            !driven_low && !self.target.sda_low
        }

        /// Deliver any edge caused by the last pin change
        fn settle(&mut self) {
            let scl = self.scl_level();
            let sda = self.sda_level();
            if scl && self.prev_scl && sda != self.prev_sda {
                if sda {
                    self.target.stop();
                } else {
                    self.target.start();
                }
            } else if scl && !self.prev_scl {
                self.target.rising(sda);
            } else if !scl && self.prev_scl {
                self.target.falling();
            }
            self.prev_scl = self.scl_level();
            self.prev_sda = self.sda_level();
        }
    }

    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Which {
        Scl,
        Sda,
    }

    struct Pin {
        wire: Rc<RefCell<Wire>>,
        which: Which,
    }

    impl Pin {
        fn with_line<R>(&self, f: impl FnOnce(&mut Line) -> R) -> R {
            let mut wire = self.wire.borrow_mut();
            let r = match self.which {
                Which::Scl => f(&mut wire.scl),
                Which::Sda => f(&mut wire.sda),
            };
            wire.settle();
            r
        }
    }

    impl OutputPin for Pin {
        fn set_high(&mut self) {
            self.with_line(|line| line.latch = true);
        }

        fn set_low(&mut self) {
            self.with_line(|line| line.latch = false);
        }
    }

    impl InputPin for Pin {
        fn is_high(&mut self) -> bool {
            let mut wire = self.wire.borrow_mut();
            if self.which == Which::Scl
                && !wire.scl.output
                && wire.target.hold > 0
                && !wire.target.stuck
            {
                wire.target.hold -= 1;
            }
            wire.settle();
            match self.which {
                Which::Scl => wire.scl_level(),
                Which::Sda => wire.sda_level(),
            }
        }
    }

    impl FlexPin for Pin {
        fn set_as_input(&mut self) {
            self.with_line(|line| line.output = false);
        }

        fn set_as_output(&mut self) {
            self.with_line(|line| line.output = true);
        }

        fn is_output(&self) -> bool {
            let wire = self.wire.borrow();
            match self.which {
                Which::Scl => wire.scl.output,
                Which::Sda => wire.sda.output,
            }
        }
    }

    /// Advances one tick per read
    #[derive(Default)]
    struct FakeClock(Cell<u32>);

    impl TickCounter for FakeClock {
        fn now(&self) -> u32 {
            let now = self.0.get();
            self.0.set(now.wrapping_add(1));
            now
        }
    }

    type TestBus = Controller<BitBang<Pin, Pin, FakeClock>>;

    fn bus(wire: &Rc<RefCell<Wire>>, config: BitBangConfig) -> TestBus {
        let scl = Pin {
            wire: wire.clone(),
            which: Which::Scl,
        };
        let sda = Pin {
            wire: wire.clone(),
            which: Which::Sda,
        };
        Controller::new(BitBang::new(scl, sda, FakeClock::default(), config))
    }

    fn config() -> BitBangConfig {
        BitBangConfig::new(8_000_000)
            .with_overhead(2)
            .with_probe_samples(8)
    }

    fn configured(address: u8, scl_pull_up: bool) -> (Rc<RefCell<Wire>>, TestBus) {
        let wire = Wire::new(address, scl_pull_up);
        let mut bus = bus(&wire, config());
        bus.configure(Mode::Standard).unwrap();
        wire.borrow_mut().target.events.clear();
        (wire, bus)
    }

    #[test]
    fn test_configure_timing() {
        let (_, bus) = configured(0x48, true);
        // 8 MHz: 5000 ns is 40 ticks, 2500 ns is 20, minus 2 overhead
        assert_eq!(bus.transport().timing().half_ticks, 38);
        assert_eq!(bus.transport().timing().quarter_ticks, 18);
    }

    #[test]
    fn test_detects_open_drain() {
        let (_, bus) = configured(0x48, true);
        assert_eq!(bus.transport().drive_mode(), DriveMode::OpenDrain);
    }

    #[test]
    fn test_detects_push_pull() {
        let (_, bus) = configured(0x48, false);
        assert_eq!(bus.transport().drive_mode(), DriveMode::PushPull);
    }

    #[test]
    fn test_reconfigure_redetects_drive_mode() {
        let (wire, bus) = configured(0x48, true);
        assert_eq!(bus.transport().drive_mode(), DriveMode::OpenDrain);

        // Pull-up gone: must fall back to push-pull, not wait on SCL
        wire.borrow_mut().scl_pull_up = false;
        let mut bus = {
            let (scl, sda, clock) = bus.release().release();
            Controller::new(BitBang::new(scl, sda, clock, config().with_stretch_timeout(500)))
        };
        bus.configure(Mode::Standard).unwrap();
        assert_eq!(bus.transport().drive_mode(), DriveMode::PushPull);

        wire.borrow_mut().scl_pull_up = true;
        bus.configure(Mode::Fast).unwrap();
        assert_eq!(bus.transport().drive_mode(), DriveMode::OpenDrain);
    }

    #[test]
    fn test_probe_restores_direction() {
        let (wire, _) = configured(0x48, true);
        // The stop during configure left SCL driven high
        assert!(wire.borrow().scl.output);
    }

    #[test]
    fn test_write_register() {
        let (wire, mut bus) = configured(0x48, true);
        bus.write_byte(0x48, 0x03, 0xA5).unwrap();

        let wire = wire.borrow();
        assert_eq!(wire.target.regs[3], 0xA5);
        assert_eq!(
            wire.target.events,
            [
                WireEvent::Start,
                WireEvent::Address(0x90),
                WireEvent::Written(0x03),
                WireEvent::Written(0xA5),
                WireEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_write_read_register() {
        let (wire, mut bus) = configured(0x49, true);
        wire.borrow_mut().target.regs[1] = 0xAB;
        wire.borrow_mut().target.regs[2] = 0xCD;

        let mut buf = [0u8; 2];
        bus.write_read(0x49, &[0x01], &mut buf).unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);

        let wire = wire.borrow();
        assert_eq!(
            wire.target.events,
            [
                WireEvent::Start,
                WireEvent::Address(0x92),
                WireEvent::Written(0x01),
                WireEvent::Start,
                WireEvent::Address(0x93),
                WireEvent::Read(0xAB),
                WireEvent::Read(0xCD),
                WireEvent::Stop,
            ]
        );
    }

    #[test]
    fn test_push_pull_transfer() {
        let (wire, mut bus) = configured(0x41, false);
        wire.borrow_mut().target.regs[1] = 0x64;
        assert_eq!(bus.read_byte(0x41, 0x01).unwrap(), 0x64);
    }

    #[test]
    fn test_detect() {
        let (wire, mut bus) = configured(0x48, true);
        assert!(bus.detect(0x48));
        assert!(!bus.detect(0x50));

        // Both probes end with a stop
        let stops = wire
            .borrow()
            .target
            .events
            .iter()
            .filter(|e| **e == WireEvent::Stop)
            .count();
        assert_eq!(stops, 2);
    }

    #[test]
    fn test_address_nack() {
        let (wire, mut bus) = configured(0x48, true);
        assert_eq!(bus.write(0x22, &[0x00, 0x01]), Err(BusError::Nack));
        assert_eq!(
            wire.borrow().target.events,
            [WireEvent::Start, WireEvent::Address(0x44), WireEvent::Stop]
        );
    }

    #[test]
    fn test_data_nack() {
        let (wire, mut bus) = configured(0x48, true);
        wire.borrow_mut().target.nack_writes = true;
        assert_eq!(bus.write(0x48, &[0x00, 0x01]), Err(BusError::Nack));
        assert_eq!(
            wire.borrow().target.events.last(),
            Some(&WireEvent::Stop)
        );
    }

    #[test]
    fn test_clock_stretching() {
        let (wire, mut bus) = configured(0x48, true);
        wire.borrow_mut().target.stretch = 5;
        wire.borrow_mut().target.regs[0] = 0x5A;
        assert_eq!(bus.read_byte(0x48, 0x00).unwrap(), 0x5A);
    }

    #[test]
    fn test_clock_stretch_timeout() {
        let wire = Wire::new(0x48, true);
        let mut bus = bus(&wire, config().with_stretch_timeout(50));
        bus.configure(Mode::Standard).unwrap();
        wire.borrow_mut().target.stuck = true;

        assert_eq!(bus.write(0x48, &[0x00]), Err(BusError::Timeout));
        let wire = wire.borrow();
        assert!(!wire.scl.output);
        assert!(!wire.sda.output);
    }

    #[test]
    fn test_unconfigured() {
        let wire = Wire::new(0x48, true);
        let mut bus = bus(&wire, config());
        assert_eq!(bus.write(0x48, &[0x00]), Err(BusError::NotConfigured));
        assert!(wire.borrow().target.events.is_empty());
    }
}
