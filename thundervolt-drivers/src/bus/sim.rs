//! Simulated transport
//!
//! An in-memory bus for host tests and emulator builds. Targets are plain
//! register files reached through the same transfer engine as the hardware
//! transports, so drivers see real framing. Every wire primitive is
//! recorded in a bounded trace.

use heapless::Vec;
use thundervolt_core::i2c::Transport;
use thundervolt_hal::i2c::{Ack, BusError, Mode};

/// Maximum targets on one simulated bus
pub const MAX_DEVICES: usize = 12;

/// Trace entries kept; later events are dropped
pub const TRACE_CAPACITY: usize = 128;

/// Value read when no target is addressed
const FLOATING: u8 = 0xFF;

/// Byte-level behaviour of a simulated target
pub trait SimTarget {
    /// Start or repeated start addressed to this target
    fn start(&mut self, repeated: bool);

    /// Stop condition ending a transaction with this target
    fn stop(&mut self);

    /// Accept one byte from the controller
    fn write_byte(&mut self, byte: u8) -> Ack;

    /// Produce one byte for the controller
    fn read_byte(&mut self) -> u8;
}

/// One recorded wire primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SimEvent {
    Start,
    RepeatedStart,
    /// Address byte including the direction bit
    Address(u8),
    Write(u8),
    Read(u8),
    Stop,
}

/// No room for another target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFull;

/// Register pointer handling shared by the register devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Pointer {
    /// No transaction
    #[default]
    Idle,
    /// Next written byte selects the register
    Expected,
    /// Pointer selected, data bytes follow
    Set,
}

/// Target with 8-bit registers
///
/// The first byte written after a start selects the register, later bytes
/// write consecutive registers. Reads return consecutive registers from the
/// pointer. Out-of-range writes are acknowledged and dropped, out-of-range
/// reads return 0. A stop resets the pointer to 0.
#[derive(Debug, Clone)]
pub struct Reg8Device<const N: usize> {
    regs: [u8; N],
    pointer: u8,
    phase: Pointer,
}

impl<const N: usize> Reg8Device<N> {
    pub const fn new(regs: [u8; N]) -> Self {
        Self {
            regs,
            pointer: 0,
            phase: Pointer::Idle,
        }
    }

    pub fn regs(&self) -> &[u8; N] {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut [u8; N] {
        &mut self.regs
    }

    /// Current register pointer
    pub fn pointer(&self) -> u8 {
        self.pointer
    }
}

impl<const N: usize> SimTarget for Reg8Device<N> {
    fn start(&mut self, _repeated: bool) {
        self.phase = Pointer::Expected;
    }

    fn stop(&mut self) {
        self.phase = Pointer::Idle;
        self.pointer = 0;
    }

    fn write_byte(&mut self, byte: u8) -> Ack {
        match self.phase {
            Pointer::Expected => {
                self.pointer = byte;
                self.phase = Pointer::Set;
            }
            _ => {
                if let Some(reg) = self.regs.get_mut(self.pointer as usize) {
                    *reg = byte;
                }
                self.pointer = self.pointer.wrapping_add(1);
            }
        }
        Ack::Ack
    }

    fn read_byte(&mut self) -> u8 {
        let byte = self.regs.get(self.pointer as usize).copied().unwrap_or(0);
        self.pointer = self.pointer.wrapping_add(1);
        byte
    }
}

/// Target with 16-bit big-endian registers
///
/// Same pointer rules as [`Reg8Device`]; each register takes two data
/// bytes, high byte first, and the pointer advances after the low byte.
#[derive(Debug, Clone)]
pub struct Reg16BeDevice<const N: usize> {
    regs: [u16; N],
    pointer: u8,
    phase: Pointer,
    /// Next data byte is the low half
    low: bool,
}

impl<const N: usize> Reg16BeDevice<N> {
    pub const fn new(regs: [u16; N]) -> Self {
        Self {
            regs,
            pointer: 0,
            phase: Pointer::Idle,
            low: false,
        }
    }

    pub fn regs(&self) -> &[u16; N] {
        &self.regs
    }

    pub fn regs_mut(&mut self) -> &mut [u16; N] {
        &mut self.regs
    }
}

impl<const N: usize> SimTarget for Reg16BeDevice<N> {
    fn start(&mut self, _repeated: bool) {
        self.phase = Pointer::Expected;
        self.low = false;
    }

    fn stop(&mut self) {
        self.phase = Pointer::Idle;
        self.pointer = 0;
        self.low = false;
    }

    fn write_byte(&mut self, byte: u8) -> Ack {
        if self.phase == Pointer::Expected {
            self.pointer = byte;
            self.phase = Pointer::Set;
            return Ack::Ack;
        }

        if let Some(reg) = self.regs.get_mut(self.pointer as usize) {
            *reg = if self.low {
                (*reg & 0xFF00) | u16::from(byte)
            } else {
                u16::from(byte) << 8
            };
        }
        if self.low {
            self.pointer = self.pointer.wrapping_add(1);
        }
        self.low = !self.low;
        Ack::Ack
    }

    fn read_byte(&mut self) -> u8 {
        let word = self.regs.get(self.pointer as usize).copied().unwrap_or(0);
        let [hi, lo] = word.to_be_bytes();
        let byte = if self.low { lo } else { hi };
        if self.low {
            self.pointer = self.pointer.wrapping_add(1);
        }
        self.low = !self.low;
        byte
    }
}

/// In-memory bus of simulated targets
pub struct SimBus<'a> {
    devices: Vec<(u8, &'a mut dyn SimTarget), MAX_DEVICES>,
    /// Index of the addressed target
    current: Option<usize>,
    trace: Vec<SimEvent, TRACE_CAPACITY>,
    read_messages: u32,
    write_messages: u32,
}

impl<'a> SimBus<'a> {
    pub const fn new() -> Self {
        Self {
            devices: Vec::new(),
            current: None,
            trace: Vec::new(),
            read_messages: 0,
            write_messages: 0,
        }
    }

    /// Put a target on the bus at `address`
    ///
    /// When two targets share an address the first one answers.
    pub fn attach(&mut self, address: u8, device: &'a mut dyn SimTarget) -> Result<(), BusFull> {
        self.devices.push((address, device)).map_err(|_| BusFull)
    }

    /// Recorded wire primitives, oldest first
    pub fn trace(&self) -> &[SimEvent] {
        &self.trace
    }

    /// Forget the trace and message counters
    pub fn clear_trace(&mut self) {
        self.trace.clear();
        self.read_messages = 0;
        self.write_messages = 0;
    }

    /// Acknowledged read messages since the last clear
    pub fn read_messages(&self) -> u32 {
        self.read_messages
    }

    /// Acknowledged write messages since the last clear
    pub fn write_messages(&self) -> u32 {
        self.write_messages
    }

    fn record(&mut self, event: SimEvent) {
        // A full trace keeps its oldest entries
        let _ = self.trace.push(event);
    }

    fn target(&mut self) -> Option<&mut (dyn SimTarget + 'a)> {
        let index = self.current?;
        self.devices.get_mut(index).map(|(_, device)| &mut **device)
    }
}

impl Default for SimBus<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SimBus<'_> {
    fn configure(&mut self, mode: Mode) -> Result<(), BusError> {
        debug!(
            "i2c: simulated bus, {=usize} targets, {} Hz",
            self.devices.len(),
            mode.frequency()
        );
        let _ = mode;
        Ok(())
    }

    fn start(&mut self, address_byte: u8, repeated: bool) -> Result<Ack, BusError> {
        self.record(if repeated {
            SimEvent::RepeatedStart
        } else {
            SimEvent::Start
        });
        self.record(SimEvent::Address(address_byte));

        let address = address_byte >> 1;
        self.current = self.devices.iter().position(|(a, _)| *a == address);

        match self.target() {
            Some(device) => {
                device.start(repeated);
                if address_byte & 1 == 1 {
                    self.read_messages += 1;
                } else {
                    self.write_messages += 1;
                }
                Ok(Ack::Ack)
            }
            None => Ok(Ack::Nack),
        }
    }

    fn stop(&mut self) -> Result<(), BusError> {
        self.record(SimEvent::Stop);
        if let Some(device) = self.target() {
            device.stop();
        }
        self.current = None;
        Ok(())
    }

    fn send_byte(&mut self, byte: u8) -> Result<Ack, BusError> {
        self.record(SimEvent::Write(byte));
        Ok(self
            .target()
            .map_or(Ack::Nack, |device| device.write_byte(byte)))
    }

    fn recv_byte(&mut self, _ack: Ack) -> Result<u8, BusError> {
        let byte = self.target().map_or(FLOATING, |device| device.read_byte());
        self.record(SimEvent::Read(byte));
        Ok(byte)
    }
}

/// Register contents of a stock board, as the emulator build presents it
pub mod presets {
    use super::{Reg16BeDevice, Reg8Device};

    /// Thundervolt board controller: LED on, stock voltages, 70 °C, HW1, SW1
    pub const fn thundervolt() -> Reg8Device<13> {
        Reg8Device::new([
            0x04, 0x00, 0xE8, 0x03, 0x7E, 0x04, 0x08, 0x07, 0xE4, 0x0C, 0x46, 0x01, 0x01,
        ])
    }

    /// 1.0 V TPS6286x regulator
    pub const fn tps6286x_1v0() -> Reg8Device<6> {
        Reg8Device::new([0x00, 0x78, 0x78, 0x00, 0x00, 0x00])
    }

    /// 1.15 V TPS6286x regulator
    pub const fn tps6286x_1v15() -> Reg8Device<6> {
        Reg8Device::new([0x00, 0x96, 0x96, 0x00, 0x00, 0x00])
    }

    /// 1.8 V TPS6286x regulator (2A option)
    pub const fn tps6286x_1v8() -> Reg8Device<6> {
        Reg8Device::new([0x00, 0x64, 0x64, 0x00, 0x00, 0x00])
    }

    /// 3.3 V TPS6381x regulator, low range
    pub const fn tps6381x() -> Reg8Device<6> {
        Reg8Device::new([0x00, 0x00, 0x00, 0x04, 0x3C, 0x42])
    }

    /// TMP1075 at 48 °C with 65/70 °C limits
    pub const fn tmp1075() -> Reg16BeDevice<4> {
        Reg16BeDevice::new([0x3000, 0x00FF, 0x4100, 0x4600])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thundervolt_core::i2c::{Controller, I2cBus, RegisterAccess};

    fn controller<'a>(bus: SimBus<'a>) -> Controller<SimBus<'a>> {
        let mut controller = Controller::new(bus);
        controller.configure(Mode::Standard).unwrap();
        controller
    }

    #[test]
    fn test_register_roundtrip() {
        let mut dev = Reg8Device::new([0u8; 8]);
        {
            let mut bus = SimBus::new();
            bus.attach(0x42, &mut dev).unwrap();
            let mut bus = controller(bus);

            bus.write_byte(0x42, 0x03, 0x5A).unwrap();
            assert_eq!(bus.read_byte(0x42, 0x03).unwrap(), 0x5A);
        }
        assert_eq!(dev.regs()[3], 0x5A);
        // The final stop resets the pointer
        assert_eq!(dev.pointer(), 0);
    }

    #[test]
    fn test_write_read_trace() {
        let mut dev = Reg8Device::new([0x00, 0xAB, 0xCD, 0x00]);
        let mut bus = SimBus::new();
        bus.attach(0x49, &mut dev).unwrap();
        let mut bus = controller(bus);

        let mut buf = [0u8; 2];
        bus.write_read(0x49, &[0x01], &mut buf).unwrap();
        assert_eq!(buf, [0xAB, 0xCD]);

        let sim = bus.transport();
        assert_eq!(
            sim.trace(),
            [
                SimEvent::Start,
                SimEvent::Address(0x92),
                SimEvent::Write(0x01),
                SimEvent::RepeatedStart,
                SimEvent::Address(0x93),
                SimEvent::Read(0xAB),
                SimEvent::Read(0xCD),
                SimEvent::Stop,
            ]
        );
        assert_eq!(sim.write_messages(), 1);
        assert_eq!(sim.read_messages(), 1);
    }

    #[test]
    fn test_unknown_address_nacks() {
        let mut bus = controller(SimBus::new());
        assert!(!bus.detect(0x50));
        assert_eq!(bus.read_byte(0x50, 0x00), Err(BusError::Nack));
        assert_eq!(bus.transport().read_messages(), 0);
        assert_eq!(bus.transport().trace().last(), Some(&SimEvent::Stop));
    }

    #[test]
    fn test_out_of_range_register() {
        let mut dev = Reg8Device::new([0x11u8; 2]);
        {
            let mut bus = SimBus::new();
            bus.attach(0x20, &mut dev).unwrap();
            let mut bus = controller(bus);
            bus.write_byte(0x20, 0x05, 0xEE).unwrap();
            assert_eq!(bus.read_byte(0x20, 0x05).unwrap(), 0x00);
        }
        assert_eq!(dev.regs(), &[0x11, 0x11]);
    }

    #[test]
    fn test_reg16_big_endian() {
        let mut dev = presets::tmp1075();
        {
            let mut bus = SimBus::new();
            bus.attach(0x49, &mut dev).unwrap();
            let mut bus = controller(bus);

            assert_eq!(bus.read_word_be(0x49, 0x00).unwrap(), 0x3000);
            assert_eq!(bus.read_word_be(0x49, 0x03).unwrap(), 0x4600);
            bus.write_word_be(0x49, 0x02, 0x1234).unwrap();
            assert_eq!(bus.read_word_be(0x49, 0x02).unwrap(), 0x1234);
        }
        assert_eq!(dev.regs()[2], 0x1234);
    }

    #[test]
    fn test_bus_full() {
        let mut devs: [Reg8Device<1>; MAX_DEVICES + 1] =
            core::array::from_fn(|_| Reg8Device::new([0]));
        let mut bus = SimBus::new();
        let mut results = std::vec::Vec::new();
        for (i, dev) in devs.iter_mut().enumerate() {
            results.push(bus.attach(i as u8, dev));
        }
        assert!(results[..MAX_DEVICES].iter().all(|r| r.is_ok()));
        assert_eq!(results[MAX_DEVICES], Err(BusFull));
    }

    #[test]
    fn test_trace_bounded() {
        let mut dev = Reg8Device::new([0u8; 4]);
        let mut bus = SimBus::new();
        bus.attach(0x10, &mut dev).unwrap();
        let mut bus = controller(bus);

        for _ in 0..100 {
            bus.write_byte(0x10, 0x00, 0x00).unwrap();
        }
        assert_eq!(bus.transport().trace().len(), TRACE_CAPACITY);
        assert_eq!(bus.transport().trace()[0], SimEvent::Start);

        bus.transport_mut().clear_trace();
        assert!(bus.transport().trace().is_empty());
        assert_eq!(bus.transport().write_messages(), 0);
    }

    #[test]
    fn test_presets() {
        let mut board = presets::thundervolt();
        let mut reg = presets::tps6381x();
        let mut bus = SimBus::new();
        bus.attach(0x48, &mut board).unwrap();
        bus.attach(0x75, &mut reg).unwrap();
        let mut bus = controller(bus);

        assert_eq!(bus.read_word_le(0x48, 0x02).unwrap(), 1000);
        assert_eq!(bus.read_byte(0x48, 0x0A).unwrap(), 70);
        assert_eq!(bus.read_byte(0x75, 0x03).unwrap(), 0x04);
    }
}
