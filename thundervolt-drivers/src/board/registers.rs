//! Board controller register file
//!
//! The register file the board firmware exposes at [`ADDRESS`] in target
//! mode. Writable registers are mirrored to a [`ByteStore`] at the same
//! offset, so the last written configuration is restored at power-on.
//!
//! [`ADDRESS`]: super::thundervolt::ADDRESS

use thundervolt_core::target::{RegisterError, RegisterFile};
use thundervolt_hal::storage::ByteStore;

use super::thundervolt::{
    config, reg, status, HardwareRevision, Rail, DEFAULT_OTSD_LIMIT, NUM_REGISTERS,
};

/// Store offset of the initialisation marker
pub const SIGNATURE_OFFSET: u8 = 0xFE;

/// Marks a store that holds board defaults
pub const SIGNATURE: u16 = 0xCAFE;

/// Values the power-on sequence applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StartupSettings {
    /// Rail voltages in mV, indexed by [`Rail`]
    pub voltages: [u16; 4],
    /// Over-temperature limit in °C
    pub otsd_limit: i8,
}

impl StartupSettings {
    /// Voltage for `rail` in mV
    pub fn voltage(&self, rail: Rail) -> u16 {
        self.voltages[rail as usize]
    }
}

impl Default for StartupSettings {
    /// Stock voltages and the default limit
    fn default() -> Self {
        Self {
            voltages: Rail::ALL.map(Rail::stock_mv),
            otsd_limit: DEFAULT_OTSD_LIMIT,
        }
    }
}

/// Board controller registers backed by persistent storage
pub struct BoardRegisters<S> {
    regs: [u8; NUM_REGISTERS],
    store: S,
}

impl<S: ByteStore> BoardRegisters<S> {
    /// Load the register file from `store`
    ///
    /// A store without the signature is reset to defaults first.
    pub fn new(store: S, hw_rev: HardwareRevision, sw_rev: u8) -> Self {
        let mut this = Self {
            regs: [0; NUM_REGISTERS],
            store,
        };
        if this.store.load_word_le(SIGNATURE_OFFSET) != SIGNATURE {
            debug!("board: store uninitialised, writing defaults");
            this.reset_store();
        }
        this.regs[reg::HWREV as usize] = hw_rev as u8;
        this.regs[reg::SWREV as usize] = sw_rev;
        this.load_persisted();
        this
    }

    /// Write default values and the signature to the store
    pub fn reset_store(&mut self) {
        let defaults = StartupSettings::default();
        self.store.persist(reg::CONFIG, config::LED);
        for rail in Rail::ALL {
            self.store
                .persist_word_le(rail.vpers_register(), defaults.voltage(rail));
        }
        self.store.persist(reg::OTSD_TEMP, defaults.otsd_limit as u8);
        self.store.persist_word_le(SIGNATURE_OFFSET, SIGNATURE);
    }

    /// Copy the persisted registers from the store
    pub fn load_persisted(&mut self) {
        self.regs[reg::CONFIG as usize] = self.store.load(reg::CONFIG);
        for index in reg::VPERS_1V0_L..=reg::VPERS_3V3_H {
            self.regs[index as usize] = self.store.load(index);
        }
        self.regs[reg::OTSD_TEMP as usize] = self.store.load(reg::OTSD_TEMP);
    }

    /// Reflect the safe-mode jumper in STATUS
    pub fn set_safe_mode(&mut self, enabled: bool) {
        let value = &mut self.regs[reg::STATUS as usize];
        if enabled {
            *value |= status::SAFEMODE;
        } else {
            *value &= !status::SAFEMODE;
        }
    }

    /// Check the safe-mode bit in STATUS
    pub fn safe_mode(&self) -> bool {
        self.regs[reg::STATUS as usize] & status::SAFEMODE != 0
    }

    /// Raw CONFIG register
    pub fn config(&self) -> u8 {
        self.regs[reg::CONFIG as usize]
    }

    /// Check if the onboard LED is enabled
    pub fn led_enabled(&self) -> bool {
        self.config() & config::LED != 0
    }

    /// Check if over-temperature shutdown is enabled
    pub fn otsd_enabled(&self) -> bool {
        self.config() & config::OTSD != 0
    }

    /// Persisted voltage for `rail` in mV
    pub fn persisted_voltage(&self, rail: Rail) -> u16 {
        let index = rail.vpers_register() as usize;
        u16::from_le_bytes([self.regs[index], self.regs[index + 1]])
    }

    /// Persisted over-temperature limit in °C
    pub fn otsd_limit(&self) -> i8 {
        self.regs[reg::OTSD_TEMP as usize] as i8
    }

    /// Settings for the power-on sequence; stock voltages in safe mode
    pub fn startup_settings(&self) -> StartupSettings {
        let voltages = if self.safe_mode() {
            Rail::ALL.map(Rail::stock_mv)
        } else {
            Rail::ALL.map(|rail| self.persisted_voltage(rail))
        };
        StartupSettings {
            voltages,
            otsd_limit: self.otsd_limit(),
        }
    }

    /// Current register image
    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        &self.regs
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Release the backing store
    pub fn release(self) -> S {
        self.store
    }

    fn is_read_only(index: u8) -> bool {
        matches!(index, reg::STATUS | reg::HWREV | reg::SWREV)
    }
}

impl<S: ByteStore> RegisterFile for BoardRegisters<S> {
    fn read_register(&self, index: u8) -> Result<u8, RegisterError> {
        self.regs.read_register(index)
    }

    fn write_register(&mut self, index: u8, value: u8) -> Result<(), RegisterError> {
        if index as usize >= NUM_REGISTERS {
            return Err(RegisterError::OutOfBounds);
        }
        if Self::is_read_only(index) {
            return Ok(());
        }

        let mut value = value;
        if index == reg::CONFIG && value & config::CLEAR != 0 {
            debug!("board: restoring defaults");
            self.reset_store();
            self.load_persisted();
            value = self.config();
        }

        self.regs[index as usize] = value;
        self.store.persist(index, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thundervolt_core::target::{Event, Responder, Response, SharedRegisterFile};

    fn fresh() -> BoardRegisters<[u8; 256]> {
        BoardRegisters::new([0xFF; 256], HardwareRevision::Hw2, 3)
    }

    fn write(responder: &mut Responder, regs: &mut impl RegisterFile, bytes: &[u8]) {
        responder.handle(Event::AddressMatch, regs);
        for &byte in bytes {
            responder.handle(Event::DataWritten(byte), regs);
        }
        assert_eq!(responder.handle(Event::Stop, regs), Response::Complete);
    }

    #[test]
    fn test_fresh_store_gets_defaults() {
        let regs = fresh();
        assert_eq!(
            regs.registers(),
            &[0x04, 0x00, 0xE8, 0x03, 0x7E, 0x04, 0x08, 0x07, 0xE4, 0x0C, 0x46, 0x02, 0x03]
        );
        assert_eq!(regs.store()[0xFE..], [0xFE, 0xCA]);
        assert!(regs.led_enabled());
        assert!(!regs.otsd_enabled());
        assert_eq!(regs.otsd_limit(), 70);
    }

    #[test]
    fn test_initialised_store_is_kept() {
        let mut store = [0u8; 256];
        store.persist_word_le(SIGNATURE_OFFSET, SIGNATURE);
        store.persist(reg::CONFIG, config::OTSD);
        store.persist_word_le(reg::VPERS_1V8_L, 1500);
        store.persist(reg::OTSD_TEMP, 85);

        let regs = BoardRegisters::new(store, HardwareRevision::Hw1, 1);
        assert!(regs.otsd_enabled());
        assert!(!regs.led_enabled());
        assert_eq!(regs.persisted_voltage(Rail::V1_8), 1500);
        assert_eq!(regs.persisted_voltage(Rail::V1_0), 0);
        assert_eq!(regs.otsd_limit(), 85);
    }

    #[test]
    fn test_writes_persist() {
        let mut regs = fresh();
        assert_eq!(regs.write_register(reg::OTSD_TEMP, 60), Ok(()));
        regs.write_register(reg::VPERS_1V0_L, 0x84).unwrap();
        regs.write_register(reg::VPERS_1V0_H, 0x03).unwrap();

        assert_eq!(regs.persisted_voltage(Rail::V1_0), 900);
        let store = regs.release();
        assert_eq!(store[reg::OTSD_TEMP as usize], 60);
        assert_eq!(store[reg::VPERS_1V0_L as usize], 0x84);
    }

    #[test]
    fn test_read_only_registers() {
        let mut regs = fresh();
        regs.set_safe_mode(true);
        for index in [reg::STATUS, reg::HWREV, reg::SWREV] {
            assert_eq!(regs.write_register(index, 0xAA), Ok(()));
        }
        assert_eq!(regs.read_register(reg::STATUS), Ok(status::SAFEMODE));
        assert_eq!(regs.read_register(reg::HWREV), Ok(2));
        assert_eq!(regs.read_register(reg::SWREV), Ok(3));
        assert_eq!(regs.store()[reg::HWREV as usize], 0xFF);
    }

    #[test]
    fn test_out_of_bounds() {
        let mut regs = fresh();
        assert_eq!(regs.read_register(13), Err(RegisterError::OutOfBounds));
        assert_eq!(regs.write_register(13, 0), Err(RegisterError::OutOfBounds));
    }

    #[test]
    fn test_clear_restores_defaults() {
        let mut regs = fresh();
        regs.write_register(reg::OTSD_TEMP, 90).unwrap();
        regs.write_register(reg::VPERS_3V3_L, 0x00).unwrap();
        regs.write_register(reg::CONFIG, config::OTSD).unwrap();

        regs.write_register(reg::CONFIG, config::OTSD | config::CLEAR)
            .unwrap();
        assert_eq!(regs.config(), config::LED);
        assert_eq!(regs.otsd_limit(), DEFAULT_OTSD_LIMIT);
        assert_eq!(regs.persisted_voltage(Rail::V3_3), 3300);
        assert_eq!(regs.store()[reg::CONFIG as usize], config::LED);
    }

    #[test]
    fn test_startup_settings() {
        let mut regs = fresh();
        regs.write_register(reg::VPERS_1V15_L, 0x52).unwrap();
        regs.write_register(reg::VPERS_1V15_H, 0x03).unwrap();
        regs.write_register(reg::OTSD_TEMP, 75).unwrap();

        let settings = regs.startup_settings();
        assert_eq!(settings.voltage(Rail::V1_15), 850);
        assert_eq!(settings.voltage(Rail::V3_3), 3300);
        assert_eq!(settings.otsd_limit, 75);

        regs.set_safe_mode(true);
        let settings = regs.startup_settings();
        assert_eq!(settings.voltage(Rail::V1_15), 1150);
        assert_eq!(settings.otsd_limit, 75);
        assert!(regs.safe_mode());
    }

    #[test]
    fn test_default_settings() {
        let settings = StartupSettings::default();
        assert_eq!(settings.voltages, [1000, 1150, 1800, 3300]);
        assert_eq!(settings.otsd_limit, 70);
    }

    #[test]
    fn test_written_over_i2c() {
        let shared = SharedRegisterFile::new(fresh());
        let mut responder = Responder::new();
        let mut handle = &shared;

        // 3000 mV to the 3V3 rail
        write(&mut responder, &mut handle, &[reg::VPERS_3V3_L, 0xB8, 0x0B]);
        // Runs past the last register; the extra byte is dropped
        write(&mut responder, &mut handle, &[reg::SWREV, 0x10, 0x20]);

        shared.with(|regs| {
            assert_eq!(regs.persisted_voltage(Rail::V3_3), 3000);
            assert_eq!(regs.read_register(reg::SWREV), Ok(3));
            assert_eq!(regs.store()[reg::VPERS_3V3_H as usize], 0x0B);
        });
    }
}
