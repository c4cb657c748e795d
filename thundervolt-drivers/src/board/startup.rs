//! Power-on sequence

use thundervolt_core::i2c::I2cBus;

use super::registers::StartupSettings;
use super::thundervolt::{Rail, Thundervolt};
use crate::error::DriverError;

/// Program every rail, then the over-temperature limit
///
/// A failing step does not stop the sequence: the remaining rails are still
/// set. The first error is returned once everything has been tried.
pub fn apply<B: I2cBus>(
    board: &mut Thundervolt<B>,
    settings: &StartupSettings,
) -> Result<(), DriverError> {
    let mut result = Ok(());

    for rail in Rail::ALL {
        let mv = settings.voltage(rail);
        if let Err(err) = board.set_voltage(rail, mv) {
            warn!("startup: {} to {=u16} mV failed: {}", rail, mv, err);
            result = result.and(Err(err));
        }
    }

    if let Err(err) = board.set_otsd_limit(settings.otsd_limit) {
        warn!("startup: over-temperature limit failed: {}", err);
        result = result.and(Err(err));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::thundervolt::tests::Bench;

    #[test]
    fn test_apply_persisted_settings() {
        let settings = StartupSettings {
            voltages: [900, 1000, 1500, 3000],
            otsd_limit: 80,
        };
        let mut bench = Bench::new();
        bench.run(|board| apply(board, &settings)).unwrap();

        assert_eq!(bench.v1_0.regs()[1], 100);
        assert_eq!(bench.v1_15.regs()[1], 120);
        assert_eq!(bench.v1_8.regs()[1], 70);
        assert_eq!(bench.v3_3.regs()[4], 48);
        assert_eq!(bench.tmp.regs()[3], 0x5000);
        assert_eq!(bench.tmp.regs()[2], 0x4B00);
    }

    #[test]
    fn test_stock_settings_are_noops_on_stock_board() {
        let mut bench = Bench::hw2();
        bench
            .run(|board| apply(board, &StartupSettings::default()))
            .unwrap();
        assert_eq!(bench.v1_0.regs()[1], 0x78);
        assert_eq!(bench.tmp.regs()[3], 0x4600);
        assert_eq!(bench.tmp.regs()[2], 0x4100);
    }

    #[test]
    fn test_continues_past_failures() {
        let settings = StartupSettings {
            // 1V15 out of range, 3V3 written normally
            voltages: [1000, 2000, 1800, 3000],
            otsd_limit: 75,
        };
        let mut bench = Bench::new();
        let result = bench.run(|board| apply(board, &settings));

        assert_eq!(result, Err(DriverError::InvalidVoltage));
        assert_eq!(bench.v1_15.regs()[1], 0x96);
        assert_eq!(bench.v3_3.regs()[4], 48);
        assert_eq!(bench.tmp.regs()[3], 0x4B00);
    }

    #[test]
    fn test_first_error_wins() {
        let mut bench = Bench::new();
        bench.board.regs_mut()[0x0B] = 0;
        let settings = StartupSettings {
            voltages: [1000, 1150, 1700, 3000],
            otsd_limit: 75,
        };
        let result = bench.run(|board| apply(board, &settings));

        // Both revision-dependent rails fail, the rest still go out
        assert_eq!(result, Err(DriverError::UnknownRevision));
        assert_eq!(bench.v1_8.regs()[1], 90);
        assert_eq!(bench.v3_3.regs()[4], 48);
        assert_eq!(bench.tmp.regs()[3], 0x4B00);
    }
}
