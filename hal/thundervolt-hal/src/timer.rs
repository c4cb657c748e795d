//! Free-running tick counter
//!
//! Bit-banged timing is expressed in ticks of a platform timebase rather
//! than wall-clock units, so delays can be compensated for call overhead.

/// Monotonic, wrapping tick counter
pub trait TickCounter {
    /// Current tick count
    fn now(&self) -> u32;

    /// Busy-wait for `ticks` ticks
    fn delay_ticks(&self, ticks: u32) {
        let start = self.now();
        while self.now().wrapping_sub(start) < ticks {}
    }

    /// Ticks elapsed since `start`
    fn elapsed_since(&self, start: u32) -> u32 {
        self.now().wrapping_sub(start)
    }
}
