//! GPIO pin abstractions
//!
//! Provides traits for the digital lines a bit-banged I2C controller needs.
//! Both SCL and SDA are switched between output and input at runtime, so
//! the bus lines are modelled as flexible pins.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip. Setting the level of a pin that is currently an
/// input only latches the output register.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }
}

/// Digital input pin
///
/// Implementations should handle the actual hardware register reading
/// for the specific chip.
pub trait InputPin {
    /// Check if the line reads high (logic 1)
    fn is_high(&mut self) -> bool;

    /// Check if the line reads low (logic 0)
    fn is_low(&mut self) -> bool {
        !self.is_high()
    }
}

/// Pin whose direction can change at runtime
///
/// An input pin is high impedance: the line floats to whatever a pull-up
/// resistor or another device drives it to.
pub trait FlexPin: OutputPin + InputPin {
    /// Switch the pin to input (release the line)
    fn set_as_input(&mut self);

    /// Switch the pin to output (drive the latched level)
    fn set_as_output(&mut self);

    /// Check if the pin is currently an output
    fn is_output(&self) -> bool;
}
