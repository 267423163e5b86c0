//! GPIO pin abstractions
//!
//! The link uses two lines besides the SPI bus: a select output the master
//! drives to claim the bus, and the shared signaling line it samples.

/// Digital output pin
pub trait OutputPin {
    /// Drive the pin high (logic 1)
    fn set_high(&mut self);

    /// Drive the pin low (logic 0)
    fn set_low(&mut self);

    /// Check if the pin is currently driven high
    fn is_set_high(&self) -> bool;

    /// Check if the pin is currently driven low
    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Digital input pin
pub trait InputPin {
    /// Check if the pin reads high (logic 1)
    fn is_high(&self) -> bool;

    /// Check if the pin reads low (logic 0)
    fn is_low(&self) -> bool {
        !self.is_high()
    }
}

impl<T: OutputPin + ?Sized> OutputPin for &mut T {
    fn set_high(&mut self) {
        (**self).set_high();
    }

    fn set_low(&mut self) {
        (**self).set_low();
    }

    fn is_set_high(&self) -> bool {
        (**self).is_set_high()
    }
}

impl<T: InputPin + ?Sized> InputPin for &T {
    fn is_high(&self) -> bool {
        (**self).is_high()
    }
}

/// Output whose asserted state is logic low
///
/// Chip select lines are active-low: asserting the select claims the bus
/// by pulling the pin to ground.
#[derive(Debug)]
pub struct ActiveLow<P> {
    pin: P,
}

impl<P: OutputPin> ActiveLow<P> {
    /// Wrap a pin and leave it deasserted (high)
    pub fn new(mut pin: P) -> Self {
        pin.set_high();
        Self { pin }
    }

    /// Claim: drive the pin low
    pub fn assert(&mut self) {
        self.pin.set_low();
    }

    /// Release: drive the pin high
    pub fn release(&mut self) {
        self.pin.set_high();
    }

    pub fn is_asserted(&self) -> bool {
        self.pin.is_set_low()
    }

    /// Access the wrapped pin
    pub fn inner(&self) -> &P {
        &self.pin
    }

    /// Unwrap the pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}
