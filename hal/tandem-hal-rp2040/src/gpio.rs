//! GPIO bindings

use core::convert::Infallible;

use embedded_hal::digital::StatefulOutputPin;
use tandem_hal::OutputPin;

/// Chip select output over an infallible embedded-hal pin
///
/// embassy-rp's `Output` qualifies. The driven level is cached because
/// embedded-hal reads it back through `&mut self`.
pub struct SelectPin<P> {
    pin: P,
    high: bool,
}

impl<P: StatefulOutputPin<Error = Infallible>> SelectPin<P> {
    pub fn new(mut pin: P) -> Self {
        let high = match pin.is_set_high() {
            Ok(high) => high,
            Err(never) => match never {},
        };
        Self { pin, high }
    }

    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P: StatefulOutputPin<Error = Infallible>> OutputPin for SelectPin<P> {
    fn set_high(&mut self) {
        match self.pin.set_high() {
            Ok(()) => self.high = true,
            Err(never) => match never {},
        }
    }

    fn set_low(&mut self) {
        match self.pin.set_low() {
            Ok(()) => self.high = false,
            Err(never) => match never {},
        }
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
