//! Signaling line access
//!
//! The line's `Input` has a single owner: the [`LineWatcher`], which awaits
//! its edges. The engine samples the pad itself through a [`LinePin`], so a
//! peer assertion the watcher has not reported yet still blocks a bus claim.

use embassy_rp::gpio::Input;
use embassy_rp::pac;
use tandem_hal::InputPin;
use tandem_protocol::{LineEdge, LineLevel};

/// Number of user GPIOs in bank 0
const BANK0_PINS: u8 = 30;

/// Error returned for a pin outside bank 0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidPin(pub u8);

/// Read-only view of a bank 0 pad through the SIO input register
///
/// Reading does not disturb the pad configuration, so this can sit next to
/// the `Input` the watcher owns.
#[derive(Debug, Clone, Copy)]
pub struct LinePin {
    mask: u32,
}

impl LinePin {
    pub const fn new(pin: u8) -> Result<Self, InvalidPin> {
        if pin >= BANK0_PINS {
            return Err(InvalidPin(pin));
        }
        Ok(Self { mask: 1 << pin })
    }

    pub fn level(&self) -> LineLevel {
        LineLevel::from_high(self.is_high())
    }
}

impl InputPin for LinePin {
    fn is_high(&self) -> bool {
        pac::SIO.gpio_in(0).read() & self.mask != 0
    }
}

/// Turns edges of the signaling line into [`LineEdge`]s
///
/// Edges alternate: after an assertion the watcher only waits for the
/// release, and the other way round. A pulse that is already over when the
/// watcher samples the pad produces no edge.
pub struct LineWatcher<'d> {
    input: Input<'d>,
    level: LineLevel,
}

impl<'d> LineWatcher<'d> {
    pub fn new(input: Input<'d>) -> Self {
        let level = LineLevel::from_high(input.is_high());
        Self { input, level }
    }

    pub fn level(&self) -> LineLevel {
        self.level
    }

    /// Wait for the next edge that leaves the line at a new level
    pub async fn next_edge(&mut self) -> LineEdge {
        loop {
            match self.level {
                LineLevel::Released => self.input.wait_for_falling_edge().await,
                LineLevel::Asserted => self.input.wait_for_rising_edge().await,
            }

            let current = LineLevel::from_high(self.input.is_high());
            if let Some(edge) = LineEdge::between(self.level, current) {
                self.level = current;
                return edge;
            }
        }
    }
}
