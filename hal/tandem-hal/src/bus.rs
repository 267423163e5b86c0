//! SPI bus abstractions
//!
//! The engine never clocks bytes itself. It hands a buffer to a
//! [`BusTransfer`] implementation and resumes when the returned future
//! completes, which is the "transfer done" signal of the protocol.

use core::future::Future;

/// Asynchronous SPI master transfers
///
/// Chip select is not part of this trait; the engine drives the select line
/// itself so that it can claim the bus atomically with its state check.
pub trait BusTransfer {
    /// Error type for failed transfers
    type Error: core::fmt::Debug;

    /// Clock `data` out, discarding whatever is clocked in
    fn write(&mut self, data: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;

    /// Clock `buf.len()` bytes in, filling `buf`
    fn read(&mut self, buf: &mut [u8]) -> impl Future<Output = Result<(), Self::Error>>;
}

impl<T: BusTransfer + ?Sized> BusTransfer for &mut T {
    type Error = T::Error;

    async fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        (**self).write(data).await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        (**self).read(buf).await
    }
}

/// SPI link configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusConfig {
    /// Clock frequency in Hz
    pub frequency_hz: u32,
    /// Clock polarity and phase
    pub mode: Mode,
    /// Bit order within each byte
    pub bit_order: BitOrder,
}

impl BusConfig {
    /// 1 MHz, mode 0, MSB first: the clocking both ends of the link agree on
    pub const fn new() -> Self {
        Self {
            frequency_hz: 1_000_000,
            mode: Mode::Mode0,
            bit_order: BitOrder::MsbFirst,
        }
    }

    pub const fn with_frequency(mut self, frequency_hz: u32) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }

    pub const fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// SPI mode (combined polarity and phase)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Mode 0: CPOL=0, CPHA=0
    Mode0,
    /// Mode 1: CPOL=0, CPHA=1
    Mode1,
    /// Mode 2: CPOL=1, CPHA=0
    Mode2,
    /// Mode 3: CPOL=1, CPHA=1
    Mode3,
}

impl Mode {
    /// Parse the conventional 0-3 mode number
    pub const fn from_number(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(Mode::Mode0),
            1 => Some(Mode::Mode1),
            2 => Some(Mode::Mode2),
            3 => Some(Mode::Mode3),
            _ => None,
        }
    }

    /// Clock idles high (CPOL=1)
    pub const fn idle_high(self) -> bool {
        matches!(self, Mode::Mode2 | Mode::Mode3)
    }

    /// Data captured on the second clock transition (CPHA=1)
    pub const fn capture_on_second_transition(self) -> bool {
        matches!(self, Mode::Mode1 | Mode::Mode3)
    }
}

/// Bit order on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}
