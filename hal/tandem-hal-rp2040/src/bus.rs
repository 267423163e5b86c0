//! SPI bus binding

use embassy_rp::spi::{self, Phase, Polarity};
use embedded_hal_async::spi::SpiBus as AsyncSpiBus;
use tandem_hal::{BitOrder, BusConfig, BusTransfer};

/// Bus settings the RP2040 SPI block cannot produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UnsupportedConfig {
    /// The PL022 only shifts MSB first
    LsbFirst,
}

/// Translate a link bus configuration into embassy-rp's SPI config
pub fn spi_config(config: &BusConfig) -> Result<spi::Config, UnsupportedConfig> {
    if config.bit_order == BitOrder::LsbFirst {
        return Err(UnsupportedConfig::LsbFirst);
    }

    let mut spi_config = spi::Config::default();
    spi_config.frequency = config.frequency_hz;
    spi_config.polarity = if config.mode.idle_high() {
        Polarity::IdleHigh
    } else {
        Polarity::IdleLow
    };
    spi_config.phase = if config.mode.capture_on_second_transition() {
        Phase::CaptureOnSecondTransition
    } else {
        Phase::CaptureOnFirstTransition
    };
    Ok(spi_config)
}

/// Link bus over any embedded-hal-async SPI bus
///
/// On the RP2040 this wraps embassy-rp's DMA-driven `Spi<'d, T, Async>`.
pub struct SpiBus<B> {
    spi: B,
}

impl<B: AsyncSpiBus> SpiBus<B> {
    pub fn new(spi: B) -> Self {
        Self { spi }
    }

    pub fn into_inner(self) -> B {
        self.spi
    }
}

impl<B: AsyncSpiBus> BusTransfer for SpiBus<B> {
    type Error = B::Error;

    async fn write(&mut self, data: &[u8]) -> Result<(), B::Error> {
        self.spi.write(data).await?;
        // The transfer is only complete once the last word left the FIFO
        self.spi.flush().await
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<(), B::Error> {
        self.spi.read(buf).await
    }
}
