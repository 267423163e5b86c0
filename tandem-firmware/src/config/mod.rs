//! Link configuration
//!
//! Values come from `link.toml`, validated and compiled in by `build.rs`.

use tandem_core::TransportConfig;
use tandem_hal::{BusConfig, Mode};

include!(concat!(env!("OUT_DIR"), "/link_config.rs"));

pub const fn transport_config() -> TransportConfig {
    TransportConfig::new()
        .with_max_message_len(MAX_MESSAGE_LEN)
        .with_watchdog_timeout_ms(WATCHDOG_TIMEOUT_MS)
        .with_payload_timeout_ms(PAYLOAD_TIMEOUT_MS)
}

pub const fn bus_config() -> BusConfig {
    // build.rs only accepts modes 0-3
    let mode = match Mode::from_number(SPI_MODE) {
        Some(mode) => mode,
        None => Mode::Mode0,
    };
    BusConfig::new().with_frequency(SPI_FREQUENCY_HZ).with_mode(mode)
}
