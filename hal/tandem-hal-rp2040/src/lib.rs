//! RP2040 bindings for the Tandem link
//!
//! Implements the `tandem-hal` traits on top of embassy-rp:
//!
//! - [`gpio::SelectPin`] drives chip select through an embassy `Output`
//! - [`bus::SpiBus`] runs transfers on embassy's DMA-backed `Spi`
//! - [`line::LineWatcher`] turns signaling line edges into events
//! - [`line::LinePin`] reads the line's pad for the engine's bus claim

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod gpio;
pub mod line;

pub use bus::{spi_config, SpiBus, UnsupportedConfig};
pub use gpio::SelectPin;
pub use line::{InvalidPin, LinePin, LineWatcher};
