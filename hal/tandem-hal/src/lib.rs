//! Tandem Hardware Abstraction Layer
//!
//! This crate defines the hardware collaborators the transport engine is
//! bound to. Chip-specific HALs implement them, so the same engine runs on
//! any board that can clock an SPI bus and watch a GPIO.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  tandem-core (TransportEngine)          │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  tandem-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//!             ┌───────────────┐
//!             │  tandem-hal-  │
//!             │    rp2040     │
//!             └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Select line (chip select toward the peripheral)
//! - [`gpio::InputPin`] - Signaling line level
//! - [`bus::BusTransfer`] - Asynchronous SPI transfers

#![no_std]
#![deny(unsafe_code)]

pub mod bus;
pub mod gpio;

// Re-export key traits at crate root for convenience
pub use bus::{BitOrder, BusConfig, BusTransfer, Mode};
pub use gpio::{ActiveLow, InputPin, OutputPin};
