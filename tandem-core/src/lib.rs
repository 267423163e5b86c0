//! Board-agnostic transport engine for the Tandem link
//!
//! This crate contains the master side of the half-duplex protocol and
//! nothing that depends on a particular chip:
//!
//! - State machine deciding who owns the bus and what frame comes next
//! - Send and receive paths, including the atomic bus claim
//! - Command-wait watchdog and optional payload stall guard
//! - Receive buffer lifecycle (allocation, hand-off, release)
//! - Link configuration types
//!
//! The engine is driven by events. Edge notifications and watchdog expiry
//! come from the runtime, and bus transfer completion comes back through
//! [`engine::TransportEngine::service`]. Application callbacks are queued and
//! run after the event that produced them, never inline.

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;
#[cfg(test)]
extern crate std;

#[macro_use]
mod fmt;

pub mod buffer;
pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod transport;
pub mod watchdog;

pub use buffer::{AllocError, BorrowedBuffer, BufferAllocator, HeapAllocator, SharedBuffer};
pub use config::{ConfigError, TransportConfig};
pub use engine::{LinkStats, TransportEngine};
pub use error::{SendResult, TransportError};
pub use state::{Event, State};
pub use transport::Transport;
pub use watchdog::{Watchdog, WatchdogTimer, WatchdogToken};
