//! Tandem link protocol
//!
//! This crate defines what travels between the master (this firmware) and
//! the peripheral over the shared SPI bus and the out-of-band signaling line.
//!
//! # Protocol Overview
//!
//! Every message is preceded by a fixed-size command frame that tells the
//! receiving side how many payload bytes follow and which port they belong to:
//! ```text
//! ┌──────────────────────┬─────────────┐
//! │ LENGTH (u32, LE)     │ PORT (u16)  │
//! │ 4B                   │ 2B, LE      │
//! └──────────────────────┴─────────────┘
//! ```
//!
//! The signaling line is pulled high. Either side drives it low to say
//! "ready to transfer" and lets it go to say "phase complete". The edges,
//! not the levels, sequence the command and payload exchanges.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod frame;
pub mod signal;

pub use frame::{decode, encode, CommandFrame, FrameError, COMMAND_FRAME_SIZE};
pub use signal::{LineEdge, LineLevel};
