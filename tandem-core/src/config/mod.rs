//! Configuration types
//!
//! Board-agnostic link parameters. The firmware fills these in from its
//! build-time validated `link.toml`.

pub mod link;

pub use link::*;
