//! Transport state machine
//!
//! Every bus-claiming decision is a function of the current state and an
//! event. The engine owns the side effects; this module owns the table.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::State;
