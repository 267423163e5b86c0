//! Events that trigger state transitions

use tandem_protocol::LineEdge;

use crate::watchdog::WatchdogToken;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Application events
    /// Application asked to send and the bus claim succeeded
    SendRequested,

    // Signaling line events
    /// Falling edge on the signaling line
    LineAsserted,
    /// Rising edge on the signaling line
    LineReleased,

    // Bus events
    /// The submitted bus transfer finished successfully
    TransferComplete,
    /// The submitted bus transfer reported an error
    TransferFailed,

    // Timer events
    /// A scheduled watchdog fired
    WatchdogExpired(WatchdogToken),
}

impl From<LineEdge> for Event {
    fn from(edge: LineEdge) -> Self {
        match edge {
            LineEdge::Asserted => Event::LineAsserted,
            LineEdge::Released => Event::LineReleased,
        }
    }
}
