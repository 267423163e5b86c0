//! Link statistics

/// Counters kept by the engine
///
/// Every recovered failure lands in one of these, since none of them is
/// surfaced to the application otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkStats {
    /// Sends that completed with the peer's release edge
    pub messages_sent: u32,
    /// Payloads delivered to the receive handler
    pub messages_received: u32,
    /// Sends refused because the link was busy
    pub busy_rejections: u32,
    /// Peer assertions written off by the command-wait watchdog
    pub glitches: u32,
    /// Events that did not fit the current state
    pub protocol_violations: u32,
    /// Failed bus transfers
    pub bus_errors: u32,
    /// Command frames announcing more than the configured maximum
    pub oversize_frames: u32,
    /// Receive buffers that could not be allocated
    pub allocation_failures: u32,
    /// Payload-wait phases ended by the stall guard
    pub stalls: u32,
    /// Application-requested resets
    pub resets: u32,
}

impl LinkStats {
    pub const fn new() -> Self {
        Self {
            messages_sent: 0,
            messages_received: 0,
            busy_rejections: 0,
            glitches: 0,
            protocol_violations: 0,
            bus_errors: 0,
            oversize_frames: 0,
            allocation_failures: 0,
            stalls: 0,
            resets: 0,
        }
    }

    /// Total number of recovered failures
    pub fn failures(&self) -> u32 {
        self.glitches
            .saturating_add(self.protocol_violations)
            .saturating_add(self.bus_errors)
            .saturating_add(self.oversize_frames)
            .saturating_add(self.allocation_failures)
            .saturating_add(self.stalls)
    }
}

pub(super) fn bump(counter: &mut u32) {
    *counter = counter.saturating_add(1);
}
