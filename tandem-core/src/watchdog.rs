//! Watchdog bookkeeping
//!
//! The engine does not own a timer. When it needs a timeout it arms a
//! [`Watchdog`] carrying a fresh [`WatchdogToken`]; the runtime schedules an
//! expiry for it and posts `Event::WatchdogExpired(token)` when it fires.
//! The engine only honours the token it currently has armed, so an expiry
//! that races a cancellation is dropped instead of acted on.

/// Identifies one arming of a watchdog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WatchdogToken(u32);

impl WatchdogToken {
    pub const fn new(generation: u32) -> Self {
        Self(generation)
    }
}

/// An armed timeout the runtime must schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Watchdog {
    pub token: WatchdogToken,
    pub timeout_ms: u32,
}

/// Hands out watchdog tokens and remembers the one currently armed
#[derive(Debug, Default)]
pub(crate) struct WatchdogSlot {
    next_generation: u32,
    armed: Option<Watchdog>,
}

impl WatchdogSlot {
    pub(crate) const fn new() -> Self {
        Self {
            next_generation: 0,
            armed: None,
        }
    }

    /// Arm with a new token, replacing whatever was armed before
    pub(crate) fn arm(&mut self, timeout_ms: u32) -> WatchdogToken {
        self.next_generation = self.next_generation.wrapping_add(1);
        let token = WatchdogToken(self.next_generation);
        self.armed = Some(Watchdog { token, timeout_ms });
        token
    }

    /// Disarm. Cancelling an idle slot is a no-op.
    pub(crate) fn cancel(&mut self) -> Option<WatchdogToken> {
        self.armed.take().map(|w| w.token)
    }

    /// Consume an expiry if it belongs to the armed watchdog
    pub(crate) fn expire(&mut self, token: WatchdogToken) -> bool {
        match self.armed {
            Some(w) if w.token == token => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn armed(&self) -> Option<Watchdog> {
        self.armed
    }
}

/// Runtime-side deadline tracking for the engine's watchdogs
///
/// Call [`WatchdogTimer::sync`] after every event with what the engine
/// reports as armed; it starts a deadline for new tokens and forgets
/// cancelled ones. [`WatchdogTimer::poll`] yields the token once its
/// deadline has passed.
#[derive(Debug, Default)]
pub struct WatchdogTimer {
    pending: Option<(WatchdogToken, u64)>,
}

impl WatchdogTimer {
    pub const fn new() -> Self {
        Self { pending: None }
    }

    /// Track the engine's armed watchdog as of `now_ms`
    pub fn sync(&mut self, armed: Option<Watchdog>, now_ms: u64) {
        self.pending = match (self.pending, armed) {
            // Same arming, keep the original deadline
            (Some((token, deadline)), Some(w)) if token == w.token => Some((token, deadline)),
            (_, Some(w)) => Some((w.token, now_ms.saturating_add(u64::from(w.timeout_ms)))),
            (_, None) => None,
        };
    }

    /// Absolute deadline of the pending watchdog, if any
    pub fn deadline_ms(&self) -> Option<u64> {
        self.pending.map(|(_, deadline)| deadline)
    }

    /// Return the expired token, at most once per arming
    pub fn poll(&mut self, now_ms: u64) -> Option<WatchdogToken> {
        match self.pending {
            Some((token, deadline)) if now_ms >= deadline => {
                self.pending = None;
                Some(token)
            }
            _ => None,
        }
    }
}
