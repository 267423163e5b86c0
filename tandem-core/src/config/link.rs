//! Link configuration type definitions

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default upper bound for a peer-declared payload length
pub const DEFAULT_MAX_MESSAGE_LEN: u32 = 4096;

/// Default command-wait watchdog (ms)
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u32 = 1000;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Watchdog timeout of zero would expire before any edge can arrive
    ZeroWatchdog,
    /// Payload stall guard configured with a zero timeout
    ZeroPayloadTimeout,
    /// Maximum message length of zero leaves nothing to receive
    ZeroMaxMessageLen,
}

/// Transport engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransportConfig {
    /// Largest payload the engine will allocate for on receive
    pub max_message_len: u32,
    /// How long to wait for the release edge after the peer asserts the
    /// line from idle before treating the assertion as a glitch (ms)
    pub watchdog_timeout_ms: u32,
    /// Optional guard for the payload-wait phases (ms). `None` waits for the
    /// peer indefinitely.
    pub payload_timeout_ms: Option<u32>,
}

impl TransportConfig {
    pub const fn new() -> Self {
        Self {
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            watchdog_timeout_ms: DEFAULT_WATCHDOG_TIMEOUT_MS,
            payload_timeout_ms: None,
        }
    }

    pub const fn with_max_message_len(mut self, max_message_len: u32) -> Self {
        self.max_message_len = max_message_len;
        self
    }

    pub const fn with_watchdog_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.watchdog_timeout_ms = timeout_ms;
        self
    }

    pub const fn with_payload_timeout_ms(mut self, timeout_ms: Option<u32>) -> Self {
        self.payload_timeout_ms = timeout_ms;
        self
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchdog_timeout_ms == 0 {
            return Err(ConfigError::ZeroWatchdog);
        }
        if self.payload_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroPayloadTimeout);
        }
        if self.max_message_len == 0 {
            return Err(ConfigError::ZeroMaxMessageLen);
        }
        Ok(())
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::new()
    }
}
