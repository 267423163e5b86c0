//! Transport errors reported to the application

use tandem_protocol::FrameError;

use crate::buffer::AllocError;

/// Why an accepted operation did not complete
///
/// A send refused because the link is busy is not an error: `send` returns
/// `false` and nothing is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// The bus reported a failed transfer
    Bus,
    /// The peer produced an event the current state does not expect
    ProtocolViolation,
    /// The peer stopped responding during a payload-wait phase
    Stalled,
    /// The application reset the link
    Reset,
    /// The peer announced a payload above the configured limit
    PayloadTooLarge,
    /// No receive buffer could be allocated
    AllocationFailed,
}

/// Outcome passed to a send completion callback
pub type SendResult = Result<(), TransportError>;

impl From<AllocError> for TransportError {
    fn from(e: AllocError) -> Self {
        match e {
            AllocError::TooLarge { .. } => TransportError::PayloadTooLarge,
            AllocError::OutOfMemory => TransportError::AllocationFailed,
        }
    }
}

impl From<FrameError> for TransportError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::PayloadTooLarge => TransportError::PayloadTooLarge,
            FrameError::Incomplete | FrameError::BufferTooSmall => {
                TransportError::ProtocolViolation
            }
        }
    }
}
