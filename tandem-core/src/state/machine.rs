//! State machine definition
//!
//! Who owns the bus and which frame is expected next are both a function
//! of the current state. The machine has no terminal state; every path
//! leads back to `Idle`.

use super::events::Event;

/// Link states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Nobody owns the bus
    #[default]
    Idle,
    /// Message delivered, waiting for the peer to release the line
    IdleWait,
    /// Bus claimed, command frame being written
    SendCommand,
    /// Command written, waiting for the peer to ask for the payload
    SendWait,
    /// Payload being written
    SendMessage,
    /// Payload written, waiting for the peer to release the line
    SendDone,
    /// Peer asserted the line from idle, waiting for it to confirm
    ReceiveWaitCommand,
    /// Command frame being read
    ReceiveCommand,
    /// Command read, waiting for the peer to offer the payload
    ReceiveWaitMessage,
    /// Payload being read
    ReceiveMessage,
}

impl State {
    /// Check if this state belongs to the send path
    pub fn is_sending(&self) -> bool {
        matches!(
            self,
            State::SendCommand | State::SendWait | State::SendMessage | State::SendDone
        )
    }

    /// Check if this state belongs to the receive path
    ///
    /// `IdleWait` counts: the peer has not yet finished the exchange.
    pub fn is_receiving(&self) -> bool {
        matches!(
            self,
            State::ReceiveWaitCommand
                | State::ReceiveCommand
                | State::ReceiveWaitMessage
                | State::ReceiveMessage
                | State::IdleWait
        )
    }

    /// Check if the engine may hold the caller's outbound buffer here
    pub fn holds_outbound(&self) -> bool {
        self.is_sending()
    }

    /// Check if the engine may hold an inbound buffer here
    pub fn holds_inbound(&self) -> bool {
        matches!(
            self,
            State::ReceiveCommand | State::ReceiveWaitMessage | State::ReceiveMessage
        )
    }

    /// Check if a bus transfer is outstanding (select asserted)
    pub fn owns_bus_transfer(&self) -> bool {
        matches!(
            self,
            State::SendCommand | State::SendMessage | State::ReceiveCommand | State::ReceiveMessage
        )
    }

    /// Check if the engine is parked until the peer moves the line
    pub fn is_waiting_for_edge(&self) -> bool {
        matches!(
            self,
            State::IdleWait
                | State::SendWait
                | State::SendDone
                | State::ReceiveWaitCommand
                | State::ReceiveWaitMessage
        )
    }

    /// Check if the payload stall guard applies here
    pub fn is_payload_wait(&self) -> bool {
        matches!(
            self,
            State::SendWait | State::SendDone | State::ReceiveWaitMessage | State::IdleWait
        )
    }

    /// Process an event and return the next state
    ///
    /// Returns `None` when the event is not expected in this state, which
    /// the engine treats as a protocol-consistency violation.
    pub fn transition(self, event: Event) -> Option<Self> {
        use Event::*;
        use State::*;

        let next = match (self, event) {
            // Idle transitions
            (Idle, SendRequested) => SendCommand,
            (Idle, LineAsserted) => ReceiveWaitCommand,
            // Late release after a glitch was already written off
            (Idle, LineReleased) => Idle,

            // Send path
            (SendCommand, TransferComplete) => SendWait,
            (SendWait, LineAsserted) => SendMessage,
            (SendMessage, TransferComplete) => SendDone,
            (SendDone, LineReleased) => Idle,

            // Receive path
            (ReceiveWaitCommand, LineReleased) => ReceiveCommand,
            (ReceiveWaitCommand, WatchdogExpired(_)) => Idle,
            (ReceiveCommand, TransferComplete) => ReceiveWaitMessage,
            (ReceiveWaitMessage, LineAsserted) => ReceiveMessage,
            (ReceiveMessage, TransferComplete) => IdleWait,
            (IdleWait, LineReleased) => Idle,

            // Bus failures abandon the exchange
            (SendCommand | SendMessage | ReceiveCommand | ReceiveMessage, TransferFailed) => Idle,

            // Stall guard on the payload-wait phases
            (state, WatchdogExpired(_)) if state.is_payload_wait() => Idle,

            _ => return None,
        };

        Some(next)
    }
}
