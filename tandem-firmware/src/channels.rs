//! Inter-task communication channels
//!
//! The line task is the only producer of edges and the transport task the
//! only consumer; send requests flow the other way from the app task.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

use tandem_core::SendResult;
use tandem_protocol::LineEdge;

/// Edges buffered while the transport task is busy on the bus
const EDGE_CHANNEL_SIZE: usize = 8;

/// A message the app wants on the link
#[derive(Debug, Clone, Copy)]
pub struct SendRequest {
    pub port: u16,
    pub data: &'static [u8],
}

/// Signaling line edges, in the order they happened
pub static EDGE_CHANNEL: Channel<CriticalSectionRawMutex, LineEdge, EDGE_CHANNEL_SIZE> =
    Channel::new();

/// Raised by the line task when an edge could not be queued
///
/// The engine no longer knows where the line is, so the exchange in
/// progress is abandoned.
pub static LINK_RESET: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Send requests from the app
pub static SEND_REQUESTS: Channel<CriticalSectionRawMutex, SendRequest, 1> = Channel::new();

/// Whether the last send request was accepted
pub static SEND_ACCEPTED: Signal<CriticalSectionRawMutex, bool> = Signal::new();

/// Outcome of the accepted send
pub static SEND_DONE: Signal<CriticalSectionRawMutex, SendResult> = Signal::new();
