//! Application-facing transport capability
//!
//! Code that only sends and receives messages depends on [`Transport`]
//! rather than on the engine's pin and allocator types.

use crate::buffer::{BorrowedBuffer, BufferAllocator, SharedBuffer};
use crate::engine::TransportEngine;
use crate::error::SendResult;
use tandem_hal::{InputPin, OutputPin};

/// Message transport over the link
pub trait Transport<'a> {
    /// Start sending `buffer` to `port`
    ///
    /// Returns `false` if the link is busy. An accepted send reports its
    /// outcome through `on_complete` exactly once.
    fn send(
        &mut self,
        port: u16,
        buffer: BorrowedBuffer<'a>,
        on_complete: impl FnOnce(SendResult) + 'a,
    ) -> bool;

    /// Install the handler for received messages
    fn set_receive_handler(&mut self, handler: impl FnMut(u16, SharedBuffer) + 'a);

    /// Check if a send would currently be accepted by state alone
    fn is_idle(&self) -> bool;
}

impl<'a, S: OutputPin, L: InputPin, A: BufferAllocator> Transport<'a> for TransportEngine<'a, S, L, A> {
    fn send(
        &mut self,
        port: u16,
        buffer: BorrowedBuffer<'a>,
        on_complete: impl FnOnce(SendResult) + 'a,
    ) -> bool {
        TransportEngine::send(self, port, buffer, on_complete)
    }

    fn set_receive_handler(&mut self, handler: impl FnMut(u16, SharedBuffer) + 'a) {
        TransportEngine::set_receive_handler(self, handler)
    }

    fn is_idle(&self) -> bool {
        TransportEngine::is_idle(self)
    }
}
