//! Transport engine
//!
//! [`TransportEngine`] owns the link state and everything the state says it
//! may hold: the chip-select line, the outbound buffer of an accepted send,
//! the inbound buffer of a receive in progress, and at most one armed
//! watchdog. It never blocks and never waits on a timer:
//!
//! - [`TransportEngine::handle`] applies one event and queues whatever the
//!   new state needs (a bus transfer, a deferred callback)
//! - [`TransportEngine::service`] runs the queued bus transfer, feeds its
//!   outcome back through `handle`, then runs deferred callbacks
//! - the runtime schedules [`TransportEngine::watchdog`] and posts
//!   `Event::WatchdogExpired` when it fires
//!
//! ```text
//!  send() ──► SendCommand ─tx─► SendWait ─assert─► SendMessage ─tx─► SendDone ─release─► Idle
//!  assert ──► ReceiveWaitCommand ─release─► ReceiveCommand ─rx─► ReceiveWaitMessage
//!                 │ watchdog                 ─assert─► ReceiveMessage ─rx─► IdleWait ─release─► Idle
//!                 └──► Idle
//! ```

use alloc::boxed::Box;
use alloc::collections::VecDeque;

use tandem_hal::{ActiveLow, BusTransfer, InputPin, OutputPin};
use tandem_protocol::{CommandFrame, LineLevel, COMMAND_FRAME_SIZE};

use crate::buffer::{AllocError, BorrowedBuffer, BufferAllocator, HeapAllocator, SharedBuffer};
use crate::config::TransportConfig;
use crate::error::{SendResult, TransportError};
use crate::state::{Event, State};
use crate::watchdog::{Watchdog, WatchdogSlot, WatchdogToken};

mod stats;
#[cfg(test)]
mod tests;

pub use stats::LinkStats;
use stats::bump;

/// Completion callback for an accepted send
pub type SendCallback<'a> = Box<dyn FnOnce(SendResult) + 'a>;

/// Receive handler, called with the port and the received payload
pub type ReceiveHandler<'a> = Box<dyn FnMut(u16, SharedBuffer) + 'a>;

/// Bus transfer queued by a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Transfer {
    WriteCommand,
    ReadCommand,
    WritePayload,
    ReadPayload,
}

/// Which timeout the watchdog slot is currently guarding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Guard {
    CommandWait,
    PayloadStall,
}

struct Outbound<'a> {
    buffer: BorrowedBuffer<'a>,
    on_complete: SendCallback<'a>,
}

enum Deferred<'a> {
    SendComplete(SendCallback<'a>, SendResult),
    Deliver(u16, SharedBuffer),
}

/// Master-side link engine
pub struct TransportEngine<'a, S, L, A = HeapAllocator> {
    state: State,
    select: ActiveLow<S>,
    line: L,
    allocator: A,
    config: TransportConfig,
    command: [u8; COMMAND_FRAME_SIZE],
    inbound_frame: Option<CommandFrame>,
    inbound: Option<SharedBuffer>,
    outbound: Option<Outbound<'a>>,
    watchdog: WatchdogSlot,
    guard: Guard,
    transfer: Option<Transfer>,
    deferred: VecDeque<Deferred<'a>>,
    receive_handler: Option<ReceiveHandler<'a>>,
    stats: LinkStats,
}

impl<'a, S: OutputPin, L: InputPin> TransportEngine<'a, S, L, HeapAllocator> {
    /// Create an engine allocating receive buffers from the global heap
    pub fn new(select: S, line: L, config: TransportConfig) -> Self {
        let allocator = HeapAllocator::new(config.max_message_len as usize);
        Self::with_allocator(select, line, allocator, config)
    }
}

impl<'a, S: OutputPin, L: InputPin, A: BufferAllocator> TransportEngine<'a, S, L, A> {
    /// Create an engine with a custom receive buffer allocator
    ///
    /// Drives chip select to its released level.
    pub fn with_allocator(select: S, line: L, allocator: A, config: TransportConfig) -> Self {
        Self {
            state: State::Idle,
            select: ActiveLow::new(select),
            line,
            allocator,
            config,
            command: [0; COMMAND_FRAME_SIZE],
            inbound_frame: None,
            inbound: None,
            outbound: None,
            watchdog: WatchdogSlot::new(),
            guard: Guard::CommandWait,
            transfer: None,
            deferred: VecDeque::new(),
            receive_handler: None,
            stats: LinkStats::new(),
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == State::Idle
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn stats(&self) -> &LinkStats {
        &self.stats
    }

    /// Watchdog the runtime should currently have scheduled
    pub fn watchdog(&self) -> Option<Watchdog> {
        self.watchdog.armed()
    }

    /// Token of the armed command-wait watchdog
    ///
    /// Set exactly while the engine is in `ReceiveWaitCommand`.
    pub fn pending_timeout(&self) -> Option<WatchdogToken> {
        match self.guard {
            Guard::CommandWait => self.watchdog.armed().map(|w| w.token),
            Guard::PayloadStall => None,
        }
    }

    /// Bus transfer waiting for [`TransportEngine::service`]
    pub fn pending_transfer(&self) -> Option<Transfer> {
        self.transfer
    }

    pub fn has_outbound(&self) -> bool {
        self.outbound.is_some()
    }

    pub fn has_inbound(&self) -> bool {
        self.inbound.is_some()
    }

    pub fn select_asserted(&self) -> bool {
        self.select.is_asserted()
    }

    /// Level of the signaling line as the engine samples it
    pub fn line_level(&self) -> LineLevel {
        LineLevel::from_high(self.line.is_high())
    }

    /// Install the handler that receives every delivered payload
    ///
    /// The handler is given its own reference to the buffer; the engine
    /// keeps none.
    pub fn set_receive_handler(&mut self, handler: impl FnMut(u16, SharedBuffer) + 'a) {
        self.receive_handler = Some(Box::new(handler));
    }

    /// Start sending `buffer` to `port`
    ///
    /// Returns `false` without side effects when the link is not idle or
    /// the peer is holding the line. Once accepted, `on_complete` runs
    /// exactly once, from a later [`TransportEngine::dispatch`].
    pub fn send(
        &mut self,
        port: u16,
        buffer: impl Into<BorrowedBuffer<'a>>,
        on_complete: impl FnOnce(SendResult) + 'a,
    ) -> bool {
        let buffer = buffer.into();
        let Ok(length) = u32::try_from(buffer.len()) else {
            warn!("send of {} bytes does not fit a command frame", buffer.len());
            return false;
        };

        // No peer edge may slip between sampling the line and asserting
        // chip select.
        let claimed = critical_section::with(|_| {
            if self.line_level().is_asserted() {
                return false;
            }
            let Some(next) = self.state.transition(Event::SendRequested) else {
                return false;
            };
            self.select.assert();
            self.state = next;
            true
        });

        if !claimed {
            bump(&mut self.stats.busy_rejections);
            debug!("send rejected in {:?}", self.state);
            return false;
        }

        debug!("send {} bytes to port {}", length, port);
        self.command = CommandFrame::new(length, port).encode();
        self.outbound = Some(Outbound {
            buffer,
            on_complete: Box::new(on_complete),
        });
        self.transfer = Some(Transfer::WriteCommand);
        true
    }

    /// Apply one event
    pub fn handle(&mut self, event: Event) {
        match event {
            Event::SendRequested => {
                warn!("SendRequested carries no message, use send()");
                return;
            }
            Event::WatchdogExpired(token) => {
                if !self.watchdog.expire(token) {
                    trace!("stale watchdog {:?} ignored", token);
                    return;
                }
            }
            _ => {}
        }

        let prev = self.state;
        let Some(next) = prev.transition(event) else {
            self.violation(event);
            return;
        };

        trace!("{:?} --{:?}--> {:?}", prev, event, next);
        self.state = next;
        self.enter(prev, event, next);
    }

    fn enter(&mut self, prev: State, event: Event, next: State) {
        match (prev, next) {
            (State::Idle, State::ReceiveWaitCommand) => {
                self.watchdog.arm(self.config.watchdog_timeout_ms);
                self.guard = Guard::CommandWait;
            }
            (State::ReceiveWaitCommand, State::ReceiveCommand) => {
                self.watchdog.cancel();
                self.command = [0; COMMAND_FRAME_SIZE];
                self.select.assert();
                self.transfer = Some(Transfer::ReadCommand);
            }
            (State::ReceiveWaitCommand, State::Idle) => {
                bump(&mut self.stats.glitches);
                info!("line assertion not confirmed, treating as glitch");
            }

            (State::SendCommand, State::SendWait) => {
                self.select.release();
                self.arm_stall_guard();
            }
            (State::SendWait, State::SendMessage) => {
                self.watchdog.cancel();
                self.select.assert();
                self.transfer = Some(Transfer::WritePayload);
            }
            (State::SendMessage, State::SendDone) => {
                self.select.release();
                self.arm_stall_guard();
            }
            (State::SendDone, State::Idle) if event == Event::LineReleased => {
                self.watchdog.cancel();
                bump(&mut self.stats.messages_sent);
                self.finish_send(Ok(()));
            }

            (State::ReceiveCommand, State::ReceiveWaitMessage) => {
                self.select.release();
                self.accept_command();
            }
            (State::ReceiveWaitMessage, State::ReceiveMessage) => {
                self.watchdog.cancel();
                self.begin_payload_read();
            }
            (State::ReceiveMessage, State::IdleWait) => {
                self.select.release();
                self.deliver();
                self.arm_stall_guard();
            }
            (State::IdleWait, State::Idle) if event == Event::LineReleased => {
                self.watchdog.cancel();
            }

            (_, State::Idle) => match event {
                Event::TransferFailed => self.abort(TransportError::Bus),
                Event::WatchdogExpired(_) => {
                    bump(&mut self.stats.stalls);
                    warn!("peer stalled in {:?}", prev);
                    self.abort(TransportError::Stalled);
                }
                _ => {}
            },

            _ => {}
        }
    }

    fn arm_stall_guard(&mut self) {
        if !self.state.is_payload_wait() {
            return;
        }
        if let Some(timeout_ms) = self.config.payload_timeout_ms {
            self.watchdog.arm(timeout_ms);
            self.guard = Guard::PayloadStall;
        }
    }

    fn accept_command(&mut self) {
        let frame = CommandFrame::decode(&self.command);
        match frame.check_length(self.config.max_message_len) {
            Ok(_) => {
                debug!("peer announces {} bytes for port {}", frame.length, frame.port);
                self.inbound_frame = Some(frame);
                self.arm_stall_guard();
            }
            Err(e) => {
                bump(&mut self.stats.oversize_frames);
                warn!(
                    "peer announces {} bytes, limit is {}",
                    frame.length,
                    self.config.max_message_len
                );
                self.abort(e.into());
            }
        }
    }

    fn begin_payload_read(&mut self) {
        let Some(frame) = self.inbound_frame else {
            error!("payload offered without a command frame");
            bump(&mut self.stats.protocol_violations);
            self.abort(TransportError::ProtocolViolation);
            return;
        };

        match self.allocator.allocate(frame.length as usize) {
            Ok(buffer) => {
                self.inbound = Some(buffer);
                self.select.assert();
                self.transfer = Some(Transfer::ReadPayload);
            }
            Err(e) => {
                match e {
                    AllocError::TooLarge { .. } => bump(&mut self.stats.oversize_frames),
                    AllocError::OutOfMemory => bump(&mut self.stats.allocation_failures),
                }
                warn!("no receive buffer for {} bytes: {:?}", frame.length, e);
                self.abort(e.into());
            }
        }
    }

    fn deliver(&mut self) {
        let frame = self.inbound_frame.take();
        let buffer = self.inbound.take();
        if let (Some(frame), Some(buffer)) = (frame, buffer) {
            bump(&mut self.stats.messages_received);
            self.defer(Deferred::Deliver(frame.port, buffer));
        }
    }

    fn finish_send(&mut self, result: SendResult) {
        if let Some(outbound) = self.outbound.take() {
            self.defer(Deferred::SendComplete(outbound.on_complete, result));
        }
    }

    fn defer(&mut self, job: Deferred<'a>) {
        self.deferred.push_back(job);
    }

    fn violation(&mut self, event: Event) {
        bump(&mut self.stats.protocol_violations);
        warn!("unexpected {:?} in {:?}, resetting link", event, self.state);
        self.abort(TransportError::ProtocolViolation);
    }

    /// Return to `Idle`, releasing everything the current state held
    fn abort(&mut self, error: TransportError) {
        self.select.release();
        self.watchdog.cancel();
        self.transfer = None;
        self.inbound = None;
        self.inbound_frame = None;
        self.finish_send(Err(error));
        self.state = State::Idle;
    }

    /// Abandon whatever exchange is in progress
    ///
    /// A pending send completes with `Err(TransportError::Reset)`.
    pub fn reset(&mut self) {
        bump(&mut self.stats.resets);
        info!("link reset from {:?}", self.state);
        self.abort(TransportError::Reset);
    }

    /// Run queued bus transfers, then deferred callbacks
    ///
    /// Chip select stays asserted for the duration of each transfer.
    pub async fn service<B: BusTransfer>(&mut self, bus: &mut B) {
        while let Some(transfer) = self.transfer.take() {
            let ok = match transfer {
                Transfer::WriteCommand => bus.write(&self.command).await.is_ok(),
                Transfer::ReadCommand => bus.read(&mut self.command).await.is_ok(),
                Transfer::WritePayload => match self.outbound.as_ref() {
                    Some(outbound) => bus.write(outbound.buffer.as_slice()).await.is_ok(),
                    None => false,
                },
                Transfer::ReadPayload => match self.inbound.as_mut().and_then(|b| b.get_mut()) {
                    Some(buffer) => bus.read(buffer).await.is_ok(),
                    None => false,
                },
            };

            let event = if ok {
                Event::TransferComplete
            } else {
                bump(&mut self.stats.bus_errors);
                warn!("{:?} failed", transfer);
                Event::TransferFailed
            };
            self.handle(event);
        }

        self.dispatch();
    }

    /// Run deferred callbacks, returning how many ran
    pub fn dispatch(&mut self) -> usize {
        let mut ran = 0;
        while self.dispatch_one() {
            ran += 1;
        }
        ran
    }

    fn dispatch_one(&mut self) -> bool {
        let Some(job) = self.deferred.pop_front() else {
            return false;
        };

        match job {
            Deferred::SendComplete(on_complete, result) => on_complete(result),
            Deferred::Deliver(port, buffer) => match self.receive_handler.as_mut() {
                Some(handler) => handler(port, buffer),
                None => warn!("no receive handler, dropping {} bytes for port {}", buffer.len(), port),
            },
        }
        true
    }
}
