use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec;
use std::vec::Vec;

use embassy_futures::block_on;
use proptest::prelude::*;
use tandem_hal::{BusTransfer, InputPin, OutputPin};
use tandem_protocol::encode;

use super::*;

/// Pin whose level is shared with the test
#[derive(Clone)]
struct Pin(Rc<Cell<bool>>);

impl Pin {
    fn high() -> Self {
        Pin(Rc::new(Cell::new(true)))
    }

    fn set(&self, high: bool) {
        self.0.set(high);
    }
}

impl OutputPin for Pin {
    fn set_high(&mut self) {
        self.0.set(true);
    }

    fn set_low(&mut self) {
        self.0.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.0.get()
    }
}

impl InputPin for Pin {
    fn is_high(&self) -> bool {
        self.0.get()
    }
}

/// Bus that records writes and plays back scripted reads
struct MockBus {
    select: Pin,
    writes: Vec<Vec<u8>>,
    reads: VecDeque<Vec<u8>>,
    read_lens: Vec<usize>,
    /// Select level seen at each transfer, `true` while asserted
    select_during: Vec<bool>,
    fail_next: bool,
}

impl MockBus {
    fn new(select: &Pin) -> Self {
        Self {
            select: select.clone(),
            writes: Vec::new(),
            reads: VecDeque::new(),
            read_lens: Vec::new(),
            select_during: Vec::new(),
            fail_next: false,
        }
    }

    fn transfers(&self) -> usize {
        self.select_during.len()
    }
}

impl BusTransfer for MockBus {
    type Error = ();

    async fn write(&mut self, data: &[u8]) -> Result<(), ()> {
        self.select_during.push(!self.select.0.get());
        if core::mem::take(&mut self.fail_next) {
            return Err(());
        }
        self.writes.push(data.to_vec());
        Ok(())
    }

    async fn read(&mut self, buffer: &mut [u8]) -> Result<(), ()> {
        self.select_during.push(!self.select.0.get());
        if core::mem::take(&mut self.fail_next) {
            return Err(());
        }
        self.read_lens.push(buffer.len());
        if let Some(src) = self.reads.pop_front() {
            let n = src.len().min(buffer.len());
            buffer[..n].copy_from_slice(&src[..n]);
        }
        Ok(())
    }
}

/// Allocator that never has memory
struct Exhausted;

impl BufferAllocator for Exhausted {
    fn allocate(&mut self, _len: usize) -> Result<SharedBuffer, AllocError> {
        Err(AllocError::OutOfMemory)
    }
}

type Completions = Rc<RefCell<Vec<SendResult>>>;
type Received = Rc<RefCell<Vec<(u16, SharedBuffer)>>>;

fn recorder(completions: &Completions) -> impl FnOnce(SendResult) + 'static {
    let completions = completions.clone();
    move |result| completions.borrow_mut().push(result)
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

struct Rig {
    select: Pin,
    line: Pin,
    bus: MockBus,
}

impl Rig {
    fn new() -> Self {
        let select = Pin::high();
        let bus = MockBus::new(&select);
        Self {
            select,
            line: Pin::high(),
            bus,
        }
    }

    fn engine<'a>(&self, config: TransportConfig) -> TransportEngine<'a, Pin, Pin> {
        TransportEngine::new(self.select.clone(), self.line.clone(), config)
    }

    /// Drive the line and post the matching edge
    fn edge<S: OutputPin, L: InputPin, A: BufferAllocator>(
        &self,
        engine: &mut TransportEngine<'_, S, L, A>,
        asserted: bool,
    ) {
        self.line.set(!asserted);
        engine.handle(if asserted {
            Event::LineAsserted
        } else {
            Event::LineReleased
        });
    }
}

fn service<S: OutputPin, L: InputPin, A: BufferAllocator>(
    engine: &mut TransportEngine<'_, S, L, A>,
    bus: &mut MockBus,
) {
    block_on(engine.service(bus));
}

fn collect_received<'a, S: OutputPin, L: InputPin, A: BufferAllocator>(
    engine: &mut TransportEngine<'a, S, L, A>,
) -> Received {
    let received: Received = Rc::new(RefCell::new(Vec::new()));
    let sink = received.clone();
    engine.set_receive_handler(move |port, buffer| sink.borrow_mut().push((port, buffer)));
    received
}

#[test]
fn test_send_end_to_end() {
    let payload = pattern(100);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(1234, payload.as_slice(), recorder(&completions)));
    assert_eq!(engine.state(), State::SendCommand);
    assert!(engine.select_asserted());
    assert_eq!(engine.pending_transfer(), Some(Transfer::WriteCommand));

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.writes[0], [0x64, 0x00, 0x00, 0x00, 0xD2, 0x04]);
    assert_eq!(engine.state(), State::SendWait);
    assert!(!engine.select_asserted());

    rig.edge(&mut engine, true);
    assert_eq!(engine.state(), State::SendMessage);
    assert!(engine.select_asserted());

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.writes[1], payload);
    assert_eq!(engine.state(), State::SendDone);
    assert!(!engine.select_asserted());
    assert!(completions.borrow().is_empty());

    rig.edge(&mut engine, false);
    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.has_outbound());

    // Completion is deferred until dispatch
    assert!(completions.borrow().is_empty());
    assert_eq!(engine.dispatch(), 1);
    assert_eq!(*completions.borrow(), vec![Ok(())]);
    assert_eq!(engine.dispatch(), 0);
    assert_eq!(completions.borrow().len(), 1);

    assert_eq!(rig.bus.select_during, vec![true, true]);
    assert_eq!(engine.stats().messages_sent, 1);
}

#[test]
fn test_receive_end_to_end() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());
    let received = collect_received(&mut engine);

    rig.edge(&mut engine, true);
    assert_eq!(engine.state(), State::ReceiveWaitCommand);
    assert!(engine.pending_timeout().is_some());

    rig.edge(&mut engine, false);
    assert_eq!(engine.state(), State::ReceiveCommand);
    assert!(engine.pending_timeout().is_none());
    assert!(engine.select_asserted());

    rig.bus.reads.push_back(encode(50, 7).to_vec());
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::ReceiveWaitMessage);
    assert!(!engine.select_asserted());

    rig.edge(&mut engine, true);
    assert_eq!(engine.state(), State::ReceiveMessage);
    assert!(engine.has_inbound());

    rig.bus.reads.push_back(pattern(50));
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::IdleWait);
    assert!(!engine.select_asserted());
    assert!(!engine.has_inbound());

    {
        let received = received.borrow();
        assert_eq!(received.len(), 1);
        let (port, buffer) = &received[0];
        assert_eq!(*port, 7);
        assert_eq!(buffer.as_slice(), pattern(50).as_slice());
        // The handler holds the only reference
        assert_eq!(buffer.ref_count(), 1);
    }

    rig.edge(&mut engine, false);
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(rig.bus.read_lens, vec![COMMAND_FRAME_SIZE, 50]);
    assert_eq!(rig.bus.select_during, vec![true, true]);
    assert_eq!(engine.stats().messages_received, 1);
}

#[test]
fn test_send_rejected_while_sending() {
    let first = pattern(100);
    let second = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(1, first.as_slice(), recorder(&completions)));
    assert!(!engine.send(2, second.as_slice(), recorder(&completions)));
    assert_eq!(engine.state(), State::SendCommand);
    assert_eq!(engine.stats().busy_rejections, 1);

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.writes[0], encode(100, 1));
    rig.edge(&mut engine, true);
    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.writes[1], first);
    rig.edge(&mut engine, false);
    engine.dispatch();

    assert_eq!(*completions.borrow(), vec![Ok(())]);
}

#[test]
fn test_send_rejected_while_receiving() {
    let payload = pattern(4);
    let completions: Completions = Rc::default();
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    rig.edge(&mut engine, true);
    assert!(!engine.send(1, payload.as_slice(), recorder(&completions)));
    assert_eq!(engine.state(), State::ReceiveWaitCommand);
    assert!(!engine.select_asserted());
    assert!(!engine.has_outbound());

    engine.dispatch();
    assert!(completions.borrow().is_empty());
}

#[test]
fn test_send_rejected_when_peer_holds_line() {
    let payload = pattern(4);
    let completions: Completions = Rc::default();
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    // Peer asserted but the edge has not been processed yet
    rig.line.set(false);
    assert!(!engine.send(1, payload.as_slice(), recorder(&completions)));
    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.select_asserted());
    assert_eq!(engine.pending_transfer(), None);
}

#[test]
fn test_peer_assertion_ahead_of_its_edge() {
    let payload = pattern(4);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    // The pad is already low; the edge is still on its way
    rig.line.set(false);
    assert!(!engine.send(5, payload.as_slice(), recorder(&completions)));
    assert_eq!(engine.stats().busy_rejections, 1);
    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.transfers(), 0);

    // Once it arrives it starts a receive, not a payload write
    engine.handle(Event::LineAsserted);
    assert_eq!(engine.state(), State::ReceiveWaitCommand);
    assert!(!engine.has_outbound());
    assert!(engine.pending_timeout().is_some());

    engine.dispatch();
    assert!(completions.borrow().is_empty());
}

#[test]
fn test_send_claim_follows_transition_table() {
    let payload = pattern(4);
    let completions: Completions = Rc::default();
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    let expected = State::Idle.transition(Event::SendRequested);
    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    assert_eq!(Some(engine.state()), expected);
    assert!(engine.select_asserted());
    assert_eq!(engine.pending_transfer(), Some(Transfer::WriteCommand));
}

#[test]
fn test_glitch_recovery() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());
    let received = collect_received(&mut engine);

    rig.edge(&mut engine, true);
    let token = engine.pending_timeout().unwrap();
    assert_eq!(engine.watchdog().map(|w| w.timeout_ms), Some(1000));

    engine.handle(Event::WatchdogExpired(token));
    assert_eq!(engine.state(), State::Idle);
    assert!(engine.pending_timeout().is_none());
    assert_eq!(engine.stats().glitches, 1);

    // The late release is absorbed in Idle
    rig.edge(&mut engine, false);
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.stats().protocol_violations, 0);

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.transfers(), 0);
    assert!(received.borrow().is_empty());
}

#[test]
fn test_stale_watchdog_ignored() {
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    rig.edge(&mut engine, true);
    let token = engine.pending_timeout().unwrap();
    rig.edge(&mut engine, false);
    assert_eq!(engine.state(), State::ReceiveCommand);

    engine.handle(Event::WatchdogExpired(token));
    engine.handle(Event::WatchdogExpired(token));
    assert_eq!(engine.state(), State::ReceiveCommand);
    assert_eq!(engine.stats().glitches, 0);
    assert_eq!(engine.stats().protocol_violations, 0);
}

#[test]
fn test_watchdog_rearmed_per_assertion() {
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    rig.edge(&mut engine, true);
    let first = engine.pending_timeout().unwrap();
    engine.handle(Event::WatchdogExpired(first));

    rig.edge(&mut engine, true);
    let second = engine.pending_timeout().unwrap();
    assert_ne!(first, second);

    // The first expiry cannot end the second wait
    engine.handle(Event::WatchdogExpired(first));
    assert_eq!(engine.state(), State::ReceiveWaitCommand);
}

fn receive_one<'a, S: OutputPin, L: InputPin, A: BufferAllocator>(
    rig: &mut Rig,
    engine: &mut TransportEngine<'a, S, L, A>,
    port: u16,
    payload: Vec<u8>,
) {
    rig.edge(engine, true);
    rig.edge(engine, false);
    rig.bus.reads.push_back(encode(payload.len() as u32, port).to_vec());
    service(engine, &mut rig.bus);
    rig.edge(engine, true);
    rig.bus.reads.push_back(payload);
    service(engine, &mut rig.bus);
    rig.edge(engine, false);
}

#[test]
fn test_each_receive_gets_fresh_buffer() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());
    let received = collect_received(&mut engine);

    receive_one(&mut rig, &mut engine, 1, vec![0xAA; 8]);
    receive_one(&mut rig, &mut engine, 2, vec![0xBB; 8]);

    let received = received.borrow();
    assert_eq!(received.len(), 2);
    assert!(!SharedBuffer::ptr_eq(&received[0].1, &received[1].1));
    assert!(received[0].1.iter().all(|&b| b == 0xAA));
    assert!(received[1].1.iter().all(|&b| b == 0xBB));
}

#[test]
fn test_zero_length_receive() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());
    let received = collect_received(&mut engine);

    receive_one(&mut rig, &mut engine, 3, Vec::new());

    assert_eq!(engine.state(), State::Idle);
    let received = received.borrow();
    assert_eq!(received.len(), 1);
    assert!(received[0].1.is_empty());
}

#[test]
fn test_oversize_frame_resets() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default().with_max_message_len(16));
    let received = collect_received(&mut engine);

    rig.edge(&mut engine, true);
    rig.edge(&mut engine, false);
    rig.bus.reads.push_back(encode(17, 9).to_vec());
    service(&mut engine, &mut rig.bus);

    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.select_asserted());
    assert_eq!(engine.stats().oversize_frames, 1);

    // Whatever the peer does next starts a new exchange
    rig.edge(&mut engine, true);
    assert_eq!(engine.state(), State::ReceiveWaitCommand);
    assert!(received.borrow().is_empty());
}

#[test]
fn test_allocation_failure_resets() {
    let mut rig = Rig::new();
    let mut engine: TransportEngine<'_, Pin, Pin, Exhausted> = TransportEngine::with_allocator(
        rig.select.clone(),
        rig.line.clone(),
        Exhausted,
        TransportConfig::default(),
    );

    rig.edge(&mut engine, true);
    rig.edge(&mut engine, false);
    rig.bus.reads.push_back(encode(8, 1).to_vec());
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::ReceiveWaitMessage);

    rig.edge(&mut engine, true);
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.pending_transfer(), None);
    assert!(!engine.select_asserted());
    assert_eq!(engine.stats().allocation_failures, 1);

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.read_lens, vec![COMMAND_FRAME_SIZE]);
}

#[test]
fn test_bus_error_fails_send() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    rig.bus.fail_next = true;
    service(&mut engine, &mut rig.bus);

    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.select_asserted());
    assert!(!engine.has_outbound());
    assert_eq!(*completions.borrow(), vec![Err(TransportError::Bus)]);
    assert_eq!(engine.stats().bus_errors, 1);
}

#[test]
fn test_bus_error_drops_inbound() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());
    let received = collect_received(&mut engine);

    rig.edge(&mut engine, true);
    rig.edge(&mut engine, false);
    rig.bus.reads.push_back(encode(8, 1).to_vec());
    service(&mut engine, &mut rig.bus);
    rig.edge(&mut engine, true);

    rig.bus.fail_next = true;
    service(&mut engine, &mut rig.bus);

    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.has_inbound());
    assert!(received.borrow().is_empty());
}

#[test]
fn test_violation_during_send() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::SendWait);

    // Release without a preceding assert
    engine.handle(Event::LineReleased);
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.stats().protocol_violations, 1);

    engine.dispatch();
    assert_eq!(
        *completions.borrow(),
        vec![Err(TransportError::ProtocolViolation)]
    );
}

#[test]
fn test_violation_during_receive() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    rig.edge(&mut engine, true);
    // A second assertion while waiting for the release
    engine.handle(Event::LineAsserted);
    assert_eq!(engine.state(), State::Idle);
    assert!(engine.pending_timeout().is_none());
    assert_eq!(engine.stats().protocol_violations, 1);

    service(&mut engine, &mut rig.bus);
    assert_eq!(rig.bus.transfers(), 0);
}

#[test]
fn test_send_requested_event_is_ignored() {
    let rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    engine.handle(Event::SendRequested);
    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.select_asserted());
    assert!(!engine.has_outbound());
    assert_eq!(engine.pending_transfer(), None);
    assert_eq!(engine.stats(), &LinkStats::new());
}

#[test]
fn test_reset_fails_pending_send() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    service(&mut engine, &mut rig.bus);
    engine.reset();

    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.stats().resets, 1);
    engine.dispatch();
    assert_eq!(*completions.borrow(), vec![Err(TransportError::Reset)]);

    // The link is usable again
    assert!(engine.send(6, payload.as_slice(), recorder(&completions)));
}

#[test]
fn test_reset_unwedges_send_done() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    service(&mut engine, &mut rig.bus);
    rig.edge(&mut engine, true);
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::SendDone);

    // The release edge was lost; without a stall guard nothing else fires
    rig.line.set(true);
    assert!(engine.watchdog().is_none());
    engine.reset();

    assert_eq!(engine.state(), State::Idle);
    assert!(!engine.select_asserted());
    assert!(!engine.has_outbound());
    engine.dispatch();
    assert_eq!(*completions.borrow(), vec![Err(TransportError::Reset)]);
    assert_eq!(engine.stats().messages_sent, 0);

    assert!(engine.send(6, payload.as_slice(), recorder(&completions)));
}

#[test]
fn test_stall_guard_on_send() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let config = TransportConfig::default().with_payload_timeout_ms(Some(500));
    let mut engine = rig.engine(config);

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::SendWait);

    let watchdog = engine.watchdog().unwrap();
    assert_eq!(watchdog.timeout_ms, 500);
    assert!(engine.pending_timeout().is_none());

    engine.handle(Event::WatchdogExpired(watchdog.token));
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.stats().stalls, 1);
    engine.dispatch();
    assert_eq!(*completions.borrow(), vec![Err(TransportError::Stalled)]);
}

#[test]
fn test_no_stall_guard_by_default() {
    let payload = pattern(10);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    assert!(engine.send(5, payload.as_slice(), recorder(&completions)));
    service(&mut engine, &mut rig.bus);
    assert_eq!(engine.state(), State::SendWait);
    assert!(engine.watchdog().is_none());
}

#[test]
fn test_stall_guard_cancelled_by_progress() {
    let mut rig = Rig::new();
    let config = TransportConfig::default().with_payload_timeout_ms(Some(500));
    let mut engine = rig.engine(config);
    let received = collect_received(&mut engine);

    receive_one(&mut rig, &mut engine, 4, vec![1, 2, 3]);
    assert_eq!(engine.state(), State::Idle);
    assert!(engine.watchdog().is_none());
    assert_eq!(received.borrow().len(), 1);
}

#[test]
fn test_receive_without_handler() {
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    receive_one(&mut rig, &mut engine, 1, vec![1, 2, 3]);
    assert_eq!(engine.state(), State::Idle);
    assert_eq!(engine.stats().messages_received, 1);
}

#[test]
fn test_send_chained_from_completion() {
    let payload = pattern(16);
    let completions: Completions = Rc::default();
    let mut rig = Rig::new();
    let mut engine = rig.engine(TransportConfig::default());

    for round in 0..3u16 {
        assert!(engine.send(round, payload.as_slice(), recorder(&completions)));
        service(&mut engine, &mut rig.bus);
        rig.edge(&mut engine, true);
        service(&mut engine, &mut rig.bus);
        rig.edge(&mut engine, false);
        engine.dispatch();
    }

    assert_eq!(completions.borrow().len(), 3);
    assert_eq!(engine.stats().messages_sent, 3);
    assert_eq!(rig.bus.writes.len(), 6);
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Send,
    Assert,
    Release,
    Expire,
    Service { fail: bool },
    Reset,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Send),
        Just(Step::Assert),
        Just(Step::Release),
        Just(Step::Expire),
        any::<bool>().prop_map(|fail| Step::Service { fail }),
        Just(Step::Reset),
    ]
}

proptest! {
    #[test]
    fn prop_invariants_hold(steps in proptest::collection::vec(step_strategy(), 0..64)) {
        let payload = pattern(8);
        let completions: Completions = Rc::default();
        let mut rig = Rig::new();
        let config = TransportConfig::default()
            .with_max_message_len(32)
            .with_payload_timeout_ms(Some(100));
        let mut engine = rig.engine(config);
        let _received = collect_received(&mut engine);
        let mut accepted = 0usize;

        for step in steps {
            match step {
                Step::Send => {
                    if engine.send(1, payload.as_slice(), recorder(&completions)) {
                        accepted += 1;
                    }
                }
                Step::Assert => rig.edge(&mut engine, true),
                Step::Release => rig.edge(&mut engine, false),
                Step::Expire => {
                    if let Some(w) = engine.watchdog() {
                        engine.handle(Event::WatchdogExpired(w.token));
                    }
                }
                Step::Service { fail } => {
                    rig.bus.fail_next = fail;
                    rig.bus.reads.push_back(encode(4, 2).to_vec());
                    service(&mut engine, &mut rig.bus);
                }
                Step::Reset => engine.reset(),
            }

            let state = engine.state();
            prop_assert!(!(state.is_sending() && state.is_receiving()));
            prop_assert_eq!(engine.pending_timeout().is_some(), state == State::ReceiveWaitCommand);
            prop_assert!(!engine.has_outbound() || state.holds_outbound());
            prop_assert!(!engine.has_inbound() || state.holds_inbound());
            prop_assert_eq!(engine.select_asserted(), engine.pending_transfer().is_some());
            prop_assert!(rig.bus.select_during.iter().all(|&asserted| asserted));
        }

        engine.reset();
        engine.dispatch();
        prop_assert_eq!(completions.borrow().len(), accepted);
    }
}
