/// Test doubles simulating the bus adapter, the timer and the sensor during integration tests.
///
/// Time is virtual: the timer advances a shared clock instead of sleeping, and
/// the bus only delivers scheduled frames once the clock reaches them.
use embassy_time::{Duration, Instant};
use korri_echo::infra::codec::distance::{decode_distance, encode_distance};
use korri_echo::protocol::harness::CancelFlag;
use korri_echo::protocol::transport::{
    can_frame::CanFrame,
    traits::{
        harness_timer::HarnessTimer, measurement_source::MeasurementSource, transport::Transport,
    },
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

pub const TARGET_ID: u32 = 0x3FE;

//==================================================================================CLOCK
#[derive(Clone, Default)]
#[allow(dead_code)]
/// Shared virtual clock, in microseconds.
pub struct VirtualClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl VirtualClock {
    pub fn now_us(&self) -> u64 {
        self.0.get()
    }

    pub fn now_ms(&self) -> u64 {
        self.0.get() / 1_000
    }

    pub fn advance(&self, duration: Duration) {
        self.0.set(self.0.get().saturating_add(duration.as_micros()));
    }
}

/// Timer whose delays complete immediately after moving the virtual clock.
pub struct SimTimer {
    clock: VirtualClock,
}

#[allow(dead_code)]
impl SimTimer {
    pub fn new(clock: VirtualClock) -> Self {
        Self { clock }
    }
}

impl HarnessTimer for SimTimer {
    fn now(&self) -> Instant {
        Instant::from_micros(self.clock.now_us())
    }

    async fn delay(&mut self, duration: Duration) {
        self.clock.advance(duration);
    }
}

//==================================================================================BUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(dead_code)]
pub enum SimBusError {
    /// Adapter refused to start a channel.
    Refused,
    /// Channel used before `start` or after `stop`.
    ChannelNotStarted,
    /// Link lost while sending.
    LinkDown,
    /// Receive request failed.
    ReadFailed,
}

#[derive(Debug, Default)]
/// Every call the harness made on the adapter.
pub struct BusLog {
    pub started: Vec<u8>,
    pub stopped: Vec<u8>,
    pub closed: u32,
    pub sent: Vec<(u8, CanFrame)>,
    pub receive_polls: u32,
}

/// Replies produced for a sent frame: (delay in ms, frame).
pub type Responder = Box<dyn FnMut(&CanFrame) -> Vec<(u64, CanFrame)>>;

/// In-memory adapter: frames become receivable once the clock reaches their time.
pub struct SimBus {
    clock: VirtualClock,
    log: Rc<RefCell<BusLog>>,
    pending: Vec<(u64, CanFrame)>,
    responder: Responder,
    fail_start: Option<u8>,
    fail_send_at: Option<usize>,
    fail_receive: bool,
}

#[allow(dead_code)]
impl SimBus {
    /// Silent bus: nothing ever answers.
    pub fn new(clock: VirtualClock) -> Self {
        Self {
            clock,
            log: Rc::new(RefCell::new(BusLog::default())),
            pending: Vec::new(),
            responder: Box::new(|_| Vec::new()),
            fail_start: None,
            fail_send_at: None,
            fail_receive: false,
        }
    }

    /// Bus looping every sent frame back after `delay_ms`.
    pub fn echoing(clock: VirtualClock, delay_ms: u64) -> Self {
        Self::new(clock).with_responder(move |frame| vec![(delay_ms, *frame)])
    }

    pub fn with_responder(
        mut self,
        responder: impl FnMut(&CanFrame) -> Vec<(u64, CanFrame)> + 'static,
    ) -> Self {
        self.responder = Box::new(responder);
        self
    }

    pub fn fail_start(mut self, channel: u8) -> Self {
        self.fail_start = Some(channel);
        self
    }

    /// Make the `index`-th send (0-based) fail.
    pub fn fail_send_at(mut self, index: usize) -> Self {
        self.fail_send_at = Some(index);
        self
    }

    pub fn fail_receive(mut self) -> Self {
        self.fail_receive = true;
        self
    }

    /// Schedule an incoming frame at an absolute time.
    pub fn queue(&mut self, at_ms: u64, frame: CanFrame) {
        self.schedule(at_ms * 1_000, frame);
    }

    pub fn log(&self) -> Rc<RefCell<BusLog>> {
        self.log.clone()
    }

    fn schedule(&mut self, at_us: u64, frame: CanFrame) {
        let position = self.pending.partition_point(|(t, _)| *t <= at_us);
        self.pending.insert(position, (at_us, frame));
    }

    fn is_running(&self, channel: u8) -> bool {
        let log = self.log.borrow();
        log.started.contains(&channel) && !log.stopped.contains(&channel)
    }
}

impl Transport for SimBus {
    type Error = SimBusError;

    fn start(&mut self, channel: u8) -> Result<(), Self::Error> {
        if self.fail_start == Some(channel) {
            return Err(SimBusError::Refused);
        }
        self.log.borrow_mut().started.push(channel);
        Ok(())
    }

    fn stop(&mut self, channel: u8) -> Result<(), Self::Error> {
        self.log.borrow_mut().stopped.push(channel);
        Ok(())
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed += 1;
    }

    async fn send<'a>(&'a mut self, channel: u8, frame: &'a CanFrame) -> Result<(), Self::Error> {
        if !self.is_running(channel) {
            return Err(SimBusError::ChannelNotStarted);
        }
        if self.fail_send_at == Some(self.log.borrow().sent.len()) {
            return Err(SimBusError::LinkDown);
        }
        self.log.borrow_mut().sent.push((channel, *frame));

        let now = self.clock.now_us();
        for (delay_ms, reply) in (self.responder)(frame) {
            self.schedule(now + delay_ms * 1_000, reply);
        }
        Ok(())
    }

    async fn receive<'a>(
        &'a mut self,
        channel: u8,
        batch: &'a mut [CanFrame],
    ) -> Result<usize, Self::Error> {
        if !self.is_running(channel) {
            return Err(SimBusError::ChannelNotStarted);
        }
        if self.fail_receive {
            return Err(SimBusError::ReadFailed);
        }
        self.log.borrow_mut().receive_polls += 1;

        let now = self.clock.now_us();
        let ready = self
            .pending
            .iter()
            .take_while(|(t, _)| *t <= now)
            .count()
            .min(batch.len());
        for (slot, (_, frame)) in batch.iter_mut().zip(self.pending.drain(..ready)) {
            *slot = frame;
        }
        Ok(ready)
    }
}

//==================================================================================SOURCE
#[derive(Debug, Default)]
pub struct SourceLog {
    pub polls: u32,
    pub closed: u32,
}

/// Sensor replaying a script, then a fallback value (or nothing).
pub struct ScriptedSource {
    script: VecDeque<Option<i64>>,
    fallback: Option<i64>,
    log: Rc<RefCell<SourceLog>>,
    cancel_after: Option<(u32, &'static CancelFlag)>,
}

#[allow(dead_code)]
impl ScriptedSource {
    pub fn new(script: impl IntoIterator<Item = Option<i64>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            fallback: None,
            log: Rc::new(RefCell::new(SourceLog::default())),
            cancel_after: None,
        }
    }

    /// Source producing `value` on every poll.
    pub fn repeating(value: i64) -> Self {
        Self::new(Vec::new()).then_repeat(value)
    }

    pub fn then_repeat(mut self, value: i64) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Raise `flag` during the `polls`-th read (1-based), simulating an interrupt.
    pub fn cancel_after(mut self, polls: u32, flag: &'static CancelFlag) -> Self {
        self.cancel_after = Some((polls, flag));
        self
    }

    pub fn log(&self) -> Rc<RefCell<SourceLog>> {
        self.log.clone()
    }
}

impl MeasurementSource for ScriptedSource {
    async fn read_one(&mut self) -> Option<i64> {
        let polls = {
            let mut log = self.log.borrow_mut();
            log.polls += 1;
            log.polls
        };
        if let Some((after, flag)) = self.cancel_after {
            if polls >= after {
                flag.cancel();
            }
        }
        self.script.pop_front().unwrap_or(self.fallback)
    }

    fn close(&mut self) {
        self.log.borrow_mut().closed += 1;
    }
}

//==================================================================================FRAMES
#[allow(dead_code)]
/// Standard eight-byte frame carrying `value` under `id`.
pub fn distance_frame(id: u32, value: i64) -> CanFrame {
    CanFrame::try_new(id, false, false, 8, &encode_distance(value)).unwrap()
}

#[allow(dead_code)]
/// Value carried by a sent frame.
pub fn sent_value(frame: &CanFrame) -> u16 {
    decode_distance(frame.payload()).unwrap()
}
