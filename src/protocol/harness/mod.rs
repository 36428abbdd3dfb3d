//! Automated echo test over a CAN adapter.
//!
//! Each cycle reads one measurement, sends it (clamped, big-endian) under the
//! configured identifier, then polls the receive channel until a frame with
//! the same identifier arrives or the echo window closes:
//!
//! ```text
//! Idle → ReadMeasurement → Sent → AwaitingEcho → Matched | Mismatched | TimedOut → Idle
//! ```
//!
//! Only identifiers take part in the correlation: the first frame carrying
//! the target identifier ends the wait, whatever its flags or value. Frames
//! with other identifiers are dropped without touching the deadline.
//! A poll that yields no measurement leaves the cycle counter untouched and
//! is followed by one poll interval of sleep.
pub mod cancel;

use core::cmp::min;

use embassy_time::Instant;
use embedded_can::Frame;
use futures_util::future::{select, Either};
use futures_util::pin_mut;

use crate::config::{HarnessConfig, HarnessMode, MeasurementMode};
use crate::error::HarnessError;
use crate::infra::codec::distance::{burst_payload, clamp_distance, decode_distance, encode_distance};
use crate::protocol::stats::Stats;
use crate::protocol::transport::{
    can_frame::CanFrame,
    session::{BusSession, SourceSession},
    traits::{
        harness_timer::HarnessTimer, measurement_source::MeasurementSource, transport::Transport,
    },
    MAX_DRAIN_POLLS, RX_BATCH_CAPACITY,
};

pub use cancel::CancelFlag;

/// Classification of one completed echo cycle. Values are clamped distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleOutcome {
    /// The echo carried the value that was sent.
    Matched { sent: u16, received: u16 },
    /// An echo arrived with another value.
    Mismatched { sent: u16, received: u16 },
    /// No frame with the target identifier arrived in time.
    TimedOut { sent: u16 },
}

/// Position of the harness in the cycle state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleState {
    Idle,
    ReadMeasurement,
    Sent,
    AwaitingEcho,
    /// Terminal classification, held during the pacing delay.
    Classified(CycleOutcome),
}

/// Result of a burst run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BurstReport {
    pub sent: u32,
    pub received: u32,
}

/// Result of [`EchoTest::run_mode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RunReport {
    Echo(Stats),
    Listen { received: u32 },
    Burst(BurstReport),
}

/// Outcome of the echo wait.
enum EchoWait {
    Echo(CanFrame, u16),
    Expired,
    Cancelled,
}

//==================================================================================ECHO_TEST
/// Harness owning the adapter, the measurement source and the timer for a whole run.
///
/// Dropping the harness stops both channels and closes both handles.
pub struct EchoTest<'c, T: Transport, S: MeasurementSource, C: HarnessTimer> {
    config: HarnessConfig,
    // Field order is the release order: adapter first, then the source.
    bus: BusSession<T>,
    source: SourceSession<S>,
    timer: C,
    cancel: &'c CancelFlag,
    stats: Stats,
    state: CycleState,
    rx_batch: [CanFrame; RX_BATCH_CAPACITY],
}

impl<'c, T, S, C> EchoTest<'c, T, S, C>
where
    T: Transport,
    S: MeasurementSource,
    C: HarnessTimer,
{
    /// Take ownership of an opened adapter and source, and start the channels.
    ///
    /// If a channel fails to start, the adapter and the source are released
    /// before the error is returned.
    pub fn new(
        config: HarnessConfig,
        transport: T,
        source: S,
        timer: C,
        cancel: &'c CancelFlag,
    ) -> Result<Self, HarnessError<T::Error>> {
        Self::assemble(config, transport, SourceSession::new(source), timer, cancel)
            .map_err(HarnessError::TransportOpen)
    }

    /// Open the source, then the adapter at the configured bitrate, then start the channels.
    ///
    /// Whatever was acquired before a failure is released.
    pub fn launch<SE, OS, OB>(
        config: HarnessConfig,
        open_source: OS,
        open_bus: OB,
        timer: C,
        cancel: &'c CancelFlag,
    ) -> Result<Self, HarnessError<T::Error, SE>>
    where
        SE: core::fmt::Debug,
        OS: FnOnce(MeasurementMode) -> Result<S, SE>,
        OB: FnOnce(u32) -> Result<T, T::Error>,
    {
        let source = match open_source(config.measurement_mode) {
            Ok(source) => SourceSession::new(source),
            Err(e) => {
                error!("Measurement source open failed");
                return Err(HarnessError::SourceOpen(e));
            }
        };
        // `source` is released by its guard if the adapter cannot be opened.
        let transport = open_bus(config.bitrate).map_err(|e| {
            error!("Bus adapter open failed (bitrate {})", config.bitrate);
            HarnessError::TransportOpen(e)
        })?;
        Self::assemble(config, transport, source, timer, cancel).map_err(HarnessError::TransportOpen)
    }

    fn assemble(
        config: HarnessConfig,
        transport: T,
        source: SourceSession<S>,
        timer: C,
        cancel: &'c CancelFlag,
    ) -> Result<Self, T::Error> {
        let bus = BusSession::start(transport, config.tx_channel, config.rx_channel)?;
        Ok(Self {
            config,
            bus,
            source,
            timer,
            cancel,
            stats: Stats::new(),
            state: CycleState::Idle,
            rx_batch: [CanFrame::EMPTY; RX_BATCH_CAPACITY],
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> Stats {
        self.stats
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    /// Release the adapter and the source, returning the final counters.
    pub fn finish(self) -> Stats {
        self.stats
    }

    /// Run according to the configured [`HarnessMode`].
    pub async fn run_mode(&mut self) -> Result<RunReport, HarnessError<T::Error>> {
        match self.config.mode {
            HarnessMode::EchoTest => self.run().await.map(RunReport::Echo),
            HarnessMode::Listen => self
                .listen()
                .await
                .map(|received| RunReport::Listen { received }),
            HarnessMode::Burst => self.burst().await.map(RunReport::Burst),
        }
    }

    /// Run echo cycles until `total_cycles` completed or cancellation.
    ///
    /// Returns the (possibly partial) counters. Send and receive failures end
    /// the run; the counters gathered so far travel with the error.
    pub async fn run(&mut self) -> Result<Stats, HarnessError<T::Error>> {
        info!(
            "Starting automated CAN test: bitrate={}, TX={}, RX={}, CAN_ID={:#X}, cycles={}",
            self.config.bitrate,
            self.config.tx_channel,
            self.config.rx_channel,
            self.config.can_id.as_raw(),
            self.config.total_cycles
        );

        if self.config.drain_on_start {
            let drained = self.drain_receive().await?;
            debug!("Cleared {} pending frame(s)", drained);
        }

        while self.stats.total < self.config.total_cycles {
            if self.cancel.is_cancelled() {
                info!("Manual stop requested after {} cycle(s)", self.stats.total);
                break;
            }
            self.run_cycle().await?;
        }

        info!(
            "Test finished: total={}, ok={}, errors={}, missed={}",
            self.stats.total,
            self.stats.ok(),
            self.stats.errors,
            self.stats.missed
        );
        Ok(self.stats)
    }

    /// Drive one pass of the state machine.
    ///
    /// Returns `Ok(None)` when no cycle completed: the source had no value (the
    /// harness then waits one poll interval), or a stop was requested before
    /// the echo was classified. Neither is counted.
    pub async fn run_cycle(&mut self) -> Result<Option<CycleOutcome>, HarnessError<T::Error>> {
        // Step 1: pull a measurement; an empty poll retries the same cycle slot.
        self.state = CycleState::ReadMeasurement;
        let Some(measurement) = self.source.source().read_one().await else {
            trace!("No measurement, retrying cycle {}", self.stats.total + 1);
            self.state = CycleState::Idle;
            // A source returning nothing forever must still yield to the executor.
            if !self.cancel.is_cancelled() {
                self.timer.delay(self.config.poll_interval).await;
            }
            return Ok(None);
        };
        if self.cancel.is_cancelled() {
            self.state = CycleState::Idle;
            return Ok(None);
        }

        // Step 2: encode and send.
        let sent = clamp_distance(measurement);
        let frame = CanFrame::standard(self.config.can_id, encode_distance(measurement));
        let tx_channel = self.config.tx_channel;
        if let Err(error) = self.bus.transport().send(tx_channel, &frame).await {
            error!("Send failed on channel {}, aborting run", tx_channel);
            self.state = CycleState::Idle;
            return Err(HarnessError::TransportSend {
                error,
                stats: self.stats,
            });
        }
        self.state = CycleState::Sent;

        // Step 3: wait for the first frame carrying our identifier.
        let deadline = self
            .timer
            .now()
            .checked_add(self.config.response_wait)
            .unwrap_or(Instant::MAX);
        self.state = CycleState::AwaitingEcho;
        let outcome = match self.await_echo(deadline).await? {
            EchoWait::Echo(echo, received) => {
                let cycle = self.stats.total + 1;
                if received == sent {
                    info!(
                        "[Cycle {}] OK: Sent {} cm, Received {} cm, Raw={:?}",
                        cycle,
                        measurement,
                        received,
                        echo.payload()
                    );
                    CycleOutcome::Matched { sent, received }
                } else {
                    warn!(
                        "[Cycle {}] ERROR: Sent {} cm, Received {} cm, Raw={:?}",
                        cycle,
                        measurement,
                        received,
                        echo.payload()
                    );
                    CycleOutcome::Mismatched { sent, received }
                }
            }
            EchoWait::Expired => {
                warn!("[Cycle {}] NO RESPONSE (timeout)", self.stats.total + 1);
                CycleOutcome::TimedOut { sent }
            }
            EchoWait::Cancelled => {
                debug!("Echo wait interrupted, cycle not counted");
                self.state = CycleState::Idle;
                return Ok(None);
            }
        };

        // Step 4: account, then pace the next cycle.
        self.stats.record(&outcome);
        self.state = CycleState::Classified(outcome);
        self.timer.delay(self.config.pacing_delay).await;
        self.state = CycleState::Idle;
        Ok(Some(outcome))
    }

    /// Poll the receive channel until an identifier match, the deadline, or a stop request.
    async fn await_echo(&mut self, deadline: Instant) -> Result<EchoWait, HarnessError<T::Error>> {
        let target = self.config.can_id.as_raw() as u32;
        let rx_channel = self.config.rx_channel;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(EchoWait::Cancelled);
            }
            let now = self.timer.now();
            if now >= deadline {
                return Ok(EchoWait::Expired);
            }

            // A slow driver cannot stretch the window: the receive races the deadline.
            let count = {
                let recv = self.bus.transport().receive(rx_channel, &mut self.rx_batch);
                let expiry = self.timer.delay(deadline - now);
                pin_mut!(recv);
                pin_mut!(expiry);

                match select(recv, expiry).await {
                    Either::Left((Ok(count), _)) => count.min(RX_BATCH_CAPACITY),
                    Either::Left((Err(error), _)) => {
                        error!("Receive failed on channel {}, aborting run", rx_channel);
                        return Err(HarnessError::TransportReceive {
                            error,
                            stats: self.stats,
                        });
                    }
                    Either::Right(_) => return Ok(EchoWait::Expired),
                }
            };

            for frame in &self.rx_batch[..count] {
                if frame.raw_id() != target {
                    trace!("Ignoring frame with id {:#X}", frame.raw_id());
                    continue;
                }
                match decode_distance(frame.data()) {
                    Ok(received) => return Ok(EchoWait::Echo(*frame, received)),
                    Err(_) => {
                        debug!("Ignoring echo candidate with {} data byte(s)", frame.len());
                    }
                }
            }

            if count == 0 {
                let now = self.timer.now();
                if now < deadline {
                    let pause = min(self.config.poll_interval, deadline - now);
                    self.timer.delay(pause).await;
                }
            }
        }
    }

    /// Read and trace everything pending on the receive channel.
    pub async fn drain_receive(&mut self) -> Result<u32, HarnessError<T::Error>> {
        let rx_channel = self.config.rx_channel;
        let mut drained = 0u32;

        for _ in 0..MAX_DRAIN_POLLS {
            let count = self
                .bus
                .transport()
                .receive(rx_channel, &mut self.rx_batch)
                .await
                .map_err(|error| HarnessError::TransportReceive {
                    error,
                    stats: self.stats,
                })?
                .min(RX_BATCH_CAPACITY);

            for frame in &self.rx_batch[..count] {
                debug!(
                    "Drained id={:#X} len={} data={:?}",
                    frame.raw_id(),
                    frame.len(),
                    frame.payload()
                );
            }
            drained += count as u32;
            if count < RX_BATCH_CAPACITY {
                break;
            }
        }
        Ok(drained)
    }

    /// Listen-only run: trace every received frame.
    ///
    /// Ends on a stop request, or once `total_cycles` frames were received
    /// (checked per poll batch). A zero `total_cycles` listens until stopped.
    pub async fn listen(&mut self) -> Result<u32, HarnessError<T::Error>> {
        let limit = self.config.total_cycles;
        let rx_channel = self.config.rx_channel;
        let mut received = 0u32;
        info!("Listening on channel {}", rx_channel);

        loop {
            if self.cancel.is_cancelled() {
                info!("Manual stop requested after {} frame(s)", received);
                break;
            }
            if limit != 0 && received >= limit {
                break;
            }

            let count = self
                .bus
                .transport()
                .receive(rx_channel, &mut self.rx_batch)
                .await
                .map_err(|error| HarnessError::TransportReceive {
                    error,
                    stats: self.stats,
                })?
                .min(RX_BATCH_CAPACITY);

            for frame in &self.rx_batch[..count] {
                info!(
                    "RX id={:#X} extended={} remote={} len={} data={:?}",
                    frame.raw_id(),
                    frame.extended(),
                    frame.remote(),
                    frame.len(),
                    frame.payload()
                );
            }
            received += count as u32;

            if count == 0 {
                self.timer.delay(self.config.poll_interval).await;
            }
        }
        Ok(received)
    }

    /// Burst run: send `total_cycles` frames whose bytes all carry the frame
    /// index, wait one pacing delay, then drain the receive channel.
    pub async fn burst(&mut self) -> Result<BurstReport, HarnessError<T::Error>> {
        let tx_channel = self.config.tx_channel;
        let mut report = BurstReport::default();

        if self.config.drain_on_start {
            self.drain_receive().await?;
        }

        info!(
            "Sending {} frame(s) on channel {}",
            self.config.total_cycles, tx_channel
        );
        for index in 0..self.config.total_cycles {
            if self.cancel.is_cancelled() {
                info!("Manual stop requested after {} frame(s)", report.sent);
                break;
            }
            let frame = CanFrame::standard(self.config.can_id, burst_payload(index));
            self.bus
                .transport()
                .send(tx_channel, &frame)
                .await
                .map_err(|error| HarnessError::TransportSend {
                    error,
                    stats: self.stats,
                })?;
            report.sent += 1;
        }

        // Let the bus settle before reading back.
        self.timer.delay(self.config.pacing_delay).await;
        report.received = self.drain_receive().await?;
        info!("Burst done: sent={}, received={}", report.sent, report.received);
        Ok(report)
    }
}
