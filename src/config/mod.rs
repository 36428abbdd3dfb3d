//! Harness configuration and its fluent builder.
//!
//! Defaults reproduce the bench setup: 500 kbit/s, transmit on channel 1,
//! receive on channel 0, identifier 0x3FE, 100 cycles, 200 ms echo window
//! and 50 ms pacing between cycles.
use embassy_time::Duration;
use embedded_can::StandardId;

use crate::error::ConfigError;

/// Default adapter bitrate (bit/s).
pub const DEFAULT_BITRATE: u32 = 500_000;
/// Default transmit channel.
pub const DEFAULT_TX_CHANNEL: u8 = 1;
/// Default receive channel.
pub const DEFAULT_RX_CHANNEL: u8 = 0;
/// Default identifier used for the echo frames.
pub const DEFAULT_CAN_ID: u16 = 0x3FE;
/// Default number of completed cycles per run.
pub const DEFAULT_TOTAL_CYCLES: u32 = 100;
/// Default echo window (ms).
pub const DEFAULT_RESPONSE_WAIT_MS: u64 = 200;
/// Default pause between two cycles (ms).
pub const DEFAULT_PACING_DELAY_MS: u64 = 50;
/// Default pause between two empty receive polls (ms).
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;
/// Longest duration accepted in seconds (one day).
pub const MAX_DURATION_SECS: f32 = 86_400.0;

/// Unit of the values produced by the measurement source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MeasurementMode {
    /// Lines already carry centimeters.
    #[default]
    Cm,
    /// Lines carry ultrasound echo times in microseconds (divided by 58).
    Us,
}

/// What a run does with the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HarnessMode {
    /// Send a measurement, await its echo, classify, repeat.
    #[default]
    EchoTest,
    /// Only trace what arrives on the receive channel.
    Listen,
    /// Send a fixed burst of frames, then drain the receive channel.
    Burst,
}

/// Validated harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Adapter bitrate (bit/s), fixed for the session.
    pub bitrate: u32,
    /// Channel frames are sent on.
    pub tx_channel: u8,
    /// Channel echoes are read from.
    pub rx_channel: u8,
    /// Identifier of outgoing frames and of the expected echo.
    pub can_id: StandardId,
    /// Completed cycles (echo), frames (burst) or received frames (listen, 0 = unbounded).
    pub total_cycles: u32,
    /// How long a cycle waits for its echo.
    pub response_wait: Duration,
    /// Pause after each completed cycle.
    pub pacing_delay: Duration,
    /// Pause between two empty receive polls.
    pub poll_interval: Duration,
    /// Unit expected from the measurement source.
    pub measurement_mode: MeasurementMode,
    /// Behaviour of the run.
    pub mode: HarnessMode,
    /// Drop frames already queued on the receive channel before the first cycle.
    pub drain_on_start: bool,
}

impl HarnessConfig {
    /// Start from the defaults.
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::new()
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            bitrate: DEFAULT_BITRATE,
            tx_channel: DEFAULT_TX_CHANNEL,
            rx_channel: DEFAULT_RX_CHANNEL,
            can_id: StandardId::new(DEFAULT_CAN_ID).unwrap_or(StandardId::MAX),
            total_cycles: DEFAULT_TOTAL_CYCLES,
            response_wait: Duration::from_millis(DEFAULT_RESPONSE_WAIT_MS),
            pacing_delay: Duration::from_millis(DEFAULT_PACING_DELAY_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            measurement_mode: MeasurementMode::Cm,
            mode: HarnessMode::EchoTest,
            drain_on_start: true,
        }
    }
}

//==================================================================================CONFIG_BUILDER
#[derive(Debug, Clone)]
/// Fluent builder; every rule is checked once in [`build`](Self::build).
pub struct HarnessConfigBuilder {
    pub bitrate: u32,
    pub tx_channel: u8,
    pub rx_channel: u8,
    pub can_id: u32,
    pub total_cycles: u32,
    pub response_wait: Duration,
    pub pacing_delay: Duration,
    pub poll_interval: Duration,
    pub measurement_mode: MeasurementMode,
    pub mode: HarnessMode,
    pub drain_on_start: bool,
}

impl HarnessConfigBuilder {
    /// Builder pre-loaded with the defaults.
    pub fn new() -> Self {
        let defaults = HarnessConfig::default();
        Self {
            bitrate: defaults.bitrate,
            tx_channel: defaults.tx_channel,
            rx_channel: defaults.rx_channel,
            can_id: defaults.can_id.as_raw() as u32,
            total_cycles: defaults.total_cycles,
            response_wait: defaults.response_wait,
            pacing_delay: defaults.pacing_delay,
            poll_interval: defaults.poll_interval,
            measurement_mode: defaults.measurement_mode,
            mode: defaults.mode,
            drain_on_start: defaults.drain_on_start,
        }
    }

    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Transmit and receive channels. Both may be the same channel.
    pub fn channels(mut self, tx_channel: u8, rx_channel: u8) -> Self {
        self.tx_channel = tx_channel;
        self.rx_channel = rx_channel;
        self
    }

    pub fn can_id(mut self, can_id: u32) -> Self {
        self.can_id = can_id;
        self
    }

    pub fn total_cycles(mut self, total_cycles: u32) -> Self {
        self.total_cycles = total_cycles;
        self
    }

    pub fn response_wait(mut self, response_wait: Duration) -> Self {
        self.response_wait = response_wait;
        self
    }

    pub fn pacing_delay(mut self, pacing_delay: Duration) -> Self {
        self.pacing_delay = pacing_delay;
        self
    }

    /// Echo window in (fractional) seconds, see [`duration_from_secs`].
    pub fn response_wait_secs(self, secs: f32) -> Result<Self, ConfigError> {
        Ok(self.response_wait(duration_from_secs(secs)?))
    }

    /// Pacing delay in (fractional) seconds, see [`duration_from_secs`].
    pub fn pacing_delay_secs(self, secs: f32) -> Result<Self, ConfigError> {
        Ok(self.pacing_delay(duration_from_secs(secs)?))
    }

    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn measurement_mode(mut self, measurement_mode: MeasurementMode) -> Self {
        self.measurement_mode = measurement_mode;
        self
    }

    pub fn mode(mut self, mode: HarnessMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn drain_on_start(mut self, drain_on_start: bool) -> Self {
        self.drain_on_start = drain_on_start;
        self
    }

    /// Validate and freeze the configuration.
    pub fn build(self) -> Result<HarnessConfig, ConfigError> {
        if self.bitrate == 0 {
            return Err(ConfigError::ZeroBitrate);
        }
        if self.poll_interval == Duration::from_ticks(0) {
            return Err(ConfigError::ZeroPollInterval);
        }
        let can_id = u16::try_from(self.can_id)
            .ok()
            .and_then(StandardId::new)
            .ok_or(ConfigError::InvalidCanId { id: self.can_id })?;

        Ok(HarnessConfig {
            bitrate: self.bitrate,
            tx_channel: self.tx_channel,
            rx_channel: self.rx_channel,
            can_id,
            total_cycles: self.total_cycles,
            response_wait: self.response_wait,
            pacing_delay: self.pacing_delay,
            poll_interval: self.poll_interval,
            measurement_mode: self.measurement_mode,
            mode: self.mode,
            drain_on_start: self.drain_on_start,
        })
    }
}

impl Default for HarnessConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a duration expressed in (fractional) seconds.
///
/// Resolution is one microsecond. Negative, NaN and infinite inputs are
/// rejected, as is anything above [`MAX_DURATION_SECS`].
pub fn duration_from_secs(secs: f32) -> Result<Duration, ConfigError> {
    if !secs.is_finite() || !(0.0..=MAX_DURATION_SECS).contains(&secs) {
        return Err(ConfigError::InvalidDuration { secs });
    }
    Ok(Duration::from_micros((secs as f64 * 1_000_000.0) as u64))
}
