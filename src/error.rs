//! Error definitions shared across library modules.
//! Frame and codec errors are local to a single frame; harness errors end a run.
use core::convert::Infallible;
use core::fmt::Debug;

use crate::protocol::stats::Stats;
use thiserror_no_std::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur while building a CAN frame.
pub enum FrameError {
    /// Identifier does not fit the 11-bit (standard) or 29-bit (extended) range.
    #[error("CAN identifier {id:#X} out of range (extended: {extended})")]
    IdOutOfRange { id: u32, extended: bool },
    /// Data length code above 8, or more data than a classic frame carries.
    #[error("Invalid data length: {len}")]
    InvalidLength { len: usize },
}

//================================================================================CODEC_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
/// Errors raised while decoding a distance payload.
pub enum CodecError {
    /// Fewer than the two distance bytes are available.
    #[error("Invalid payload: {available} byte(s), need at least 2")]
    PayloadTooShort { available: usize },
}

//================================================================================CONFIG_ERROR
#[derive(Error, Debug, Clone, Copy, PartialEq)]
/// Rejected harness configuration.
pub enum ConfigError {
    /// Echo frames are sent with a standard identifier.
    #[error("CAN id {id:#X} does not fit a standard 11-bit identifier")]
    InvalidCanId { id: u32 },
    /// A zero bitrate cannot configure the adapter.
    #[error("Bitrate must be greater than zero")]
    ZeroBitrate,
    /// A zero poll interval would spin on the receive queue.
    #[error("Poll interval must be greater than zero")]
    ZeroPollInterval,
    /// Durations given in seconds must be finite and non-negative.
    #[error("Invalid duration: {secs} s")]
    InvalidDuration { secs: f32 },
}

//================================================================================HARNESS_ERROR
#[derive(Error, Debug)]
/// Fatal failures that end a harness run.
///
/// `TE` is the transport driver error, `SE` the measurement source open error.
/// Failures raised after cycles started carry the statistics gathered so far.
pub enum HarnessError<TE: Debug, SE: Debug = Infallible> {
    /// The adapter could not be opened or a channel refused to start.
    #[error("Transport open failed: {0:?}")]
    TransportOpen(TE),
    /// The measurement source could not be opened.
    #[error("Measurement source open failed: {0:?}")]
    SourceOpen(SE),
    /// The adapter rejected an outgoing frame.
    #[error("Transport send failed: {error:?}")]
    TransportSend { error: TE, stats: Stats },
    /// The adapter failed while reading the receive channel.
    #[error("Transport receive failed: {error:?}")]
    TransportReceive { error: TE, stats: Stats },
}

impl<TE: Debug, SE: Debug> HarnessError<TE, SE> {
    /// Statistics accumulated before the failure, if any cycle could run.
    pub fn partial_stats(&self) -> Option<Stats> {
        match self {
            HarnessError::TransportSend { stats, .. }
            | HarnessError::TransportReceive { stats, .. } => Some(*stats),
            HarnessError::TransportOpen(_) | HarnessError::SourceOpen(_) => None,
        }
    }
}

impl<TE: Debug> HarnessError<TE, Infallible> {
    /// Widen a run error to any source-open error type.
    pub fn with_source_error<SE: Debug>(self) -> HarnessError<TE, SE> {
        match self {
            HarnessError::TransportOpen(e) => HarnessError::TransportOpen(e),
            HarnessError::SourceOpen(never) => match never {},
            HarnessError::TransportSend { error, stats } => {
                HarnessError::TransportSend { error, stats }
            }
            HarnessError::TransportReceive { error, stats } => {
                HarnessError::TransportReceive { error, stats }
            }
        }
    }
}
