//! Measurement source adapters.
//!
//! Sensors report one decimal number per line, either in centimeters or as
//! an ultrasound round-trip time in microseconds. Anything else on a line
//! (empty, signs, decimals, text) means "no value this poll".
use crate::config::MeasurementMode;

#[cfg(feature = "std")]
mod line;
#[cfg(feature = "std")]
pub use line::{open_serial, LineSource, SerialSource};

/// Round-trip microseconds per centimeter for an ultrasound ranger.
pub const US_PER_CM: i64 = 58;

/// Parse one sensor line into centimeters.
pub fn parse_measurement(line: &str, mode: MeasurementMode) -> Option<i64> {
    let line = line.trim();
    if line.is_empty() || !line.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = line.parse().ok()?;
    Some(match mode {
        MeasurementMode::Cm => value,
        MeasurementMode::Us => value / US_PER_CM,
    })
}
