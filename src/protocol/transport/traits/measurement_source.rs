//! Producer of the integer measurements sent by the echo test.

/// Line-oriented measurement producer (serial sensor, file replay, generator).
pub trait MeasurementSource {
    /// Read the next measurement.
    ///
    /// Returns `None` on read timeout, empty line or unparsable content;
    /// these are never errors. Implementations bound the wait with their own
    /// read timeout.
    fn read_one<'a>(&'a mut self) -> impl core::future::Future<Output = Option<i64>> + 'a;

    /// Release the underlying handle.
    fn close(&mut self);
}

/// Source that never yields a value, for runs that do not send measurements
/// (listen and burst modes).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSource;

impl MeasurementSource for NoSource {
    async fn read_one(&mut self) -> Option<i64> {
        None
    }

    fn close(&mut self) {}
}
