//! Clock and delay abstraction bounding the echo window, the poll interval
//! and the pacing between cycles.
use embassy_time::{Duration, Instant};

/// Monotonic time source able to suspend the harness.
pub trait HarnessTimer {
    /// Current instant on the timer's monotonic clock.
    fn now(&self) -> Instant;

    /// Asynchronously wait for `duration`.
    fn delay<'a>(&'a mut self, duration: Duration) -> impl core::future::Future<Output = ()> + 'a;
}
