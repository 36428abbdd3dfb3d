//! `HarnessTimer` backed by the embassy time driver (firmware, or the host
//! driver enabled by the `std` feature).
use embassy_time::{Duration, Instant, Timer};

use crate::protocol::transport::traits::harness_timer::HarnessTimer;

/// Timer reading `embassy_time::Instant::now()` and sleeping until
/// `now + duration`, saturated at `Instant::MAX`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbassyTimer;

impl HarnessTimer for EmbassyTimer {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn delay(&mut self, duration: Duration) {
        // `Timer::after` panics when `now + duration` overflows.
        let at = Instant::now()
            .checked_add(duration)
            .unwrap_or(Instant::MAX);
        Timer::at(at).await;
    }
}
