//! Cooperative stop request shared between the harness and an interrupt source.
use core::sync::atomic::{AtomicBool, Ordering};

/// Flag raised by an interrupt handler (Ctrl-C, button, supervisor task).
///
/// The harness checks it before each send and between receive polls; once
/// raised, no new frame is sent and the run returns its partial statistics.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request the run to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Lower the flag so the same instance can drive another run.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}
