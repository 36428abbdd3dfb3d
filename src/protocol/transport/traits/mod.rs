//! Abstraction traits consumed by the harness (bus adapter, timer, measurement source).
pub mod harness_timer;
pub mod measurement_source;
pub mod transport;
