//! Echo-test protocol: CAN transport abstractions, the cycle state machine,
//! and the statistics it accumulates.
pub mod harness;
pub mod stats;
pub mod transport;
