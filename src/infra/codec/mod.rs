//! Payload codecs for the frames exchanged by the harness.
pub mod distance;
