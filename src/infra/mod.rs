//! Infrastructure: payload codec, measurement source adapters and timers.
pub mod codec;
pub mod source;
#[cfg(feature = "embassy")]
pub mod timer;
