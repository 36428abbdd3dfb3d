//! `korri-echo` library: a `no_std` harness validating a request/echo
//! exchange over a CAN bus. A measurement is encoded into an eight-byte
//! frame, sent, awaited back within a bounded window, compared, and counted.
//!
//! The crate exposes the infrastructure modules (payload codec, measurement
//! sources, timers), the transport abstractions (frame, adapter traits,
//! scoped sessions) and the harness itself with its statistics.
#![no_std]

#[cfg(any(test, feature = "std"))]
extern crate std;

// Must stay first so the logging macros are visible to every module.
mod fmt;
//==================================================================================
/// Harness configuration (bus, identifier, timing, run mode).
pub mod config;
/// Frame, codec, configuration and harness errors.
pub mod error;
/// Payload codec, measurement source adapters and timer implementations.
pub mod infra;
/// CAN transport abstractions, the echo harness and its statistics.
pub mod protocol;
//==================================================================================
