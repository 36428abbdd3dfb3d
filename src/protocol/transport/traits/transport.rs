//! Minimal abstraction for a multi-channel CAN bus adapter. Allows the harness
//! to plug into various drivers (USB adapters, embedded HAL, simulators).
use crate::protocol::transport::can_frame::CanFrame;
use futures_util::Future;

/// Contract to drive the channels of an already opened adapter.
///
/// Opening the adapter (bitrate selection) is driver specific and happens
/// before the handle is given to the harness. Channel lifecycle calls are
/// synchronous so they can run from `Drop`.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Initialise and start a channel so it can send and receive.
    fn start(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// Stop a started channel.
    fn stop(&mut self, channel: u8) -> Result<(), Self::Error>;

    /// Release the adapter. No call is made on the handle afterwards.
    fn close(&mut self);

    /// Emit a frame on `channel`. Fails when the link is down or the channel is not started.
    fn send<'a>(
        &'a mut self,
        channel: u8,
        frame: &'a CanFrame,
    ) -> impl Future<Output = Result<(), Self::Error>> + 'a;

    /// Copy the frames pending on `channel` into `batch`, in arrival order,
    /// and return how many were written (possibly zero).
    ///
    /// Must return promptly: either non-blocking or bounded by a short
    /// driver timeout. The future may be dropped before completion.
    fn receive<'a>(
        &'a mut self,
        channel: u8,
        batch: &'a mut [CanFrame],
    ) -> impl Future<Output = Result<usize, Self::Error>> + 'a;
}
