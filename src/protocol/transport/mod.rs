//! Transport layer: CAN frame representation, adapter/timer/source traits,
//! and the scoped sessions owning the adapter and the source.

pub mod can_frame;
pub mod session;
pub mod traits;

/// Frames read from the adapter in one receive poll.
///
/// USB adapters typically hand over their whole receive buffer per request;
/// 32 frames cover a full 8-byte-frame burst at 500 kbit/s within one poll
/// interval of 10 ms (≈ 37 frames worst case, the remainder is read on the
/// next poll).
pub const RX_BATCH_CAPACITY: usize = 32;

/// Upper bound on the receive polls performed while draining a channel.
///
/// Prevents a flooded bus from keeping the harness in its drain loop forever.
pub const MAX_DRAIN_POLLS: usize = 64;
