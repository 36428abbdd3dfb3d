//! Distance payload codec.
//!
//! A measurement travels in the first two payload bytes, big-endian (high
//! byte first). The remaining six bytes are zero. Values outside the `u16`
//! range are clamped before encoding; decoding never clamps.
use crate::error::CodecError;
use crate::protocol::transport::can_frame::CAN_PAYLOAD_LEN;

/// Largest distance a payload can carry.
pub const MAX_DISTANCE: u16 = u16::MAX;

/// Saturate a raw measurement into the transmittable range.
pub fn clamp_distance(value: i64) -> u16 {
    value.clamp(0, MAX_DISTANCE as i64) as u16
}

/// Encode a measurement into a full eight-byte payload.
pub fn encode_distance(value: i64) -> [u8; CAN_PAYLOAD_LEN] {
    let [high, low] = clamp_distance(value).to_be_bytes();
    [high, low, 0, 0, 0, 0, 0, 0]
}

/// Decode the distance carried by the first two bytes of `payload`.
pub fn decode_distance(payload: &[u8]) -> Result<u16, CodecError> {
    match payload {
        [high, low, ..] => Ok(u16::from_be_bytes([*high, *low])),
        _ => Err(CodecError::PayloadTooShort {
            available: payload.len(),
        }),
    }
}

/// Burst-mode payload: every byte carries the frame index (wrapping at 256).
pub fn burst_payload(index: u32) -> [u8; CAN_PAYLOAD_LEN] {
    [index as u8; CAN_PAYLOAD_LEN]
}
