//! In-memory representation of a classic CAN frame.
//!
//! The record is fixed-size: identifier, flags, data length code and an
//! eight-byte payload whose unused trailing bytes are always zero.
use embedded_can::{ExtendedId, Id, StandardId};

use crate::error::FrameError;

/// Payload capacity of a classic CAN frame.
pub const CAN_PAYLOAD_LEN: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
/// Raw CAN frame as exchanged with the bus adapter.
pub struct CanFrame {
    id: Id,
    remote: bool,
    len: usize,
    data: [u8; CAN_PAYLOAD_LEN],
}

impl CanFrame {
    /// Blank standard data frame, used to pre-fill receive buffers.
    pub const EMPTY: CanFrame = CanFrame {
        id: Id::Standard(StandardId::ZERO),
        remote: false,
        len: 0,
        data: [0; CAN_PAYLOAD_LEN],
    };

    /// Build a frame from raw parts, enforcing identifier width and length.
    ///
    /// `data` may be shorter than `len` (missing bytes are zero) but never
    /// longer than eight bytes. Remote frames carry no data.
    pub fn try_new(
        raw_id: u32,
        extended: bool,
        remote: bool,
        len: usize,
        data: &[u8],
    ) -> Result<Self, FrameError> {
        let id = if extended {
            ExtendedId::new(raw_id).map(Id::Extended)
        } else {
            u16::try_from(raw_id)
                .ok()
                .and_then(StandardId::new)
                .map(Id::Standard)
        }
        .ok_or(FrameError::IdOutOfRange { id: raw_id, extended })?;

        if len > CAN_PAYLOAD_LEN {
            return Err(FrameError::InvalidLength { len });
        }
        if data.len() > CAN_PAYLOAD_LEN || (remote && !data.is_empty()) {
            return Err(FrameError::InvalidLength { len: data.len() });
        }

        let mut payload = [0u8; CAN_PAYLOAD_LEN];
        payload[..data.len()].copy_from_slice(data);
        Ok(Self {
            id,
            remote,
            len,
            data: payload,
        })
    }

    /// Full eight-byte standard data frame. Infallible: the identifier is already checked.
    pub const fn standard(id: StandardId, data: [u8; CAN_PAYLOAD_LEN]) -> Self {
        Self {
            id: Id::Standard(id),
            remote: false,
            len: CAN_PAYLOAD_LEN,
            data,
        }
    }

    /// Numeric identifier, without the standard/extended distinction.
    pub fn raw_id(&self) -> u32 {
        match self.id {
            Id::Standard(id) => id.as_raw() as u32,
            Id::Extended(id) => id.as_raw(),
        }
    }

    /// Identifier including its format.
    pub fn can_id(&self) -> Id {
        self.id
    }

    /// Whether the identifier uses the 29-bit format.
    pub fn extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    /// Whether this is a remote transmission request.
    pub fn remote(&self) -> bool {
        self.remote
    }

    /// Data length code (0 to 8).
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the frame carries no data bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// All eight payload bytes, zero-filled past `len`.
    pub fn payload(&self) -> &[u8; CAN_PAYLOAD_LEN] {
        &self.data
    }
}

impl Default for CanFrame {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_PAYLOAD_LEN {
            return None;
        }
        let mut payload = [0u8; CAN_PAYLOAD_LEN];
        payload[..data.len()].copy_from_slice(data);
        Some(Self {
            id: id.into(),
            remote: false,
            len: data.len(),
            data: payload,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_PAYLOAD_LEN {
            return None;
        }
        Some(Self {
            id: id.into(),
            remote: true,
            len: dlc,
            data: [0; CAN_PAYLOAD_LEN],
        })
    }

    fn is_extended(&self) -> bool {
        self.extended()
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.len
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.len]
        }
    }
}
