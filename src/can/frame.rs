//! # CAN Frame Type
//!
//! Classic CAN frame as delivered by the serial adapter.

use embedded_can::{ExtendedId, Frame, Id, StandardId};

/// Maximum classic CAN data length
pub const CAN_MAX_DLC: usize = 8;

/// Received CAN frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: Id,
    remote: bool,
    dlc: usize,
    data: [u8; CAN_MAX_DLC],
}

impl CanFrame {
    /// Build a data frame from a raw identifier
    ///
    /// # Returns
    ///
    /// * `Option<CanFrame>` - `None` if the id does not fit its format
    ///   (11 or 29 bits) or `data` exceeds 8 bytes
    pub fn from_raw(id: u32, extended: bool, data: &[u8]) -> Option<Self> {
        Self::new(make_id(id, extended)?, data)
    }

    /// Build a remote frame from a raw identifier
    pub fn remote_from_raw(id: u32, extended: bool, dlc: usize) -> Option<Self> {
        Self::new_remote(make_id(id, extended)?, dlc)
    }
}

fn make_id(id: u32, extended: bool) -> Option<Id> {
    if extended {
        ExtendedId::new(id).map(Id::Extended)
    } else {
        let raw = u16::try_from(id).ok()?;
        StandardId::new(raw).map(Id::Standard)
    }
}

impl Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        if data.len() > CAN_MAX_DLC {
            return None;
        }

        let mut payload = [0u8; CAN_MAX_DLC];
        payload[..data.len()].copy_from_slice(data);

        Some(Self {
            id: id.into(),
            remote: false,
            dlc: data.len(),
            data: payload,
        })
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > CAN_MAX_DLC {
            return None;
        }

        Some(Self {
            id: id.into(),
            remote: true,
            dlc,
            data: [0u8; CAN_MAX_DLC],
        })
    }

    fn is_extended(&self) -> bool {
        matches!(self.id, Id::Extended(_))
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        self.id
    }

    fn dlc(&self) -> usize {
        self.dlc
    }

    fn data(&self) -> &[u8] {
        if self.remote {
            &[]
        } else {
            &self.data[..self.dlc]
        }
    }
}
