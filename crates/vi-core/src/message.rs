//! CAN frame types
//!
//! `CanMessage` is the host-side view of a frame: the 8 payload bytes are
//! packed into a `u64` with wire byte 0 in the most significant byte, which
//! is the layout the signal codec packs bits into. `OutgoingFrame` is the
//! byte-ordered form handed to a controller driver.

use serde::{Deserialize, Serialize};

/// Maximum CAN 2.0 payload size in bytes
pub const CAN_MESSAGE_SIZE: usize = 8;

/// A CAN frame as seen by the firmware logic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanMessage {
    /// Arbitration ID
    pub id: u32,
    /// Payload, wire byte 0 in the most significant byte
    pub data: u64,
    /// Declared length (0 means the full 8 bytes)
    #[serde(default)]
    pub length: u8,
}

impl CanMessage {
    pub fn new(id: u32, data: u64, length: u8) -> Self {
        Self { id, data, length }
    }

    /// Build a message from wire-ordered bytes (left-aligned, at most 8)
    pub fn from_bytes(id: u32, bytes: &[u8]) -> Self {
        let length = bytes.len().min(CAN_MESSAGE_SIZE);
        let mut data = [0u8; CAN_MESSAGE_SIZE];
        data[..length].copy_from_slice(&bytes[..length]);
        Self {
            id,
            data: u64::from_be_bytes(data),
            length: length as u8,
        }
    }

    /// Payload in wire order
    pub fn bytes(&self) -> [u8; CAN_MESSAGE_SIZE] {
        self.data.to_be_bytes()
    }

    /// Number of payload bytes actually on the wire
    pub fn effective_length(&self) -> u8 {
        if self.length == 0 || self.length as usize > CAN_MESSAGE_SIZE {
            CAN_MESSAGE_SIZE as u8
        } else {
            self.length
        }
    }
}

/// A frame queued for transmission, payload already in wire byte order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutgoingFrame {
    pub id: u32,
    pub data: [u8; CAN_MESSAGE_SIZE],
    pub length: u8,
}

impl OutgoingFrame {
    /// Payload bytes up to the declared length
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.length as usize]
    }
}

impl From<&CanMessage> for OutgoingFrame {
    fn from(message: &CanMessage) -> Self {
        Self {
            id: message.id,
            data: message.bytes(),
            length: message.effective_length(),
        }
    }
}
