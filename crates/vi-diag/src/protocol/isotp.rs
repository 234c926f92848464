//! ISO-TP (ISO 15765-2) framing for diagnostic requests and responses
//!
//! Requests always fit a single frame. Responses may span a first frame
//! and any number of consecutive frames; [`IsoTpReceiver`] reassembles
//! them one CAN frame at a time.

use thiserror::Error;
use tracing::debug;

/// Frame type nibbles (upper 4 bits of the PCI byte)
pub const ISOTP_SINGLE_FRAME: u8 = 0x0;
pub const ISOTP_FIRST_FRAME: u8 = 0x1;
pub const ISOTP_CONSECUTIVE_FRAME: u8 = 0x2;
pub const ISOTP_FLOW_CONTROL: u8 = 0x3;

/// Largest payload a single frame carries
pub const MAX_SINGLE_FRAME_PAYLOAD: usize = 7;

/// Flow Control: ContinueToSend, block size 0, separation time 0
pub const FLOW_CONTROL_CTS: [u8; 8] = [0x30, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

/// Framing violations that abort a reception
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IsoTpError {
    #[error("invalid single frame length {0}")]
    InvalidSingleFrameLength(usize),

    #[error("invalid first frame length {0}")]
    InvalidFirstFrameLength(usize),

    #[error("sequence mismatch: expected {expected}, got {got}")]
    SequenceMismatch { expected: u8, got: u8 },
}

/// What one inbound frame did to a reception
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsoTpEvent {
    /// Not part of a reception (flow control, stray consecutive frame, empty)
    Ignored,
    /// A first frame opened a multi-frame reception; flow control is due
    FirstFrame,
    /// A consecutive frame was appended, more are expected
    InProgress,
    /// A whole message is available
    Complete(Vec<u8>),
    /// The reception was aborted
    Error(IsoTpError),
}

/// Build the single frame carrying `payload`
pub fn encode_single_frame(payload: &[u8]) -> Option<Vec<u8>> {
    if payload.is_empty() || payload.len() > MAX_SINGLE_FRAME_PAYLOAD {
        return None;
    }
    let mut frame = Vec::with_capacity(payload.len() + 1);
    frame.push((ISOTP_SINGLE_FRAME << 4) | payload.len() as u8);
    frame.extend_from_slice(payload);
    Some(frame)
}

/// Reassembly state for one responder
#[derive(Debug, Clone, Default)]
pub struct IsoTpReceiver {
    buffer: Vec<u8>,
    expected_len: usize,
    next_sequence: u8,
    active: bool,
}

impl IsoTpReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a multi-frame reception is open
    pub fn is_receiving(&self) -> bool {
        self.active
    }

    fn abort(&mut self, error: IsoTpError) -> IsoTpEvent {
        self.buffer.clear();
        self.active = false;
        IsoTpEvent::Error(error)
    }

    /// Feed one CAN payload
    pub fn receive(&mut self, data: &[u8]) -> IsoTpEvent {
        let Some(&pci) = data.first() else {
            return IsoTpEvent::Ignored;
        };

        match pci >> 4 {
            ISOTP_SINGLE_FRAME => {
                let len = (pci & 0x0F) as usize;
                if len == 0 || len + 1 > data.len() {
                    return self.abort(IsoTpError::InvalidSingleFrameLength(len));
                }
                self.active = false;
                self.buffer.clear();
                IsoTpEvent::Complete(data[1..1 + len].to_vec())
            }
            ISOTP_FIRST_FRAME => {
                let total_len = (((pci & 0x0F) as usize) << 8) | data.get(1).copied().unwrap_or(0) as usize;
                if total_len <= MAX_SINGLE_FRAME_PAYLOAD || data.len() < 2 {
                    return self.abort(IsoTpError::InvalidFirstFrameLength(total_len));
                }
                self.buffer.clear();
                self.buffer.extend_from_slice(&data[2..data.len().min(8)]);
                self.expected_len = total_len;
                self.next_sequence = 1;
                self.active = true;
                IsoTpEvent::FirstFrame
            }
            ISOTP_CONSECUTIVE_FRAME => {
                if !self.active {
                    debug!("Consecutive frame without a first frame, ignoring");
                    return IsoTpEvent::Ignored;
                }
                let sequence = pci & 0x0F;
                if sequence != self.next_sequence {
                    let expected = self.next_sequence;
                    return self.abort(IsoTpError::SequenceMismatch {
                        expected,
                        got: sequence,
                    });
                }

                let remaining = self.expected_len - self.buffer.len();
                let end = data.len().min(1 + remaining);
                self.buffer.extend_from_slice(&data[1..end]);
                self.next_sequence = (self.next_sequence + 1) & 0x0F;

                if self.buffer.len() >= self.expected_len {
                    self.active = false;
                    IsoTpEvent::Complete(std::mem::take(&mut self.buffer))
                } else {
                    IsoTpEvent::InProgress
                }
            }
            _ => IsoTpEvent::Ignored,
        }
    }
}
