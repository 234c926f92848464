//! Diagnostic request and response values

use std::fmt;

use crate::error::{DiagResult, DiagnosticError};

use super::isotp::MAX_SINGLE_FRAME_PAYLOAD;
use super::nrc::NegativeResponseCode;
use super::{
    DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET, MAX_SINGLE_BYTE_PID_MODE,
    OBD2_FUNCTIONAL_BROADCAST_ID, OBD2_FUNCTIONAL_RESPONSE_COUNT, OBD2_FUNCTIONAL_RESPONSE_START,
};

/// An outgoing diagnostic request
///
/// Two requests are the same request when every field matches; this is how
/// an existing recurring request is found again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticRequest {
    pub arbitration_id: u32,
    pub mode: u8,
    pub pid: Option<u16>,
    pub payload: Vec<u8>,
}

impl DiagnosticRequest {
    pub fn new(arbitration_id: u32, mode: u8) -> Self {
        Self {
            arbitration_id,
            mode,
            pid: None,
            payload: Vec::new(),
        }
    }

    pub fn with_pid(mut self, pid: u16) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Whether the request is addressed to every ECU
    pub fn is_functional(&self) -> bool {
        self.arbitration_id == OBD2_FUNCTIONAL_BROADCAST_ID
    }

    /// PID width in bytes: one for OBD-II modes, two for UDS services
    pub fn pid_length(&self) -> usize {
        match self.pid {
            None => 0,
            Some(pid) if self.mode <= MAX_SINGLE_BYTE_PID_MODE && pid <= 0xFF => 1,
            Some(_) => 2,
        }
    }

    /// Ids responses to this request arrive on
    pub fn response_ids(&self) -> std::ops::RangeInclusive<u32> {
        if self.is_functional() {
            OBD2_FUNCTIONAL_RESPONSE_START
                ..=OBD2_FUNCTIONAL_RESPONSE_START + OBD2_FUNCTIONAL_RESPONSE_COUNT - 1
        } else {
            let id = self.arbitration_id.saturating_add(DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET);
            id..=id
        }
    }

    pub(crate) fn pid_bytes(&self) -> Vec<u8> {
        match (self.pid, self.pid_length()) {
            (Some(pid), 1) => vec![pid as u8],
            (Some(pid), _) => pid.to_be_bytes().to_vec(),
            (None, _) => Vec::new(),
        }
    }

    /// Mode, PID and payload as carried inside the ISO-TP frame
    pub fn encode(&self) -> DiagResult<Vec<u8>> {
        let length = 1 + self.pid_length() + self.payload.len();
        if length > MAX_SINGLE_FRAME_PAYLOAD {
            return Err(DiagnosticError::RequestTooLong { length });
        }
        let mut bytes = Vec::with_capacity(length);
        bytes.push(self.mode);
        bytes.extend_from_slice(&self.pid_bytes());
        bytes.extend_from_slice(&self.payload);
        Ok(bytes)
    }
}

impl fmt::Display for DiagnosticRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "arb_id: 0x{:X}, mode: 0x{:X}", self.arbitration_id, self.mode)?;
        if let Some(pid) = self.pid {
            write!(f, ", pid: 0x{:X}", pid)?;
        }
        if !self.payload.is_empty() {
            write!(f, ", payload: 0x{}", hex::encode(&self.payload))?;
        }
        Ok(())
    }
}

/// What a request handle made of the frames received so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagnosticResponse {
    /// Id the response arrived on
    pub arbitration_id: u32,
    pub mode: u8,
    pub pid: Option<u16>,
    /// A whole response (positive or negative) was received
    pub completed: bool,
    /// Positive response
    pub success: bool,
    /// Present for negative responses
    pub negative_response_code: Option<NegativeResponseCode>,
    pub payload: Vec<u8>,
}

impl DiagnosticResponse {
    /// Payload read as a big-endian unsigned integer (first 8 bytes)
    pub fn payload_to_integer(&self) -> u64 {
        self.payload
            .iter()
            .take(8)
            .fold(0u64, |acc, byte| (acc << 8) | *byte as u64)
    }
}
