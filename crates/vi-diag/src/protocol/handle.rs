//! Per-request protocol state

use tracing::{debug, warn};
use vi_core::{BusResult, CanBus, CanMessage};

use crate::error::{DiagResult, DiagnosticError};

use super::isotp::{encode_single_frame, IsoTpEvent, IsoTpReceiver, FLOW_CONTROL_CTS};
use super::message::{DiagnosticRequest, DiagnosticResponse};
use super::nrc::NegativeResponseCode;
use super::{DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET, MODE_RESPONSE_OFFSET, NEGATIVE_RESPONSE_MODE};

/// Where a handle writes its frames
pub trait FrameSink {
    fn send_frame(&mut self, id: u32, data: &[u8]) -> BusResult<()>;
}

impl FrameSink for CanBus {
    fn send_frame(&mut self, id: u32, data: &[u8]) -> BusResult<()> {
        self.enqueue_message(&CanMessage::from_bytes(id, data))
    }
}

/// Transmission and reception state of one diagnostic request
///
/// `completed` is set once any response has been received (or reception
/// failed); `success` tells those apart. The handle keeps accepting frames
/// after completion so several ECUs can answer one broadcast.
#[derive(Debug, Clone)]
pub struct RequestHandle {
    request: DiagnosticRequest,
    completed: bool,
    success: bool,
    sent: bool,
    receivers: Vec<(u32, IsoTpReceiver)>,
}

impl RequestHandle {
    pub fn new(request: DiagnosticRequest) -> Self {
        Self {
            request,
            completed: false,
            success: false,
            sent: false,
            receivers: Vec::new(),
        }
    }

    pub fn request(&self) -> &DiagnosticRequest {
        &self.request
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// The last reception produced a well-formed response
    pub fn success(&self) -> bool {
        self.success
    }

    /// The request frame was handed to the bus
    pub fn sent(&self) -> bool {
        self.sent
    }

    /// Whether frames on `arbitration_id` may answer this request
    pub fn accepts(&self, arbitration_id: u32) -> bool {
        self.request.response_ids().contains(&arbitration_id)
    }

    /// Forget any previous exchange and transmit the request
    pub fn start(&mut self, sink: &mut dyn FrameSink) -> DiagResult<()> {
        self.completed = false;
        self.success = false;
        self.sent = false;
        self.receivers.clear();

        let body = self.request.encode()?;
        let frame = encode_single_frame(&body).ok_or(DiagnosticError::RequestTooLong {
            length: body.len(),
        })?;
        sink.send_frame(self.request.arbitration_id, &frame)?;
        self.sent = true;
        debug!(request = %self.request, "Sent diagnostic request");
        Ok(())
    }

    fn receiver(&mut self, arbitration_id: u32) -> &mut IsoTpReceiver {
        let index = match self.receivers.iter().position(|(id, _)| *id == arbitration_id) {
            Some(index) => index,
            None => {
                self.receivers.push((arbitration_id, IsoTpReceiver::new()));
                self.receivers.len() - 1
            }
        };
        &mut self.receivers[index].1
    }

    /// Feed one inbound frame; the returned response is `completed` when
    /// this frame finished a response to the request.
    pub fn receive_frame(
        &mut self,
        sink: &mut dyn FrameSink,
        arbitration_id: u32,
        data: &[u8],
    ) -> DiagnosticResponse {
        let mut response = DiagnosticResponse {
            arbitration_id,
            mode: self.request.mode,
            pid: self.request.pid,
            ..Default::default()
        };

        if !self.sent || !self.accepts(arbitration_id) {
            return response;
        }

        match self.receiver(arbitration_id).receive(data) {
            IsoTpEvent::Ignored | IsoTpEvent::InProgress => {}
            IsoTpEvent::FirstFrame => {
                let target = arbitration_id - DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET;
                if let Err(e) = sink.send_frame(target, &FLOW_CONTROL_CTS) {
                    warn!(id = format!("0x{:X}", target), error = %e, "Unable to send flow control");
                }
            }
            IsoTpEvent::Error(e) => {
                warn!(id = format!("0x{:X}", arbitration_id), error = %e, "ISO-TP reception failed");
                self.completed = true;
                self.success = false;
                response.completed = true;
            }
            IsoTpEvent::Complete(message) => {
                if self.parse_message(&message, &mut response) {
                    self.completed = true;
                    self.success = true;
                }
            }
        }
        response
    }

    /// Match a reassembled message against the request; false if it is not
    /// a final answer to it.
    fn parse_message(&self, message: &[u8], response: &mut DiagnosticResponse) -> bool {
        let Some(&first) = message.first() else {
            return false;
        };

        if first == NEGATIVE_RESPONSE_MODE {
            if message.len() < 3 || message[1] != self.request.mode {
                debug!(request = %self.request, "Negative response for another mode, ignoring");
                return false;
            }
            let nrc = NegativeResponseCode::from(message[2]);
            if nrc.is_response_pending() {
                debug!(request = %self.request, "Response pending, still waiting");
                return false;
            }
            response.completed = true;
            response.success = false;
            response.negative_response_code = Some(nrc);
            return true;
        }

        if first != self.request.mode.wrapping_add(MODE_RESPONSE_OFFSET) {
            debug!(request = %self.request, mode = first, "Response mode does not match, ignoring");
            return false;
        }

        let pid_bytes = self.request.pid_bytes();
        let body = &message[1..];
        if !body.starts_with(&pid_bytes) {
            debug!(request = %self.request, "Response PID does not match, ignoring");
            return false;
        }

        response.completed = true;
        response.success = true;
        response.payload = body[pid_bytes.len()..].to_vec();
        true
    }
}
