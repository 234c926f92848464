//! Relaying completed responses downstream
//!
//! A response becomes either a named numeric message (when the request has
//! a generic name and the answer was positive) or a diagnostic response
//! record. Both go through a [`Pipeline`].

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::error::DiagResult;
use crate::protocol::{DiagnosticResponse, OBD2_FUNCTIONAL_BROADCAST_ID, DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET};
use crate::request::ActiveRequest;

/// A named numeric value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimpleMessage {
    pub name: String,
    pub value: f64,
}

/// A diagnostic response as published downstream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticResponseRecord {
    pub bus: u8,
    /// Responding module: the request id, or the literal responder id for
    /// functional broadcasts
    #[serde(rename = "id")]
    pub message_id: u32,
    pub mode: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_response_code: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none", serialize_with = "serialize_payload")]
    pub payload: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

fn serialize_payload<S: Serializer>(payload: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error> {
    match payload {
        Some(bytes) => serializer.serialize_str(&format!("0x{}", hex::encode(bytes))),
        None => serializer.serialize_none(),
    }
}

/// Messages the relay emits
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum VehicleMessage {
    Simple(SimpleMessage),
    DiagnosticResponse(DiagnosticResponseRecord),
}

/// Downstream sink for relayed messages
pub trait Pipeline {
    fn send_vehicle_message(&mut self, message: VehicleMessage);

    fn send_numerical_message(&mut self, name: &str, value: f64) {
        self.send_vehicle_message(VehicleMessage::Simple(SimpleMessage {
            name: name.to_string(),
            value,
        }));
    }
}

/// In-memory pipeline collecting messages in order
#[derive(Debug, Clone, Default)]
pub struct MessageBuffer {
    messages: Vec<VehicleMessage>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[VehicleMessage] {
        &self.messages
    }

    pub fn drain(&mut self) -> Vec<VehicleMessage> {
        std::mem::take(&mut self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// One JSON object per line
    pub fn to_json_lines(&self) -> DiagResult<String> {
        let mut out = String::new();
        for message in &self.messages {
            out.push_str(&serde_json::to_string(message)?);
            out.push('\n');
        }
        Ok(out)
    }
}

impl Pipeline for MessageBuffer {
    fn send_vehicle_message(&mut self, message: VehicleMessage) {
        self.messages.push(message);
    }
}

/// Build the record published for a response that is not relayed by name
pub fn response_record(request: &ActiveRequest, response: &DiagnosticResponse, value: f64) -> DiagnosticResponseRecord {
    let message_id = if request.request().arbitration_id == OBD2_FUNCTIONAL_BROADCAST_ID {
        response.arbitration_id
    } else {
        response.arbitration_id - DIAGNOSTIC_RESPONSE_ARBITRATION_ID_OFFSET
    };
    let payload = (!response.payload.is_empty()).then(|| response.payload.clone());
    let value = (payload.is_some() && request.parse_payload).then_some(value);

    DiagnosticResponseRecord {
        bus: request.bus,
        message_id,
        mode: response.mode,
        pid: response.pid,
        success: response.success,
        negative_response_code: if response.success {
            None
        } else {
            Some(response.negative_response_code.map_or(0, u8::from))
        },
        payload,
        value,
    }
}

/// Publish a completed response and run the request's callback
pub fn relay_response(request: &ActiveRequest, response: &DiagnosticResponse, pipeline: &mut dyn Pipeline) {
    let mut value = response.payload_to_integer() as f64 * request.factor + request.offset;
    if let Some(decoder) = &request.decoder {
        value = decoder(response, value);
    }

    match request.generic_name() {
        Some(name) if response.success => {
            debug!(name, value, "Relaying diagnostic response as named value");
            pipeline.send_numerical_message(name, value);
        }
        _ => {
            pipeline.send_vehicle_message(VehicleMessage::DiagnosticResponse(response_record(
                request, response, value,
            )));
        }
    }

    if let Some(callback) = &request.callback {
        callback(request, response, value);
    }
}
