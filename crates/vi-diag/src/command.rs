//! Control commands that add diagnostic requests
//!
//! ```json
//! {"command": "diagnostic_request",
//!  "request": {"bus": 1, "id": 2015, "mode": 1, "pid": 12, "frequency": 1}}
//! ```

use serde::Deserialize;
use tracing::debug;
use vi_core::CanBusSet;

use crate::error::{DiagResult, DiagnosticError};
use crate::manager::DiagnosticsManager;
use crate::protocol::{DiagnosticRequest, OBD2_FUNCTIONAL_BROADCAST_ID};
use crate::request::RequestOptions;

/// A command received from the host
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    DiagnosticRequest { request: DiagnosticRequestCommand },
    Version,
    DeviceId,
}

impl ControlCommand {
    pub fn from_json(text: &str) -> DiagResult<Self> {
        serde_json::from_str(text).map_err(|e| DiagnosticError::InvalidCommand(e.to_string()))
    }
}

/// Fields of a diagnostic request command; only `id` and `mode` are required
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct DiagnosticRequestCommand {
    pub bus: Option<u8>,
    pub id: Option<u32>,
    pub mode: Option<u8>,
    pub pid: Option<u16>,
    /// Hex string, with or without a `0x` prefix
    pub payload: Option<String>,
    pub multiple_responses: Option<bool>,
    pub frequency: Option<f64>,
    pub name: Option<String>,
    pub parse_payload: Option<bool>,
    pub factor: Option<f64>,
    pub offset: Option<f64>,
}

/// Decode a hex payload string
pub fn parse_payload(text: &str) -> DiagResult<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|e| DiagnosticError::InvalidPayload(format!("{text}: {e}")))
}

impl DiagnosticsManager {
    /// Translate a control command into [`DiagnosticsManager::add_request`].
    ///
    /// Without a bus the first configured bus is used. Broadcast requests
    /// wait for multiple responses unless the command says otherwise.
    pub fn handle_control_command(&mut self, buses: &mut CanBusSet, command: &ControlCommand) -> DiagResult<()> {
        let ControlCommand::DiagnosticRequest { request: command } = command else {
            debug!("Command was not a diagnostic request");
            return Err(DiagnosticError::NotADiagnosticRequest);
        };

        let (Some(id), Some(mode)) = (command.id, command.mode) else {
            debug!("Diagnostic requests need at least an arb. ID and mode");
            return Err(DiagnosticError::MissingField(if command.id.is_none() { "id" } else { "mode" }));
        };

        let bus = match command.bus {
            Some(address) => buses.lookup(address).ok_or(DiagnosticError::UnknownBus(address))?,
            None => {
                let first = buses.first().ok_or_else(|| {
                    debug!("No active bus to send diagnostic request");
                    DiagnosticError::NoActiveBus
                })?;
                debug!(bus = first.address, "No bus specified for diagnostic request, using first active");
                first
            }
        };
        if !bus.raw_writable {
            debug!(bus = bus.address, "Raw CAN writes not allowed");
            return Err(DiagnosticError::RawWriteDisallowed(bus.address));
        }
        let address = bus.address;

        let mut request = DiagnosticRequest::new(id, mode);
        if let Some(pid) = command.pid {
            request = request.with_pid(pid);
        }
        if let Some(payload) = &command.payload {
            request = request.with_payload(parse_payload(payload)?);
        }

        let mut options = RequestOptions::new()
            .parse_payload(command.parse_payload.unwrap_or(false))
            .with_scale(command.factor.unwrap_or(1.0), command.offset.unwrap_or(0.0))
            .with_frequency(command.frequency.unwrap_or(0.0))
            .wait_for_multiple_responses(
                command
                    .multiple_responses
                    .unwrap_or(id == OBD2_FUNCTIONAL_BROADCAST_ID),
            );
        if let Some(name) = &command.name {
            options = options.named(name.clone());
        }

        self.add_request(buses, address, request, options)
    }
}
