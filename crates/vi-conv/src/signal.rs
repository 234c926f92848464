//! CAN signal descriptors
//!
//! A signal is a field of `bit_size` bits inside the 64-bit payload of the
//! message `message_id`. Bit positions count from the most significant bit
//! of the payload (wire byte 0, bit 7), so a field at position 0 with size
//! 8 is the first byte on the wire.

use serde::{Deserialize, Serialize};

use crate::types::{Encoded, SignalState, SignalValue};

/// Per-signal write handler, replacing the default encoder for that signal
pub type SignalEncoder = fn(&CanSignal, &SignalValue) -> Encoded;

/// Complete description of a single CAN signal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanSignal {
    /// Name the signal is published under (e.g. "vehicle_speed")
    pub generic_name: String,

    /// Arbitration id of the message carrying the signal
    pub message_id: u32,

    /// First bit of the field, counted from the MSB of the payload
    pub bit_position: u8,

    /// Field width in bits (1..=64)
    pub bit_size: u8,

    /// Scale factor: physical = raw * factor + offset
    #[serde(default = "default_factor")]
    pub factor: f64,

    /// Offset: physical = raw * factor + offset
    #[serde(default)]
    pub offset: f64,

    /// Lowest physical value accepted when writing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_value: Option<f64>,

    /// Highest physical value accepted when writing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_value: Option<f64>,

    /// Symbolic states, in table order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<SignalState>,

    /// Whether `send_signal` may write it without `force`
    #[serde(default)]
    pub writable: bool,

    /// Custom write handler
    #[serde(skip)]
    pub encoder: Option<SignalEncoder>,
}

fn default_factor() -> f64 {
    1.0
}

impl CanSignal {
    /// A plain numeric signal with factor 1 and offset 0
    pub fn new(generic_name: impl Into<String>, message_id: u32, bit_position: u8, bit_size: u8) -> Self {
        Self {
            generic_name: generic_name.into(),
            message_id,
            bit_position,
            bit_size,
            factor: 1.0,
            offset: 0.0,
            min_value: None,
            max_value: None,
            states: Vec::new(),
            writable: false,
            encoder: None,
        }
    }

    pub fn with_scale(mut self, factor: f64, offset: f64) -> Self {
        self.factor = factor;
        self.offset = offset;
        self
    }

    pub fn with_bounds(mut self, min: f64, max: f64) -> Self {
        self.min_value = Some(min);
        self.max_value = Some(max);
        self
    }

    pub fn with_states(mut self, states: Vec<SignalState>) -> Self {
        self.states = states;
        self
    }

    pub fn with_encoder(mut self, encoder: SignalEncoder) -> Self {
        self.encoder = Some(encoder);
        self
    }

    pub fn writable(mut self) -> Self {
        self.writable = true;
        self
    }

    /// Integer for a state name; the first entry in table order wins
    pub fn state_value(&self, name: &str) -> Option<i64> {
        self.states
            .iter()
            .find(|state| state.name == name)
            .map(|state| state.value)
    }

    /// State name for an integer; the first entry in table order wins
    pub fn state_name(&self, value: i64) -> Option<&str> {
        self.states
            .iter()
            .find(|state| state.value == value)
            .map(|state| state.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gear() -> CanSignal {
        CanSignal::new("transmission_gear_position", 0x128, 0, 4).with_states(vec![
            SignalState::new("park", 0),
            SignalState::new("reverse", 1),
            SignalState::new("neutral", 2),
            SignalState::new("drive", 3),
            SignalState::new("first", 3),
        ])
    }

    #[test]
    fn test_state_lookup() {
        let signal = gear();
        assert_eq!(signal.state_value("neutral"), Some(2));
        assert_eq!(signal.state_value("sport"), None);
    }

    #[test]
    fn test_duplicate_state_values_pick_first() {
        let signal = gear();
        assert_eq!(signal.state_name(3), Some("drive"));
        assert_eq!(signal.state_value("first"), Some(3));
    }

    #[test]
    fn test_deserialize_defaults() {
        let signal: CanSignal = serde_json::from_str(
            r#"{"generic_name": "engine_speed", "message_id": 256, "bit_position": 8, "bit_size": 16}"#,
        )
        .unwrap();
        assert_eq!(signal.factor, 1.0);
        assert_eq!(signal.offset, 0.0);
        assert!(!signal.writable);
        assert!(signal.states.is_empty());
        assert!(signal.encoder.is_none());
    }
}
