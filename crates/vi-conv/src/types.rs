//! Value types shared by encoders and decoders

use serde::{Deserialize, Serialize};

/// One symbolic state of a signal (e.g. "drive" = 4)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub name: String,
    pub value: i64,
}

impl SignalState {
    pub fn new(name: impl Into<String>, value: i64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// A value a caller wants written to a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalValue {
    Number(f64),
    Boolean(bool),
    State(String),
}

impl From<f64> for SignalValue {
    fn from(value: f64) -> Self {
        SignalValue::Number(value)
    }
}

impl From<bool> for SignalValue {
    fn from(value: bool) -> Self {
        SignalValue::Boolean(value)
    }
}

impl From<&str> for SignalValue {
    fn from(value: &str) -> Self {
        SignalValue::State(value.to_string())
    }
}

/// Output of an encoder: the physical value to pack, and whether to send it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Encoded {
    pub value: f64,
    /// Cleared when the value must not be transmitted
    pub send: bool,
}

impl Encoded {
    pub fn send(value: f64) -> Self {
        Self { value, send: true }
    }

    pub fn veto() -> Self {
        Self {
            value: 0.0,
            send: false,
        }
    }
}
