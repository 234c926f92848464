//! Diagnostic subsystem errors

use thiserror::Error;
use vi_core::BusError;

/// Result type for diagnostic operations
pub type DiagResult<T> = Result<T, DiagnosticError>;

/// Reasons a diagnostic request or command was rejected
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DiagnosticError {
    /// Recurring frequency above the system-wide cap
    #[error("frequency {frequency} Hz exceeds the {max} Hz limit for recurring requests")]
    FrequencyTooHigh { frequency: f64, max: f64 },

    /// Negative or NaN recurring frequency
    #[error("invalid recurring frequency: {0} Hz")]
    InvalidFrequency(f64),

    /// Arbitration id does not fit in 29 bits
    #[error("invalid arbitration id: 0x{0:X}")]
    InvalidArbitrationId(u32),

    /// Every request slot is in use
    #[error("no free diagnostic request slots ({capacity} in use)")]
    PoolExhausted { capacity: usize },

    /// A response acceptance filter could not be installed
    #[error("unable to install acceptance filter 0x{id:X} on bus {bus}")]
    FilterInstallFailed { bus: u8, id: u32 },

    /// No bus with the given address is configured
    #[error("unknown bus: {0}")]
    UnknownBus(u8),

    /// The command named no bus and none is configured
    #[error("no active bus to send diagnostic request")]
    NoActiveBus,

    /// The target bus does not allow raw writes
    #[error("raw CAN writes not allowed on bus {0}")]
    RawWriteDisallowed(u8),

    /// A required command field was absent
    #[error("diagnostic request command is missing {0}")]
    MissingField(&'static str),

    /// Mode, PID and payload do not fit a single frame
    #[error("diagnostic request is {length} bytes, at most 7 fit in a single frame")]
    RequestTooLong { length: usize },

    /// The payload string is not valid hex
    #[error("invalid request payload: {0}")]
    InvalidPayload(String),

    /// The command is not a diagnostic request
    #[error("command was not a diagnostic request")]
    NotADiagnosticRequest,

    /// The command could not be parsed
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Configuration could not be parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// A relayed message could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The bus refused a frame
    #[error(transparent)]
    Bus(#[from] BusError),
}

impl From<toml::de::Error> for DiagnosticError {
    fn from(err: toml::de::Error) -> Self {
        DiagnosticError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for DiagnosticError {
    fn from(err: serde_json::Error) -> Self {
        DiagnosticError::Serialization(err.to_string())
    }
}
