//! Common error types for CAN bus collaborators

use thiserror::Error;

/// Result type for bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Errors that can occur while talking to a CAN bus
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BusError {
    /// Outgoing write queue has no room left; the frame was dropped
    #[error("write queue full on bus {bus}, dropped frame 0x{id:X}")]
    QueueFull { bus: u8, id: u32 },

    /// Every hardware acceptance filter slot is taken
    #[error("acceptance filter table full on bus {bus} ({capacity} entries)")]
    FilterTableFull { bus: u8, capacity: usize },

    /// The controller driver refused an operation
    #[error("controller error: {0}")]
    Controller(String),

    /// No bus with the given address is configured
    #[error("unknown bus: {0}")]
    UnknownBus(u8),

    /// Bus configuration could not be parsed
    #[error("invalid bus configuration: {0}")]
    InvalidConfig(String),
}

impl From<toml::de::Error> for BusError {
    fn from(err: toml::de::Error) -> Self {
        BusError::InvalidConfig(err.to_string())
    }
}
