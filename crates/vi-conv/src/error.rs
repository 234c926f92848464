//! Error types for signal conversion

use thiserror::Error;
use vi_core::BusError;

/// Errors that can occur while encoding or writing a signal
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConvError {
    /// Signal is read-only and the write was not forced
    #[error("signal {0} is not writable")]
    NotWritable(String),

    /// The encoder cleared its send flag
    #[error("encoder declined to send a value for signal {0}")]
    Vetoed(String),

    /// Bit position/size do not describe a field inside a 64-bit frame
    #[error("invalid bit range: position {position}, size {size}")]
    InvalidBitRange { position: u8, size: u8 },

    /// Raw value needs more bits than the field has
    #[error("raw value {value} does not fit in {size} bits")]
    ValueOverflow { value: u64, size: u8 },

    /// Scaling produced NaN, which has no raw representation
    #[error("value is not a number")]
    NotANumber,

    /// The encoded frame could not be queued
    #[error(transparent)]
    Bus(#[from] BusError),
}

/// Result type for signal conversion operations
pub type ConvResult<T> = Result<T, ConvError>;
