//! Encoding physical values into signal fields
//!
//! Encoders turn a caller's [`SignalValue`] into the physical number to pack
//! and a `send` flag. Clearing the flag vetoes the write without an error at
//! this layer; [`crate::write`] turns a veto into [`crate::ConvError::Vetoed`].

use tracing::debug;

use crate::bitfield::{encode_float, set_bitfield};
use crate::error::ConvResult;
use crate::signal::CanSignal;
use crate::types::{Encoded, SignalValue};

/// Encode a number, clamping it to the signal's declared bounds
pub fn number_encoder(signal: &CanSignal, value: f64) -> Encoded {
    if value.is_nan() {
        return Encoded::veto();
    }

    let value = match (signal.min_value, signal.max_value) {
        (Some(min), Some(max)) if min <= max => {
            let clamped = value.clamp(min, max);
            if clamped != value {
                debug!(signal = %signal.generic_name, value, clamped, "Clamped value to signal bounds");
            }
            clamped
        }
        _ => value,
    };
    Encoded::send(value)
}

/// Encode a boolean as 1 or 0
pub fn boolean_encoder(_signal: &CanSignal, value: bool) -> Encoded {
    Encoded::send(if value { 1.0 } else { 0.0 })
}

/// Encode a state name as its integer from the signal's state table
pub fn state_encoder(signal: &CanSignal, name: &str) -> Encoded {
    match signal.state_value(name) {
        Some(value) => Encoded::send(value as f64),
        None => {
            debug!(signal = %signal.generic_name, state = name, "No matching state value");
            Encoded::veto()
        }
    }
}

/// Pick the encoder by the kind of value supplied
pub fn default_encoder(signal: &CanSignal, value: &SignalValue) -> Encoded {
    match value {
        SignalValue::Number(number) => number_encoder(signal, *number),
        SignalValue::Boolean(flag) => boolean_encoder(signal, *flag),
        SignalValue::State(name) => state_encoder(signal, name),
    }
}

/// Physical value to the signal's field, positioned in an otherwise empty frame
pub fn encode_signal(signal: &CanSignal, value: f64) -> ConvResult<u64> {
    encode_float(
        value,
        signal.bit_position,
        signal.bit_size,
        signal.factor,
        signal.offset,
    )
}

/// Write the signal's field into an existing frame, leaving other bits alone
pub fn pack_signal(signal: &CanSignal, value: f64, frame: &mut u64) -> ConvResult<()> {
    let encoded = encode_signal(signal, value)?;
    let raw = encoded >> (64 - signal.bit_position as u32 - signal.bit_size as u32);
    set_bitfield(frame, raw, signal.bit_position, signal.bit_size)
}
