//! Decoding signal fields from a 64-bit payload

use crate::bitfield::{decode_float, get_bitfield};
use crate::error::ConvResult;
use crate::signal::CanSignal;

/// Physical value of the signal in `data`
pub fn parse_signal(signal: &CanSignal, data: u64) -> ConvResult<f64> {
    decode_float(
        data,
        signal.bit_position,
        signal.bit_size,
        signal.factor,
        signal.offset,
    )
}

/// State name of the signal in `data`, if the raw value has one
pub fn state_decoder(signal: &CanSignal, data: u64) -> ConvResult<Option<&str>> {
    let raw = get_bitfield(data, signal.bit_position, signal.bit_size)?;
    Ok(signal.state_name(raw as i64))
}

/// Whether the signal in `data` is non-zero
pub fn boolean_decoder(signal: &CanSignal, data: u64) -> ConvResult<bool> {
    Ok(parse_signal(signal, data)? != 0.0)
}
