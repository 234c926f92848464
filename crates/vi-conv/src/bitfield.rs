//! Bit-level access to a 64-bit CAN payload
//!
//! Positions count from the most significant bit: a field at `position`
//! with `size` bits occupies bits `63 - position` down to
//! `64 - position - size` of the `u64`.

use crate::error::{ConvError, ConvResult};

fn check_range(position: u8, size: u8) -> ConvResult<()> {
    if size == 0 || size > 64 || position as u16 + size as u16 > 64 {
        return Err(ConvError::InvalidBitRange { position, size });
    }
    Ok(())
}

fn mask(size: u8) -> u64 {
    if size >= 64 {
        u64::MAX
    } else {
        (1u64 << size) - 1
    }
}

/// Read `size` bits starting at `position`
pub fn get_bitfield(data: u64, position: u8, size: u8) -> ConvResult<u64> {
    check_range(position, size)?;
    let shift = 64 - position as u32 - size as u32;
    Ok((data >> shift) & mask(size))
}

/// Overwrite `size` bits starting at `position` with `value`
pub fn set_bitfield(data: &mut u64, value: u64, position: u8, size: u8) -> ConvResult<()> {
    check_range(position, size)?;
    if value & !mask(size) != 0 {
        return Err(ConvError::ValueOverflow { value, size });
    }
    let shift = 64 - position as u32 - size as u32;
    *data &= !(mask(size) << shift);
    *data |= value << shift;
    Ok(())
}

/// Physical value to the raw integer for a field, rounding to nearest
pub fn encode_float(value: f64, position: u8, size: u8, factor: f64, offset: f64) -> ConvResult<u64> {
    check_range(position, size)?;
    let raw = ((value - offset) / factor).round();
    if raw.is_nan() {
        return Err(ConvError::NotANumber);
    }
    if raw < 0.0 || raw > mask(size) as f64 {
        return Err(ConvError::ValueOverflow {
            value: raw.max(0.0) as u64,
            size,
        });
    }
    let mut data = 0;
    set_bitfield(&mut data, raw as u64, position, size)?;
    Ok(data)
}

/// Raw field value scaled to its physical value
pub fn decode_float(data: u64, position: u8, size: u8, factor: f64, offset: f64) -> ConvResult<f64> {
    let raw = get_bitfield(data, position, size)?;
    Ok(raw as f64 * factor + offset)
}
