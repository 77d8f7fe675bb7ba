//! Ion 1.1 scalar payloads.

use half::f16;

use crate::error::{DecodeError, Result};
use crate::flex::{fixed_int, fixed_u64, fixed_uint, read_flex_int, read_flex_uint};
use crate::value::{Decimal, Int, Timestamp};

/// Payload length of short timestamp opcodes `0x80..=0x8C`.
pub const SHORT_TIMESTAMP_LENGTHS: [u8; 13] = [1, 2, 2, 4, 5, 6, 7, 8, 5, 5, 7, 8, 9];

const YEAR_BIAS: u32 = 1970;
const SHORT_OFFSET_BIAS: i32 = 56;
const SHORT_OFFSET_UNKNOWN: u32 = 0x7F;
const LONG_OFFSET_BIAS: i32 = 1440;
const LONG_OFFSET_UNKNOWN: u32 = 0xFFF;

/// Payload length of a short timestamp opcode.
pub fn short_timestamp_len(opcode: u8) -> Option<usize> {
    opcode
        .checked_sub(0x80)
        .and_then(|i| SHORT_TIMESTAMP_LENGTHS.get(i as usize))
        .map(|&n| n as usize)
}

/// Two's-complement little-endian integer.
pub fn int(bytes: &[u8]) -> Int {
    fixed_int(bytes)
}

pub fn float(bytes: &[u8]) -> Result<f64> {
    match bytes.len() {
        0 => Ok(0.0),
        2 => Ok(f16::from_le_bytes([bytes[0], bytes[1]]).to_f64()),
        4 => Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64),
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(f64::from_le_bytes(raw))
        }
        n => Err(DecodeError::InvalidFloatLength(n).into()),
    }
}

/// FlexInt exponent followed by a FixedInt coefficient filling the rest.
pub fn decimal(bytes: &[u8]) -> Result<Decimal> {
    if bytes.is_empty() {
        return Ok(Decimal::zero());
    }
    let (exponent, n) = read_flex_int(bytes, 0)?;
    Ok(Decimal::new(fixed_int(&bytes[n..]), exponent))
}

#[inline]
fn bits(data: u64, offset: u32, width: u32) -> u32 {
    ((data >> offset) & ((1u64 << width) - 1)) as u32
}

fn fraction(value: u32, digits: i64) -> Decimal {
    Decimal::new(value as i64, -digits)
}

/// Bit-packed timestamp selected by `opcode` (`0x80..=0x8C`).
pub fn short_timestamp(opcode: u8, bytes: &[u8]) -> Result<Timestamp> {
    let expected = short_timestamp_len(opcode)
        .ok_or(DecodeError::InvalidTimestamp("not a short timestamp opcode"))?;
    if bytes.len() != expected {
        return Err(DecodeError::Truncated.into());
    }
    let data = fixed_u64(&bytes[..bytes.len().min(8)]);

    let mut ts = Timestamp::with_year(bits(data, 0, 7) + YEAR_BIAS)?;
    if opcode == 0x80 {
        return Ok(ts);
    }
    ts = ts.with_month(bits(data, 7, 4))?;
    if opcode == 0x81 {
        return Ok(ts);
    }
    ts = ts.with_day(bits(data, 11, 5))?;
    if opcode == 0x82 {
        return Ok(ts);
    }
    ts = ts.with_time(bits(data, 16, 5), bits(data, 21, 6))?;

    if opcode <= 0x87 {
        let utc = bits(data, 27, 1) == 1;
        ts = ts.with_offset(utc.then_some(0))?;
        if opcode >= 0x84 {
            ts = ts.with_second(bits(data, 28, 6))?;
        }
        return match opcode {
            0x85 => ts.with_fraction(fraction(bits(data, 34, 10), 3)),
            0x86 => ts.with_fraction(fraction(bits(data, 34, 20), 6)),
            0x87 => ts.with_fraction(fraction(bits(data, 34, 30), 9)),
            _ => Ok(ts),
        };
    }

    let raw_offset = bits(data, 27, 7);
    let offset =
        (raw_offset != SHORT_OFFSET_UNKNOWN).then(|| (raw_offset as i32 - SHORT_OFFSET_BIAS) * 15);
    ts = ts.with_offset(offset)?;
    if opcode >= 0x89 {
        ts = ts.with_second(bits(data, 34, 6))?;
    }
    match opcode {
        0x8A => ts.with_fraction(fraction(bits(data, 40, 10), 3)),
        0x8B => ts.with_fraction(fraction(bits(data, 40, 20), 6)),
        0x8C => {
            let nanos = (fixed_u64(&bytes[5..9]) & 0x3FFF_FFFF) as u32;
            ts.with_fraction(fraction(nanos, 9))
        }
        _ => Ok(ts),
    }
}

/// Variable-length timestamp (`0xF8`).
pub fn long_timestamp(bytes: &[u8]) -> Result<Timestamp> {
    let len = bytes.len();
    if matches!(len, 0 | 1 | 4 | 5) {
        return Err(DecodeError::InvalidTimestamp("invalid length").into());
    }
    let data = fixed_u64(&bytes[..len.min(8)]);

    let mut ts = Timestamp::with_year(bits(data, 0, 14))?;
    if len == 2 {
        return Ok(ts);
    }
    ts = ts.with_month(bits(data, 14, 4))?;
    let day = bits(data, 18, 5);
    if len == 3 && day == 0 {
        return Ok(ts);
    }
    ts = ts.with_day(day)?;
    if len == 3 {
        return Ok(ts);
    }

    ts = ts.with_time(bits(data, 23, 5), bits(data, 28, 6))?;
    let raw_offset = bits(data, 34, 12);
    let offset = (raw_offset != LONG_OFFSET_UNKNOWN).then(|| raw_offset as i32 - LONG_OFFSET_BIAS);
    ts = ts.with_offset(offset)?;
    if len == 6 {
        return Ok(ts);
    }

    ts = ts.with_second(bits(data, 46, 6))?;
    if len == 7 {
        return Ok(ts);
    }

    let (scale, n) = read_flex_uint(bytes, 7)?;
    let coefficient = fixed_uint(&bytes[7 + n..]);
    if coefficient.is_zero() && scale == 0 {
        return Ok(ts);
    }
    let scale = i64::try_from(scale).map_err(|_| DecodeError::IntegerOverflow)?;
    ts.with_fraction(Decimal::new(coefficient, -scale))
}
