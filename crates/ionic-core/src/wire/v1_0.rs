//! Ion 1.0 scalar payloads.

use crate::error::{DecodeError, Result};
use crate::value::{Decimal, Int, Precision, Timestamp};
use crate::varint::{read_var_int, read_var_uint};

/// VarInt byte encoding negative zero, used for the unknown timestamp offset.
const NEGATIVE_ZERO: u8 = 0xC0;

/// Big-endian magnitude with the sign taken from the type code.
pub fn int(bytes: &[u8], negative: bool) -> Int {
    Int::from_magnitude_be(bytes, negative)
}

/// Big-endian unsigned value of at most four bytes, used for symbol IDs.
pub fn sid(bytes: &[u8]) -> Result<usize> {
    if bytes.len() > 4 {
        return Err(DecodeError::IntegerTooLarge.into());
    }
    let value = bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64);
    if value > i32::MAX as u64 {
        return Err(DecodeError::IntegerTooLarge.into());
    }
    Ok(value as usize)
}

pub fn float(bytes: &[u8]) -> Result<f64> {
    match bytes.len() {
        0 => Ok(0.0),
        4 => Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64),
        8 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(bytes);
            Ok(f64::from_be_bytes(raw))
        }
        n => Err(DecodeError::InvalidFloatLength(n).into()),
    }
}

/// Sign-and-magnitude integer: the high bit of the first byte is the sign.
/// Returns the value and whether the sign bit was set.
fn signed_magnitude(bytes: &[u8]) -> (Int, bool) {
    let Some((&first, rest)) = bytes.split_first() else {
        return (Int::Small(0), false);
    };
    let negative = first & 0x80 != 0;
    let mut magnitude = Vec::with_capacity(bytes.len());
    magnitude.push(first & 0x7F);
    magnitude.extend_from_slice(rest);
    (Int::from_magnitude_be(&magnitude, negative), negative)
}

/// VarInt exponent followed by a sign-and-magnitude coefficient.
pub fn decimal(bytes: &[u8]) -> Result<Decimal> {
    if bytes.is_empty() {
        return Ok(Decimal::zero());
    }
    let (exponent, n) = read_var_int(bytes, 0)?;
    let (coefficient, negative) = signed_magnitude(&bytes[n..]);
    if negative && coefficient.is_zero() {
        return Ok(Decimal::negative_zero(exponent as i64));
    }
    Ok(Decimal::new(coefficient, exponent as i64))
}

/// Offset, year, then optional month, day, hour+minute, second and fraction.
pub fn timestamp(bytes: &[u8]) -> Result<Timestamp> {
    let mut pos = 0;
    let offset = match bytes.first() {
        None => return Err(DecodeError::InvalidTimestamp("empty payload").into()),
        Some(&NEGATIVE_ZERO) => {
            pos += 1;
            None
        }
        Some(_) => {
            let (offset, n) = read_var_int(bytes, pos)?;
            pos += n;
            Some(offset)
        }
    };

    let field = |pos: &mut usize| -> Result<u32> {
        let (value, n) = read_var_uint(bytes, *pos)?;
        *pos += n;
        Ok(value as u32)
    };

    let mut ts = Timestamp::with_year(field(&mut pos)?)?;
    if pos < bytes.len() {
        ts = ts.with_month(field(&mut pos)?)?;
    }
    if pos < bytes.len() {
        ts = ts.with_day(field(&mut pos)?)?;
    }
    if pos < bytes.len() {
        let hour = field(&mut pos)?;
        if pos >= bytes.len() {
            return Err(DecodeError::InvalidTimestamp("hour without minute").into());
        }
        let minute = field(&mut pos)?;
        ts = ts.with_time(hour, minute)?;
    }
    if pos < bytes.len() {
        ts = ts.with_second(field(&mut pos)?)?;
    }
    if pos < bytes.len() {
        let fraction = decimal(&bytes[pos..])?;
        if fraction.is_negative_zero() {
            return Err(DecodeError::InvalidTimestamp("negative fraction").into());
        }
        if !(fraction.coefficient().is_zero() && fraction.exponent() >= 0) {
            ts = ts.with_fraction(fraction)?;
        }
    }
    if ts.precision() >= Precision::Minute {
        ts = ts.with_offset(offset)?;
    }
    Ok(ts)
}
