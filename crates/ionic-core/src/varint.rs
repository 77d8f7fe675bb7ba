//! Ion 1.0 VarUInt / VarInt codec.
//!
//! Seven data bits per byte, most significant group first. The last byte of an
//! encoding has its high bit set. For VarInt the first byte spends bit 0x40 on
//! the sign, leaving six magnitude bits.
//!
//! Values are bounded to the signed 32-bit range: symbol IDs, lengths and
//! exponents never need more, and anything larger is rejected with
//! [`DecodeError::IntegerTooLarge`].

use crate::error::{DecodeError, Result, eof};

const END_FLAG: u8 = 0x80;
const SIGN_FLAG: u8 = 0x40;
const LIMIT: u64 = i32::MAX as u64;

/// Read a VarUInt at `pos`, returning `(value, bytes_consumed)`.
#[inline]
pub fn read_var_uint(buf: &[u8], pos: usize) -> Result<(usize, usize)> {
    let first = *buf.get(pos).ok_or_else(|| eof(pos))?;
    if first & END_FLAG != 0 {
        return Ok(((first & 0x7F) as usize, 1));
    }
    let mut value = first as u64;
    let mut i = pos + 1;
    loop {
        let byte = *buf.get(i).ok_or_else(|| eof(i))?;
        value = (value << 7) | (byte & 0x7F) as u64;
        if value > LIMIT {
            return Err(DecodeError::IntegerTooLarge.into());
        }
        i += 1;
        if byte & END_FLAG != 0 {
            return Ok((value as usize, i - pos));
        }
    }
}

/// Read a VarInt at `pos`, returning `(value, bytes_consumed)`.
///
/// Negative zero decodes as `0`; callers that care (timestamp offsets) inspect
/// the raw byte themselves.
#[inline]
pub fn read_var_int(buf: &[u8], pos: usize) -> Result<(i32, usize)> {
    let first = *buf.get(pos).ok_or_else(|| eof(pos))?;
    let negative = first & SIGN_FLAG != 0;
    let mut magnitude = (first & 0x3F) as u64;
    let mut i = pos + 1;
    if first & END_FLAG == 0 {
        loop {
            let byte = *buf.get(i).ok_or_else(|| eof(i))?;
            magnitude = (magnitude << 7) | (byte & 0x7F) as u64;
            if magnitude > LIMIT {
                return Err(DecodeError::IntegerTooLarge.into());
            }
            i += 1;
            if byte & END_FLAG != 0 {
                break;
            }
        }
    }
    let value = magnitude as i32;
    Ok((if negative { -value } else { value }, i - pos))
}

/// Number of bytes `write_var_uint` uses for `value`.
pub fn var_uint_len(value: u32) -> usize {
    let bits = 32 - value.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Append the minimal VarUInt encoding of `value`, returning its length.
pub fn write_var_uint(value: u32, out: &mut Vec<u8>) -> usize {
    let len = var_uint_len(value);
    for i in (0..len).rev() {
        let mut byte = ((value >> (7 * i)) & 0x7F) as u8;
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
    len
}

/// Append the minimal VarInt encoding of `value`, returning its length.
pub fn write_var_int(value: i32, out: &mut Vec<u8>) -> usize {
    let magnitude = value.unsigned_abs();
    let bits = 32 - magnitude.leading_zeros() as usize;
    // Six bits fit in the first byte, every further byte adds seven.
    let len = if bits <= 6 { 1 } else { 1 + (bits - 6).div_ceil(7) };
    for i in (0..len).rev() {
        let shift = 7 * i;
        let mut byte = if i == len - 1 {
            let mut b = ((magnitude >> shift) & 0x3F) as u8;
            if value < 0 {
                b |= SIGN_FLAG;
            }
            b
        } else {
            ((magnitude >> shift) & 0x7F) as u8
        };
        if i == 0 {
            byte |= END_FLAG;
        }
        out.push(byte);
    }
    len
}
