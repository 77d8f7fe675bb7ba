//! Ion 1.1 FlexUInt / FlexInt / FixedInt / FlexSym codec.
//!
//! A FlexUInt stores its own length in unary: the number of trailing zero bits
//! in the first byte plus one is the total byte count. The value is the
//! little-endian payload shifted right by that count. FlexInt is the same
//! layout holding a two's-complement value.

use num_bigint::{BigInt, BigUint};

use crate::error::{DecodeError, Result, eof};
use crate::value::Int;

/// Longest Flex encoding we accept. Eight bytes carry 56 value bits.
const MAX_FLEX_LEN: usize = 8;

#[inline]
fn flex_len(buf: &[u8], pos: usize) -> Result<usize> {
    let first = *buf.get(pos).ok_or_else(|| eof(pos))?;
    if first == 0 {
        return Err(DecodeError::IntegerOverflow.into());
    }
    let len = first.trailing_zeros() as usize + 1;
    if pos + len > buf.len() {
        return Err(eof(buf.len()));
    }
    Ok(len)
}

#[inline]
fn load_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

/// Read a FlexUInt at `pos`, returning `(value, bytes_consumed)`.
#[inline]
pub fn read_flex_uint(buf: &[u8], pos: usize) -> Result<(u64, usize)> {
    let first = *buf.get(pos).ok_or_else(|| eof(pos))?;
    if first & 1 == 1 {
        return Ok(((first >> 1) as u64, 1));
    }
    let len = flex_len(buf, pos)?;
    let raw = load_le(&buf[pos..pos + len]);
    Ok((raw >> len, len))
}

/// Read a FlexInt at `pos`, returning `(value, bytes_consumed)`.
#[inline]
pub fn read_flex_int(buf: &[u8], pos: usize) -> Result<(i64, usize)> {
    let len = flex_len(buf, pos)?;
    let raw = load_le(&buf[pos..pos + len]);
    let unused = 64 - 8 * len as u32;
    let signed = ((raw << unused) as i64) >> unused;
    Ok((signed >> len, len))
}

/// FlexUInt narrowed to `usize`, for lengths and addresses.
#[inline]
pub fn read_flex_len(buf: &[u8], pos: usize) -> Result<(usize, usize)> {
    let (value, len) = read_flex_uint(buf, pos)?;
    let value = usize::try_from(value).map_err(|_| DecodeError::IntegerOverflow)?;
    Ok((value, len))
}

/// Little-endian two's-complement integer spanning all of `bytes`.
pub fn fixed_int(bytes: &[u8]) -> Int {
    match bytes.len() {
        0 => Int::Small(0),
        n if n <= MAX_FLEX_LEN => {
            let unused = 64 - 8 * n as u32;
            Int::Small(((load_le(bytes) << unused) as i64) >> unused)
        }
        _ => Int::from(BigInt::from_signed_bytes_le(bytes)),
    }
}

/// Little-endian unsigned integer spanning all of `bytes`.
pub fn fixed_uint(bytes: &[u8]) -> Int {
    if bytes.len() < MAX_FLEX_LEN {
        Int::Small(load_le(bytes) as i64)
    } else {
        Int::from(BigInt::from(BigUint::from_bytes_le(bytes)))
    }
}

/// Little-endian unsigned value of at most eight bytes.
#[inline]
pub fn fixed_u64(bytes: &[u8]) -> u64 {
    load_le(bytes)
}

/// A decoded FlexSym.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FlexSym<'a> {
    /// Symbol ID in the active symbol table.
    Sid(usize),
    /// Inline UTF-8 text.
    Text(&'a str),
    /// Symbol ID in the system symbol table.
    System(u8),
    /// End of a delimited struct.
    End,
}

/// Read a FlexSym at `pos`, returning `(symbol, bytes_consumed)`.
pub fn read_flex_sym(buf: &[u8], pos: usize) -> Result<(FlexSym<'_>, usize)> {
    let (value, len) = read_flex_int(buf, pos)?;
    if value > 0 {
        let sid = usize::try_from(value).map_err(|_| DecodeError::IntegerOverflow)?;
        return Ok((FlexSym::Sid(sid), len));
    }
    if value < 0 {
        let text_len = value.unsigned_abs() as usize;
        let start = pos + len;
        let end = start + text_len;
        let bytes = buf.get(start..end).ok_or_else(|| eof(buf.len()))?;
        let text =
            std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8 { position: start })?;
        return Ok((FlexSym::Text(text), len + text_len));
    }
    let escape_pos = pos + len;
    let escape = *buf.get(escape_pos).ok_or_else(|| eof(escape_pos))?;
    let sym = match escape {
        0xF0 => FlexSym::End,
        0x60..=0xDF => FlexSym::System(escape - 0x60),
        _ => {
            return Err(DecodeError::InvalidOpcode {
                opcode: escape,
                position: escape_pos,
            }
            .into());
        }
    };
    Ok((sym, len + 1))
}

/// Append the minimal FlexUInt encoding of `value`, returning its length.
///
/// Panics if `value` needs more than 56 bits.
pub fn write_flex_uint(value: u64, out: &mut Vec<u8>) -> usize {
    let bits = (64 - value.leading_zeros() as usize).max(1);
    let len = bits.div_ceil(7);
    assert!(len <= MAX_FLEX_LEN, "FlexUInt value too large: {value}");
    let encoded = (value << len) | (1 << (len - 1));
    out.extend_from_slice(&encoded.to_le_bytes()[..len]);
    len
}

/// Append the minimal FlexInt encoding of `value`, returning its length.
///
/// Panics if `value` needs more than 56 bits.
pub fn write_flex_int(value: i64, out: &mut Vec<u8>) -> usize {
    let magnitude_bits = if value < 0 {
        64 - (!value).leading_zeros() as usize
    } else {
        64 - value.leading_zeros() as usize
    };
    let len = (magnitude_bits + 1).div_ceil(7);
    assert!(len <= MAX_FLEX_LEN, "FlexInt value too large: {value}");
    let encoded = ((value << len) as u64) | (1 << (len - 1));
    out.extend_from_slice(&encoded.to_le_bytes()[..len]);
    len
}
