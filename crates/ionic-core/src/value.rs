//! Scalar value types that do not map onto a Rust primitive.

use std::fmt;

use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};

use crate::error::{DecodeError, Result};

/// Arbitrary-precision integer, kept inline when it fits in `i64`.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Int {
    Small(i64),
    Big(BigInt),
}

impl Int {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Int::Small(v) => Some(*v),
            Int::Big(b) => b.to_i64(),
        }
    }

    pub fn to_big(&self) -> BigInt {
        match self {
            Int::Small(v) => BigInt::from(*v),
            Int::Big(b) => b.clone(),
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            Int::Small(v) => *v == 0,
            Int::Big(b) => b.is_zero(),
        }
    }

    pub fn negate(self) -> Self {
        match self {
            Int::Small(v) => match v.checked_neg() {
                Some(n) => Int::Small(n),
                None => Int::Big(-BigInt::from(v)),
            },
            Int::Big(b) => Int::from(-b),
        }
    }

    /// Build from a big-endian magnitude.
    pub fn from_magnitude_be(bytes: &[u8], negative: bool) -> Self {
        let magnitude = if bytes.len() <= 7 {
            Int::Small(bytes.iter().fold(0i64, |acc, &b| (acc << 8) | b as i64))
        } else {
            Int::from(BigInt::from_bytes_be(num_bigint::Sign::Plus, bytes))
        };
        if negative { magnitude.negate() } else { magnitude }
    }
}

impl From<i64> for Int {
    fn from(v: i64) -> Self {
        Int::Small(v)
    }
}

impl From<BigInt> for Int {
    fn from(b: BigInt) -> Self {
        match b.to_i64() {
            Some(v) => Int::Small(v),
            None => Int::Big(b),
        }
    }
}

impl fmt::Display for Int {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Int::Small(v) => write!(f, "{v}"),
            Int::Big(b) => write!(f, "{b}"),
        }
    }
}

/// Decimal number `coefficient * 10^exponent`.
///
/// Negative zero is representable and distinct from zero.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Decimal {
    coefficient: Int,
    exponent: i64,
    negative_zero: bool,
}

impl Decimal {
    pub fn new(coefficient: impl Into<Int>, exponent: i64) -> Self {
        Self {
            coefficient: coefficient.into(),
            exponent,
            negative_zero: false,
        }
    }

    pub fn negative_zero(exponent: i64) -> Self {
        Self {
            coefficient: Int::Small(0),
            exponent,
            negative_zero: true,
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    pub fn coefficient(&self) -> &Int {
        &self.coefficient
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn is_negative_zero(&self) -> bool {
        self.negative_zero
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative_zero {
            f.write_str("-")?;
        }
        write!(f, "{}d{}", self.coefficient, self.exponent)
    }
}

/// How much of a timestamp is present.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Fraction,
}

/// An Ion timestamp with the fields exactly as encoded.
///
/// Builders validate ranges but not calendar consistency (February 31st is
/// the caller's problem).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    fraction: Option<Decimal>,
    /// Offset in minutes. `None` is the unknown offset (`-00:00`).
    offset: Option<i16>,
    precision: Precision,
}

impl Timestamp {
    pub fn with_year(year: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(DecodeError::InvalidTimestamp("year out of range").into());
        }
        Ok(Self {
            year: year as u16,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            fraction: None,
            offset: None,
            precision: Precision::Year,
        })
    }

    pub fn with_month(mut self, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(DecodeError::InvalidTimestamp("month out of range").into());
        }
        self.month = month as u8;
        self.precision = Precision::Month;
        Ok(self)
    }

    pub fn with_day(mut self, day: u32) -> Result<Self> {
        if !(1..=31).contains(&day) {
            return Err(DecodeError::InvalidTimestamp("day out of range").into());
        }
        self.day = day as u8;
        self.precision = Precision::Day;
        Ok(self)
    }

    pub fn with_time(mut self, hour: u32, minute: u32) -> Result<Self> {
        if hour > 23 || minute > 59 {
            return Err(DecodeError::InvalidTimestamp("time out of range").into());
        }
        self.hour = hour as u8;
        self.minute = minute as u8;
        self.precision = Precision::Minute;
        Ok(self)
    }

    pub fn with_second(mut self, second: u32) -> Result<Self> {
        if second > 59 {
            return Err(DecodeError::InvalidTimestamp("second out of range").into());
        }
        self.second = second as u8;
        self.precision = Precision::Second;
        Ok(self)
    }

    /// Fractional seconds. Must lie in `[0, 1)`.
    pub fn with_fraction(mut self, fraction: Decimal) -> Result<Self> {
        let in_range = match fraction.coefficient.as_i64() {
            Some(c) if c < 0 => false,
            Some(0) => true,
            Some(c) => fraction.exponent < 0 && digits(c) <= fraction.exponent.unsigned_abs(),
            None => false,
        };
        if !in_range {
            return Err(DecodeError::InvalidTimestamp("fraction out of range").into());
        }
        self.fraction = Some(fraction);
        self.precision = Precision::Fraction;
        Ok(self)
    }

    pub fn with_offset(mut self, offset_minutes: Option<i32>) -> Result<Self> {
        match offset_minutes {
            Some(m) if m.abs() >= 24 * 60 => {
                Err(DecodeError::InvalidTimestamp("offset out of range").into())
            }
            m => {
                self.offset = m.map(|m| m as i16);
                Ok(self)
            }
        }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn fraction(&self) -> Option<&Decimal> {
        self.fraction.as_ref()
    }

    pub fn offset_minutes(&self) -> Option<i16> {
        self.offset
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

fn digits(mut v: i64) -> u64 {
    let mut n = 1;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if self.precision == Precision::Year {
            return f.write_str("T");
        }
        write!(f, "-{:02}", self.month)?;
        if self.precision == Precision::Month {
            return f.write_str("T");
        }
        write!(f, "-{:02}", self.day)?;
        if self.precision == Precision::Day {
            return Ok(());
        }
        write!(f, "T{:02}:{:02}", self.hour, self.minute)?;
        if self.precision >= Precision::Second {
            write!(f, ":{:02}", self.second)?;
        }
        if let Some(fraction) = &self.fraction
            && fraction.exponent < 0
        {
            let width = fraction.exponent.unsigned_abs() as usize;
            let digits = fraction.coefficient.to_string();
            write!(f, ".{digits:0>width$}")?;
        }
        match self.offset {
            None => f.write_str("-00:00"),
            Some(0) => f.write_str("Z"),
            Some(m) => {
                let sign = if m < 0 { '-' } else { '+' };
                let m = m.unsigned_abs();
                write!(f, "{sign}{:02}:{:02}", m / 60, m % 60)
            }
        }
    }
}
