//! Canonical decimal price.
//!
//! ## Overview
//!
//! A [`Price`] is `mantissa * 10^exponent` with a `u64` mantissa and an `i8`
//! exponent. The representation is canonical: the mantissa never carries a
//! trailing zero digit, so every numeric value has exactly one `Price`
//! and exactly one string form.
//!
//! ## String Form
//!
//! `"<mantissa>"` when the exponent is zero, `"<mantissa>e<exponent>"`
//! otherwise. Examples: `"375e-3"`, `"1e5"`, `"12345"`.
//!
//! ## Ordered Bytes
//!
//! [`Price::to_ordered_bytes`] produces 9 bytes whose unsigned lexicographic
//! order equals numeric order. The mantissa is right-padded with zeros to
//! 19 digits and the exponent lowered by the padding, so every encoded
//! mantissa lies in `[10^18, 10^19)` and the exponent alone decides
//! across decades:
//!
//! ```text
//! byte 0      : normalized exponent as i8, sign bit flipped
//! bytes 1..9  : normalized mantissa, u64 big-endian
//! ```
//!
//! ## Examples
//!
//! ```
//! use spot_dex::types::Price;
//!
//! let p: Price = "375e-3".parse().unwrap();
//! assert_eq!(p.mantissa(), 375);
//! assert_eq!(p.exponent(), -3);
//! assert_eq!(p.to_string(), "375e-3");
//!
//! let q: Price = "4e-1".parse().unwrap();
//! assert!(p < q);
//! assert!(p.to_ordered_bytes() < q.to_ordered_bytes());
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use num_bigint::BigInt;
use num_rational::BigRational;
use thiserror::Error;

use crate::math::pow10;

/// Maximum number of decimal digits in a mantissa.
pub const MAX_MANTISSA_DIGITS: u32 = 19;

/// Smallest allowed exponent.
pub const MIN_EXPONENT: i32 = -100;

/// Largest allowed exponent.
pub const MAX_EXPONENT: i32 = 100;

/// Length of [`Price::to_ordered_bytes`] output.
pub const ORDERED_BYTES_LEN: usize = 9;

const MIN_NORMALIZED_MANTISSA: u64 = 1_000_000_000_000_000_000;
const MAX_MANTISSA: u64 = 9_999_999_999_999_999_999;

/// Price parsing and decoding errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    #[error("price string is empty")]
    Empty,

    #[error("invalid price format: {0}")]
    InvalidFormat(String),

    #[error("price mantissa must not be zero")]
    ZeroMantissa,

    #[error("price mantissa {0} has a trailing zero")]
    TrailingZero(String),

    #[error("price mantissa {0} has more than 19 digits")]
    MantissaTooLong(String),

    #[error("price exponent {0} is outside [-100, 100]")]
    ExponentOutOfRange(i32),

    #[error("invalid ordered price bytes: {0}")]
    InvalidEncoding(String),
}

// ============================================================================
// Price
// ============================================================================

/// Canonical decimal price, see module docs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Price {
    exponent: i8,
    mantissa: u64,
}

impl Price {
    /// Build a price from its parts, enforcing canonical form.
    pub fn new(mantissa: u64, exponent: i32) -> Result<Self, PriceError> {
        if mantissa == 0 {
            return Err(PriceError::ZeroMantissa);
        }
        if mantissa % 10 == 0 {
            return Err(PriceError::TrailingZero(mantissa.to_string()));
        }
        if mantissa > MAX_MANTISSA {
            return Err(PriceError::MantissaTooLong(mantissa.to_string()));
        }
        if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&exponent) {
            return Err(PriceError::ExponentOutOfRange(exponent));
        }
        Ok(Self {
            exponent: exponent as i8,
            mantissa,
        })
    }

    /// Parse the canonical string form.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        if s.is_empty() {
            return Err(PriceError::Empty);
        }
        let (mantissa_str, exponent_str) = match s.split_once('e') {
            Some((m, e)) => (m, Some(e)),
            None => (s, None),
        };

        let mantissa = parse_mantissa(s, mantissa_str)?;
        let exponent = match exponent_str {
            Some(e) => parse_exponent(s, e)?,
            None => 0,
        };

        Self::new(mantissa, exponent)
    }

    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    pub fn exponent(&self) -> i32 {
        self.exponent as i32
    }

    /// Exact rational value, reduced.
    pub fn to_rational(&self) -> BigRational {
        let m = BigInt::from(self.mantissa);
        let e = self.exponent as i32;
        if e >= 0 {
            BigRational::new(m * pow10(e as u32), BigInt::from(1u8))
        } else {
            BigRational::new(m, pow10(e.unsigned_abs()))
        }
    }

    /// Order-preserving fixed-width encoding.
    pub fn to_ordered_bytes(&self) -> [u8; ORDERED_BYTES_LEN] {
        let pad = MAX_MANTISSA_DIGITS - digit_count(self.mantissa);
        // pad <= 18, so the product stays below 10^19
        let mantissa = self.mantissa * 10u64.pow(pad);
        // lowest value is -100 - 18 = -118, inside i8
        let exponent = (self.exponent as i16 - pad as i16) as i8;

        let mut out = [0u8; ORDERED_BYTES_LEN];
        out[0] = (exponent as u8) ^ 0x80;
        out[1..].copy_from_slice(&mantissa.to_be_bytes());
        out
    }

    /// Inverse of [`Price::to_ordered_bytes`].
    pub fn from_ordered_bytes(bytes: &[u8]) -> Result<Self, PriceError> {
        if bytes.len() != ORDERED_BYTES_LEN {
            return Err(PriceError::InvalidEncoding(format!(
                "expected {} bytes, got {}",
                ORDERED_BYTES_LEN,
                bytes.len()
            )));
        }
        let mut exponent = ((bytes[0] ^ 0x80) as i8) as i32;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[1..]);
        let mut mantissa = u64::from_be_bytes(raw);

        if !(MIN_NORMALIZED_MANTISSA..=MAX_MANTISSA).contains(&mantissa) {
            return Err(PriceError::InvalidEncoding(format!(
                "mantissa {} is not normalized",
                mantissa
            )));
        }
        while mantissa % 10 == 0 {
            mantissa /= 10;
            exponent += 1;
        }

        Self::new(mantissa, exponent).map_err(|e| PriceError::InvalidEncoding(e.to_string()))
    }
}

fn digit_count(mut v: u64) -> u32 {
    let mut n = 1;
    while v >= 10 {
        v /= 10;
        n += 1;
    }
    n
}

fn parse_mantissa(input: &str, m: &str) -> Result<u64, PriceError> {
    if m.is_empty() || !m.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PriceError::InvalidFormat(input.to_string()));
    }
    if m.len() > MAX_MANTISSA_DIGITS as usize {
        return Err(PriceError::MantissaTooLong(m.to_string()));
    }
    if m.starts_with('0') {
        if m.bytes().all(|b| b == b'0') {
            return Err(PriceError::ZeroMantissa);
        }
        return Err(PriceError::InvalidFormat(input.to_string()));
    }
    if m.ends_with('0') {
        return Err(PriceError::TrailingZero(m.to_string()));
    }
    m.parse::<u64>()
        .map_err(|_| PriceError::InvalidFormat(input.to_string()))
}

fn parse_exponent(input: &str, e: &str) -> Result<i32, PriceError> {
    let digits = e.strip_prefix('-').unwrap_or(e);
    // "0", "-0", leading zeros and signs other than '-' are not canonical
    if digits.is_empty()
        || !digits.bytes().all(|b| b.is_ascii_digit())
        || digits.starts_with('0')
        || digits.len() > 3
    {
        return Err(PriceError::InvalidFormat(input.to_string()));
    }
    let value: i32 = e
        .parse()
        .map_err(|_| PriceError::InvalidFormat(input.to_string()))?;
    if !(MIN_EXPONENT..=MAX_EXPONENT).contains(&value) {
        return Err(PriceError::ExponentOutOfRange(value));
    }
    Ok(value)
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Price::parse(s)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent == 0 {
            write!(f, "{}", self.mantissa)
        } else {
            write!(f, "{}e{}", self.mantissa, self.exponent)
        }
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_rational().cmp(&other.to_rational())
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
