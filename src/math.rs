//! Exact rational helpers.
//!
//! Prices span `10^-118 ..= 10^119` after normalization, far beyond any
//! fixed-width integer, so every computation that mixes prices and
//! quantities goes through `num-bigint`/`num-rational`. Nothing here
//! touches floating point.

use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive};
use rust_decimal::Decimal;

/// `10^exp` as a big integer.
pub fn pow10(exp: u32) -> BigInt {
    num_traits::pow(BigInt::from(10u8), exp as usize)
}

/// `10^exp` as an exact rational, negative exponents included.
pub fn pow10_rational(exp: i32) -> BigRational {
    if exp >= 0 {
        BigRational::from_integer(pow10(exp.unsigned_abs()))
    } else {
        BigRational::new(BigInt::one(), pow10(exp.unsigned_abs()))
    }
}

/// Number of decimal digits of a positive integer.
fn digits(n: &BigInt) -> i32 {
    n.magnitude().to_str_radix(10).len() as i32
}

/// Exact `ceil(log10(x))` for a positive rational.
///
/// With `x = n/d`, `x` lies in `(10^(l-1), 10^(l+1))` where
/// `l = digits(n) - digits(d)`, so the answer is `l` when `x <= 10^l`
/// and `l + 1` otherwise. An exact power of ten maps to its own exponent.
///
/// Returns `None` for `x <= 0`.
pub fn ceil_log10(x: &BigRational) -> Option<i32> {
    if !x.is_positive() {
        return None;
    }
    let l = digits(x.numer()) - digits(x.denom());
    if *x <= pow10_rational(l) {
        Some(l)
    } else {
        Some(l + 1)
    }
}

/// Largest integer not above `x`.
pub fn floor_int(x: &BigRational) -> BigInt {
    x.floor().to_integer()
}

/// Smallest integer not below `x`.
pub fn ceil_int(x: &BigRational) -> BigInt {
    x.ceil().to_integer()
}

/// Integer division rounding towards negative infinity.
pub fn int_quo(a: &BigInt, b: &BigInt) -> BigInt {
    a.div_floor(b)
}

pub fn rational_from_u128(v: u128) -> BigRational {
    BigRational::from_integer(BigInt::from(v))
}

/// Converts a non-negative big integer to `u128`, `None` on overflow or sign.
pub fn to_u128(v: &BigInt) -> Option<u128> {
    v.to_u128()
}

/// Exact rational value of a decimal.
pub fn rational_from_decimal(d: Decimal) -> BigRational {
    let numer = BigInt::from(d.mantissa());
    let denom = pow10(d.scale());
    BigRational::new(numer, denom)
}

/// True when the rational has no fractional part.
pub fn is_integer(x: &BigRational) -> bool {
    x.is_integer()
}

// ============================================================================
// Unit Tests
// ============================================================================
