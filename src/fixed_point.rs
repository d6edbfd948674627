//! Fixed point numbers with 63 fractional bits, stored as a single scalar
//!
//! A value `x` is represented by `repr = floor(x * 2^63) mod r`. Conversions
//! from floats go through exact integer arithmetic so that committed prices
//! do not depend on float rounding.

use std::fmt;
use std::ops::{Add, Sub};

use num_bigint::BigUint;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::FIXED_POINT_PRECISION_BITS;
use crate::errors::{CoreError, CoreResult};
use crate::scalar::Scalar;

const F64_MANTISSA_BITS: u32 = 52;
const F64_EXPONENT_BIAS: i64 = 1075;

#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FixedPoint {
    /// The scaled integer representation, `floor(value * 2^63)`
    pub repr: Scalar,
}

impl FixedPoint {
    pub fn zero() -> Self {
        Self { repr: Scalar::zero() }
    }

    pub fn from_repr(repr: Scalar) -> Self {
        Self { repr }
    }

    pub fn repr(&self) -> Scalar {
        self.repr
    }

    pub fn from_integer(value: u64) -> Self {
        let shifted = (value as u128) << FIXED_POINT_PRECISION_BITS;
        Self { repr: Scalar::from(shifted) }
    }

    /// Compute `floor(value * 2^63)` exactly from the float's bit pattern
    pub fn from_f64(value: f64) -> CoreResult<Self> {
        if !value.is_finite() {
            return Err(CoreError::Encoding(format!(
                "cannot represent {} as a fixed point",
                value
            )));
        }

        // value = mantissa * 2^exponent exactly
        let bits = value.to_bits();
        let negative = bits >> 63 == 1;
        let biased_exponent = ((bits >> F64_MANTISSA_BITS) & 0x7ff) as i64;
        let fraction = bits & ((1u64 << F64_MANTISSA_BITS) - 1);
        let (mantissa, exponent) = if biased_exponent == 0 {
            (fraction, 1 - F64_EXPONENT_BIAS)
        } else {
            (fraction | (1u64 << F64_MANTISSA_BITS), biased_exponent - F64_EXPONENT_BIAS)
        };

        let mantissa = BigUint::from(mantissa);
        let shift = exponent + FIXED_POINT_PRECISION_BITS as i64;
        let (truncated, exact) = if shift >= 0 {
            (mantissa << shift as u64, true)
        } else {
            let down = (-shift) as u64;
            let truncated = &mantissa >> down;
            let exact = (&truncated << down) == mantissa;
            (truncated, exact)
        };

        // Truncation rounds toward zero, floor needs one more step down for negatives
        let repr = if negative {
            let magnitude = if exact { truncated } else { truncated + 1u32 };
            -Scalar::from_biguint(&magnitude)
        } else {
            Scalar::from_biguint(&truncated)
        };

        Ok(Self { repr })
    }

    /// Approximate the value as a float, for display only
    ///
    /// Representatives above r/2 are read as negative values.
    pub fn to_f64(&self) -> f64 {
        let canonical = self.repr.to_biguint();
        let modulus = Scalar::modulus();
        let (negative, magnitude) = if canonical > (&modulus >> 1u32) {
            (true, modulus - canonical)
        } else {
            (false, canonical)
        };

        let unscaled = magnitude
            .iter_u64_digits()
            .rev()
            .fold(0f64, |acc, digit| acc * 2f64.powi(64) + digit as f64);
        let value = unscaled / 2f64.powi(FIXED_POINT_PRECISION_BITS as i32);
        if negative {
            -value
        } else {
            value
        }
    }

    /// The integer part, `floor(repr / 2^63)`
    pub fn floor(&self) -> BigUint {
        self.repr.to_biguint() >> FIXED_POINT_PRECISION_BITS
    }

    /// Compute `floor(repr * amount / 2^63)` without leaving the integers
    pub fn floor_mul_int(&self, amount: u128) -> Scalar {
        let product = self.repr.to_biguint() * BigUint::from(amount);
        Scalar::from_biguint(&(product >> FIXED_POINT_PRECISION_BITS))
    }

    /// Compute `ceil(amount * 2^63 / repr)`, the smallest amount that buys
    /// `amount` units at price `fp`
    pub fn ceil_div_int(amount: u128, fp: &FixedPoint) -> CoreResult<Scalar> {
        if fp.repr.is_zero() {
            return Err(CoreError::DivisionByZero);
        }

        let numerator = BigUint::from(amount) << FIXED_POINT_PRECISION_BITS;
        let denominator = fp.repr.to_biguint();
        let quotient = (numerator + &denominator - 1u32) / denominator;
        Ok(Scalar::from_biguint(&quotient))
    }

    pub fn to_repr_decimal_string(&self) -> String {
        self.repr.to_decimal_string()
    }

    pub fn from_repr_decimal_string(decimal: &str) -> CoreResult<Self> {
        Scalar::from_decimal_str(decimal).map(Self::from_repr)
    }
}

impl Add for FixedPoint {
    type Output = FixedPoint;
    fn add(self, rhs: FixedPoint) -> FixedPoint {
        FixedPoint::from_repr(self.repr + rhs.repr)
    }
}

impl Sub for FixedPoint {
    type Output = FixedPoint;
    fn sub(self, rhs: FixedPoint) -> FixedPoint {
        FixedPoint::from_repr(self.repr - rhs.repr)
    }
}

impl fmt::Debug for FixedPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FixedPoint({})", self.to_f64())
    }
}

impl Serialize for FixedPoint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_repr_decimal_string())
    }
}

impl<'de> Deserialize<'de> for FixedPoint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let decimal = String::deserialize(deserializer)?;
        FixedPoint::from_repr_decimal_string(&decimal).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_pow_63() -> BigUint {
        BigUint::from(1u8) << 63u32
    }

    #[test]
    fn test_exact_powers_of_two() {
        assert_eq!(FixedPoint::from_f64(1.0).unwrap(), FixedPoint::from_integer(1));
        assert_eq!(
            FixedPoint::from_f64(0.5).unwrap().repr.to_biguint(),
            BigUint::from(1u8) << 62u32
        );
        assert_eq!(FixedPoint::from_f64(0.0).unwrap(), FixedPoint::zero());
    }

    #[test]
    fn test_float_roundtrip() {
        let values = [
            0.0, 1.0, 0.1, 3.14159, 999.999, 123.456789, 1e-9, -1.0, -0.75, -999.5, 42.0,
        ];
        for value in values {
            let fp = FixedPoint::from_f64(value).unwrap();
            assert!(
                (fp.to_f64() - value).abs() < 1e-10,
                "roundtrip of {} gave {}",
                value,
                fp.to_f64()
            );
        }
    }

    #[test]
    fn test_floor_semantics() {
        // Below the precision floor positive values truncate to zero
        assert!(FixedPoint::from_f64(1e-30).unwrap().repr.is_zero());
        // Negative values floor away from zero
        assert_eq!(FixedPoint::from_f64(-1e-30).unwrap().repr, -Scalar::one());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(FixedPoint::from_f64(f64::NAN).is_err());
        assert!(FixedPoint::from_f64(f64::INFINITY).is_err());
    }

    #[test]
    fn test_floor_mul_int() {
        let fp = FixedPoint::from_f64(1.5).unwrap();
        assert_eq!(fp.floor_mul_int(3), Scalar::from(4u64));
        assert_eq!(fp.floor_mul_int(4), Scalar::from(6u64));

        let fp = FixedPoint::from_f64(0.3).unwrap();
        let amount = 1_000_000_007u128;
        let expected = (fp.repr.to_biguint() * BigUint::from(amount)) / two_pow_63();
        assert_eq!(fp.floor_mul_int(amount).to_biguint(), expected);
    }

    #[test]
    fn test_ceil_div_int() {
        let fp = FixedPoint::from_f64(1.5).unwrap();
        assert_eq!(FixedPoint::ceil_div_int(3, &fp).unwrap(), Scalar::from(2u64));
        assert_eq!(FixedPoint::ceil_div_int(4, &fp).unwrap(), Scalar::from(3u64));
        assert_eq!(
            FixedPoint::ceil_div_int(4, &FixedPoint::zero()),
            Err(CoreError::DivisionByZero)
        );
    }

    #[test]
    fn test_floor() {
        let fp = FixedPoint::from_f64(12.75).unwrap();
        assert_eq!(fp.floor(), BigUint::from(12u8));
    }

    #[test]
    fn test_repr_decimal_string() {
        let fp = FixedPoint::from_f64(2.25).unwrap();
        let decimal = fp.to_repr_decimal_string();
        assert_eq!(decimal, (BigUint::from(9u8) << 61u32).to_str_radix(10));
        assert_eq!(FixedPoint::from_repr_decimal_string(&decimal).unwrap(), fp);
        assert!(FixedPoint::from_repr_decimal_string("1.5").is_err());
    }

    #[test]
    fn test_serde_uses_repr_decimal() {
        let fp = FixedPoint::from_integer(1);
        let json = serde_json::to_string(&fp).unwrap();
        assert_eq!(json, format!("\"{}\"", two_pow_63()));
        let back: FixedPoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fp);
    }
}
