//! Elements of the bn254 scalar field
//!
//! Every constructor reduces its input modulo r, so a `Scalar` always holds
//! the canonical representative.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use ark_bn254::Fr as Fq;
use ark_ff::{BigInteger, Field, One, PrimeField, Zero};
use num_bigint::BigUint;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{CoreError, CoreResult};

/// Number of bytes in the canonical big-endian encoding
pub const SCALAR_BYTES: usize = 32;

// F_q here is the scalar field of bn254, the circuit's native field
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scalar(pub(crate) Fq);

impl Scalar {
    pub fn zero() -> Self {
        Scalar(Fq::zero())
    }

    pub fn one() -> Self {
        Scalar(Fq::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.0.is_one()
    }

    /// Sample a uniform scalar from the thread rng
    ///
    /// 64 random bytes are reduced so the modular bias is negligible.
    pub fn random() -> Self {
        let mut bytes = [0u8; 2 * SCALAR_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Scalar(Fq::from_le_bytes_mod_order(&bytes))
    }

    pub fn inverse(&self) -> CoreResult<Self> {
        self.0.inverse().map(Scalar).ok_or(CoreError::DivisionByZero)
    }

    /// The field modulus r
    pub fn modulus() -> BigUint {
        BigUint::from(Fq::MODULUS)
    }

    // --- Byte and text encodings ---

    pub fn to_bytes_be(&self) -> [u8; SCALAR_BYTES] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; SCALAR_BYTES];
        out[SCALAR_BYTES - bytes.len()..].copy_from_slice(&bytes);
        out
    }

    pub fn from_be_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != SCALAR_BYTES {
            return Err(CoreError::Encoding(format!(
                "expected {} bytes, got {}",
                SCALAR_BYTES,
                bytes.len()
            )));
        }

        Ok(Scalar(Fq::from_be_bytes_mod_order(bytes)))
    }

    /// Interpret any number of big-endian bytes as an integer and reduce it
    pub fn from_be_bytes_mod_order(bytes: &[u8]) -> Self {
        Scalar(Fq::from_be_bytes_mod_order(bytes))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }

    /// Parse a big-endian hex string, with or without a `0x` prefix
    ///
    /// Inputs shorter than 32 bytes are left padded.
    pub fn from_hex(hex_str: &str) -> CoreResult<Self> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)
            .map_err(|e| CoreError::Encoding(format!("invalid hex '{}': {}", hex_str, e)))?;
        if bytes.len() > SCALAR_BYTES {
            return Err(CoreError::Encoding(format!(
                "hex value is {} bytes, at most {} allowed",
                bytes.len(),
                SCALAR_BYTES
            )));
        }

        let mut padded = [0u8; SCALAR_BYTES];
        padded[SCALAR_BYTES - bytes.len()..].copy_from_slice(&bytes);
        Self::from_be_bytes(&padded)
    }

    pub fn to_biguint(&self) -> BigUint {
        BigUint::from(self.0.into_bigint())
    }

    pub fn from_biguint(value: &BigUint) -> Self {
        Scalar(Fq::from_le_bytes_mod_order(&value.to_bytes_le()))
    }

    pub fn to_decimal_string(&self) -> String {
        self.to_biguint().to_str_radix(10)
    }

    pub fn from_decimal_str(decimal: &str) -> CoreResult<Self> {
        BigUint::parse_bytes(decimal.as_bytes(), 10)
            .map(|value| Self::from_biguint(&value))
            .ok_or_else(|| CoreError::Encoding(format!("invalid decimal string '{}'", decimal)))
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Scalar(Fq::from(value))
    }
}

impl From<u128> for Scalar {
    fn from(value: u128) -> Self {
        Scalar(Fq::from(value))
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::from(value as u64)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl fmt::Debug for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Scalar({})", self.to_decimal_string())
    }
}

// --- Arithmetic ---

impl Add for Scalar {
    type Output = Scalar;
    fn add(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 + rhs.0)
    }
}

impl AddAssign for Scalar {
    fn add_assign(&mut self, rhs: Scalar) {
        self.0 += rhs.0;
    }
}

impl Sub for Scalar {
    type Output = Scalar;
    fn sub(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 - rhs.0)
    }
}

impl SubAssign for Scalar {
    fn sub_assign(&mut self, rhs: Scalar) {
        self.0 -= rhs.0;
    }
}

impl Mul for Scalar {
    type Output = Scalar;
    fn mul(self, rhs: Scalar) -> Scalar {
        Scalar(self.0 * rhs.0)
    }
}

impl MulAssign for Scalar {
    fn mul_assign(&mut self, rhs: Scalar) {
        self.0 *= rhs.0;
    }
}

impl Neg for Scalar {
    type Output = Scalar;
    fn neg(self) -> Scalar {
        Scalar(-self.0)
    }
}

impl Sum for Scalar {
    fn sum<I: Iterator<Item = Scalar>>(iter: I) -> Scalar {
        iter.fold(Scalar::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a Scalar> for Scalar {
    fn sum<I: Iterator<Item = &'a Scalar>>(iter: I) -> Scalar {
        iter.fold(Scalar::zero(), |acc, x| acc + *x)
    }
}

// --- Serde ---

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex_str = String::deserialize(deserializer)?;
        Scalar::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}
