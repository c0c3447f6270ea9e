//! 256-bit integers with checked arithmetic.
//!
//! `U256` is re-exported from `primitive_types` (the ecosystem's standard
//! fixed-width unsigned integer). `I256` is a thin two's-complement wrapper
//! around it since no widely-used crate in this corpus carries a signed
//! 256-bit type; the wrapper is plain arithmetic, not a vendored dependency.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

pub use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Two's-complement signed 256-bit integer backed by [`U256`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct I256(U256);

const SIGN_BIT: usize = 255;

impl I256 {
    pub const ZERO: I256 = I256(U256::zero());

    pub fn from_i128(v: i128) -> Self {
        if v >= 0 {
            I256(U256::from(v as u128))
        } else {
            let magnitude = U256::from((-v) as u128);
            I256(Self::negate_unsigned(magnitude))
        }
    }

    fn negate_unsigned(v: U256) -> U256 {
        (!v).overflowing_add(U256::one()).0
    }

    pub fn is_negative(&self) -> bool {
        self.0.bit(SIGN_BIT)
    }

    /// Sign-magnitude decomposition: `(is_negative, magnitude)`.
    fn magnitude(&self) -> (bool, U256) {
        if self.is_negative() {
            (true, Self::negate_unsigned(self.0))
        } else {
            (false, self.0)
        }
    }

    pub fn checked_add(self, rhs: I256) -> Option<I256> {
        let result = I256(self.0.overflowing_add(rhs.0).0);
        let overflow = (self.is_negative() == rhs.is_negative())
            && (result.is_negative() != self.is_negative());
        if overflow {
            None
        } else {
            Some(result)
        }
    }

    pub fn checked_sub(self, rhs: I256) -> Option<I256> {
        rhs.checked_neg().and_then(|neg| self.checked_add(neg))
    }

    pub fn checked_neg(self) -> Option<I256> {
        // i256::MIN has no positive counterpart.
        if self.0 == (U256::one() << SIGN_BIT) {
            None
        } else {
            Some(I256(Self::negate_unsigned(self.0)))
        }
    }

    pub fn checked_mul(self, rhs: I256) -> Option<I256> {
        let (neg_a, mag_a) = self.magnitude();
        let (neg_b, mag_b) = rhs.magnitude();
        let (product, overflow) = mag_a.overflowing_mul(mag_b);
        if overflow || product.bit(SIGN_BIT) {
            return None;
        }
        let result = if neg_a != neg_b { Self::negate_unsigned(product) } else { product };
        Some(I256(result))
    }

    pub fn checked_div(self, rhs: I256) -> Option<I256> {
        if rhs.0.is_zero() {
            return None;
        }
        let (neg_a, mag_a) = self.magnitude();
        let (neg_b, mag_b) = rhs.magnitude();
        let quotient = mag_a / mag_b;
        let result = if neg_a != neg_b { Self::negate_unsigned(quotient) } else { quotient };
        Some(I256(result))
    }

    pub fn checked_rem(self, rhs: I256) -> Option<I256> {
        if rhs.0.is_zero() {
            return None;
        }
        let (neg_a, mag_a) = self.magnitude();
        let (_, mag_b) = rhs.magnitude();
        let remainder = mag_a % mag_b;
        let result = if neg_a { Self::negate_unsigned(remainder) } else { remainder };
        Some(I256(result))
    }

    pub fn to_le_bytes(&self) -> [u8; 32] {
        let mut buf = [0u8; 32];
        self.0.to_little_endian(&mut buf);
        buf
    }

    pub fn from_le_bytes(bytes: &[u8; 32]) -> Self {
        I256(U256::from_little_endian(bytes))
    }
}

impl Add for I256 {
    type Output = Option<I256>;
    fn add(self, rhs: I256) -> Option<I256> {
        self.checked_add(rhs)
    }
}

impl Sub for I256 {
    type Output = Option<I256>;
    fn sub(self, rhs: I256) -> Option<I256> {
        self.checked_sub(rhs)
    }
}

impl Mul for I256 {
    type Output = Option<I256>;
    fn mul(self, rhs: I256) -> Option<I256> {
        self.checked_mul(rhs)
    }
}

impl Neg for I256 {
    type Output = Option<I256>;
    fn neg(self) -> Option<I256> {
        self.checked_neg()
    }
}

impl PartialOrd for I256 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for I256 {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_negative(), other.is_negative()) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            _ => self.0.cmp(&other.0),
        }
    }
}

impl fmt::Debug for I256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (neg, mag) = self.magnitude();
        write!(f, "{}{}", if neg { "-" } else { "" }, mag)
    }
}

impl Serialize for I256 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bytes(&self.to_le_bytes())
    }
}

impl<'de> Deserialize<'de> for I256 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bytes: Vec<u8> = Deserialize::deserialize(deserializer)?;
        if bytes.len() != 32 {
            return Err(serde::de::Error::custom("I256 requires exactly 32 bytes"));
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(I256::from_le_bytes(&arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_round_trip() {
        let a = I256::from_i128(100);
        let b = I256::from_i128(-30);
        let sum = a.checked_add(b).unwrap();
        assert_eq!(sum, I256::from_i128(70));
        let back = sum.checked_sub(b).unwrap();
        assert_eq!(back, a);
    }

    #[test]
    fn mul_sign_rules() {
        let a = I256::from_i128(-4);
        let b = I256::from_i128(5);
        assert_eq!(a.checked_mul(b).unwrap(), I256::from_i128(-20));
        assert_eq!(a.checked_mul(a).unwrap(), I256::from_i128(16));
    }

    #[test]
    fn div_rem_truncate_toward_zero() {
        let a = I256::from_i128(-7);
        let b = I256::from_i128(2);
        assert_eq!(a.checked_div(b).unwrap(), I256::from_i128(-3));
        assert_eq!(a.checked_rem(b).unwrap(), I256::from_i128(-1));
    }

    #[test]
    fn div_by_zero_is_none() {
        assert!(I256::from_i128(1).checked_div(I256::ZERO).is_none());
    }

    #[test]
    fn ordering_respects_sign() {
        assert!(I256::from_i128(-1) < I256::from_i128(1));
        assert!(I256::from_i128(-5) < I256::from_i128(-1));
    }

    #[test]
    fn byte_round_trip() {
        let v = I256::from_i128(-123456789);
        let bytes = v.to_le_bytes();
        assert_eq!(I256::from_le_bytes(&bytes), v);
    }
}
