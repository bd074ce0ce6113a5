//! Validated primes and modular inverses.
//!
//! A [`ValidPrime`] can only be constructed from an actual prime number, so
//! every modular coefficient built on top of it lives in a genuine field.
//! Multiplicative inverses are served from a table built lazily once per
//! prime and shared process-wide; for primes too large to tabulate we fall
//! back to Fermat's little theorem.

use std::{fmt, str::FromStr, sync::Arc};

use dashmap::DashMap;
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Primes below this bound get a full inverse table; larger ones are
/// inverted by exponentiation.
const INVERSE_TABLE_LIMIT: u32 = 1 << 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimeError {
    #[error("not an integer: {0}")]
    NotAnInteger(std::num::ParseIntError),
    #[error("{0} is not a valid prime")]
    InvalidPrime(u32),
}

/// A `u32` that is known to be prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidPrime {
    p: u32,
}

pub const fn is_prime(p: u32) -> bool {
    if p < 2 {
        return false;
    }
    let mut k: u64 = 2;
    while k * k <= p as u64 {
        if p as u64 % k == 0 {
            return false;
        }
        k += 1;
    }
    true
}

impl ValidPrime {
    /// Panics on composite input. Use `TryFrom<u32>` for a fallible version.
    pub const fn new(p: u32) -> Self {
        assert!(p < (1 << 31), "tried to construct a prime larger than 2^31");
        assert!(is_prime(p), "tried to construct a composite prime");
        Self { p }
    }

    pub const fn as_u32(self) -> u32 {
        self.p
    }

    pub const fn as_usize(self) -> usize {
        self.p as usize
    }

    /// Sum mod p, with overflow taken care of.
    pub fn sum(self, a: u32, b: u32) -> u32 {
        ((a as u64 + b as u64) % self.p as u64) as u32
    }

    /// Difference mod p.
    pub fn difference(self, a: u32, b: u32) -> u32 {
        ((a as u64 + self.p as u64 - b as u64) % self.p as u64) as u32
    }

    /// Product mod p, with overflow taken care of.
    pub fn product(self, a: u32, b: u32) -> u32 {
        ((a as u64 * b as u64) % self.p as u64) as u32
    }

    pub fn pow_mod(self, mut b: u32, mut e: u32) -> u32 {
        let mut result = 1;
        while e > 0 {
            if e & 1 == 1 {
                result = self.product(result, b);
            }
            b = self.product(b, b);
            e >>= 1;
        }
        result
    }

    /// Multiplicative inverse of `k` in `[1, p)`.
    ///
    /// Panics if `k` is zero; callers decide beforehand whether the element
    /// is invertible.
    pub fn inverse(self, k: u32) -> u32 {
        assert!(k != 0, "the additive identity has no inverse");
        debug_assert!(k < self.p);
        if self.p < INVERSE_TABLE_LIMIT {
            inverse_table(self)[k as usize]
        } else {
            self.pow_mod(k, self.p - 2)
        }
    }
}

/// Per-prime inverse tables, built on first use and shared by every
/// coefficient with the same modulus.
fn inverse_table(p: ValidPrime) -> Arc<Vec<u32>> {
    static TABLES: std::sync::OnceLock<DashMap<u32, Arc<Vec<u32>>>> = std::sync::OnceLock::new();
    let tables = TABLES.get_or_init(DashMap::new);
    tables
        .entry(p.as_u32())
        .or_insert_with(|| {
            let m = p.as_u32() as u64;
            let mut inv = vec![0u32; p.as_usize()];
            if m > 1 {
                inv[1] = 1;
                // inv[i] = -(m / i) * inv[m % i] mod m
                for i in 2..p.as_usize() {
                    inv[i] = ((m - m / i as u64) * inv[(m % i as u64) as usize] as u64 % m) as u32;
                }
            }
            Arc::new(inv)
        })
        .clone()
}

impl TryFrom<u32> for ValidPrime {
    type Error = PrimeError;

    fn try_from(p: u32) -> Result<Self, PrimeError> {
        if p < (1 << 31) && is_prime(p) {
            Ok(Self { p })
        } else {
            Err(PrimeError::InvalidPrime(p))
        }
    }
}

impl FromStr for ValidPrime {
    type Err = PrimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p: u32 = s.parse().map_err(PrimeError::NotAnInteger)?;
        Self::try_from(p)
    }
}

impl From<ValidPrime> for u32 {
    fn from(p: ValidPrime) -> u32 {
        p.as_u32()
    }
}

impl PartialEq<u32> for ValidPrime {
    fn eq(&self, other: &u32) -> bool {
        self.p == *other
    }
}

impl fmt::Display for ValidPrime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.p.fmt(f)
    }
}

impl Serialize for ValidPrime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.p.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidPrime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let p = u32::deserialize(deserializer)?;
        Self::try_from(p).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(2, true)]
    #[case(3, true)]
    #[case(4, false)]
    #[case(5, true)]
    #[case(1, false)]
    #[case(0, false)]
    #[case(65537, true)]
    #[case(65536, false)]
    fn primality(#[case] p: u32, #[case] expected: bool) {
        assert_eq!(is_prime(p), expected);
        assert_eq!(ValidPrime::try_from(p).is_ok(), expected);
    }

    #[test]
    fn inverses_small_prime() {
        let p = ValidPrime::new(101);
        for k in 1..101 {
            assert_eq!(p.product(k, p.inverse(k)), 1);
        }
    }

    #[test]
    fn inverses_large_prime() {
        // Above the table limit, exercising the pow_mod path.
        let p = ValidPrime::new(104729);
        for k in [1, 2, 17, 50000, 104728] {
            assert_eq!(p.product(k, p.inverse(k)), 1);
        }
    }

    #[test]
    fn deserialization_revalidates() {
        assert!(serde_json::from_str::<ValidPrime>("13").is_ok());
        assert!(serde_json::from_str::<ValidPrime>("12").is_err());
    }
}
