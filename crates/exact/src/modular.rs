//! Coefficients in the field of integers modulo a prime.

use std::{
    fmt,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use crate::{field::FieldElement, prime::ValidPrime};

/// A residue modulo a prime. The modulus travels with the value, so two
/// elements of different fields can never be combined silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zm {
    value: u32,
    p: ValidPrime,
}

impl Zm {
    pub fn new(p: ValidPrime, value: u32) -> Self {
        Self {
            value: value % p.as_u32(),
            p,
        }
    }

    pub fn from_i64(p: ValidPrime, value: i64) -> Self {
        let m = i64::from(p.as_u32());
        Self {
            value: value.rem_euclid(m) as u32,
            p,
        }
    }

    pub fn value(self) -> u32 {
        self.value
    }

    pub fn prime(self) -> ValidPrime {
        self.p
    }
}

impl Add for Zm {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        debug_assert_eq!(self.p, rhs.p);
        Self {
            value: self.p.sum(self.value, rhs.value),
            p: self.p,
        }
    }
}

impl Sub for Zm {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        debug_assert_eq!(self.p, rhs.p);
        Self {
            value: self.p.difference(self.value, rhs.value),
            p: self.p,
        }
    }
}

impl Mul for Zm {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        debug_assert_eq!(self.p, rhs.p);
        Self {
            value: self.p.product(self.value, rhs.value),
            p: self.p,
        }
    }
}

impl Neg for Zm {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            value: self.p.difference(0, self.value),
            p: self.p,
        }
    }
}

impl AddAssign for Zm {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for Zm {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl MulAssign for Zm {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}

impl FieldElement for Zm {
    fn is_zero(&self) -> bool {
        self.value == 0
    }

    fn inverse(&self) -> Option<Self> {
        if self.value == 0 {
            None
        } else {
            Some(Self {
                value: self.p.inverse(self.value),
                p: self.p,
            })
        }
    }
}

impl fmt::Display for Zm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const P5: ValidPrime = ValidPrime::new(5);

    #[test]
    fn construction_reduces() {
        assert_eq!(Zm::new(P5, 13).value(), 3);
        assert_eq!(Zm::from_i64(P5, -1).value(), 4);
        assert_eq!(Zm::from_i64(P5, -10).value(), 0);
    }

    #[rstest]
    #[case(2, 4, 1)]
    #[case(3, 3, 1)]
    #[case(0, 4, 4)]
    fn addition(#[case] a: u32, #[case] b: u32, #[case] sum: u32) {
        assert_eq!((Zm::new(P5, a) + Zm::new(P5, b)).value(), sum);
    }

    #[test]
    fn inverses() {
        for v in 1..5 {
            let x = Zm::new(P5, v);
            let inv = x.inverse().unwrap();
            assert_eq!((x * inv).value(), 1);
        }
        assert_eq!(Zm::new(P5, 0).inverse(), None);
    }

    #[test]
    fn negation() {
        assert_eq!((-Zm::new(P5, 2)).value(), 3);
        assert_eq!((-Zm::new(P5, 0)).value(), 0);
    }
}
