//! Exact rational coefficients.

use std::{
    fmt,
    ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_bigint::BigInt;
use num_traits::{One, Signed, Zero};

use crate::field::FieldElement;

/// An arbitrary-precision rational, kept normalized: the denominator is
/// positive, numerator and denominator are coprime, and zero is `0/1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    num: BigInt,
    den: BigInt,
}

fn gcd(mut a: BigInt, mut b: BigInt) -> BigInt {
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a.abs()
}

impl Rational {
    /// Panics if the denominator is zero.
    pub fn new(num: impl Into<BigInt>, den: impl Into<BigInt>) -> Self {
        Self::normalized(num.into(), den.into())
    }

    pub(crate) fn normalized(mut num: BigInt, mut den: BigInt) -> Self {
        assert!(!den.is_zero(), "rational with zero denominator");
        if den.is_negative() {
            num = -num;
            den = -den;
        }
        if num.is_zero() {
            return Self {
                num,
                den: BigInt::one(),
            };
        }
        let g = gcd(num.clone(), den.clone());
        Self {
            num: num / &g,
            den: den / g,
        }
    }

    pub fn numerator(&self) -> &BigInt {
        &self.num
    }

    pub fn denominator(&self) -> &BigInt {
        &self.den
    }
}

impl From<i64> for Rational {
    fn from(value: i64) -> Self {
        Self {
            num: BigInt::from(value),
            den: BigInt::one(),
        }
    }
}

impl From<(i64, i64)> for Rational {
    fn from((num, den): (i64, i64)) -> Self {
        Self::new(num, den)
    }
}

impl Add for Rational {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::normalized(&self.num * &rhs.den + &rhs.num * &self.den, self.den * rhs.den)
    }
}

impl Sub for Rational {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::normalized(&self.num * &rhs.den - &rhs.num * &self.den, self.den * rhs.den)
    }
}

impl Mul for Rational {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::normalized(self.num * rhs.num, self.den * rhs.den)
    }
}

impl Neg for Rational {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            num: -self.num,
            den: self.den,
        }
    }
}

impl AddAssign for Rational {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.clone() + rhs;
    }
}

impl SubAssign for Rational {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.clone() - rhs;
    }
}

impl MulAssign for Rational {
    fn mul_assign(&mut self, rhs: Self) {
        *self = self.clone() * rhs;
    }
}

impl FieldElement for Rational {
    fn is_zero(&self) -> bool {
        self.num.is_zero()
    }

    fn inverse(&self) -> Option<Self> {
        if self.num.is_zero() {
            None
        } else {
            Some(Self::normalized(self.den.clone(), self.num.clone()))
        }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den.is_one() {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}
