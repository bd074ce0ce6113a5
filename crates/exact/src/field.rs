//! Field descriptors and the element trait.
//!
//! A [`Field`] is a small copyable descriptor ([`Rationals`] or [`Fp`]) that
//! knows how to produce elements; the elements themselves carry everything
//! they need for arithmetic, so a modular value travels together with its
//! modulus instead of reading process-wide state.

use std::{
    fmt::{Debug, Display},
    ops::{AddAssign, Mul, Neg, SubAssign},
};

use thiserror::Error;

use crate::{
    cache::{Load, Save},
    modular::Zm,
    prime::ValidPrime,
    rational::Rational,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// Division by the additive identity. Signalled as an error rather than
    /// returning zero, so that a broken elimination cannot be mistaken for a
    /// successful one.
    #[error("division by the additive identity")]
    DivisionByZero,
}

/// One coefficient of a matrix or vector.
pub trait FieldElement:
    Clone
    + PartialEq
    + Eq
    + Debug
    + Display
    + Send
    + Sync
    + AddAssign<Self>
    + SubAssign<Self>
    + Mul<Self, Output = Self>
    + Neg<Output = Self>
    + 'static
{
    fn is_zero(&self) -> bool;

    fn is_invertible(&self) -> bool {
        !self.is_zero()
    }

    /// `None` for the additive identity.
    fn inverse(&self) -> Option<Self>;

    fn try_div(&self, rhs: &Self) -> Result<Self, ArithmeticError> {
        let inv = rhs.inverse().ok_or(ArithmeticError::DivisionByZero)?;
        Ok(self.clone() * inv)
    }
}

/// A coefficient domain.
pub trait Field: Copy + Debug + PartialEq + Eq + Send + Sync + 'static {
    type Element: FieldElement + Save + Load<AuxData = Self>;

    fn zero(self) -> Self::Element;

    fn one(self) -> Self::Element;

    /// Builds an element from an integer, reducing where necessary.
    fn element(self, value: i64) -> Self::Element;
}

/// The field of rational numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rationals;

impl Field for Rationals {
    type Element = Rational;

    fn zero(self) -> Rational {
        Rational::from(0)
    }

    fn one(self) -> Rational {
        Rational::from(1)
    }

    fn element(self, value: i64) -> Rational {
        Rational::from(value)
    }
}

/// The field of integers modulo a prime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fp {
    p: ValidPrime,
}

impl Fp {
    pub const fn new(p: ValidPrime) -> Self {
        Self { p }
    }

    pub const fn prime(self) -> ValidPrime {
        self.p
    }
}

impl Field for Fp {
    type Element = Zm;

    fn zero(self) -> Zm {
        Zm::new(self.p, 0)
    }

    fn one(self) -> Zm {
        Zm::new(self.p, 1)
    }

    fn element(self, value: i64) -> Zm {
        Zm::from_i64(self.p, value)
    }
}
