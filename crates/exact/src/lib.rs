//! Exact linear algebra for homology computations.
//!
//! The centerpiece is the [`diagonalizer`]: a Gauss-elimination rank, kernel
//! and image computer for dense matrices with exact coefficients, either
//! rationals of arbitrary precision or integers modulo a prime. It comes in a
//! sequential and a multi-threaded flavor that are guaranteed to produce the
//! same pivots in the same order, and it keeps enough bookkeeping (the
//! diagonal ledger and, on request, the full record of row operations) to
//! later replay the base change onto arbitrary vectors.

pub mod cache;
pub mod diagonalizer;
pub mod field;
pub mod matrix;
pub mod modular;
pub mod prime;
pub mod rational;
pub mod vector;

pub use cache::{Load, Save};
pub use diagonalizer::{DiagonalizeError, Diagonalizer, Progress};
pub use field::{ArithmeticError, Field, FieldElement, Fp, Rationals};
pub use matrix::{Diagonal, Diagonalizable, MatrixBool, MatrixField, RowOp};
pub use modular::Zm;
pub use prime::ValidPrime;
pub use rational::Rational;
pub use vector::{
    apply_base_changes_image, apply_base_changes_kernel, compute_base_of_kernel,
    compute_base_of_kernel_bool, matrix_vector_product, matrix_vector_product_vanishes,
    ReplayError, VectorBool, VectorField,
};
