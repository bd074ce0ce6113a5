//! Homology of chain complexes.
//!
//! This crate glues the exact linear algebra of [`exact`] to the language of
//! chain complexes: a [`ChainComplex`] stores differentials by degree,
//! diagonalizes them and collects kernel and torsion dimensions in a
//! [`HomologyField`].
//!
//! ```
//! use exact::{Diagonalizer, MatrixField, Rationals};
//! use homology::ChainComplex;
//!
//! let mut complex = ChainComplex::new(false);
//! complex.insert_differential(
//!     1,
//!     MatrixField::from_vec(Rationals, &[vec![1, 1], vec![-1, -1]]),
//! );
//! let mut diagonalizer = Diagonalizer::sequential();
//! let h1 = complex.homology(1, &mut diagonalizer).unwrap();
//! assert_eq!(h1.dimension(1), 1);
//! ```

pub mod chain_complex;
pub mod homology;

pub use chain_complex::{ChainComplex, ChainComplexError};
pub use homology::HomologyField;

pub use exact;
