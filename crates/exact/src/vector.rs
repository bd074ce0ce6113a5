//! Vectors and base-change replay.
//!
//! Diagonalizing a matrix changes the basis of its codomain. The matrix
//! keeps the row operations it performed, and the functions here replay them
//! onto vectors, forwards for vectors whose coordinates follow the kernel
//! side and backwards for vectors on the image side. Kernel bases are read
//! off the reduced matrix by back substitution over the pivot ledger.

use std::{
    fmt,
    ops::{AddAssign, SubAssign},
};

use itertools::Itertools;
use thiserror::Error;

use crate::{
    field::{Field, FieldElement},
    matrix::{MatrixBool, MatrixField},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplayError {
    #[error("vector has dimension {got} but the matrix has {expected} rows")]
    ShapeMismatch { expected: usize, got: usize },
    /// The matrix was never diagonalized, or was mutated since.
    #[error("matrix is not diagonalized")]
    NotDiagonalized,
    /// The matrix was diagonalized without recording its row operations.
    #[error("row operations were not recorded")]
    NotRecorded,
    /// GF(2) matrices never record row operations.
    #[error("base changes are not available over GF(2)")]
    Unsupported,
}

/// A dense vector over a coefficient field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorField<F: Field> {
    field: F,
    data: Vec<F::Element>,
}

impl<F: Field> VectorField<F> {
    pub fn new(field: F, dimension: usize) -> Self {
        Self {
            field,
            data: vec![field.zero(); dimension],
        }
    }

    pub fn from_vec(field: F, entries: &[i64]) -> Self {
        Self {
            field,
            data: entries.iter().map(|&v| field.element(v)).collect(),
        }
    }

    pub fn field(&self) -> F {
        self.field
    }

    pub fn dimension(&self) -> usize {
        self.data.len()
    }

    pub fn entry(&self, i: usize) -> &F::Element {
        &self.data[i]
    }

    pub fn entry_mut(&mut self, i: usize) -> &mut F::Element {
        &mut self.data[i]
    }

    pub fn set_entry(&mut self, i: usize, value: F::Element) {
        self.data[i] = value;
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(FieldElement::is_zero)
    }

    pub fn scale(&mut self, coeff: &F::Element) {
        for entry in &mut self.data {
            *entry = entry.clone() * coeff.clone();
        }
    }

    pub fn resize(&mut self, dimension: usize) {
        let field = self.field;
        self.data.resize_with(dimension, || field.zero());
    }

    pub fn clear(&mut self) {
        let field = self.field;
        for entry in &mut self.data {
            *entry = field.zero();
        }
    }

    pub(crate) fn entries(&self) -> &[F::Element] {
        &self.data
    }
}

impl<F: Field> AddAssign<&VectorField<F>> for VectorField<F> {
    fn add_assign(&mut self, rhs: &VectorField<F>) {
        assert_eq!(self.data.len(), rhs.data.len());
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a += b.clone();
        }
    }
}

impl<F: Field> SubAssign<&VectorField<F>> for VectorField<F> {
    fn sub_assign(&mut self, rhs: &VectorField<F>) {
        assert_eq!(self.data.len(), rhs.data.len());
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a -= b.clone();
        }
    }
}

impl<F: Field> fmt::Display for VectorField<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.data.iter().join(", "))
    }
}

const BITS_PER_LIMB: usize = u64::BITS as usize;

/// A dense vector over GF(2), one bit per entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorBool {
    dimension: usize,
    data: Vec<u64>,
}

impl VectorBool {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            data: vec![0; dimension.div_ceil(BITS_PER_LIMB)],
        }
    }

    pub fn from_vec(entries: &[u8]) -> Self {
        let mut v = Self::new(entries.len());
        for (i, &e) in entries.iter().enumerate() {
            v.set_entry(i, e % 2 == 1);
        }
        v
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn entry(&self, i: usize) -> bool {
        self.data[i / BITS_PER_LIMB] >> (i % BITS_PER_LIMB) & 1 == 1
    }

    pub fn set_entry(&mut self, i: usize, value: bool) {
        let mask = 1 << (i % BITS_PER_LIMB);
        if value {
            self.data[i / BITS_PER_LIMB] |= mask;
        } else {
            self.data[i / BITS_PER_LIMB] &= !mask;
        }
    }

    pub fn add_entry(&mut self, i: usize) {
        self.data[i / BITS_PER_LIMB] ^= 1 << (i % BITS_PER_LIMB);
    }

    pub fn is_zero(&self) -> bool {
        self.data.iter().all(|&limb| limb == 0)
    }

    pub fn resize(&mut self, dimension: usize) {
        self.dimension = dimension;
        self.data = vec![0; dimension.div_ceil(BITS_PER_LIMB)];
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }
}

impl AddAssign<&VectorBool> for VectorBool {
    fn add_assign(&mut self, rhs: &VectorBool) {
        assert_eq!(self.dimension, rhs.dimension);
        for (a, b) in self.data.iter_mut().zip(&rhs.data) {
            *a ^= b;
        }
    }
}

impl fmt::Display for VectorBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({})",
            (0..self.dimension)
                .map(|i| u8::from(self.entry(i)))
                .join(", ")
        )
    }
}

fn check_replayable<F: Field>(
    matrix: &MatrixField<F>,
    vector: &VectorField<F>,
) -> Result<(), ReplayError> {
    if vector.dimension() != matrix.num_rows() {
        return Err(ReplayError::ShapeMismatch {
            expected: matrix.num_rows(),
            got: vector.dimension(),
        });
    }
    if !matrix.is_diagonalized() {
        return Err(ReplayError::NotDiagonalized);
    }
    if !matrix.records_base_changes() {
        return Err(ReplayError::NotRecorded);
    }
    Ok(())
}

/// Replays the recorded row operations onto `vector`, in order. This maps
/// coordinates with respect to the old basis to coordinates with respect to
/// the diagonalized basis on the kernel side.
pub fn apply_base_changes_kernel<F: Field>(
    matrix: &MatrixField<F>,
    vector: &mut VectorField<F>,
) -> Result<(), ReplayError> {
    check_replayable(matrix, vector)?;
    for op in matrix.base_changes() {
        let delta = op.coeff.clone() * vector.entry(op.row_1).clone();
        *vector.entry_mut(op.row_2) += delta;
    }
    Ok(())
}

/// Replays the recorded row operations inverted and in reverse order. This
/// is the base change on the image side, the inverse of
/// [`apply_base_changes_kernel`].
pub fn apply_base_changes_image<F: Field>(
    matrix: &MatrixField<F>,
    vector: &mut VectorField<F>,
) -> Result<(), ReplayError> {
    check_replayable(matrix, vector)?;
    for op in matrix.base_changes().iter().rev() {
        let delta = op.coeff.clone() * vector.entry(op.row_1).clone();
        *vector.entry_mut(op.row_2) -= delta;
    }
    Ok(())
}

pub fn apply_base_changes_kernel_bool(
    matrix: &MatrixBool,
    _vector: &mut VectorBool,
) -> Result<(), ReplayError> {
    tracing::warn!(
        rows = matrix.num_rows(),
        "base change replay requested on a GF(2) matrix"
    );
    Err(ReplayError::Unsupported)
}

pub fn apply_base_changes_image_bool(
    matrix: &MatrixBool,
    _vector: &mut VectorBool,
) -> Result<(), ReplayError> {
    tracing::warn!(
        rows = matrix.num_rows(),
        "base change replay requested on a GF(2) matrix"
    );
    Err(ReplayError::Unsupported)
}

/// Computes a basis of the kernel of the diagonalized matrix, one vector per
/// column without a pivot. Each basis vector is 1 at its free column and is
/// completed by back substitution over the pivot rows.
pub fn compute_base_of_kernel<F: Field>(
    matrix: &MatrixField<F>,
) -> Result<Vec<VectorField<F>>, ReplayError> {
    if !matrix.is_diagonalized() {
        return Err(ReplayError::NotDiagonalized);
    }
    let field = matrix.field();
    let num_cols = matrix.num_cols();
    let mut has_pivot = vec![false; num_cols];
    for &(_, col) in matrix.diagonal().iter() {
        has_pivot[col] = true;
    }
    let mut basis = Vec::with_capacity(num_cols - matrix.diagonal().len());
    for free in (0..num_cols).filter(|&c| !has_pivot[c]) {
        let mut v = VectorField::new(field, num_cols);
        v.set_entry(free, field.one());
        // Pivot rows form a triangular system when visited in reverse.
        for &(row, col) in matrix.diagonal().entries().iter().rev() {
            let mut acc = field.zero();
            for j in (col + 1)..num_cols {
                let entry = matrix.entry(row, j);
                if !entry.is_zero() && !v.entry(j).is_zero() {
                    acc += entry.clone() * v.entry(j).clone();
                }
            }
            if acc.is_zero() {
                continue;
            }
            match (-acc).try_div(matrix.entry(row, col)) {
                Ok(value) => v.set_entry(col, value),
                Err(_) => return Err(ReplayError::NotDiagonalized),
            }
        }
        basis.push(v);
    }
    Ok(basis)
}

/// GF(2) variant of [`compute_base_of_kernel`].
pub fn compute_base_of_kernel_bool(matrix: &MatrixBool) -> Result<Vec<VectorBool>, ReplayError> {
    if !matrix.is_diagonalized() {
        return Err(ReplayError::NotDiagonalized);
    }
    let num_cols = matrix.num_cols();
    let mut has_pivot = vec![false; num_cols];
    for &(_, col) in matrix.diagonal().iter() {
        has_pivot[col] = true;
    }
    let mut basis = Vec::with_capacity(num_cols - matrix.diagonal().len());
    for free in (0..num_cols).filter(|&c| !has_pivot[c]) {
        let mut v = VectorBool::new(num_cols);
        v.set_entry(free, true);
        for &(row, col) in matrix.diagonal().entries().iter().rev() {
            let mut parity = false;
            for j in (col + 1)..num_cols {
                parity ^= matrix.entry(row, j) && v.entry(j);
            }
            v.set_entry(col, parity);
        }
        basis.push(v);
    }
    Ok(basis)
}

pub fn matrix_vector_product<F: Field>(
    matrix: &MatrixField<F>,
    vector: &VectorField<F>,
) -> VectorField<F> {
    assert_eq!(vector.dimension(), matrix.num_cols());
    let field = matrix.field();
    let mut result = VectorField::new(field, matrix.num_rows());
    for (r, row) in matrix.rows().iter().enumerate() {
        let mut acc = field.zero();
        for (entry, coord) in row.iter().zip(vector.entries()) {
            if !entry.is_zero() && !coord.is_zero() {
                acc += entry.clone() * coord.clone();
            }
        }
        result.set_entry(r, acc);
    }
    result
}

pub fn matrix_vector_product_vanishes<F: Field>(
    matrix: &MatrixField<F>,
    vector: &VectorField<F>,
) -> bool {
    matrix_vector_product(matrix, vector).is_zero()
}

pub fn matrix_vector_product_bool(matrix: &MatrixBool, vector: &VectorBool) -> VectorBool {
    assert_eq!(vector.dimension(), matrix.num_cols());
    let mut result = VectorBool::new(matrix.num_rows());
    for r in 0..matrix.num_rows() {
        let mut parity = false;
        for c in 0..matrix.num_cols() {
            parity ^= matrix.entry(r, c) && vector.entry(c);
        }
        result.set_entry(r, parity);
    }
    result
}

pub fn matrix_vector_product_vanishes_bool(matrix: &MatrixBool, vector: &VectorBool) -> bool {
    matrix_vector_product_bool(matrix, vector).is_zero()
}

#[cfg(test)]
mod tests {
    use crate::{
        diagonalizer::Diagonalizer,
        field::Rationals,
        matrix::MatrixField,
        rational::Rational,
    };

    use super::*;

    fn golden_matrix(record: bool) -> MatrixField<Rationals> {
        let mut m =
            MatrixField::from_vec(Rationals, &[vec![2, 1, 1], vec![1, -1, 2], vec![0, 1, -1]]);
        m.record_base_changes(record);
        let mut d = Diagonalizer::sequential();
        d.diagonalize(&mut m).unwrap();
        m
    }

    #[test]
    fn vector_arithmetic() {
        let mut a = VectorField::from_vec(Rationals, &[1, 2, 3]);
        let b = VectorField::from_vec(Rationals, &[1, 0, -1]);
        a += &b;
        assert_eq!(a, VectorField::from_vec(Rationals, &[2, 2, 2]));
        a -= &b;
        a.scale(&Rational::new(1, 2));
        assert_eq!(*a.entry(2), Rational::new(3, 2));
    }

    #[test]
    fn kernel_replay_matches_golden_values() {
        let m = golden_matrix(true);
        let mut v = VectorField::from_vec(Rationals, &[1, -1, -1]);
        apply_base_changes_kernel(&m, &mut v).unwrap();
        assert_eq!(*v.entry(0), Rational::from(1));
        assert_eq!(*v.entry(1), Rational::new(-3, 2));
        assert_eq!(*v.entry(2), Rational::from(-2));

        let mut w = VectorField::from_vec(Rationals, &[0, 1, 0]);
        apply_base_changes_kernel(&m, &mut w).unwrap();
        assert_eq!(*w.entry(0), Rational::from(0));
        assert_eq!(*w.entry(1), Rational::from(1));
        assert_eq!(*w.entry(2), Rational::new(2, 3));
    }

    #[test]
    fn image_replay_inverts_kernel_replay() {
        let m = golden_matrix(true);
        let original = VectorField::from_vec(Rationals, &[3, -5, 7]);
        let mut v = original.clone();
        apply_base_changes_kernel(&m, &mut v).unwrap();
        apply_base_changes_image(&m, &mut v).unwrap();
        assert_eq!(v, original);
    }

    #[test]
    fn replay_without_recording_is_an_error() {
        let m = golden_matrix(false);
        let mut v = VectorField::new(Rationals, 3);
        assert_eq!(
            apply_base_changes_kernel(&m, &mut v),
            Err(ReplayError::NotRecorded)
        );
    }

    #[test]
    fn replay_shape_mismatch() {
        let m = golden_matrix(true);
        let mut v = VectorField::new(Rationals, 2);
        assert_eq!(
            apply_base_changes_kernel(&m, &mut v),
            Err(ReplayError::ShapeMismatch {
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn kernel_basis_spans_the_kernel() {
        let m = golden_matrix(false);
        let basis = compute_base_of_kernel(&m).unwrap();
        assert_eq!(basis.len(), 1);
        let v = &basis[0];
        assert!(!v.is_zero());
        // The kernel basis is computed from the reduced matrix, whose kernel
        // equals that of the original since row operations preserve it.
        assert!(matrix_vector_product_vanishes(&m, v));
        // Recomputing from the same reduced matrix gives the same basis.
        assert_eq!(compute_base_of_kernel(&m).unwrap(), basis);
    }

    #[test]
    fn kernel_basis_of_full_rank_matrix_is_empty() {
        let mut m = MatrixField::from_vec(Rationals, &[vec![1, 0], vec![0, 1]]);
        let mut d = Diagonalizer::sequential();
        d.diagonalize(&mut m).unwrap();
        assert!(compute_base_of_kernel(&m).unwrap().is_empty());
    }

    #[test]
    fn bool_replay_is_unsupported() {
        let m = crate::matrix::MatrixBool::new(2, 2);
        let mut v = VectorBool::new(2);
        assert_eq!(
            apply_base_changes_kernel_bool(&m, &mut v),
            Err(ReplayError::Unsupported)
        );
        assert_eq!(
            apply_base_changes_image_bool(&m, &mut v),
            Err(ReplayError::Unsupported)
        );
    }

    #[test]
    fn bool_kernel_basis() {
        let mut m =
            crate::matrix::MatrixBool::from_vec(&[vec![0, 1, 1], vec![1, 1, 0], vec![0, 1, 1]]);
        let mut d = Diagonalizer::sequential();
        d.diagonalize(&mut m).unwrap();
        let basis = compute_base_of_kernel_bool(&m).unwrap();
        assert_eq!(basis.len(), 1);
        assert!(matrix_vector_product_vanishes_bool(&m, &basis[0]));
    }
}
