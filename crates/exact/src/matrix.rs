//! Matrices with a diagonalization ledger.
//!
//! A matrix owns, next to its entries, the bookkeeping produced by Gauss
//! elimination: the [`Diagonal`] ledger of pivot positions and (optionally)
//! the list of [`RowOp`]s performed, in order. Both are needed afterwards to
//! read off ranks and to replay base changes onto vectors, so they live on
//! the matrix rather than in the diagonalizer.

use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::field::{ArithmeticError, Field, FieldElement};

/// The pivot ledger: one `(row, col)` pair per eliminated column, in the
/// order the columns were processed. Its length is the rank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagonal {
    entries: Vec<(usize, usize)>,
}

impl Diagonal {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(usize, usize)] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &(usize, usize)> {
        self.entries.iter()
    }

    pub(crate) fn push(&mut self, row: usize, col: usize) {
        self.entries.push((row, col));
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn from_entries(entries: Vec<(usize, usize)>) -> Self {
        Self { entries }
    }
}

/// One recorded row operation: `coeff * row_1` was added to `row_2` while
/// eliminating column `col`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOp<C> {
    pub row_1: usize,
    pub row_2: usize,
    pub col: usize,
    pub coeff: C,
}

/// A dense matrix over a coefficient field.
#[derive(Debug, Clone)]
pub struct MatrixField<F: Field> {
    field: F,
    num_rows: usize,
    num_cols: usize,
    data: Vec<Vec<F::Element>>,
    transposed: bool,
    diagonal: Diagonal,
    base_changes: Vec<RowOp<F::Element>>,
    record_base_changes: bool,
    diagonalized: bool,
}

impl<F: Field> MatrixField<F> {
    pub fn new(field: F, num_rows: usize, num_cols: usize) -> Self {
        let data = (0..num_rows)
            .map(|_| vec![field.zero(); num_cols])
            .collect();
        Self {
            field,
            num_rows,
            num_cols,
            data,
            transposed: false,
            diagonal: Diagonal::default(),
            base_changes: Vec::new(),
            record_base_changes: false,
            diagonalized: false,
        }
    }

    /// Panics if the rows have unequal lengths.
    pub fn from_vec(field: F, rows: &[Vec<i64>]) -> Self {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        let data = rows
            .iter()
            .map(|row| {
                assert_eq!(row.len(), num_cols, "ragged rows");
                row.iter().map(|&v| field.element(v)).collect()
            })
            .collect();
        Self {
            field,
            num_rows,
            num_cols,
            data,
            transposed: false,
            diagonal: Diagonal::default(),
            base_changes: Vec::new(),
            record_base_changes: false,
            diagonalized: false,
        }
    }

    pub fn field(&self) -> F {
        self.field
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn entry(&self, row: usize, col: usize) -> &F::Element {
        &self.data[row][col]
    }

    /// Mutable entry access invalidates previous diagonalization results.
    pub fn entry_mut(&mut self, row: usize, col: usize) -> &mut F::Element {
        self.invalidate();
        &mut self.data[row][col]
    }

    pub fn set_entry(&mut self, row: usize, col: usize, value: F::Element) {
        self.invalidate();
        self.data[row][col] = value;
    }

    fn invalidate(&mut self) {
        self.diagonal.clear();
        self.base_changes.clear();
        self.diagonalized = false;
    }

    /// Adds a multiple of `row_1` to `row_2` so that the entry of `row_2` at
    /// `col` vanishes. Returns the coefficient used. Entries left of `col`
    /// are not touched.
    pub fn row_operation(
        &mut self,
        row_1: usize,
        row_2: usize,
        col: usize,
    ) -> Result<F::Element, ArithmeticError> {
        assert_ne!(row_1, row_2);
        let (source, target) = split_rows(&mut self.data, row_1, row_2);
        let coeff = eliminate_row(source, target, col)?;
        if self.record_base_changes {
            self.base_changes.push(RowOp {
                row_1,
                row_2,
                col,
                coeff: coeff.clone(),
            });
        }
        Ok(coeff)
    }

    pub fn resize(&mut self, num_rows: usize, num_cols: usize) {
        self.invalidate();
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        let field = self.field;
        self.data = (0..num_rows)
            .map(|_| vec![field.zero(); num_cols])
            .collect();
    }

    pub fn clear(&mut self) {
        self.invalidate();
        let field = self.field;
        for row in &mut self.data {
            for entry in row {
                *entry = field.zero();
            }
        }
    }

    pub fn diagonal(&self) -> &Diagonal {
        &self.diagonal
    }

    pub fn is_diagonalized(&self) -> bool {
        self.diagonalized
    }

    pub fn transposed(&self) -> bool {
        self.transposed
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    /// The dimension of the domain of the linear map this matrix encodes.
    pub fn domain_dimension(&self) -> usize {
        if self.transposed {
            self.num_rows
        } else {
            self.num_cols
        }
    }

    /// Enables or disables recording of row operations. Recording is needed
    /// to replay base changes onto vectors later.
    pub fn record_base_changes(&mut self, record: bool) {
        self.record_base_changes = record;
    }

    pub fn records_base_changes(&self) -> bool {
        self.record_base_changes
    }

    pub fn base_changes(&self) -> &[RowOp<F::Element>] {
        &self.base_changes
    }

    pub(crate) fn set_diagonal(&mut self, diagonal: Diagonal) {
        self.diagonal = diagonal;
    }

    pub(crate) fn set_base_changes(&mut self, ops: Vec<RowOp<F::Element>>) {
        self.base_changes = ops;
    }

    pub(crate) fn mark_diagonalized(&mut self) {
        self.diagonalized = true;
    }

    pub(crate) fn rows(&self) -> &[Vec<F::Element>] {
        &self.data
    }
}

fn split_rows<R>(rows: &mut [R], row_1: usize, row_2: usize) -> (&R, &mut R) {
    if row_1 < row_2 {
        let (head, tail) = rows.split_at_mut(row_2);
        (&head[row_1], &mut tail[0])
    } else {
        let (head, tail) = rows.split_at_mut(row_1);
        (&tail[0], &mut head[row_2])
    }
}

fn eliminate_row<E: FieldElement>(
    source: &[E],
    target: &mut [E],
    col: usize,
) -> Result<E, ArithmeticError> {
    let coeff = -(target[col].try_div(&source[col])?);
    for (s, t) in source[col..].iter().zip(&mut target[col..]) {
        if !s.is_zero() {
            *t += coeff.clone() * s.clone();
        }
    }
    Ok(coeff)
}

impl<F: Field> fmt::Display for MatrixField<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.data {
            writeln!(f, "[{}]", row.iter().join(", "))?;
        }
        Ok(())
    }
}

const BITS_PER_LIMB: usize = u64::BITS as usize;

/// A dense matrix over GF(2), one bit per entry.
#[derive(Debug, Clone)]
pub struct MatrixBool {
    num_rows: usize,
    num_cols: usize,
    data: Vec<Vec<u64>>,
    transposed: bool,
    diagonal: Diagonal,
    diagonalized: bool,
}

impl MatrixBool {
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        let limbs = num_cols.div_ceil(BITS_PER_LIMB);
        Self {
            num_rows,
            num_cols,
            data: vec![vec![0; limbs]; num_rows],
            transposed: false,
            diagonal: Diagonal::default(),
            diagonalized: false,
        }
    }

    pub fn from_vec(rows: &[Vec<u8>]) -> Self {
        let num_rows = rows.len();
        let num_cols = rows.first().map_or(0, Vec::len);
        let mut matrix = Self::new(num_rows, num_cols);
        for (r, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), num_cols, "ragged rows");
            for (c, &v) in row.iter().enumerate() {
                matrix.set_entry(r, c, v % 2 == 1);
            }
        }
        matrix
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn entry(&self, row: usize, col: usize) -> bool {
        self.data[row][col / BITS_PER_LIMB] >> (col % BITS_PER_LIMB) & 1 == 1
    }

    pub fn set_entry(&mut self, row: usize, col: usize, value: bool) {
        self.invalidate();
        let mask = 1 << (col % BITS_PER_LIMB);
        if value {
            self.data[row][col / BITS_PER_LIMB] |= mask;
        } else {
            self.data[row][col / BITS_PER_LIMB] &= !mask;
        }
    }

    /// Flips the entry, matching addition of 1 over GF(2).
    pub fn add_entry(&mut self, row: usize, col: usize) {
        self.invalidate();
        self.data[row][col / BITS_PER_LIMB] ^= 1 << (col % BITS_PER_LIMB);
    }

    fn invalidate(&mut self) {
        self.diagonal.clear();
        self.diagonalized = false;
    }

    /// Adds `row_1` to `row_2`. Over GF(2) the elimination coefficient is
    /// always 1, so the whole rows are xored.
    pub fn row_operation(&mut self, row_1: usize, row_2: usize) {
        assert_ne!(row_1, row_2);
        let (source, target) = split_rows(&mut self.data, row_1, row_2);
        for (s, t) in source.iter().zip(target.iter_mut()) {
            *t ^= s;
        }
    }

    pub fn resize(&mut self, num_rows: usize, num_cols: usize) {
        self.invalidate();
        self.num_rows = num_rows;
        self.num_cols = num_cols;
        let limbs = num_cols.div_ceil(BITS_PER_LIMB);
        self.data = vec![vec![0; limbs]; num_rows];
    }

    pub fn clear(&mut self) {
        self.invalidate();
        for row in &mut self.data {
            row.fill(0);
        }
    }

    pub fn diagonal(&self) -> &Diagonal {
        &self.diagonal
    }

    pub fn is_diagonalized(&self) -> bool {
        self.diagonalized
    }

    pub fn transposed(&self) -> bool {
        self.transposed
    }

    pub fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    pub fn domain_dimension(&self) -> usize {
        if self.transposed {
            self.num_rows
        } else {
            self.num_cols
        }
    }

    pub(crate) fn set_diagonal(&mut self, diagonal: Diagonal) {
        self.diagonal = diagonal;
    }

    pub(crate) fn mark_diagonalized(&mut self) {
        self.diagonalized = true;
    }

    pub(crate) fn set_limb(&mut self, row: usize, limb: usize, value: u64) {
        self.data[row][limb] = value;
    }

    pub(crate) fn rows(&self) -> &[Vec<u64>] {
        &self.data
    }
}

impl fmt::Display for MatrixBool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.num_rows {
            writeln!(
                f,
                "[{}]",
                (0..self.num_cols)
                    .map(|col| u8::from(self.entry(row, col)))
                    .join(", ")
            )?;
        }
        Ok(())
    }
}

/// What a diagonalizer needs from a matrix. Associated functions take rows
/// instead of `&self` so that workers can operate on disjoint rows while the
/// coordinator holds the rest of the matrix.
pub trait Diagonalizable: Send {
    type Row: Send + Sync;
    type Coeff: Clone + Send;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize;

    fn transposed(&self) -> bool;

    fn set_transposed(&mut self, transposed: bool);

    fn domain_dimension(&self) -> usize {
        if self.transposed() {
            self.row_count()
        } else {
            self.column_count()
        }
    }

    fn row_data_mut(&mut self) -> &mut [Self::Row];

    fn entry_is_nonzero(row: &Self::Row, col: usize) -> bool;

    /// Adds a multiple of `source` to `target` clearing `target`'s entry at
    /// `col`. The caller guarantees `source` is nonzero at `col`.
    fn eliminate(
        source: &Self::Row,
        target: &mut Self::Row,
        col: usize,
    ) -> Result<Self::Coeff, ArithmeticError>;

    fn records_base_changes(&self) -> bool;

    fn push_base_change(&mut self, row_1: usize, row_2: usize, col: usize, coeff: Self::Coeff);

    fn diagonal(&self) -> &Diagonal;

    fn begin_diagonalization(&mut self);

    fn finish_diagonalization(&mut self, diagonal: Diagonal);
}

impl<F: Field> Diagonalizable for MatrixField<F> {
    type Row = Vec<F::Element>;
    type Coeff = F::Element;

    fn row_count(&self) -> usize {
        self.num_rows
    }

    fn column_count(&self) -> usize {
        self.num_cols
    }

    fn transposed(&self) -> bool {
        self.transposed
    }

    fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    fn row_data_mut(&mut self) -> &mut [Vec<F::Element>] {
        &mut self.data
    }

    fn entry_is_nonzero(row: &Vec<F::Element>, col: usize) -> bool {
        !row[col].is_zero()
    }

    fn eliminate(
        source: &Vec<F::Element>,
        target: &mut Vec<F::Element>,
        col: usize,
    ) -> Result<F::Element, ArithmeticError> {
        eliminate_row(source, target, col)
    }

    fn records_base_changes(&self) -> bool {
        self.record_base_changes
    }

    fn push_base_change(&mut self, row_1: usize, row_2: usize, col: usize, coeff: F::Element) {
        self.base_changes.push(RowOp {
            row_1,
            row_2,
            col,
            coeff,
        });
    }

    fn diagonal(&self) -> &Diagonal {
        &self.diagonal
    }

    fn begin_diagonalization(&mut self) {
        self.diagonal.clear();
        self.base_changes.clear();
        self.diagonalized = false;
    }

    fn finish_diagonalization(&mut self, diagonal: Diagonal) {
        self.diagonal = diagonal;
        self.diagonalized = true;
    }
}

impl Diagonalizable for MatrixBool {
    type Row = Vec<u64>;
    type Coeff = ();

    fn row_count(&self) -> usize {
        self.num_rows
    }

    fn column_count(&self) -> usize {
        self.num_cols
    }

    fn transposed(&self) -> bool {
        self.transposed
    }

    fn set_transposed(&mut self, transposed: bool) {
        self.transposed = transposed;
    }

    fn row_data_mut(&mut self) -> &mut [Vec<u64>] {
        &mut self.data
    }

    fn entry_is_nonzero(row: &Vec<u64>, col: usize) -> bool {
        row[col / BITS_PER_LIMB] >> (col % BITS_PER_LIMB) & 1 == 1
    }

    fn eliminate(
        source: &Vec<u64>,
        target: &mut Vec<u64>,
        _col: usize,
    ) -> Result<(), ArithmeticError> {
        for (s, t) in source.iter().zip(target.iter_mut()) {
            *t ^= s;
        }
        Ok(())
    }

    fn records_base_changes(&self) -> bool {
        false
    }

    fn push_base_change(&mut self, _row_1: usize, _row_2: usize, _col: usize, _coeff: ()) {}

    fn diagonal(&self) -> &Diagonal {
        &self.diagonal
    }

    fn begin_diagonalization(&mut self) {
        self.diagonal.clear();
        self.diagonalized = false;
    }

    fn finish_diagonalization(&mut self, diagonal: Diagonal) {
        self.diagonal = diagonal;
        self.diagonalized = true;
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        field::{Fp, Rationals},
        prime::ValidPrime,
        rational::Rational,
    };

    use super::*;

    #[test]
    fn entry_access() {
        let mut m = MatrixField::new(Rationals, 2, 3);
        assert!(m.entry(1, 2).is_zero());
        m.set_entry(1, 2, Rational::new(3, 4));
        assert_eq!(*m.entry(1, 2), Rational::new(3, 4));
    }

    #[test]
    fn row_operation_clears_target_entry() {
        let mut m =
            MatrixField::from_vec(Rationals, &[vec![2, 1, 1], vec![1, -1, 2], vec![0, 1, -1]]);
        m.record_base_changes(true);
        let coeff = m.row_operation(0, 1, 0).unwrap();
        assert_eq!(coeff, Rational::new(-1, 2));
        assert!(m.entry(1, 0).is_zero());
        assert_eq!(*m.entry(1, 1), Rational::new(-3, 2));
        assert_eq!(*m.entry(1, 2), Rational::new(3, 2));
        assert_eq!(m.base_changes().len(), 1);
        assert_eq!(m.base_changes()[0].coeff, Rational::new(-1, 2));
    }

    #[test]
    fn row_operation_fails_on_zero_pivot() {
        let mut m = MatrixField::from_vec(Rationals, &[vec![0, 1], vec![1, 1]]);
        assert!(m.row_operation(0, 1, 0).is_err());
    }

    #[test]
    fn mutation_invalidates_the_ledger() {
        let mut m = MatrixField::from_vec(Rationals, &[vec![1]]);
        m.finish_diagonalization(Diagonal::from_entries(vec![(0, 0)]));
        assert!(m.is_diagonalized());
        m.set_entry(0, 0, Rational::from(2));
        assert!(!m.is_diagonalized());
        assert!(m.diagonal().is_empty());
    }

    #[test]
    fn modular_row_operation() {
        let f = Fp::new(ValidPrime::new(5));
        let mut m = MatrixField::from_vec(f, &[vec![2, 1], vec![3, 4]]);
        m.row_operation(0, 1, 0).unwrap();
        assert!(m.entry(1, 0).is_zero());
        // 4 - 3 * inverse(2) * 1 = 4 - 3 * 3 = 0 mod 5
        assert!(m.entry(1, 1).is_zero());
    }

    #[test]
    fn bool_entries_and_xor() {
        let mut m = MatrixBool::from_vec(&[vec![0, 1, 1], vec![1, 1, 0]]);
        assert!(!m.entry(0, 0));
        assert!(m.entry(0, 1));
        m.row_operation(0, 1);
        assert!(m.entry(1, 0));
        assert!(!m.entry(1, 1));
        assert!(m.entry(1, 2));
        m.add_entry(1, 0);
        assert!(!m.entry(1, 0));
    }

    #[test]
    fn bool_wide_rows_span_limbs() {
        let mut m = MatrixBool::new(1, 130);
        m.set_entry(0, 129, true);
        assert!(m.entry(0, 129));
        assert!(!m.entry(0, 128));
    }

    #[test]
    fn domain_dimension_follows_transposition() {
        let mut m = MatrixField::new(Rationals, 2, 5);
        assert_eq!(m.domain_dimension(), 5);
        m.set_transposed(true);
        assert_eq!(m.domain_dimension(), 2);
    }
}
