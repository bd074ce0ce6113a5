//! Chain complexes of differentials and their homology.
//!
//! A complex can be driven in two modes. In map mode every differential is
//! inserted under its degree and homology is read off the whole family. In
//! streaming mode only a `current` and an `old` differential are held at a
//! time, which is what large computations use to keep one degree in memory
//! while the next one is being assembled.

use std::collections::BTreeMap;

use thiserror::Error;

use exact::{Diagonalizable, DiagonalizeError, Diagonalizer, Progress};

use crate::homology::HomologyField;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChainComplexError {
    #[error("no differential stored for degree {degree}")]
    MissingDifferential { degree: i32 },
    #[error(transparent)]
    Diagonalize(#[from] DiagonalizeError),
}

/// A chain complex with differentials `d_n: C_n -> C_(n-1)`.
///
/// When `transposed` is set, the stored matrices encode the differentials
/// with rows and columns swapped and the kernel dimension is read off the
/// row count instead of the column count.
#[derive(Debug)]
pub struct ChainComplex<M: Diagonalizable> {
    transposed: bool,
    current: Option<M>,
    old: Option<M>,
    differentials: BTreeMap<i32, M>,
}

impl<M: Diagonalizable> ChainComplex<M> {
    pub fn new(transposed: bool) -> Self {
        Self {
            transposed,
            current: None,
            old: None,
            differentials: BTreeMap::new(),
        }
    }

    pub fn transposed(&self) -> bool {
        self.transposed
    }

    /// Installs `matrix` as the current differential, stamping it with the
    /// complex's orientation.
    pub fn set_current_differential(&mut self, mut matrix: M) {
        matrix.set_transposed(self.transposed);
        self.current = Some(matrix);
    }

    pub fn current_differential(&self) -> Option<&M> {
        self.current.as_ref()
    }

    pub fn current_differential_mut(&mut self) -> Option<&mut M> {
        self.current.as_mut()
    }

    pub fn erase_current_differential(&mut self) {
        self.current = None;
    }

    /// Moves the current differential into the old slot, freeing the current
    /// one for the next degree.
    pub fn make_current_differential_old(&mut self) {
        self.old = self.current.take();
    }

    pub fn old_differential(&self) -> Option<&M> {
        self.old.as_ref()
    }

    pub fn erase_old_differential(&mut self) {
        self.old = None;
    }

    pub fn insert_differential(&mut self, n: i32, mut matrix: M) {
        matrix.set_transposed(self.transposed);
        self.differentials.insert(n, matrix);
    }

    pub fn differential(&self, n: i32) -> Option<&M> {
        self.differentials.get(&n)
    }

    pub fn differential_mut(&mut self, n: i32) -> Option<&mut M> {
        self.differentials.get_mut(&n)
    }

    pub fn exists_differential(&self, n: i32) -> bool {
        self.differentials.contains_key(&n)
    }

    pub fn erase_differential(&mut self, n: i32) {
        self.differentials.remove(&n);
    }

    pub fn erase_all_differentials(&mut self) {
        self.differentials.clear();
    }

    pub fn degrees(&self) -> impl Iterator<Item = i32> + '_ {
        self.differentials.keys().copied()
    }

    /// Diagonalizes the current differential, taken to be `d_n`, and stores
    /// its kernel dimension at degree `n` and its rank as torsion at `n - 1`.
    pub fn compute_current_kernel_and_torsion(
        &mut self,
        n: i32,
        diagonalizer: &mut Diagonalizer,
        progress: &Progress,
    ) -> Result<HomologyField, ChainComplexError> {
        let matrix = self
            .current
            .as_mut()
            .ok_or(ChainComplexError::MissingDifferential { degree: n })?;
        diagonalizer.diagonalize_with_progress(matrix, progress)?;
        let mut homology = HomologyField::new();
        homology.set_kern(n, diagonalizer.kern());
        homology.set_tors(n - 1, diagonalizer.tors());
        Ok(homology)
    }

    /// Map-mode counterpart of [`Self::compute_current_kernel_and_torsion`].
    pub fn compute_kernel_and_torsion(
        &mut self,
        n: i32,
        diagonalizer: &mut Diagonalizer,
        progress: &Progress,
    ) -> Result<HomologyField, ChainComplexError> {
        let matrix = self
            .differentials
            .get_mut(&n)
            .ok_or(ChainComplexError::MissingDifferential { degree: n })?;
        diagonalizer.diagonalize_with_progress(matrix, progress)?;
        let mut homology = HomologyField::new();
        homology.set_kern(n, diagonalizer.kern());
        homology.set_tors(n - 1, diagonalizer.tors());
        Ok(homology)
    }

    /// The dimension of the n-th homology module. Needs the differentials at
    /// `n` and `n + 1`; a missing differential at `n + 1` counts as the zero
    /// map, and a missing one at `n` does too if `n + 1` is present, in
    /// which case the kernel is the whole domain of degree `n`.
    pub fn homology(
        &mut self,
        n: i32,
        diagonalizer: &mut Diagonalizer,
    ) -> Result<HomologyField, ChainComplexError> {
        let progress = Progress::new();
        let mut homology = HomologyField::new();
        match self.differentials.get_mut(&n) {
            Some(matrix) => {
                diagonalizer.diagonalize_with_progress(matrix, &progress)?;
                homology.set_kern(n, diagonalizer.kern());
            }
            None => {
                let above = self
                    .differentials
                    .get(&(n + 1))
                    .ok_or(ChainComplexError::MissingDifferential { degree: n })?;
                homology.set_kern(n, codomain_dimension(above) as i32);
            }
        }
        if let Some(above) = self.differentials.get_mut(&(n + 1)) {
            diagonalizer.diagonalize_with_progress(above, &progress)?;
            homology.set_tors(n, diagonalizer.tors());
        }
        tracing::info!(degree = n, dimension = homology.dimension(n), "homology");
        Ok(homology)
    }

    /// Computes kernels and torsions for every stored differential. The
    /// resulting dimensions are valid at every degree `n` for which both
    /// `d_n` and `d_(n+1)` are stored, or known to be zero.
    pub fn homology_all(
        &mut self,
        diagonalizer: &mut Diagonalizer,
    ) -> Result<HomologyField, ChainComplexError> {
        let progress = Progress::new();
        let mut homology = HomologyField::new();
        for (&n, matrix) in &mut self.differentials {
            diagonalizer.diagonalize_with_progress(matrix, &progress)?;
            homology.set_kern(n, diagonalizer.kern());
            homology.set_tors(n - 1, diagonalizer.tors());
        }
        Ok(homology)
    }
}

fn codomain_dimension<M: Diagonalizable>(matrix: &M) -> usize {
    if matrix.transposed() {
        matrix.column_count()
    } else {
        matrix.row_count()
    }
}

#[cfg(test)]
mod tests {
    use exact::{MatrixField, Rationals};

    use super::*;

    // The simplicial circle: two vertices, two edges, d_1 sends both edges
    // to the difference of the vertices.
    fn circle() -> ChainComplex<MatrixField<Rationals>> {
        let mut complex = ChainComplex::new(false);
        let d1 = MatrixField::from_vec(Rationals, &[vec![1, 1], vec![-1, -1]]);
        complex.insert_differential(1, d1);
        complex
    }

    #[test]
    fn circle_homology() {
        let mut complex = circle();
        let mut d = Diagonalizer::sequential();
        // H_1: kernel of d_1, no differential above.
        let h1 = complex.homology(1, &mut d).unwrap();
        assert_eq!(h1.dimension(1), 1);
        // H_0: d_0 is missing, so the kernel is all of C_0 and the torsion
        // comes from d_1.
        let h0 = complex.homology(0, &mut d).unwrap();
        assert_eq!(h0.dimension(0), 1);
    }

    #[test]
    fn streaming_mode_matches_map_mode() {
        let mut complex = circle();
        let d1 = complex.differential(1).unwrap().clone();
        let mut d = Diagonalizer::sequential();
        let progress = Progress::new();

        let from_map = complex
            .compute_kernel_and_torsion(1, &mut d, &progress)
            .unwrap();

        let mut streaming = ChainComplex::new(false);
        streaming.set_current_differential(d1);
        let from_stream = streaming
            .compute_current_kernel_and_torsion(1, &mut d, &progress)
            .unwrap();

        assert_eq!(from_map, from_stream);
        assert_eq!(from_stream.kern(1), 1);
        assert_eq!(from_stream.tors(0), 1);
    }

    #[test]
    fn current_differential_lifecycle() {
        let mut complex: ChainComplex<MatrixField<Rationals>> = ChainComplex::new(false);
        assert!(complex.current_differential().is_none());
        complex.set_current_differential(MatrixField::new(Rationals, 2, 2));
        assert!(complex.current_differential().is_some());
        complex.make_current_differential_old();
        assert!(complex.current_differential().is_none());
        assert!(complex.old_differential().is_some());
        complex.erase_old_differential();
        assert!(complex.old_differential().is_none());
    }

    #[test]
    fn transposed_complex_stamps_its_matrices() {
        let mut complex: ChainComplex<MatrixField<Rationals>> = ChainComplex::new(true);
        complex.insert_differential(0, MatrixField::new(Rationals, 2, 5));
        assert!(complex.differential(0).unwrap().transposed());
        assert_eq!(complex.differential(0).unwrap().domain_dimension(), 2);
    }

    #[test]
    fn missing_differential_is_an_error() {
        let mut complex: ChainComplex<MatrixField<Rationals>> = ChainComplex::new(false);
        let mut d = Diagonalizer::sequential();
        assert!(matches!(
            complex.homology(3, &mut d),
            Err(ChainComplexError::MissingDifferential { degree: 3 })
        ));
    }

    #[test]
    fn homology_all_covers_every_degree() {
        let mut complex = circle();
        let mut d = Diagonalizer::sequential();
        let h = complex.homology_all(&mut d).unwrap();
        assert_eq!(h.kern(1), 1);
        assert_eq!(h.tors(0), 1);
    }
}
