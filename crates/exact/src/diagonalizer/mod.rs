//! Gauss diagonalization.
//!
//! The sequential and the multithreaded algorithm produce the same pivot
//! ledger for the same matrix: in each column the surviving nonzero row with
//! the smallest index becomes the pivot. The parallel variant only changes
//! who performs the eliminations, not which rows are picked.

mod parallel;

use std::sync::atomic::{AtomicU32, Ordering};

use thiserror::Error;

use crate::{
    field::ArithmeticError,
    matrix::{Diagonal, Diagonalizable},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DiagonalizeError {
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// Shared progress counter, updated after every found pivot. Readers on
/// other threads poll it to report on long-running diagonalizations.
#[derive(Debug, Default)]
pub struct Progress {
    current_rank: AtomicU32,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_rank(&self) -> u32 {
        self.current_rank.load(Ordering::Relaxed)
    }

    pub(crate) fn store(&self, rank: u32) {
        self.current_rank.store(rank, Ordering::Relaxed);
    }
}

/// Diagonalizes matrices and retains the rank and defect of the last run.
#[derive(Debug)]
pub struct Diagonalizer {
    threads: u32,
    rnk: u32,
    def: u32,
}

impl Diagonalizer {
    /// Panics if `threads` is zero.
    pub fn new(threads: u32) -> Self {
        assert!(threads > 0, "at least one thread is required");
        Self {
            threads,
            rnk: 0,
            def: 0,
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn threads(&self) -> u32 {
        self.threads
    }

    pub fn diagonalize<M: Diagonalizable>(
        &mut self,
        matrix: &mut M,
    ) -> Result<(), DiagonalizeError> {
        self.diagonalize_with_progress(matrix, &Progress::new())
    }

    /// Diagonalizes `matrix` in place, filling its pivot ledger and, where
    /// enabled, its row operation record.
    pub fn diagonalize_with_progress<M: Diagonalizable>(
        &mut self,
        matrix: &mut M,
        progress: &Progress,
    ) -> Result<(), DiagonalizeError> {
        progress.store(0);
        matrix.begin_diagonalization();
        let diagonal = if self.threads > 1 {
            parallel::diagonalize(matrix, self.threads, progress)?
        } else {
            sequential(matrix, progress)?
        };
        self.rnk = diagonal.len() as u32;
        self.def = (matrix.domain_dimension() - diagonal.len()) as u32;
        tracing::debug!(
            rank = self.rnk,
            defect = self.def,
            threads = self.threads,
            "diagonalization finished"
        );
        matrix.finish_diagonalization(diagonal);
        Ok(())
    }

    /// The rank of the last diagonalized matrix.
    pub fn rank(&self) -> u32 {
        self.rnk
    }

    /// The dimension of the kernel of the last diagonalized matrix.
    pub fn defect(&self) -> u32 {
        self.def
    }

    pub fn kern(&self) -> i32 {
        self.def as i32
    }

    pub fn tors(&self) -> i32 {
        self.rnk as i32
    }
}

fn sequential<M: Diagonalizable>(
    matrix: &mut M,
    progress: &Progress,
) -> Result<Diagonal, DiagonalizeError> {
    let num_rows = matrix.row_count();
    let num_cols = matrix.column_count();
    let mut diagonal = Diagonal::default();
    let mut ops = Vec::new();
    let records = matrix.records_base_changes();
    {
        let rows = matrix.row_data_mut();
        let mut rows_to_check: Vec<usize> = (0..num_rows).collect();
        for col in 0..num_cols {
            if rows_to_check.is_empty() {
                break;
            }
            let Some(position) = rows_to_check
                .iter()
                .position(|&r| M::entry_is_nonzero(&rows[r], col))
            else {
                continue;
            };
            let pivot = rows_to_check.remove(position);
            for &row in &rows_to_check {
                if !M::entry_is_nonzero(&rows[row], col) {
                    continue;
                }
                let (source, target) = split_rows(rows, pivot, row);
                let coeff = M::eliminate(source, target, col)?;
                if records {
                    ops.push((pivot, row, col, coeff));
                }
            }
            diagonal.push(pivot, col);
            progress.store(diagonal.len() as u32);
        }
    }
    for (row_1, row_2, col, coeff) in ops {
        matrix.push_base_change(row_1, row_2, col, coeff);
    }
    Ok(diagonal)
}

fn split_rows<R>(rows: &mut [R], source: usize, target: usize) -> (&R, &mut R) {
    debug_assert_ne!(source, target);
    if source < target {
        let (head, tail) = rows.split_at_mut(target);
        (&head[source], &mut tail[0])
    } else {
        let (head, tail) = rows.split_at_mut(source);
        (&tail[0], &mut head[target])
    }
}
