//! The multithreaded elimination rounds.
//!
//! Work proceeds column by column. At every column the surviving rows are
//! split into those with a nonzero entry there (`rows_to_work_at`) and those
//! without (`remaining_rows`). The smallest index in `rows_to_work_at`
//! becomes the pivot and the rest are handed to workers in contiguous
//! chunks. While the workers eliminate, the coordinator reclassifies the
//! remaining rows for the next column; each worker reclassifies the rows it
//! eliminated. After the barrier the per-worker buckets are merged back in
//! ascending row order, so the next round sees the same partition a single
//! thread would have produced. Rows never move between chunks inside a
//! round, which keeps all writes disjoint.

use std::mem;

use itertools::Itertools;

use crate::{
    field::ArithmeticError,
    matrix::{Diagonal, Diagonalizable},
};

use super::{DiagonalizeError, Progress};

/// The shared state of one elimination round: the current column and pivot
/// row, the rows known nonzero there, the rows known zero there, and the
/// chunk size handed to each worker.
#[derive(Debug)]
struct JobQueue {
    col: usize,
    row_1: usize,
    rows_to_work_at: Vec<usize>,
    remaining_rows: Vec<usize>,
    chunk_size: usize,
}

struct WorkerOutput<C> {
    nonzero: Vec<usize>,
    zero: Vec<usize>,
    ops: Vec<(usize, usize, C)>,
    error: Option<ArithmeticError>,
}

impl<C> WorkerOutput<C> {
    fn new() -> Self {
        Self {
            nonzero: Vec::new(),
            zero: Vec::new(),
            ops: Vec::new(),
            error: None,
        }
    }
}

/// A shared view of the matrix rows. Callers must only take disjoint mutable
/// rows, plus shared references to rows nobody writes.
struct RowsPtr<R> {
    ptr: *mut R,
    len: usize,
}

impl<R> Clone for RowsPtr<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for RowsPtr<R> {}

unsafe impl<R: Send> Send for RowsPtr<R> {}
unsafe impl<R: Sync> Sync for RowsPtr<R> {}

impl<R> RowsPtr<R> {
    fn new(rows: &mut [R]) -> Self {
        Self {
            ptr: rows.as_mut_ptr(),
            len: rows.len(),
        }
    }

    /// Safety: no thread may hold a mutable reference to `row`.
    unsafe fn get(&self, row: usize) -> &R {
        debug_assert!(row < self.len);
        &*self.ptr.add(row)
    }

    /// Safety: no other reference to `row` may exist.
    #[allow(clippy::mut_from_ref)]
    unsafe fn get_mut(&self, row: usize) -> &mut R {
        debug_assert!(row < self.len);
        &mut *self.ptr.add(row)
    }
}

pub(super) fn diagonalize<M: Diagonalizable>(
    matrix: &mut M,
    threads: u32,
    progress: &Progress,
) -> Result<Diagonal, DiagonalizeError> {
    let num_rows = matrix.row_count();
    let num_cols = matrix.column_count();
    let records = matrix.records_base_changes();
    let mut entries: Vec<(usize, usize)> = Vec::new();
    let mut recorded: Vec<(usize, usize, usize, M::Coeff)> = Vec::new();

    'rows_released: {
        if num_cols == 0 || num_rows == 0 {
            break 'rows_released;
        }
        let rows = matrix.row_data_mut();
        let mut queue = initial_queue::<M>(rows, num_rows);

        while queue.col < num_cols {
            if queue.rows_to_work_at.is_empty() && queue.remaining_rows.is_empty() {
                break;
            }
            let next_col = queue.col + 1;
            if queue.rows_to_work_at.is_empty() {
                // Defective column. The remaining rows still have to be
                // reclassified so the next round sees a correct partition.
                if next_col == num_cols {
                    break;
                }
                let remaining = mem::take(&mut queue.remaining_rows);
                for row in remaining {
                    if M::entry_is_nonzero(&rows[row], next_col) {
                        queue.rows_to_work_at.push(row);
                    } else {
                        queue.remaining_rows.push(row);
                    }
                }
                queue.col = next_col;
                continue;
            }

            let work = mem::take(&mut queue.rows_to_work_at);
            queue.row_1 = work[0];
            let others = &work[1..];
            queue.chunk_size = others.len().div_ceil(threads as usize).max(1);

            let chunk_count = others.chunks(queue.chunk_size).len();
            let mut outputs: Vec<WorkerOutput<M::Coeff>> =
                (0..chunk_count).map(|_| WorkerOutput::new()).collect();
            let mut remaining_nonzero = Vec::new();
            let mut remaining_zero = Vec::new();

            let pivot = queue.row_1;
            let col = queue.col;
            let shared = RowsPtr::new(rows);
            rayon::in_place_scope(|scope| {
                for (chunk, out) in others.chunks(queue.chunk_size).zip(&mut outputs) {
                    scope.spawn(move |_| {
                        // The pivot row is read only and every worker writes
                        // its own chunk exclusively.
                        let source = unsafe { shared.get(pivot) };
                        for &row in chunk {
                            let target = unsafe { shared.get_mut(row) };
                            match M::eliminate(source, target, col) {
                                Ok(coeff) => {
                                    if records {
                                        out.ops.push((row, col, coeff));
                                    }
                                    if next_col < num_cols {
                                        if M::entry_is_nonzero(target, next_col) {
                                            out.nonzero.push(row);
                                        } else {
                                            out.zero.push(row);
                                        }
                                    }
                                }
                                Err(error) => {
                                    out.error = Some(error);
                                    break;
                                }
                            }
                        }
                    });
                }
                if next_col < num_cols {
                    for &row in &queue.remaining_rows {
                        if M::entry_is_nonzero(unsafe { shared.get(row) }, next_col) {
                            remaining_nonzero.push(row);
                        } else {
                            remaining_zero.push(row);
                        }
                    }
                }
            });

            for out in &mut outputs {
                if let Some(error) = out.error.take() {
                    return Err(error.into());
                }
            }
            for out in &mut outputs {
                recorded.extend(out.ops.drain(..).map(|(row, c, coeff)| (pivot, row, c, coeff)));
            }
            entries.push((pivot, col));
            progress.store(entries.len() as u32);
            tracing::trace!(
                col,
                pivot,
                eliminated = others.len(),
                chunk_size = queue.chunk_size,
                "round finished"
            );

            if next_col == num_cols {
                break;
            }
            // Worker buckets concatenate in ascending row order because the
            // chunks partition an ascending list. Merging them with the
            // coordinator's buckets restores the global order, so the next
            // pivot is again the smallest surviving nonzero row.
            let eliminated_nonzero: Vec<usize> = outputs
                .iter_mut()
                .flat_map(|out| out.nonzero.drain(..))
                .collect();
            let eliminated_zero: Vec<usize> = outputs
                .iter_mut()
                .flat_map(|out| out.zero.drain(..))
                .collect();
            queue.rows_to_work_at = eliminated_nonzero
                .into_iter()
                .merge(remaining_nonzero)
                .collect();
            queue.remaining_rows = eliminated_zero.into_iter().merge(remaining_zero).collect();
            queue.col = next_col;
        }
    }

    for (row_1, row_2, col, coeff) in recorded {
        matrix.push_base_change(row_1, row_2, col, coeff);
    }
    Ok(Diagonal::from_entries(entries))
}

fn initial_queue<M: Diagonalizable>(rows: &[M::Row], num_rows: usize) -> JobQueue {
    let mut queue = JobQueue {
        col: 0,
        row_1: 0,
        rows_to_work_at: Vec::new(),
        remaining_rows: Vec::new(),
        chunk_size: 1,
    };
    for row in 0..num_rows {
        if M::entry_is_nonzero(&rows[row], 0) {
            queue.rows_to_work_at.push(row);
        } else {
            queue.remaining_rows.push(row);
        }
    }
    queue
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use crate::{
        diagonalizer::Diagonalizer,
        field::{Fp, Rationals},
        matrix::{MatrixBool, MatrixField},
        prime::ValidPrime,
    };

    #[rstest]
    #[case(2)]
    #[case(3)]
    #[case(8)]
    fn golden_rational_matrix(#[case] threads: u32) {
        let mut m =
            MatrixField::from_vec(Rationals, &[vec![2, 1, 1], vec![1, -1, 2], vec![0, 1, -1]]);
        let mut d = Diagonalizer::new(threads);
        d.diagonalize(&mut m).unwrap();
        assert_eq!(d.rank(), 2);
        assert_eq!(m.diagonal().entries(), &[(0, 0), (1, 1)]);
    }

    #[rstest]
    #[case(2)]
    #[case(5)]
    fn defective_columns_reclassify_remaining_rows(#[case] threads: u32) {
        // Column 1 is defective after the first round; row 3 must still be
        // found as the pivot of column 3.
        let mut m = MatrixField::from_vec(
            Rationals,
            &[
                vec![1, 2, 3, 4],
                vec![0, 0, 0, 0],
                vec![2, 4, 6, 8],
                vec![0, 0, 0, 1],
            ],
        );
        let mut d = Diagonalizer::new(threads);
        d.diagonalize(&mut m).unwrap();
        assert_eq!(d.rank(), 2);
        assert_eq!(m.diagonal().entries(), &[(0, 0), (3, 3)]);
    }

    #[rstest]
    #[case(2)]
    #[case(4)]
    fn bool_parallel_matches_sequential(#[case] threads: u32) {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xb001);
        for _ in 0..20 {
            let rows = rng.gen_range(1..40);
            let cols = rng.gen_range(1..40);
            let entries: Vec<Vec<u8>> = (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(0..2)).collect())
                .collect();
            let mut a = MatrixBool::from_vec(&entries);
            let mut b = a.clone();
            Diagonalizer::sequential().diagonalize(&mut a).unwrap();
            Diagonalizer::new(threads).diagonalize(&mut b).unwrap();
            assert_eq!(a.diagonal(), b.diagonal());
        }
    }

    #[test]
    fn modular_parallel_matches_sequential() {
        use rand::{Rng, SeedableRng};
        let f = Fp::new(ValidPrime::new(7));
        let mut rng = rand::rngs::StdRng::seed_from_u64(0xf7);
        for _ in 0..20 {
            let rows = rng.gen_range(1..15);
            let cols = rng.gen_range(1..15);
            let entries: Vec<Vec<i64>> = (0..rows)
                .map(|_| (0..cols).map(|_| rng.gen_range(0..7)).collect())
                .collect();
            let mut a = MatrixField::from_vec(f, &entries);
            let mut b = a.clone();
            Diagonalizer::sequential().diagonalize(&mut a).unwrap();
            Diagonalizer::new(3).diagonalize(&mut b).unwrap();
            assert_eq!(a.diagonal(), b.diagonal());
        }
    }

    #[test]
    fn more_threads_than_rows() {
        let mut m = MatrixField::from_vec(Rationals, &[vec![1, 1], vec![1, 0]]);
        let mut d = Diagonalizer::new(16);
        d.diagonalize(&mut m).unwrap();
        assert_eq!(d.rank(), 2);
    }

    #[test]
    fn empty_matrix() {
        let mut m = MatrixField::new(Rationals, 0, 0);
        let mut d = Diagonalizer::new(4);
        d.diagonalize(&mut m).unwrap();
        assert_eq!(d.rank(), 0);
        assert_eq!(d.defect(), 0);
    }
}
