//! Compressed sparse rows for fused feature vectors.
//!
//! TF-IDF output is overwhelmingly zero, so fused rows only store their non-zero
//! `(column, value)` pairs, kept sorted by column.

use crate::error::{ApiError, Result};

/// One sparse row. Entries are sorted by column and never hold explicit zeros.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseRow {
    entries: Vec<(usize, f64)>,
}

impl SparseRow {
    /// Build a row from unordered pairs; duplicate columns are summed.
    pub fn from_pairs(mut pairs: Vec<(usize, f64)>) -> Self {
        pairs.sort_by_key(|&(col, _)| col);

        let mut entries: Vec<(usize, f64)> = Vec::with_capacity(pairs.len());
        for (col, value) in pairs {
            match entries.last_mut() {
                Some((last_col, last_value)) if *last_col == col => *last_value += value,
                _ => entries.push((col, value)),
            }
        }
        entries.retain(|&(_, value)| value != 0.0);

        Self { entries }
    }

    pub fn from_dense(values: &[f64]) -> Self {
        Self {
            entries: values
                .iter()
                .enumerate()
                .filter(|(_, value)| **value != 0.0)
                .map(|(col, value)| (col, *value))
                .collect(),
        }
    }

    pub fn entries(&self) -> &[(usize, f64)] {
        &self.entries
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    /// Value at `col`, zero when not stored.
    pub fn get(&self, col: usize) -> f64 {
        self.entries
            .binary_search_by_key(&col, |&(c, _)| c)
            .map(|pos| self.entries[pos].1)
            .unwrap_or(0.0)
    }

    pub fn max_column(&self) -> Option<usize> {
        self.entries.last().map(|&(col, _)| col)
    }

    pub fn norm(&self) -> f64 {
        self.entries
            .iter()
            .map(|&(_, value)| value * value)
            .sum::<f64>()
            .sqrt()
    }

    /// Dot product by merging the two sorted entry lists.
    pub fn dot(&self, other: &SparseRow) -> f64 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;

        while i < self.entries.len() && j < other.entries.len() {
            let (col_a, value_a) = self.entries[i];
            let (col_b, value_b) = other.entries[j];
            match col_a.cmp(&col_b) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    sum += value_a * value_b;
                    i += 1;
                    j += 1;
                }
            }
        }

        sum
    }

    /// Scale the row to unit L2 norm; zero rows are left untouched.
    pub fn normalize(&mut self) {
        let norm = self.norm();
        if norm > 0.0 {
            for (_, value) in &mut self.entries {
                *value /= norm;
            }
        }
    }
}

/// A row-major sparse matrix with a fixed column count.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseMatrix {
    rows: Vec<SparseRow>,
    n_cols: usize,
}

/// Text, numeric and categorical blocks concatenated into one feature space.
pub type FusedFeatureMatrix = SparseMatrix;

impl SparseMatrix {
    pub fn new(rows: Vec<SparseRow>, n_cols: usize) -> Result<Self> {
        if let Some(col) = rows.iter().filter_map(SparseRow::max_column).max() {
            if col >= n_cols {
                return Err(ApiError::InternalError(format!(
                    "sparse entry at column {} exceeds matrix width {}",
                    col, n_cols
                )));
            }
        }
        Ok(Self { rows, n_cols })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.n_cols)
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    /// Concatenate blocks column-wise, in the given order.
    pub fn hstack(blocks: &[SparseMatrix]) -> Result<Self> {
        let n_rows = blocks.first().map(SparseMatrix::n_rows).unwrap_or(0);
        if let Some(block) = blocks.iter().find(|b| b.n_rows() != n_rows) {
            return Err(ApiError::InternalError(format!(
                "cannot stack blocks with {} and {} rows",
                n_rows,
                block.n_rows()
            )));
        }

        let n_cols = blocks.iter().map(SparseMatrix::n_cols).sum();
        let rows = (0..n_rows)
            .map(|row| {
                let mut offset = 0;
                let mut entries = Vec::new();
                for block in blocks {
                    entries.extend(
                        block.rows[row]
                            .entries
                            .iter()
                            .map(|&(col, value)| (col + offset, value)),
                    );
                    offset += block.n_cols;
                }
                // Blocks are visited left to right, so entries are already sorted.
                SparseRow { entries }
            })
            .collect();

        Ok(Self { rows, n_cols })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pairs_sorts_merges_and_drops_zeros() {
        let row = SparseRow::from_pairs(vec![(3, 1.0), (1, 2.0), (3, 0.5), (2, 0.0)]);
        assert_eq!(row.entries(), &[(1, 2.0), (3, 1.5)]);
        assert_eq!(row.get(3), 1.5);
        assert_eq!(row.get(2), 0.0);
    }

    #[test]
    fn test_dot_and_norm() {
        let a = SparseRow::from_dense(&[1.0, 0.0, 2.0]);
        let b = SparseRow::from_dense(&[3.0, 4.0, 1.0]);
        assert_eq!(a.dot(&b), 5.0);
        assert_eq!(SparseRow::from_dense(&[3.0, 4.0]).norm(), 5.0);
    }

    #[test]
    fn test_hstack_offsets_columns() {
        let left = SparseMatrix::new(
            vec![SparseRow::from_dense(&[1.0, 0.0]), SparseRow::default()],
            2,
        )
        .unwrap();
        let right = SparseMatrix::new(
            vec![
                SparseRow::from_dense(&[0.0, 0.0, 7.0]),
                SparseRow::from_dense(&[5.0, 0.0, 0.0]),
            ],
            3,
        )
        .unwrap();

        let stacked = SparseMatrix::hstack(&[left, right]).unwrap();
        assert_eq!(stacked.shape(), (2, 5));
        assert_eq!(stacked.rows()[0].entries(), &[(0, 1.0), (4, 7.0)]);
        assert_eq!(stacked.rows()[1].entries(), &[(2, 5.0)]);
    }

    #[test]
    fn test_hstack_rejects_ragged_blocks() {
        let one = SparseMatrix::new(vec![SparseRow::default()], 1).unwrap();
        let two = SparseMatrix::new(vec![SparseRow::default(), SparseRow::default()], 1).unwrap();
        assert!(SparseMatrix::hstack(&[one, two]).is_err());
    }

    #[test]
    fn test_new_rejects_out_of_range_column() {
        let row = SparseRow::from_pairs(vec![(4, 1.0)]);
        assert!(SparseMatrix::new(vec![row], 4).is_err());
    }
}
