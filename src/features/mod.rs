// NovelCrab - GPL-3.0-or-later
// This file is part of NovelCrab.
//
// Copyright (C) 2025 Daniel Freiermuth
//
// NovelCrab is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// NovelCrab is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with NovelCrab.  If not, see <https://www.gnu.org/licenses/>.

//! Feature vectorization: raw string records to a fixed-width numeric matrix.

pub mod encoder;
pub mod padding;

pub use encoder::ColumnEncoder;
pub use padding::{pad_left, PAD_VALUE};

use crate::dataset::RawDataset;
use crate::error::{PipelineError, Result};
use ndarray::{Array2, ArrayView1, ArrayView2};

/// Rectangular matrix of fixed-length feature vectors, one row per record
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub const fn from_array(values: Array2<f64>) -> Self {
        Self { values }
    }

    /// Build from rows that must all have `width` entries
    pub fn from_rows(rows: &[Vec<f64>], width: usize) -> Result<Self> {
        let mut flat = Vec::with_capacity(rows.len() * width);
        for row in rows {
            if row.len() != width {
                return Err(PipelineError::DimensionMismatch {
                    context: "feature matrix row",
                    expected: width,
                    found: row.len(),
                });
            }
            flat.extend_from_slice(row);
        }

        let values = Array2::from_shape_vec((rows.len(), width), flat).map_err(|e| {
            PipelineError::Configuration(format!("cannot shape feature matrix: {e}"))
        })?;
        Ok(Self { values })
    }

    pub fn zeros(rows: usize, width: usize) -> Self {
        Self {
            values: Array2::zeros((rows, width)),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn width(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.values.view()
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }
}

/// Encodes and aligns records with one shared code table
#[derive(Debug, Clone)]
pub struct FeatureVectorizer {
    encoder: ColumnEncoder,
    fixed_length: usize,
}

impl FeatureVectorizer {
    /// Learn the categorical codes of every dataset that will be vectorized
    pub fn fit<'a>(
        datasets: impl IntoIterator<Item = &'a RawDataset>,
        fixed_length: usize,
    ) -> Result<Self> {
        if fixed_length == 0 {
            return Err(PipelineError::Configuration(
                "fixed vector length must be positive".to_string(),
            ));
        }
        Ok(Self {
            encoder: ColumnEncoder::fit(datasets),
            fixed_length,
        })
    }

    pub const fn fixed_length(&self) -> usize {
        self.fixed_length
    }

    pub const fn encoder(&self) -> &ColumnEncoder {
        &self.encoder
    }

    pub fn vectorize(&self, dataset: &RawDataset) -> Result<FeatureMatrix> {
        let mut values = Array2::from_elem((dataset.len(), self.fixed_length), PAD_VALUE);
        let mut truncated = 0usize;

        for (row, mut target) in values.rows_mut().into_iter().enumerate() {
            let sequence = self.encoder.encode_record(dataset, row)?;
            if sequence.len() > self.fixed_length {
                truncated += 1;
            }
            for (slot, value) in target.iter_mut().zip(pad_left(&sequence, self.fixed_length)) {
                *slot = value;
            }
        }

        if truncated > 0 {
            tracing::debug!(
                "{truncated} of {} records in {} were truncated to {} values",
                dataset.len(),
                dataset.source().display(),
                self.fixed_length
            );
        }

        Ok(FeatureMatrix::from_array(values))
    }
}

/// Vectorize a single dataset with a code table learned from it alone
pub fn vectorize(dataset: &RawDataset, fixed_length: usize) -> Result<FeatureMatrix> {
    FeatureVectorizer::fit([dataset], fixed_length)?.vectorize(dataset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vectorize_pads_and_truncates() {
        let dataset = RawDataset::from_records(vec![
            vec!["1", "2"],
            vec!["1", "2", "3", "4", "5", "6"],
            vec!["9", "8", "7", "6"],
        ]);
        let matrix = vectorize(&dataset, 4).expect("vectorizes");

        assert_eq!(matrix.n_rows(), 3);
        assert_eq!(matrix.width(), 4);
        assert_eq!(matrix.row(0).to_vec(), vec![0.0, 0.0, 1.0, 2.0]);
        assert_eq!(matrix.row(1).to_vec(), vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(matrix.row(2).to_vec(), vec![9.0, 8.0, 7.0, 6.0]);
    }

    #[test]
    fn test_train_and_test_share_width_and_codes() {
        let train = RawDataset::from_records(vec![vec!["open", "read"], vec!["open", "write", "close"]]);
        let test = RawDataset::from_records(vec![vec!["write", "close"]]);
        let vectorizer = FeatureVectorizer::fit([&train, &test], 3).expect("fits");

        let train_x = vectorizer.vectorize(&train).expect("train");
        let test_x = vectorizer.vectorize(&test).expect("test");
        assert_eq!(train_x.width(), test_x.width());
        // "write" is column 1 in train but column 0 in test, so codes differ per column
        assert_eq!(train_x.row(1).to_vec(), vec![1.0, 2.0, 1.0]);
        assert_eq!(test_x.row(0).to_vec(), vec![0.0, 2.0, 3.0]);
    }

    #[test]
    fn test_zero_length_is_rejected() {
        let dataset = RawDataset::from_records(vec![vec!["1"]]);
        let err = vectorize(&dataset, 0).expect_err("zero width");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_from_rows_checks_width() {
        let err = FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![1.0]], 2).expect_err("ragged");
        assert!(matches!(err, PipelineError::DimensionMismatch { found: 1, .. }));

        let empty = FeatureMatrix::from_rows(&[], 5).expect("empty matrix");
        assert!(empty.is_empty());
        assert_eq!(empty.width(), 5);
    }
}
