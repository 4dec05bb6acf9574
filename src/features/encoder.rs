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

//! Column-wise categorical encoding.
//!
//! Numeric tokens keep their value. Any other token gets a per-column code in
//! first-seen order: 1, 2, 3, ... for purely categorical columns. In a column
//! that also holds numbers the codes start after the largest one, so a
//! category never shares a value with a number or with the padding sentinel
//! 0.0. The scheme is only meaningful within one run.

use crate::dataset::RawDataset;
use crate::error::{PipelineError, Result};
use indexmap::IndexMap;

/// Per-column code tables learned from one or more datasets
#[derive(Debug, Clone, Default)]
pub struct ColumnEncoder {
    columns: Vec<ColumnCodes>,
}

#[derive(Debug, Clone, Default)]
struct ColumnCodes {
    codes: IndexMap<String, usize>,
    /// Largest numeric value seen in the column, 0 when there is none
    numeric_max: f64,
}

impl ColumnCodes {
    fn value(&self, code: usize) -> f64 {
        self.numeric_max.floor() + code as f64
    }
}

/// Result of encoding a single token
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Encoded {
    /// Empty field
    Missing,
    Value(f64),
    /// Non-numeric token that was not seen while fitting
    Unknown,
}

/// Parse a token as a finite number
fn numeric_value(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

impl ColumnEncoder {
    /// Learn codes for every non-numeric token of the given datasets
    pub fn fit<'a>(datasets: impl IntoIterator<Item = &'a RawDataset>) -> Self {
        let mut encoder = Self::default();
        for dataset in datasets {
            for record in dataset.records() {
                for (column, token) in record.iter().enumerate() {
                    encoder.observe(column, token);
                }
            }
        }

        tracing::debug!(
            "Categorical codes per column: {:?}",
            encoder.columns.iter().map(|c| c.codes.len()).collect::<Vec<_>>()
        );
        encoder
    }

    fn observe(&mut self, column: usize, token: &str) {
        if token.is_empty() {
            return;
        }
        if self.columns.len() <= column {
            self.columns.resize_with(column + 1, ColumnCodes::default);
        }
        let entry = &mut self.columns[column];
        if let Some(value) = numeric_value(token) {
            entry.numeric_max = entry.numeric_max.max(value);
            return;
        }
        let next = entry.codes.len() + 1;
        entry.codes.entry(token.to_string()).or_insert(next);
    }

    /// Number of distinct categories seen in `column`
    pub fn categories(&self, column: usize) -> usize {
        self.columns.get(column).map_or(0, |c| c.codes.len())
    }

    pub fn encode(&self, column: usize, token: &str) -> Encoded {
        if token.is_empty() {
            return Encoded::Missing;
        }
        if let Some(value) = numeric_value(token) {
            return Encoded::Value(value);
        }
        self.columns
            .get(column)
            .and_then(|entry| entry.codes.get(token).map(|&code| entry.value(code)))
            .map_or(Encoded::Unknown, Encoded::Value)
    }

    /// Encode a record into its numeric sequence, dropping missing values
    pub fn encode_record(&self, dataset: &RawDataset, row: usize) -> Result<Vec<f64>> {
        let record = &dataset.records()[row];
        let mut sequence = Vec::with_capacity(record.len());
        for (column, token) in record.iter().enumerate() {
            match self.encode(column, token) {
                Encoded::Value(value) => sequence.push(value),
                Encoded::Missing => {}
                Encoded::Unknown => {
                    return Err(PipelineError::dataset(
                        dataset.source(),
                        format!(
                            "record {}, column {}: token {token:?} has no categorical code",
                            row + 1,
                            column + 1
                        ),
                    ))
                }
            }
        }
        Ok(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_tokens_pass_through() {
        let dataset = RawDataset::from_records(vec![vec!["1.5", "-2", "1e3"]]);
        let encoder = ColumnEncoder::fit([&dataset]);
        assert_eq!(
            encoder.encode_record(&dataset, 0).expect("encodes"),
            vec![1.5, -2.0, 1000.0]
        );
        assert_eq!(encoder.categories(0), 0);
    }

    #[test]
    fn test_codes_are_per_column_and_stable() {
        let train = RawDataset::from_records(vec![
            vec!["GET", "/a", "200"],
            vec!["POST", "/b", "500"],
            vec!["GET", "/b", "200"],
        ]);
        let test = RawDataset::from_records(vec![vec!["DELETE", "/a", "404"]]);
        let encoder = ColumnEncoder::fit([&train, &test]);

        assert_eq!(encoder.encode_record(&train, 0).expect("row 0"), vec![1.0, 1.0, 200.0]);
        assert_eq!(encoder.encode_record(&train, 1).expect("row 1"), vec![2.0, 2.0, 500.0]);
        assert_eq!(encoder.encode_record(&train, 2).expect("row 2"), vec![1.0, 2.0, 200.0]);
        assert_eq!(encoder.encode_record(&test, 0).expect("test row"), vec![3.0, 1.0, 404.0]);
        assert_eq!(encoder.categories(0), 3);
    }

    #[test]
    fn test_codes_skip_numbers_in_mixed_columns() {
        let dataset = RawDataset::from_records(vec![
            vec!["1", "x"],
            vec!["GET", "y"],
            vec!["7.5", "x"],
            vec!["POST", "-3"],
        ]);
        let encoder = ColumnEncoder::fit([&dataset]);

        assert_eq!(encoder.encode(0, "1"), Encoded::Value(1.0));
        assert_eq!(encoder.encode(0, "GET"), Encoded::Value(8.0));
        assert_eq!(encoder.encode(0, "POST"), Encoded::Value(9.0));
        // negative numbers do not pull codes below 1
        assert_eq!(encoder.encode(1, "x"), Encoded::Value(1.0));
        assert_eq!(encoder.encode(1, "y"), Encoded::Value(2.0));
    }

    #[test]
    fn test_empty_fields_are_dropped() {
        let dataset = RawDataset::from_records(vec![vec!["4", "", "x", ""]]);
        let encoder = ColumnEncoder::fit([&dataset]);
        assert_eq!(encoder.encode_record(&dataset, 0).expect("encodes"), vec![4.0, 1.0]);
    }

    #[test]
    fn test_unknown_token_is_an_error() {
        let seen = RawDataset::from_records(vec![vec!["a"]]);
        let unseen = RawDataset::from_records(vec![vec!["b"]]);
        let encoder = ColumnEncoder::fit([&seen]);
        let err = encoder.encode_record(&unseen, 0).expect_err("unknown token");
        assert!(err.to_string().contains("column 1"));
    }
}
