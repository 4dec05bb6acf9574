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

//! Delimited dataset ingestion.
//!
//! Records are kept as ordered string fields. Rows may be ragged; each record
//! is a time-ordered sequence and its length is normalized later by the
//! feature vectorizer.

use crate::config::DataConfig;
use crate::error::{PipelineError, Result};
use std::path::{Path, PathBuf};

/// Ordered records of string fields read from one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataset {
    source: PathBuf,
    header: Option<Vec<String>>,
    records: Vec<Vec<String>>,
}

impl RawDataset {
    pub const fn new(source: PathBuf, header: Option<Vec<String>>, records: Vec<Vec<String>>) -> Self {
        Self {
            source,
            header,
            records,
        }
    }

    /// Build an in-memory dataset, mostly useful for tests and embedding
    pub fn from_records<R, F>(records: R) -> Self
    where
        R: IntoIterator<Item = Vec<F>>,
        F: Into<String>,
    {
        Self {
            source: PathBuf::from("<memory>"),
            header: None,
            records: records
                .into_iter()
                .map(|r| r.into_iter().map(Into::into).collect())
                .collect(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Keep the leading `fraction` of the records (floored), preserving order
    pub fn head_fraction(&self, fraction: f64) -> Self {
        let keep = ((self.records.len() as f64) * fraction).floor() as usize;
        Self {
            source: self.source.clone(),
            header: self.header.clone(),
            records: self.records[..keep.min(self.records.len())].to_vec(),
        }
    }
}

/// Reads delimiter-separated text files into [`RawDataset`]s
#[derive(Debug, Clone, Copy)]
pub struct DelimitedLoader {
    delimiter: u8,
    has_header: bool,
}

impl DelimitedLoader {
    pub const fn new(delimiter: u8, has_header: bool) -> Self {
        Self {
            delimiter,
            has_header,
        }
    }

    pub const fn from_config(data: &DataConfig) -> Self {
        // validated as ASCII when the configuration was loaded
        Self::new(data.delimiter as u8, data.has_header)
    }

    fn reader(&self, path: &Path) -> Result<csv::Reader<std::fs::File>> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| PipelineError::dataset(path, format!("cannot open: {e}")))
    }

    /// Read a dataset; an empty file (no records) is an error
    pub fn load(&self, path: &Path) -> Result<RawDataset> {
        let mut reader = self.reader(path)?;

        let header = if self.has_header {
            let header = reader
                .headers()
                .map_err(|e| PipelineError::dataset(path, format!("bad header: {e}")))?;
            Some(header.iter().map(str::to_string).collect())
        } else {
            None
        };

        let mut records = Vec::new();
        for (index, result) in reader.records().enumerate() {
            let record = result
                .map_err(|e| PipelineError::dataset(path, format!("record {}: {e}", index + 1)))?;
            records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        if records.is_empty() {
            return Err(PipelineError::dataset(path, "file contains no records"));
        }

        tracing::info!("Loaded {} records from {}", records.len(), path.display());
        Ok(RawDataset::new(path.to_path_buf(), header, records))
    }

    /// Read ground-truth labels: the first field of every record, `1` (normal) or `-1` (anomaly).
    /// Label files never carry a header.
    pub fn load_labels(&self, path: &Path) -> Result<Vec<i8>> {
        let dataset = Self::new(self.delimiter, false).load(path)?;
        dataset
            .records()
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let field = record.first().map_or("", String::as_str);
                parse_label(field).ok_or_else(|| {
                    PipelineError::dataset(
                        path,
                        format!("record {}: expected label 1 or -1, found {field:?}", index + 1),
                    )
                })
            })
            .collect()
    }
}

/// Parse a canonical label; accepts `1`, `+1`, `-1`, `1.0`, `-1.0`
pub fn parse_label(text: &str) -> Option<i8> {
    let value: f64 = text.trim().parse().ok()?;
    if (value - 1.0).abs() < f64::EPSILON {
        Some(1)
    } else if (value + 1.0).abs() < f64::EPSILON {
        Some(-1)
    } else {
        None
    }
}
