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

//! Error taxonomy shared by every pipeline stage.
//!
//! Every variant is fatal to a run. Variants carry the file, line, column or
//! widths needed to diagnose the failure from the message alone.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Error, Debug)]
pub enum PipelineError {
    /// Missing or invalid settings
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unreadable, malformed or empty dataset file
    #[error("dataset error in {}: {message}", path.display())]
    Dataset { path: PathBuf, message: String },

    /// Feature width disagreement between two matrices or a model and a matrix
    #[error("dimension mismatch ({context}): expected {expected} columns, found {found}")]
    DimensionMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    /// Fitting attempted without any rows
    #[error("insufficient data: cannot fit {model} on an empty training matrix")]
    InsufficientData { model: &'static str },

    /// Ground truth and predictions differ in length
    #[error("length mismatch: {ground_truth} ground-truth labels vs {predictions} predictions")]
    LengthMismatch {
        ground_truth: usize,
        predictions: usize,
    },

    /// Persisted hyperparameter file missing, unreadable or corrupt
    #[error("persistence error in {}: {message}", path.display())]
    Persistence { path: PathBuf, message: String },
}

impl PipelineError {
    pub fn dataset(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Dataset {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn persistence(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Short, stable name of the error class
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "ConfigurationError",
            Self::Dataset { .. } => "DatasetError",
            Self::DimensionMismatch { .. } => "DimensionMismatchError",
            Self::InsufficientData { .. } => "InsufficientDataError",
            Self::LengthMismatch { .. } => "LengthMismatchError",
            Self::Persistence { .. } => "PersistenceError",
        }
    }
}
