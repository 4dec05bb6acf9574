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

//! Batch novelty detection over delimited log datasets.
//!
//! A run loads a training and a test dataset, turns every record into a
//! fixed-width numeric vector, fits either a one-class SVM or an LSAnomaly
//! model on the training vectors and reports how many records of each set are
//! flagged as anomalous. See [`pipeline::run`].

pub mod anomaly;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod labels;
pub mod metrics;
pub mod pipeline;

pub use config::RunConfig;
pub use error::{PipelineError, Result};
pub use pipeline::{run, RunError, RunResult};
