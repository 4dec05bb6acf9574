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

//! Rendering of a finished run for stdout.

use crate::anomaly::BackendKind;
use crate::labels::PredictionVector;
use crate::metrics::{AnomalyCount, MetricsSummary};
use crate::pipeline::RunResult;
use serde::Serialize;
use std::fmt;

/// What gets printed once a run reached the `Reported` stage
#[derive(Debug, Clone, Serialize)]
pub struct RunReport<'a> {
    pub backend: BackendKind,
    pub feature_width: usize,
    pub train: AnomalyCount,
    pub test: AnomalyCount,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<&'a MetricsSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictions: Option<Predictions<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Predictions<'a> {
    pub train: &'a PredictionVector,
    pub test: &'a PredictionVector,
}

impl<'a> RunReport<'a> {
    pub fn new(result: &'a RunResult) -> Self {
        Self {
            backend: result.backend,
            feature_width: result.feature_width,
            train: result.train_anomalies,
            test: result.test_anomalies,
            validation: result.validation.as_ref(),
            predictions: None,
        }
    }

    /// Also emit the per-record labels
    #[must_use]
    pub fn with_predictions(mut self, result: &'a RunResult) -> Self {
        self.predictions = Some(Predictions {
            train: &result.train_predictions,
            test: &result.test_predictions,
        });
        self
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_labels(f: &mut fmt::Formatter<'_>, name: &str, labels: &PredictionVector) -> fmt::Result {
    let joined = labels
        .as_slice()
        .iter()
        .map(i8::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    writeln!(f, "{name} predictions: {joined}")
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Backend: {}", self.backend)?;
        writeln!(f, "Anomalies in training set: {}", self.train)?;
        writeln!(f, "Anomalies in test set: {}", self.test)?;
        if let Some(metrics) = self.validation {
            writeln!(f, "Validation on test set:")?;
            for line in metrics.to_string().lines() {
                writeln!(f, "  {line}")?;
            }
        }
        if let Some(predictions) = &self.predictions {
            write_labels(f, "Training", predictions.train)?;
            write_labels(f, "Test", predictions.test)?;
        }
        Ok(())
    }
}
