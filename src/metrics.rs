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

//! Evaluation metrics.
//!
//! Anomalies (`-1`) are the positive class throughout: precision answers "of
//! the records flagged, how many were anomalies" and recall "of the anomalies,
//! how many were flagged".

use crate::error::{PipelineError, Result};
use crate::labels::{PredictionVector, OUTLIER};
use serde::Serialize;
use std::fmt;

/// Anomalies flagged in one dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnomalyCount {
    pub anomalies: usize,
    pub total: usize,
}

impl AnomalyCount {
    pub fn of(predictions: &PredictionVector) -> Self {
        Self {
            anomalies: predictions.anomaly_count(),
            total: predictions.len(),
        }
    }

    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.anomalies as f64 / self.total as f64
        }
    }
}

impl fmt::Display for AnomalyCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.anomalies, self.total)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ConfusionMatrix {
    pub true_positive: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_negative: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(ground_truth: &[i8], predictions: &[i8]) -> Self {
        let mut matrix = Self::default();
        for (&truth, &predicted) in ground_truth.iter().zip(predictions) {
            match (truth == OUTLIER, predicted == OUTLIER) {
                (true, true) => matrix.true_positive += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (false, false) => matrix.true_negative += 1,
            }
        }
        matrix
    }

    pub const fn total(&self) -> usize {
        self.true_positive + self.false_positive + self.false_negative + self.true_negative
    }
}

/// Ratio with the zero-denominator case defined as 0
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricsSummary {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    /// Undefined when the ground truth holds a single class
    pub auc: Option<f64>,
    pub confusion: ConfusionMatrix,
}

impl fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "accuracy:  {:.4}", self.accuracy)?;
        writeln!(f, "precision: {:.4}", self.precision)?;
        writeln!(f, "recall:    {:.4}", self.recall)?;
        writeln!(f, "f1:        {:.4}", self.f1)?;
        match self.auc {
            Some(auc) => write!(f, "auc:       {auc:.4}"),
            None => write!(f, "auc:       undefined (single class in ground truth)"),
        }
    }
}

/// Area under the ROC curve with anomalies as positives and higher scores meaning "more anomalous".
/// Ties count half (Mann-Whitney U).
pub fn roc_auc(ground_truth: &[i8], scores: &[f64]) -> Option<f64> {
    let mut ranked: Vec<(f64, bool)> = scores
        .iter()
        .zip(ground_truth)
        .map(|(&score, &truth)| (score, truth == OUTLIER))
        .collect();
    ranked.sort_by(|a, b| a.0.total_cmp(&b.0));

    let positives = ranked.iter().filter(|(_, positive)| *positive).count();
    let negatives = ranked.len() - positives;
    if positives == 0 || negatives == 0 {
        return None;
    }

    // 1-based average ranks over runs of tied scores
    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < ranked.len() {
        let mut end = start;
        while end + 1 < ranked.len() && ranked[end + 1].0 == ranked[start].0 {
            end += 1;
        }
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        let tied_positives = ranked[start..=end].iter().filter(|(_, p)| *p).count();
        positive_rank_sum += average_rank * tied_positives as f64;
        start = end + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Some(p.mul_add(-(p + 1.0) / 2.0, positive_rank_sum) / (p * n))
}

/// Compare predictions against ground truth
pub fn report(ground_truth: &[i8], predictions: &PredictionVector) -> Result<MetricsSummary> {
    let predicted = predictions.as_slice();
    if ground_truth.len() != predicted.len() {
        return Err(PipelineError::LengthMismatch {
            ground_truth: ground_truth.len(),
            predictions: predicted.len(),
        });
    }

    let confusion = ConfusionMatrix::from_labels(ground_truth, predicted);
    let precision = ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_positive,
    );
    let recall = ratio(
        confusion.true_positive,
        confusion.true_positive + confusion.false_negative,
    );
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    // -1 is the positive class, so the anomaly score is the negated label
    let scores: Vec<f64> = predicted.iter().map(|&label| -f64::from(label)).collect();

    Ok(MetricsSummary {
        accuracy: ratio(
            confusion.true_positive + confusion.true_negative,
            confusion.total(),
        ),
        precision,
        recall,
        f1,
        auc: roc_auc(ground_truth, &scores),
        confusion,
    })
}
