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

//! Label reconciliation between the backends.
//!
//! The canonical convention is `+1` for normal records and `-1` for
//! anomalies. The one-class SVM already speaks it; the least-squares backend
//! emits class tags and is mapped here.

use crate::anomaly::BackendKind;
use serde::Serialize;

pub const INLIER: i8 = 1;
pub const OUTLIER: i8 = -1;

/// Tag the least-squares backend gives records outside every known class
pub const ANOMALY_TAG: &str = "anomaly";

/// Tag of the single normal class learned from unlabeled training data
pub const NORMAL_TAG: &str = "0";

/// Backend output in its native convention, tagged with the producing backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawPredictions {
    /// `+1` / `-1` from the one-class SVM
    Margin(Vec<i8>),
    /// Class tags from the least-squares backend
    Category(Vec<String>),
}

impl RawPredictions {
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::Margin(_) => BackendKind::OneClassSvm,
            Self::Category(_) => BackendKind::LsAnomaly,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Margin(labels) => labels.len(),
            Self::Category(tags) => tags.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Per-record labels in the canonical `+1` / `-1` convention
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(transparent)]
pub struct PredictionVector(Vec<i8>);

impl PredictionVector {
    pub const fn new(labels: Vec<i8>) -> Self {
        Self(labels)
    }

    pub fn as_slice(&self) -> &[i8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of `-1` entries
    pub fn anomaly_count(&self) -> usize {
        self.0.iter().filter(|&&label| label == OUTLIER).count()
    }
}

/// Map a tag to the canonical label. Unknown tags count as normal.
pub fn tag_to_label(tag: &str) -> i8 {
    if tag == ANOMALY_TAG {
        OUTLIER
    } else {
        INLIER
    }
}

/// Convert raw backend output into a new canonical vector
pub fn normalize(raw: &RawPredictions) -> PredictionVector {
    match raw {
        RawPredictions::Margin(labels) => PredictionVector::new(labels.clone()),
        RawPredictions::Category(tags) => {
            PredictionVector::new(tags.iter().map(|tag| tag_to_label(tag)).collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_margin_labels_are_unchanged() {
        let raw = RawPredictions::Margin(vec![1, -1, -1, 1, 1]);
        let once = normalize(&raw);
        assert_eq!(once.as_slice(), &[1, -1, -1, 1, 1]);
        assert_eq!(normalize(&RawPredictions::Margin(once.as_slice().to_vec())), once);
        assert_eq!(raw.kind(), BackendKind::OneClassSvm);
    }

    #[test]
    fn test_category_mapping() {
        let tags = ["0", "anomaly", "0", "weird", "anomaly", "Anomaly"];
        let raw = RawPredictions::Category(tags.iter().map(ToString::to_string).collect());
        let labels = normalize(&raw);
        assert_eq!(labels.as_slice(), &[1, -1, 1, 1, -1, 1]);
        assert_eq!(raw.kind(), BackendKind::LsAnomaly);
        // the raw tags are untouched
        assert_eq!(raw.len(), 6);
    }

    #[test]
    fn test_category_mapping_is_exactly_two_valued() {
        let raw = RawPredictions::Category(
            (0..40)
                .map(|i| if i % 3 == 0 { ANOMALY_TAG.to_string() } else { format!("c{i}") })
                .collect(),
        );
        let labels = normalize(&raw);
        assert!(labels.as_slice().iter().all(|&l| l == INLIER || l == OUTLIER));
        assert_eq!(labels.anomaly_count(), 14);
    }

    #[test]
    fn test_anomaly_count() {
        assert_eq!(PredictionVector::default().anomaly_count(), 0);
        assert_eq!(PredictionVector::new(vec![1, 1, 1]).anomaly_count(), 0);
        assert_eq!(PredictionVector::new(vec![-1, 1, -1]).anomaly_count(), 2);
    }
}
