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

use crate::anomaly::lsanomaly::{LsAnomaly, LsAnomalyParams};
use crate::anomaly::params::SvmParams;
use crate::anomaly::svm::OneClassSvm;
use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;
use crate::labels::RawPredictions;
use serde::Serialize;
use std::fmt;

/// Which anomaly-detection strategy produced a model or a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    OneClassSvm,
    LsAnomaly,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneClassSvm => write!(f, "one-class SVM"),
            Self::LsAnomaly => write!(f, "LSAnomaly"),
        }
    }
}

/// A model fitted on a training matrix, able to label any matrix of the same width
pub trait NoveltyModel {
    fn kind(&self) -> BackendKind;

    /// Feature width seen during fitting
    fn width(&self) -> usize;

    /// Label every row in the backend's native convention
    fn predict(&self, x: &FeatureMatrix) -> Result<RawPredictions>;

    /// Reject matrices whose width differs from the fitted width
    fn check_width(&self, x: &FeatureMatrix) -> Result<()> {
        if x.width() == self.width() {
            Ok(())
        } else {
            Err(PipelineError::DimensionMismatch {
                context: "model/matrix feature width",
                expected: self.width(),
                found: x.width(),
            })
        }
    }
}

/// Configured, not yet fitted backend
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    OneClassSvm(SvmParams),
    LsAnomaly(LsAnomalyParams),
}

impl Backend {
    pub const fn kind(&self) -> BackendKind {
        match self {
            Self::OneClassSvm(_) => BackendKind::OneClassSvm,
            Self::LsAnomaly(_) => BackendKind::LsAnomaly,
        }
    }

    /// Fit on the training matrix; fails on an empty matrix
    pub fn fit(&self, train: &FeatureMatrix) -> Result<Box<dyn NoveltyModel>> {
        tracing::info!(
            "Fitting {} on {} rows x {} features",
            self.kind(),
            train.n_rows(),
            train.width()
        );
        match self {
            Self::OneClassSvm(params) => Ok(Box::new(OneClassSvm::fit(params, train)?)),
            Self::LsAnomaly(params) => Ok(Box::new(LsAnomaly::fit(params, train)?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backends() -> Vec<Backend> {
        vec![
            Backend::OneClassSvm(SvmParams::default()),
            Backend::LsAnomaly(LsAnomalyParams::default()),
        ]
    }

    #[test]
    fn test_uniform_training_matrix_fits() {
        let train = FeatureMatrix::zeros(100, 30);
        for backend in backends() {
            let model = backend.fit(&train).expect("non-empty matrix fits");
            assert_eq!(model.kind(), backend.kind());
            let raw = model.predict(&train).expect("predicts");
            assert_eq!(raw.len(), 100);
            assert_eq!(raw.kind(), backend.kind());
        }
    }

    #[test]
    fn test_empty_training_matrix_fails() {
        let train = FeatureMatrix::zeros(0, 30);
        for backend in backends() {
            let err = backend.fit(&train).err().expect("empty matrix must fail");
            assert!(matches!(err, PipelineError::InsufficientData { .. }), "{err}");
        }
    }

    #[test]
    fn test_predict_width_mismatch() {
        let train = FeatureMatrix::zeros(10, 30);
        let test = FeatureMatrix::zeros(4, 25);
        for backend in backends() {
            let model = backend.fit(&train).expect("fits");
            let err = model.predict(&test).expect_err("width mismatch");
            assert!(matches!(
                err,
                PipelineError::DimensionMismatch {
                    expected: 30,
                    found: 25,
                    ..
                }
            ));
        }
    }
}
