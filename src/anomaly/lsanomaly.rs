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

//! Least-squares probabilistic anomaly detection.
//!
//! Fits a kernel model of the normal class by regularized least squares on
//! Gaussian basis functions centred at training rows. A record's normal-class
//! probability is the clipped model output; whatever probability mass is left
//! goes to the anomaly class, and the larger of the two wins.

use crate::anomaly::backend::{BackendKind, NoveltyModel};
use crate::anomaly::kernel::squared_distance;
use crate::anomaly::linalg::cholesky_solve;
use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;
use crate::labels::{RawPredictions, ANOMALY_TAG, NORMAL_TAG};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Neighbour rank used to estimate the kernel width
const WIDTH_NEIGHBOUR: usize = 5;

/// Rows sampled for the kernel width estimate
const WIDTH_SAMPLE: usize = 2000;

#[derive(Debug, Clone, PartialEq)]
pub struct LsAnomalyParams {
    /// Ridge regularization
    pub rho: f64,
    /// Kernel width; estimated from the data when `None`
    pub sigma: Option<f64>,
    /// Upper bound on the number of basis functions
    pub n_kernels_max: usize,
    pub seed: u64,
}

impl Default for LsAnomalyParams {
    fn default() -> Self {
        Self {
            rho: 0.1,
            sigma: None,
            n_kernels_max: 500,
            seed: 0,
        }
    }
}

impl LsAnomalyParams {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

/// Posterior of one record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassProbabilities {
    pub normal: f64,
    pub anomaly: f64,
}

impl ClassProbabilities {
    /// Ties go to the normal class
    pub const fn is_anomaly(&self) -> bool {
        self.anomaly > self.normal
    }
}

/// Fitted least-squares anomaly model
#[derive(Debug, Clone)]
pub struct LsAnomaly {
    centres: Array2<f64>,
    theta: Array1<f64>,
    gamma: f64,
}

/// Median distance from each sampled row to its k-th nearest sampled row (itself included)
fn median_kneighbour_distance(x: ArrayView2<'_, f64>, rng: &mut StdRng) -> f64 {
    let mut sample: Vec<usize> = (0..x.nrows()).collect();
    sample.shuffle(rng);
    sample.truncate(WIDTH_SAMPLE);

    let k = WIDTH_NEIGHBOUR.min(sample.len());
    let mut kth: Vec<f64> = sample
        .iter()
        .map(|&i| {
            let mut distances: Vec<f64> = sample
                .iter()
                .map(|&j| squared_distance(x.row(i), x.row(j)).sqrt())
                .collect();
            distances.sort_by(f64::total_cmp);
            distances[k - 1]
        })
        .collect();
    kth.sort_by(f64::total_cmp);

    let mid = kth.len() / 2;
    if kth.len() % 2 == 0 {
        (kth[mid - 1] + kth[mid]) / 2.0
    } else {
        kth[mid]
    }
}

/// Gaussian design matrix `exp(-gamma * |x - c|^2)`, rows = records, columns = centres
fn design_matrix(x: ArrayView2<'_, f64>, centres: ArrayView2<'_, f64>, gamma: f64) -> Array2<f64> {
    let mut phi = Array2::zeros((x.nrows(), centres.nrows()));
    for (i, mut row) in phi.rows_mut().into_iter().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = (-gamma * squared_distance(x.row(i), centres.row(j))).exp();
        }
    }
    phi
}

impl LsAnomaly {
    pub fn fit(params: &LsAnomalyParams, train: &FeatureMatrix) -> Result<Self> {
        if train.is_empty() {
            return Err(PipelineError::InsufficientData { model: "LSAnomaly" });
        }

        let x = train.view();
        let mut rng = StdRng::seed_from_u64(params.seed);

        let estimated = params
            .sigma
            .unwrap_or_else(|| median_kneighbour_distance(x, &mut rng));
        let sigma = if estimated.is_finite() && estimated > 0.0 {
            estimated
        } else {
            tracing::warn!("Degenerate kernel width {estimated}, training rows are not spread; using 1.0");
            1.0
        };
        let gamma = sigma.powi(-2);

        let mut order: Vec<usize> = (0..train.n_rows()).collect();
        order.shuffle(&mut rng);
        order.truncate(params.n_kernels_max.max(1));
        let centres = x.select(Axis(0), &order);

        let phi = design_matrix(x, centres.view(), gamma);
        let mut gram = phi.t().dot(&phi);
        gram.diag_mut().mapv_inplace(|d| d + params.rho);
        let target = phi.sum_axis(Axis(0));

        let theta = cholesky_solve(&gram, &target).ok_or_else(|| {
            PipelineError::Configuration(format!(
                "LSAnomaly normal equations are not positive definite (rho = {})",
                params.rho
            ))
        })?;

        tracing::debug!(
            "LSAnomaly fitted: sigma={sigma:.6}, {} basis functions",
            centres.nrows()
        );

        Ok(Self {
            centres,
            theta,
            gamma,
        })
    }

    pub fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<ClassProbabilities>> {
        self.check_width(x)?;
        let outputs = design_matrix(x.view(), self.centres.view(), self.gamma).dot(&self.theta);
        Ok(outputs
            .iter()
            .map(|&output| {
                let normal = output.clamp(0.0, 1.0);
                ClassProbabilities {
                    normal,
                    anomaly: (1.0 - normal).max(0.0),
                }
            })
            .collect())
    }

    pub const fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl NoveltyModel for LsAnomaly {
    fn kind(&self) -> BackendKind {
        BackendKind::LsAnomaly
    }

    fn width(&self) -> usize {
        self.centres.ncols()
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<RawPredictions> {
        let tags = self
            .predict_proba(x)?
            .iter()
            .map(|p| {
                if p.is_anomaly() {
                    ANOMALY_TAG.to_string()
                } else {
                    NORMAL_TAG.to_string()
                }
            })
            .collect();
        Ok(RawPredictions::Category(tags))
    }
}
