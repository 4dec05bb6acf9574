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

//! ν one-class support vector machine.
//!
//! Solves the dual
//!
//! ```text
//! min  ½ αᵀQα    s.t.  0 ≤ αᵢ ≤ 1,  Σαᵢ = ν·l
//! ```
//!
//! with sequential minimal optimization and second-order working set
//! selection. The decision function is `f(x) = Σ αᵢ K(xᵢ, x) − ρ`; a record is
//! an inlier (`+1`) when `f(x) > 0`.

use crate::anomaly::backend::{BackendKind, NoveltyModel};
use crate::anomaly::kernel::Kernel;
use crate::anomaly::params::SvmParams;
use crate::error::{PipelineError, Result};
use crate::features::FeatureMatrix;
use crate::labels::{RawPredictions, INLIER, OUTLIER};
use ndarray::{Array2, ArrayView2, Axis};
use std::borrow::Cow;

/// Substitute for non-positive curvature in the working set selection
const TAU: f64 = 1e-12;

/// Largest training set whose kernel matrix is precomputed (~128 MiB)
const CACHED_ROWS_MAX: usize = 4096;

/// Rows of the kernel matrix `Q_ij = K(x_i, x_j)`, precomputed for small
/// training sets and evaluated on demand otherwise
struct KernelRows<'a> {
    x: ArrayView2<'a, f64>,
    kernel: Kernel,
    cached: Option<Array2<f64>>,
    diag: Vec<f64>,
}

impl<'a> KernelRows<'a> {
    fn new(x: ArrayView2<'a, f64>, kernel: Kernel) -> Self {
        let l = x.nrows();
        let cached = (l <= CACHED_ROWS_MAX).then(|| {
            let mut q = Array2::zeros((l, l));
            for i in 0..l {
                for j in i..l {
                    let value = kernel.eval(x.row(i), x.row(j));
                    q[[i, j]] = value;
                    q[[j, i]] = value;
                }
            }
            q
        });
        let diag = (0..l).map(|i| kernel.eval(x.row(i), x.row(i))).collect();
        Self {
            x,
            kernel,
            cached,
            diag,
        }
    }

    fn row(&self, i: usize) -> Cow<'_, [f64]> {
        if let Some(row) = self.cached.as_ref().and_then(|q| q.row(i).to_slice()) {
            return Cow::Borrowed(row);
        }
        let xi = self.x.row(i);
        Cow::Owned(
            self.x
                .rows()
                .into_iter()
                .map(|xj| self.kernel.eval(xi, xj))
                .collect(),
        )
    }
}

struct Solution {
    alpha: Vec<f64>,
    rho: f64,
    iterations: usize,
}

fn solve(q: &KernelRows<'_>, nu: f64, eps: f64, max_iter: usize) -> Solution {
    let l = q.diag.len();
    let total = nu * l as f64;
    let n = (total as usize).min(l);

    let mut alpha = vec![0.0; l];
    for a in alpha.iter_mut().take(n) {
        *a = 1.0;
    }
    if n < l {
        alpha[n] = total - n as f64;
    }

    let mut gradient = vec![0.0; l];
    for (i, &a) in alpha.iter().enumerate() {
        if a > 0.0 {
            let qi = q.row(i);
            for (g, &qik) in gradient.iter_mut().zip(qi.iter()) {
                *g += a * qik;
            }
        }
    }

    let mut iterations = 0;
    while iterations < max_iter {
        // i: most violating index that can still grow
        let mut gmax = f64::NEG_INFINITY;
        let mut selected_i = None;
        for t in 0..l {
            if alpha[t] < 1.0 && -gradient[t] >= gmax {
                gmax = -gradient[t];
                selected_i = Some(t);
            }
        }
        let Some(i) = selected_i else { break };
        let qi = q.row(i);

        // j: index that can shrink with the best second-order gain
        let mut gmax2 = f64::NEG_INFINITY;
        let mut selected_j = None;
        let mut obj_min = f64::INFINITY;
        for t in 0..l {
            if alpha[t] > 0.0 {
                gmax2 = gmax2.max(gradient[t]);
                let grad_diff = gmax + gradient[t];
                if grad_diff > 0.0 {
                    let curvature = q.diag[i] + q.diag[t] - 2.0 * qi[t];
                    let obj = -(grad_diff * grad_diff) / if curvature > 0.0 { curvature } else { TAU };
                    if obj <= obj_min {
                        obj_min = obj;
                        selected_j = Some(t);
                    }
                }
            }
        }
        if gmax + gmax2 < eps {
            break;
        }
        let Some(j) = selected_j else { break };
        let qj = q.row(j);
        iterations += 1;

        let (old_i, old_j) = (alpha[i], alpha[j]);
        let curvature = q.diag[i] + q.diag[j] - 2.0 * qi[j];
        let delta = (gradient[i] - gradient[j]) / if curvature > 0.0 { curvature } else { TAU };
        let sum = old_i + old_j;
        alpha[i] -= delta;
        alpha[j] += delta;

        if sum > 1.0 {
            if alpha[i] > 1.0 {
                alpha[i] = 1.0;
                alpha[j] = sum - 1.0;
            }
        } else if alpha[j] < 0.0 {
            alpha[j] = 0.0;
            alpha[i] = sum;
        }
        if sum > 1.0 {
            if alpha[j] > 1.0 {
                alpha[j] = 1.0;
                alpha[i] = sum - 1.0;
            }
        } else if alpha[i] < 0.0 {
            alpha[i] = 0.0;
            alpha[j] = sum;
        }

        let (delta_i, delta_j) = (alpha[i] - old_i, alpha[j] - old_j);
        for (k, g) in gradient.iter_mut().enumerate() {
            *g += qi[k] * delta_i + qj[k] * delta_j;
        }
    }

    if iterations >= max_iter {
        tracing::warn!("One-class SVM reached max_iter={max_iter} before converging");
    }

    Solution {
        rho: offset(&alpha, &gradient),
        alpha,
        iterations,
    }
}

/// ρ from the KKT conditions: mean gradient of free vectors, or the middle of the feasible interval
fn offset(alpha: &[f64], gradient: &[f64]) -> f64 {
    let mut upper = f64::INFINITY;
    let mut lower = f64::NEG_INFINITY;
    let mut free_sum = 0.0;
    let mut free_count = 0usize;

    for (&a, &g) in alpha.iter().zip(gradient) {
        if a >= 1.0 {
            lower = lower.max(g);
        } else if a <= 0.0 {
            upper = upper.min(g);
        } else {
            free_count += 1;
            free_sum += g;
        }
    }

    if free_count > 0 {
        free_sum / free_count as f64
    } else if upper.is_infinite() {
        lower
    } else if lower.is_infinite() {
        upper
    } else {
        (upper + lower) / 2.0
    }
}

/// Fitted one-class SVM: support vectors with their dual coefficients
#[derive(Debug, Clone)]
pub struct OneClassSvm {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    dual_coef: Vec<f64>,
    rho: f64,
}

impl OneClassSvm {
    pub fn fit(params: &SvmParams, train: &FeatureMatrix) -> Result<Self> {
        if train.is_empty() {
            return Err(PipelineError::InsufficientData {
                model: "one-class SVM",
            });
        }

        let x = train.view();
        let l = train.n_rows();
        let gamma = params.gamma.resolve(x);
        let kernel = Kernel::new(params.kernel, gamma, params.coef0, params.degree);
        let max_iter = params.max_iter.unwrap_or_else(|| 10_000_000.max(l.saturating_mul(100)));

        let rows = KernelRows::new(x, kernel);
        let solution = solve(&rows, params.nu, params.tol, max_iter);

        let support: Vec<usize> = (0..l).filter(|&i| solution.alpha[i] > 0.0).collect();
        let dual_coef: Vec<f64> = support.iter().map(|&i| solution.alpha[i]).collect();
        let support_vectors = x.select(Axis(0), &support);

        if params.verbose {
            tracing::info!(
                "optimization finished, #iter = {}, nSV = {}, rho = {:.6}, gamma = {gamma:.6}",
                solution.iterations,
                support.len(),
                solution.rho
            );
        } else {
            tracing::debug!(
                "One-class SVM converged after {} iterations with {} support vectors",
                solution.iterations,
                support.len()
            );
        }

        Ok(Self {
            kernel,
            support_vectors,
            dual_coef,
            rho: solution.rho,
        })
    }

    /// Signed distance to the separating surface, positive for inliers
    pub fn decision_function(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        self.check_width(x)?;
        Ok(x.view()
            .rows()
            .into_iter()
            .map(|row| {
                self.support_vectors
                    .rows()
                    .into_iter()
                    .zip(&self.dual_coef)
                    .map(|(sv, &coef)| coef * self.kernel.eval(sv, row))
                    .sum::<f64>()
                    - self.rho
            })
            .collect())
    }

    pub const fn rho(&self) -> f64 {
        self.rho
    }

    pub fn dual_coef(&self) -> &[f64] {
        &self.dual_coef
    }

    pub fn n_support(&self) -> usize {
        self.dual_coef.len()
    }
}

impl NoveltyModel for OneClassSvm {
    fn kind(&self) -> BackendKind {
        BackendKind::OneClassSvm
    }

    fn width(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn predict(&self, x: &FeatureMatrix) -> Result<RawPredictions> {
        let labels = self
            .decision_function(x)?
            .into_iter()
            .map(|value| if value > 0.0 { INLIER } else { OUTLIER })
            .collect();
        Ok(RawPredictions::Margin(labels))
    }
}
