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

//! Kernel functions shared by both backends.

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

/// Kernel family of the one-class SVM
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KernelKind {
    Linear,
    #[serde(alias = "polynomial")]
    Poly,
    #[default]
    #[serde(alias = "radial-basis", alias = "radial_basis", alias = "gaussian")]
    Rbf,
    Sigmoid,
}

/// Data-driven choices for the kernel coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GammaHeuristic {
    /// `1 / (n_features * X.var())`
    Scale,
    /// `1 / n_features`
    Auto,
}

/// Kernel coefficient: a fixed value or a heuristic resolved at fit time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Gamma {
    Value(f64),
    Heuristic(GammaHeuristic),
}

impl Default for Gamma {
    fn default() -> Self {
        Self::Heuristic(GammaHeuristic::Scale)
    }
}

impl Gamma {
    /// Resolve to a concrete coefficient for the given training matrix
    pub fn resolve(self, train: ArrayView2<'_, f64>) -> f64 {
        let n_features = train.ncols().max(1) as f64;
        match self {
            Self::Value(gamma) => gamma,
            Self::Heuristic(GammaHeuristic::Auto) => 1.0 / n_features,
            Self::Heuristic(GammaHeuristic::Scale) => {
                let variance = if train.is_empty() {
                    0.0
                } else {
                    let mean = train.mean().unwrap_or(0.0);
                    train.mapv(|v| (v - mean).powi(2)).mean().unwrap_or(0.0)
                };
                if variance > 0.0 {
                    1.0 / (n_features * variance)
                } else {
                    1.0
                }
            }
        }
    }
}

/// A fully parameterized kernel `K(a, b)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Kernel {
    Linear,
    Poly { gamma: f64, coef0: f64, degree: u32 },
    Rbf { gamma: f64 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    pub const fn new(kind: KernelKind, gamma: f64, coef0: f64, degree: u32) -> Self {
        match kind {
            KernelKind::Linear => Self::Linear,
            KernelKind::Poly => Self::Poly {
                gamma,
                coef0,
                degree,
            },
            KernelKind::Rbf => Self::Rbf { gamma },
            KernelKind::Sigmoid => Self::Sigmoid { gamma, coef0 },
        }
    }

    pub fn eval(&self, a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
        match *self {
            Self::Linear => a.dot(&b),
            Self::Poly {
                gamma,
                coef0,
                degree,
            } => (gamma * a.dot(&b) + coef0).powi(degree as i32),
            Self::Rbf { gamma } => (-gamma * squared_distance(a, b)).exp(),
            Self::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }
}

pub fn squared_distance(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn test_kernel_values() {
        let a = array![1.0, 2.0];
        let b = array![3.0, 0.5];

        assert!((Kernel::Linear.eval(a.view(), b.view()) - 4.0).abs() < 1e-12);

        let poly = Kernel::new(KernelKind::Poly, 0.5, 1.0, 2);
        assert!((poly.eval(a.view(), b.view()) - 9.0).abs() < 1e-12);

        let rbf = Kernel::new(KernelKind::Rbf, 0.1, 0.0, 3);
        let expected = (-0.1f64 * 6.25).exp();
        assert!((rbf.eval(a.view(), b.view()) - expected).abs() < 1e-12);
        assert!((rbf.eval(a.view(), a.view()) - 1.0).abs() < 1e-12);

        let sigmoid = Kernel::new(KernelKind::Sigmoid, 0.25, 0.0, 3);
        assert!((sigmoid.eval(a.view(), b.view()) - 1.0f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn test_gamma_heuristics() {
        let x = Array2::from_shape_vec((2, 2), vec![0.0, 2.0, 0.0, 2.0]).expect("shape");
        // mean 1, variance 1, two features
        assert!((Gamma::default().resolve(x.view()) - 0.5).abs() < 1e-12);
        assert!((Gamma::Heuristic(GammaHeuristic::Auto).resolve(x.view()) - 0.5).abs() < 1e-12);
        assert!((Gamma::Value(0.3).resolve(x.view()) - 0.3).abs() < 1e-12);

        let flat = Array2::<f64>::zeros((4, 3));
        assert!((Gamma::default().resolve(flat.view()) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_kind_aliases() {
        #[derive(Deserialize)]
        struct Wrapper {
            kernel: KernelKind,
        }
        for (text, kind) in [
            ("linear", KernelKind::Linear),
            ("polynomial", KernelKind::Poly),
            ("poly", KernelKind::Poly),
            ("radial-basis", KernelKind::Rbf),
            ("rbf", KernelKind::Rbf),
            ("sigmoid", KernelKind::Sigmoid),
        ] {
            let parsed: Wrapper =
                serde_json::from_str(&format!("{{\"kernel\": \"{text}\"}}")).expect(text);
            assert_eq!(parsed.kernel, kind);
        }
    }
}
