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

//! One-class SVM hyperparameters and their JSON persistence.
//!
//! Only hyperparameters are persisted, never support vectors: a model built
//! from a loaded parameter file must still be fitted.
//!
//! Loading is lenient: missing keys take their defaults, unknown keys are
//! ignored, a negative `max_iter` means unlimited, and `nu`, `gamma` and
//! `verbose` may be written as strings.

use crate::anomaly::kernel::{Gamma, KernelKind};
use crate::config::{flexible_bool, Settings};
use crate::error::{PipelineError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SvmParams {
    /// Upper bound on the fraction of training margin errors, in (0, 1]
    #[serde(deserialize_with = "lenient_f64")]
    pub nu: f64,
    pub kernel: KernelKind,
    #[serde(deserialize_with = "lenient_gamma")]
    pub gamma: Gamma,
    pub degree: u32,
    pub coef0: f64,
    pub tol: f64,
    #[serde(deserialize_with = "unlimited_if_negative")]
    pub max_iter: Option<usize>,
    #[serde(deserialize_with = "flexible_bool")]
    pub verbose: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberLike {
    Number(f64),
    Text(String),
}

fn parse_number<E: serde::de::Error>(text: &str) -> std::result::Result<f64, E> {
    text.trim()
        .parse()
        .map_err(|_| E::custom(format!("expected a number, found \"{text}\"")))
}

/// A number, or a string holding one
fn lenient_f64<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberLike::deserialize(deserializer)? {
        NumberLike::Number(value) => Ok(value),
        NumberLike::Text(text) => parse_number(&text),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum GammaLike {
    Gamma(Gamma),
    Text(String),
}

/// `"scale"`, `"auto"`, a number, or a string holding a number
fn lenient_gamma<'de, D>(deserializer: D) -> std::result::Result<Gamma, D::Error>
where
    D: Deserializer<'de>,
{
    match GammaLike::deserialize(deserializer)? {
        GammaLike::Gamma(gamma) => Ok(gamma),
        GammaLike::Text(text) => parse_number(&text).map(Gamma::Value),
    }
}

/// `null` or any negative count means no iteration cap
fn unlimited_if_negative<'de, D>(deserializer: D) -> std::result::Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<i64>::deserialize(deserializer)? {
        Some(count) if count >= 0 => usize::try_from(count)
            .map(Some)
            .map_err(|_| D::Error::custom(format!("max_iter {count} is out of range"))),
        _ => Ok(None),
    }
}

impl Default for SvmParams {
    fn default() -> Self {
        Self {
            nu: 0.5,
            kernel: KernelKind::Rbf,
            gamma: Gamma::default(),
            degree: 3,
            coef0: 0.0,
            tol: 1e-3,
            max_iter: None,
            verbose: false,
        }
    }
}

impl SvmParams {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            nu: settings.nu,
            kernel: settings.kernel,
            gamma: settings.gamma,
            degree: settings.degree,
            coef0: settings.coef0,
            tol: settings.tol,
            max_iter: settings.max_iter,
            verbose: settings.verbose,
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        if !(self.nu > 0.0 && self.nu <= 1.0) {
            return Err(format!("nu must be in (0, 1], got {}", self.nu));
        }
        if let Gamma::Value(gamma) = self.gamma {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(format!("gamma must be positive, got {gamma}"));
            }
        }
        if !(self.tol.is_finite() && self.tol > 0.0) {
            return Err(format!("tol must be positive, got {}", self.tol));
        }
        Ok(())
    }

    /// Write the parameters as one JSON object, replacing any previous content
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| PipelineError::persistence(path, format!("cannot serialize: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PipelineError::persistence(path, format!("cannot create directory: {e}"))
            })?;
        }

        std::fs::write(path, json)
            .map_err(|e| PipelineError::persistence(path, format!("cannot write: {e}")))?;

        tracing::info!("Saved parameters to {}", path.display());
        Ok(())
    }

    /// Read parameters written by [`SvmParams::save`]; missing or malformed files are errors
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::persistence(path, format!("cannot read: {e}")))?;

        let params: Self = serde_json::from_str(&contents)
            .map_err(|e| PipelineError::persistence(path, format!("malformed parameters: {e}")))?;
        params
            .check()
            .map_err(|message| PipelineError::persistence(path, message))?;

        tracing::info!("Loaded parameters from {}", path.display());
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::kernel::GammaHeuristic;

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model_ocsvm.json");

        let params = SvmParams {
            nu: 0.1,
            kernel: KernelKind::Sigmoid,
            gamma: Gamma::Value(0.05),
            degree: 2,
            coef0: 0.25,
            tol: 1e-4,
            max_iter: Some(5000),
            verbose: true,
        };
        params.save(&path).expect("saves");
        assert_eq!(SvmParams::load(&path).expect("loads"), params);

        let heuristic = SvmParams {
            gamma: Gamma::Heuristic(GammaHeuristic::Auto),
            ..SvmParams::default()
        };
        heuristic.save(&path).expect("overwrites");
        assert_eq!(SvmParams::load(&path).expect("loads again"), heuristic);
    }

    #[test]
    fn test_saved_file_is_a_flat_object() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("params.json");
        SvmParams::default().save(&path).expect("saves");

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("json");
        let object = value.as_object().expect("object");
        assert_eq!(object["kernel"], "rbf");
        assert_eq!(object["gamma"], "scale");
        assert_eq!(object["nu"], 0.5);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = SvmParams::load(&dir.path().join("absent.json")).expect_err("missing");
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("params.json");

        for contents in ["{not json", "{\"nu\": \"lots\"}", "{\"gamma\": \"wide\"}", "42"] {
            std::fs::write(&path, contents).expect("write");
            let err = SvmParams::load(&path).expect_err(contents);
            assert!(matches!(err, PipelineError::Persistence { .. }), "{contents}");
        }

        let mut invalid = serde_json::to_value(SvmParams::default()).expect("value");
        invalid["nu"] = serde_json::json!(3.0);
        std::fs::write(&path, invalid.to_string()).expect("write");
        assert!(SvmParams::load(&path).is_err());
    }

    #[test]
    fn test_partial_object_takes_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("params.json");
        std::fs::write(&path, r#"{"nu": 0.1, "kernel": "rbf", "gamma": 0.1}"#).expect("write");

        let params = SvmParams::load(&path).expect("partial object loads");
        assert_eq!(
            params,
            SvmParams {
                nu: 0.1,
                gamma: Gamma::Value(0.1),
                ..SvmParams::default()
            }
        );
    }

    #[test]
    fn test_sklearn_get_params_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model_ocsvm.json");
        let contents = r#"{"cache_size": 200, "coef0": 0.0, "degree": 3, "gamma": "0.1",
            "kernel": "rbf", "max_iter": -1, "nu": "0.1", "shrinking": true,
            "tol": 0.001, "verbose": "False"}"#;
        std::fs::write(&path, contents).expect("write");

        let params = SvmParams::load(&path).expect("sklearn-shaped file loads");
        assert!((params.nu - 0.1).abs() < 1e-12);
        assert_eq!(params.gamma, Gamma::Value(0.1));
        assert_eq!(params.kernel, KernelKind::Rbf);
        assert_eq!(params.max_iter, None);
        assert!(!params.verbose);

        std::fs::write(&path, r#"{"max_iter": 250, "gamma": "auto", "verbose": true}"#)
            .expect("write");
        let params = SvmParams::load(&path).expect("loads");
        assert_eq!(params.max_iter, Some(250));
        assert_eq!(params.gamma, Gamma::Heuristic(GammaHeuristic::Auto));
        assert!(params.verbose);
    }
}
