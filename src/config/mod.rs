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

//! Run configuration.
//!
//! A run is configured by one TOML file with two tables:
//!
//! ```toml
//! [settings]
//! use_probabilistic_backend = false
//! load_parameters = false
//! nu = 0.1
//! kernel = "rbf"
//! gamma = 0.1
//! verbose = false
//!
//! [data]
//! train_dataset_file = "train.csv"
//! test_dataset_file = "test.csv"
//! ```
//!
//! The file is read once, validated, and the resulting [`RunConfig`] is passed
//! by reference into every stage.

use crate::anomaly::kernel::{Gamma, KernelKind};
use crate::error::{PipelineError, Result};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "novelcrab.toml";
pub const DEFAULT_PARAMETERS_FILE: &str = "model_ocsvm.json";
pub const DEFAULT_MAX_VECTOR_LENGTH: usize = 30;

/// Complete, validated configuration of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub settings: Settings,
    pub data: DataConfig,
}

/// The `[settings]` table: backend choice and hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Use the least-squares probabilistic backend instead of the one-class SVM
    #[serde(default, deserialize_with = "flexible_bool")]
    pub use_probabilistic_backend: bool,

    /// Take SVM hyperparameters from `parameters_file` instead of this table
    #[serde(default, deserialize_with = "flexible_bool")]
    pub load_parameters: bool,

    #[serde(default = "default_nu")]
    pub nu: f64,

    #[serde(default)]
    pub kernel: KernelKind,

    #[serde(default)]
    pub gamma: Gamma,

    /// Degree of the polynomial kernel
    #[serde(default = "default_degree")]
    pub degree: u32,

    /// Independent term of the polynomial and sigmoid kernels
    #[serde(default)]
    pub coef0: f64,

    /// Solver stopping tolerance
    #[serde(default = "default_tol")]
    pub tol: f64,

    /// Solver iteration cap, unlimited when absent
    #[serde(default)]
    pub max_iter: Option<usize>,

    #[serde(default, deserialize_with = "flexible_bool")]
    pub verbose: bool,

    /// Fixed width every feature vector is padded or truncated to
    #[serde(default = "default_max_vector_length")]
    pub max_vector_length: usize,

    #[serde(default = "default_parameters_file")]
    pub parameters_file: PathBuf,

    /// Seed for the random sampling done by the probabilistic backend
    #[serde(default)]
    pub seed: u64,
}

/// The `[data]` table: where the datasets live and how to read them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub train_dataset_file: PathBuf,
    pub test_dataset_file: PathBuf,

    /// Ground-truth labels (+1/-1, one per test record) for validation runs
    #[serde(default)]
    pub test_labels_file: Option<PathBuf>,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub has_header: bool,

    /// Leading share of the training records used for fitting.
    /// Defaults to all of them; the experiments this tool replaces used the first sixth.
    #[serde(default = "default_train_fraction")]
    pub train_fraction: f64,
}

const fn default_nu() -> f64 {
    0.5
}

const fn default_degree() -> u32 {
    3
}

const fn default_tol() -> f64 {
    1e-3
}

const fn default_max_vector_length() -> usize {
    DEFAULT_MAX_VECTOR_LENGTH
}

fn default_parameters_file() -> PathBuf {
    PathBuf::from(DEFAULT_PARAMETERS_FILE)
}

const fn default_delimiter() -> char {
    ';'
}

const fn default_true() -> bool {
    true
}

const fn default_train_fraction() -> f64 {
    1.0
}

/// Parse the usual spellings of a boolean flag
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BoolLike {
    Bool(bool),
    Int(i64),
    Text(String),
}

/// Accept real booleans as well as `"True"`, `"no"`, `1`, ... and reject anything else
pub(crate) fn flexible_bool<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match BoolLike::deserialize(deserializer)? {
        BoolLike::Bool(value) => Ok(value),
        BoolLike::Int(0) => Ok(false),
        BoolLike::Int(1) => Ok(true),
        BoolLike::Int(other) => Err(D::Error::custom(format!(
            "expected a boolean, found integer {other}"
        ))),
        BoolLike::Text(text) => parse_bool(&text)
            .ok_or_else(|| D::Error::custom(format!("expected a boolean, found \"{text}\""))),
    }
}

impl RunConfig {
    /// Load and validate a configuration file.
    /// Relative dataset and parameter paths are resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading configuration from {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;

        let mut config = Self::from_toml_str(&contents).map_err(|e| match e {
            PipelineError::Configuration(message) => {
                PipelineError::Configuration(format!("{}: {message}", path.display()))
            }
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }

        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(contents).map_err(|e| PipelineError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.data.train_dataset_file);
        resolve(&mut self.data.test_dataset_file);
        if let Some(labels) = self.data.test_labels_file.as_mut() {
            resolve(labels);
        }
        resolve(&mut self.settings.parameters_file);
    }

    /// Check value ranges that the TOML types cannot express
    pub fn validate(&self) -> Result<()> {
        let s = &self.settings;
        if !(s.nu > 0.0 && s.nu <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "settings.nu must be in (0, 1], got {}",
                s.nu
            )));
        }
        if let Gamma::Value(gamma) = s.gamma {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(PipelineError::Configuration(format!(
                    "settings.gamma must be a positive number, got {gamma}"
                )));
            }
        }
        if !(s.tol.is_finite() && s.tol > 0.0) {
            return Err(PipelineError::Configuration(format!(
                "settings.tol must be positive, got {}",
                s.tol
            )));
        }
        if s.max_vector_length == 0 {
            return Err(PipelineError::Configuration(
                "settings.max_vector_length must be positive".to_string(),
            ));
        }

        let d = &self.data;
        if !d.delimiter.is_ascii() {
            return Err(PipelineError::Configuration(format!(
                "data.delimiter must be a single ASCII character, got {:?}",
                d.delimiter
            )));
        }
        if !(d.train_fraction > 0.0 && d.train_fraction <= 1.0) {
            return Err(PipelineError::Configuration(format!(
                "data.train_fraction must be in (0, 1], got {}",
                d.train_fraction
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::kernel::GammaHeuristic;

    const MINIMAL: &str = r#"
        [settings]

        [data]
        train_dataset_file = "train.csv"
        test_dataset_file = "test.csv"
    "#;

    #[test]
    fn test_defaults() {
        let config = RunConfig::from_toml_str(MINIMAL).expect("minimal config parses");
        assert!(!config.settings.use_probabilistic_backend);
        assert!(!config.settings.load_parameters);
        assert_eq!(config.settings.kernel, KernelKind::Rbf);
        assert_eq!(config.settings.gamma, Gamma::Heuristic(GammaHeuristic::Scale));
        assert_eq!(config.settings.max_vector_length, 30);
        assert_eq!(config.data.delimiter, ';');
        assert!(config.data.has_header);
        assert!(config.data.test_labels_file.is_none());
        assert!((config.data.train_fraction - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_string_booleans_are_parsed() {
        let text = r#"
            [settings]
            use_probabilistic_backend = "True"
            load_parameters = "no"
            verbose = 1
            nu = 0.1
            kernel = "radial-basis"
            gamma = 0.05

            [data]
            train_dataset_file = "train.csv"
            test_dataset_file = "test.csv"
            has_header = "False"
        "#;
        let config = RunConfig::from_toml_str(text).expect("config parses");
        assert!(config.settings.use_probabilistic_backend);
        assert!(!config.settings.load_parameters);
        assert!(config.settings.verbose);
        assert!(!config.data.has_header);
        assert_eq!(config.settings.kernel, KernelKind::Rbf);
        assert_eq!(config.settings.gamma, Gamma::Value(0.05));
    }

    #[test]
    fn test_unrecognized_boolean_is_rejected() {
        let text = MINIMAL.replace("[settings]", "[settings]\nload_parameters = \"maybe\"");
        let err = RunConfig::from_toml_str(&text).expect_err("bad flag must fail");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_missing_data_section() {
        let err = RunConfig::from_toml_str("[settings]\nnu = 0.2\n").expect_err("no data table");
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[test]
    fn test_value_ranges() {
        for bad in ["nu = 0.0", "nu = 1.5", "gamma = -1.0", "max_vector_length = 0"] {
            let text = MINIMAL.replace("[settings]", &format!("[settings]\n{bad}"));
            let err = RunConfig::from_toml_str(&text).expect_err(bad);
            assert!(matches!(err, PipelineError::Configuration(_)), "{bad}");
        }

        let text = MINIMAL.replace("[data]", "[data]\ntrain_fraction = 0.0");
        assert!(RunConfig::from_toml_str(&text).is_err());
    }

    #[test]
    fn test_load_resolves_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("novelcrab.toml");
        std::fs::write(&path, MINIMAL).expect("write config");

        let config = RunConfig::load(&path).expect("config loads");
        assert_eq!(config.data.train_dataset_file, dir.path().join("train.csv"));
        assert_eq!(
            config.settings.parameters_file,
            dir.path().join(DEFAULT_PARAMETERS_FILE)
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = RunConfig::load(&dir.path().join("absent.toml")).expect_err("missing file");
        assert!(err.to_string().contains("absent.toml"));
    }
}
