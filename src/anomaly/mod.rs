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

pub mod backend;
pub mod kernel;
pub mod linalg;
pub mod lsanomaly;
pub mod params;
pub mod svm;

pub use backend::{Backend, BackendKind, NoveltyModel};
pub use lsanomaly::{LsAnomaly, LsAnomalyParams};
pub use params::SvmParams;
pub use svm::OneClassSvm;

use crate::config::Settings;
use crate::error::Result;

/// Choose and parameterize the backend named by the settings.
/// With `load_parameters` the SVM hyperparameters come from the persisted file.
pub fn create_backend(settings: &Settings) -> Result<Backend> {
    if settings.use_probabilistic_backend {
        if settings.load_parameters {
            tracing::warn!("load_parameters is ignored by the LSAnomaly backend");
        }
        return Ok(Backend::LsAnomaly(LsAnomalyParams::with_seed(settings.seed)));
    }

    let params = if settings.load_parameters {
        SvmParams::load(&settings.parameters_file)?
    } else {
        SvmParams::from_settings(settings)
    };
    Ok(Backend::OneClassSvm(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use crate::error::PipelineError;

    fn settings(extra: &str) -> Settings {
        let text = format!(
            "[settings]\n{extra}\n[data]\ntrain_dataset_file = \"a\"\ntest_dataset_file = \"b\"\n"
        );
        RunConfig::from_toml_str(&text).expect("config").settings
    }

    #[test]
    fn test_backend_selection() {
        let svm = create_backend(&settings("nu = 0.2")).expect("svm");
        assert_eq!(svm.kind(), BackendKind::OneClassSvm);
        assert!(matches!(svm, Backend::OneClassSvm(SvmParams { nu, .. }) if (nu - 0.2).abs() < 1e-12));

        let ls = create_backend(&settings("use_probabilistic_backend = \"True\"\nseed = 3")).expect("ls");
        assert_eq!(ls, Backend::LsAnomaly(LsAnomalyParams::with_seed(3)));
    }

    #[test]
    fn test_persisted_parameters_override_settings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("params.json");
        let persisted = SvmParams {
            nu: 0.33,
            ..SvmParams::default()
        };
        persisted.save(&path).expect("saves");

        let mut s = settings("nu = 0.9\nload_parameters = true");
        s.parameters_file = path;
        assert_eq!(create_backend(&s).expect("loads"), Backend::OneClassSvm(persisted));
    }

    #[test]
    fn test_missing_persisted_parameters() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut s = settings("load_parameters = true");
        s.parameters_file = dir.path().join("absent.json");
        let err = create_backend(&s).expect_err("missing file");
        assert!(matches!(err, PipelineError::Persistence { .. }));
    }
}
