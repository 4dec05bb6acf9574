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

//! Orchestration of one batch run.
//!
//! A run moves strictly forward through
//! `Loaded → Vectorized → Fitted → Scored → Reported`. The first failing stage
//! aborts the run and is named in the returned [`RunError`]; nothing is
//! reported from a partial run.

pub mod report;

pub use report::RunReport;

use crate::anomaly::{create_backend, Backend, BackendKind, NoveltyModel};
use crate::config::RunConfig;
use crate::dataset::{DelimitedLoader, RawDataset};
use crate::error::PipelineError;
use crate::features::{FeatureMatrix, FeatureVectorizer};
use crate::labels::{normalize, PredictionVector};
use crate::metrics::{self, AnomalyCount, MetricsSummary};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Loaded,
    Vectorized,
    Fitted,
    Scored,
    Reported,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Loaded => "load",
            Self::Vectorized => "vectorize",
            Self::Fitted => "fit",
            Self::Scored => "score",
            Self::Reported => "report",
        };
        f.write_str(name)
    }
}

/// A pipeline error tagged with the stage that raised it
#[derive(Error, Debug)]
#[error("{stage} stage failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    pub source: PipelineError,
}

fn at(stage: Stage) -> impl Fn(PipelineError) -> RunError {
    move |source| RunError { stage, source }
}

/// Everything one run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    pub backend: BackendKind,
    pub feature_width: usize,
    pub train_predictions: PredictionVector,
    pub test_predictions: PredictionVector,
    pub train_anomalies: AnomalyCount,
    pub test_anomalies: AnomalyCount,
    /// Test-set metrics, present when ground-truth labels were supplied
    pub validation: Option<MetricsSummary>,
}

/// Training and test data as read from disk
struct LoadedData {
    train: RawDataset,
    test: RawDataset,
    ground_truth: Option<Vec<i8>>,
}

fn load(config: &RunConfig) -> Result<LoadedData, PipelineError> {
    let data = &config.data;
    let loader = DelimitedLoader::from_config(data);

    let mut train = loader.load(&data.train_dataset_file)?;
    if data.train_fraction < 1.0 {
        train = train.head_fraction(data.train_fraction);
        tracing::info!(
            "Using the first {} training records (train_fraction = {})",
            train.len(),
            data.train_fraction
        );
    }
    let test = loader.load(&data.test_dataset_file)?;

    let ground_truth = data
        .test_labels_file
        .as_deref()
        .map(|path| loader.load_labels(path))
        .transpose()?;

    Ok(LoadedData {
        train,
        test,
        ground_truth,
    })
}

/// Both matrices share one categorical code table
fn vectorize(
    config: &RunConfig,
    data: &LoadedData,
) -> Result<(FeatureMatrix, FeatureMatrix), PipelineError> {
    let vectorizer = FeatureVectorizer::fit(
        [&data.train, &data.test],
        config.settings.max_vector_length,
    )?;
    Ok((
        vectorizer.vectorize(&data.train)?,
        vectorizer.vectorize(&data.test)?,
    ))
}

fn score(
    model: &dyn NoveltyModel,
    train_x: &FeatureMatrix,
    test_x: &FeatureMatrix,
) -> Result<(PredictionVector, PredictionVector), PipelineError> {
    Ok((
        normalize(&model.predict(train_x)?),
        normalize(&model.predict(test_x)?),
    ))
}

/// Run the whole pipeline from the files named in `config`
pub fn run(config: &RunConfig) -> Result<RunResult, RunError> {
    tracing::info!("Stage: {}", Stage::Loaded);
    let data = load(config).map_err(at(Stage::Loaded))?;

    tracing::info!("Stage: {}", Stage::Vectorized);
    let (train_x, test_x) = vectorize(config, &data).map_err(at(Stage::Vectorized))?;

    evaluate(config, &train_x, &test_x, data.ground_truth.as_deref())
}

/// Train/test matrices must have the same feature width
pub fn check_widths(train: &FeatureMatrix, test: &FeatureMatrix) -> Result<(), PipelineError> {
    if train.width() == test.width() {
        Ok(())
    } else {
        Err(PipelineError::DimensionMismatch {
            context: "train/test feature width",
            expected: train.width(),
            found: test.width(),
        })
    }
}

/// Fit, score and report on already vectorized matrices
pub fn evaluate(
    config: &RunConfig,
    train_x: &FeatureMatrix,
    test_x: &FeatureMatrix,
    ground_truth: Option<&[i8]>,
) -> Result<RunResult, RunError> {
    check_widths(train_x, test_x).map_err(at(Stage::Vectorized))?;
    tracing::info!(
        "Vectorized {} training and {} test records to width {}",
        train_x.n_rows(),
        test_x.n_rows(),
        train_x.width()
    );

    tracing::info!("Stage: {}", Stage::Fitted);
    let backend = create_backend(&config.settings).map_err(at(Stage::Fitted))?;
    let model = backend.fit(train_x).map_err(at(Stage::Fitted))?;
    if let Backend::OneClassSvm(params) = &backend {
        if !config.settings.load_parameters {
            params
                .save(&config.settings.parameters_file)
                .map_err(at(Stage::Fitted))?;
        }
    }

    tracing::info!("Stage: {}", Stage::Scored);
    let (train_predictions, test_predictions) =
        score(model.as_ref(), train_x, test_x).map_err(at(Stage::Scored))?;

    tracing::info!("Stage: {}", Stage::Reported);
    let validation = ground_truth
        .map(|truth| metrics::report(truth, &test_predictions))
        .transpose()
        .map_err(at(Stage::Reported))?;

    let result = RunResult {
        backend: backend.kind(),
        feature_width: train_x.width(),
        train_anomalies: AnomalyCount::of(&train_predictions),
        test_anomalies: AnomalyCount::of(&test_predictions),
        train_predictions,
        test_predictions,
        validation,
    };
    tracing::info!(
        "Anomalies in training set: {}; anomalies in test set: {}",
        result.train_anomalies,
        result.test_anomalies
    );
    Ok(result)
}
