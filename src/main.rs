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

use anyhow::Context;
use clap::{Parser, ValueEnum};
use novelcrab::config::{RunConfig, DEFAULT_CONFIG_FILE};
use novelcrab::pipeline::{self, RunReport};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "novelcrab")]
#[command(version)]
#[command(about = "Fit a novelty detector on a training dataset and count anomalies in training and test data", long_about = None)]
struct Args {
    /// Run configuration file
    #[arg(short, long, value_name = "FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Hyperparameter file, overrides settings.parameters_file
    #[arg(long, value_name = "FILE")]
    parameters: Option<PathBuf>,

    /// Report format on stdout
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Include every per-record label in the report
    #[arg(long)]
    predictions: bool,
}

fn main() -> anyhow::Result<()> {
    // Set RUST_LOG to override (e.g., RUST_LOG=novelcrab=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        "NovelCrab starting up (version {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH")
    );

    let args = Args::parse();

    let mut config = RunConfig::load(&args.config)
        .with_context(|| format!("Failed to load configuration {}", args.config.display()))?;
    if let Some(parameters) = args.parameters {
        tracing::info!("Using parameter file {}", parameters.display());
        config.settings.parameters_file = parameters;
    }

    let result = pipeline::run(&config).context("Novelty detection run failed")?;

    let mut report = RunReport::new(&result);
    if args.predictions {
        report = report.with_predictions(&result);
    }
    match args.format {
        OutputFormat::Text => print!("{report}"),
        OutputFormat::Json => println!(
            "{}",
            report.to_json().context("Failed to serialize report")?
        ),
    }

    Ok(())
}
