// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use anyhow::Context;
use clap::{Args, ValueEnum};
use co2cpd_core::{
    AnalysisConfig, CostKind, CpdError, Penalty, Stopping, TTestVariant, non_negative_param,
    positive_param,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestArg {
    Welch,
    Student,
}

impl From<TestArg> for TTestVariant {
    fn from(value: TestArg) -> Self {
        match value {
            TestArg::Welch => Self::Welch,
            TestArg::Student => Self::Student,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CostArg {
    L2,
    Normal,
}

impl From<CostArg> for CostKind {
    fn from(value: CostArg) -> Self {
        match value {
            CostArg::L2 => Self::L2,
            CostArg::Normal => Self::Normal,
        }
    }
}

/// Penalty as written in a config file: `"bic"`, `"aic"` or a number.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PenaltySetting {
    Named(String),
    Value(f64),
}

/// Optional TOML configuration file. Integer options are signed so that
/// negative values reach validation instead of failing to parse.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub window_size: Option<i64>,
    pub n_changepoints: Option<i64>,
    pub penalty: Option<PenaltySetting>,
    pub significance_level: Option<f64>,
    pub test_window: Option<i64>,
    pub test_gap: Option<i64>,
    pub test: Option<TestArg>,
    pub cost: Option<CostArg>,
}

impl ConfigFile {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded analysis configuration");
        Ok(config)
    }
}

/// Detection options shared by the `analyze` and `segment` subcommands.
#[derive(Args, Clone, Debug, Default)]
pub struct DetectionArgs {
    /// TOML file with default analysis options; flags override it
    #[arg(long, value_name = "TOML")]
    pub config: Option<PathBuf>,

    /// Sliding window width in samples [default: max(2, n / 20)]
    #[arg(long, allow_negative_numbers = true)]
    pub window_size: Option<i64>,

    /// Number of changepoints to report per scenario [default: 1]
    #[arg(long, allow_negative_numbers = true, conflicts_with = "penalty")]
    pub n_changepoints: Option<i64>,

    /// Report every peak above a penalty: bic, aic or a positive number
    #[arg(long)]
    pub penalty: Option<String>,

    /// Significance level for the mean-shift test [default: 0.05]
    #[arg(long, allow_negative_numbers = true)]
    pub significance_level: Option<f64>,

    /// Samples on each side of a changepoint used by the test [default: window size]
    #[arg(long, allow_negative_numbers = true)]
    pub test_window: Option<i64>,

    /// Samples skipped on each side of a changepoint before the test samples [default: window size]
    #[arg(long, allow_negative_numbers = true)]
    pub test_gap: Option<i64>,

    /// Two-sample test [default: welch]
    #[arg(long, value_enum)]
    pub test: Option<TestArg>,

    /// Window cost model [default: l2]
    #[arg(long, value_enum)]
    pub cost: Option<CostArg>,
}

/// Parses `bic`, `aic` or a positive number.
pub fn parse_penalty(raw: &str) -> Result<Penalty, CpdError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "bic" => Ok(Penalty::BIC),
        "aic" => Ok(Penalty::AIC),
        other => {
            let beta = other.parse::<f64>().map_err(|_| {
                CpdError::invalid_parameter(format!(
                    "unsupported penalty '{raw}'; expected 'bic', 'aic', or a positive number"
                ))
            })?;
            manual_penalty(beta)
        }
    }
}

fn manual_penalty(beta: f64) -> Result<Penalty, CpdError> {
    if !beta.is_finite() || beta <= 0.0 {
        return Err(CpdError::invalid_parameter(format!(
            "penalty must be finite and > 0.0; got {beta}"
        )));
    }
    Ok(Penalty::Manual(beta))
}

fn penalty_from_setting(setting: &PenaltySetting) -> Result<Penalty, CpdError> {
    match setting {
        PenaltySetting::Named(name) => parse_penalty(name),
        PenaltySetting::Value(beta) => manual_penalty(*beta),
    }
}

/// Layers defaults, then the config file, then command-line flags.
///
/// Within one layer a penalty replaces the fixed changepoint count. The
/// returned configuration has already been validated.
pub fn resolve_config(
    file: Option<&ConfigFile>,
    args: &DetectionArgs,
) -> Result<AnalysisConfig, CpdError> {
    let file = file.cloned().unwrap_or_default();
    let mut config = AnalysisConfig::default();

    if let Some(raw) = args.window_size.or(file.window_size) {
        config.window_size = Some(positive_param("window_size", raw)?);
    }
    if let Some(raw) = args.test_window.or(file.test_window) {
        config.test_window = Some(positive_param("test_window", raw)?);
    }
    if let Some(raw) = args.test_gap.or(file.test_gap) {
        config.test_gap = Some(non_negative_param("test_gap", raw)?);
    }
    if let Some(level) = args.significance_level.or(file.significance_level) {
        config.significance_level = level;
    }
    if let Some(test) = args.test.or(file.test) {
        config.test_variant = test.into();
    }
    if let Some(cost) = args.cost.or(file.cost) {
        config.cost = cost.into();
    }

    config.stopping = if let Some(count) = args.n_changepoints {
        Stopping::KnownK(non_negative_param("n_changepoints", count)?)
    } else if let Some(raw) = args.penalty.as_deref() {
        Stopping::Penalized(parse_penalty(raw)?)
    } else if let Some(setting) = file.penalty.as_ref() {
        Stopping::Penalized(penalty_from_setting(setting)?)
    } else if let Some(count) = file.n_changepoints {
        Stopping::KnownK(non_negative_param("n_changepoints", count)?)
    } else {
        Stopping::default()
    };

    config.validate()?;
    Ok(config)
}
