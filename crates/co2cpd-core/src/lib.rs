// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Shared types for CO2 scenario changepoint analysis: validated series,
//! the immutable analysis configuration, per-scenario result records and the
//! error taxonomy every other crate in the workspace reports through.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod results;
pub mod series;

pub use config::{
    AUTO_WINDOW_DIVISOR, AnalysisConfig, CostKind, DEFAULT_N_CHANGEPOINTS,
    DEFAULT_SIGNIFICANCE_LEVEL, MIN_AUTO_WINDOW, Penalty, ResolvedParams, Stopping, TTestVariant,
    auto_window_size, non_negative_param, penalty_value, positive_param, validate_stopping,
};
pub use diagnostics::Diagnostics;
pub use error::CpdError;
pub use results::{
    Changepoint, ScenarioResult, ScenarioStatus, Significance, TestOutcome,
};
pub use series::{ScenarioLabel, Series, SeriesStore};
