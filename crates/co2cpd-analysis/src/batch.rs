// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::scenario::analyze;
use co2cpd_core::{AnalysisConfig, CpdError, ScenarioResult, SeriesStore};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::info;

/// Analyzes every scenario of `store` independently.
///
/// The output is in store order. A scenario that cannot be segmented is
/// reported as degraded and never stops the others; only an invalid
/// configuration fails the batch.
pub fn analyze_batch(
    store: &SeriesStore,
    config: &AnalysisConfig,
) -> Result<Vec<ScenarioResult>, CpdError> {
    config.validate()?;
    info!(scenarios = store.len(), stopping = ?config.stopping, "analyzing scenarios");

    let results = run(store, config)?;

    let degraded = results.iter().filter(|result| result.is_degraded()).count();
    let significant: usize = results.iter().map(ScenarioResult::n_significant).sum();
    info!(
        scenarios = results.len(),
        degraded, significant, "scenario analysis complete"
    );
    Ok(results)
}

#[cfg(feature = "rayon")]
fn run(store: &SeriesStore, config: &AnalysisConfig) -> Result<Vec<ScenarioResult>, CpdError> {
    store
        .as_slice()
        .par_iter()
        .map(|series| analyze(series, config))
        .collect()
}

#[cfg(not(feature = "rayon"))]
fn run(store: &SeriesStore, config: &AnalysisConfig) -> Result<Vec<ScenarioResult>, CpdError> {
    store.iter().map(|series| analyze(series, config)).collect()
}
