// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_core::{ScenarioLabel, ScenarioResult, ScenarioStatus};

/// Count, mean and sample standard deviation of a set of values.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stats {
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` for fewer than two values.
    pub std: Option<f64>,
}

impl Stats {
    /// `None` for an empty input.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = (n >= 2).then(|| {
            let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
            (sum_sq / (n - 1) as f64).sqrt()
        });
        Some(Self { n, mean, std })
    }
}

/// Statistics over significant changepoints.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum SignificantStats {
    NoSignificantChangepoints,
    Present {
        /// Changepoint time, in the units of the input time axis.
        location: Stats,
        magnitude: Stats,
        concentration: Stats,
        /// t-statistic of the significance test.
        statistic: Stats,
        p_value: Stats,
    },
}

impl SignificantStats {
    fn from_points(points: &[SignificantPoint]) -> Self {
        let column = |pick: fn(&SignificantPoint) -> f64| {
            Stats::from_values(&points.iter().map(pick).collect::<Vec<_>>())
        };
        match (
            column(|p| p.time),
            column(|p| p.magnitude),
            column(|p| p.concentration),
            column(|p| p.statistic),
            column(|p| p.p_value),
        ) {
            (
                Some(location),
                Some(magnitude),
                Some(concentration),
                Some(statistic),
                Some(p_value),
            ) => Self::Present {
                location,
                magnitude,
                concentration,
                statistic,
                p_value,
            },
            _ => Self::NoSignificantChangepoints,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present { .. })
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioSummary {
    pub label: ScenarioLabel,
    pub status: ScenarioStatus,
    pub detected: usize,
    pub significant: usize,
    pub stats: SignificantStats,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OverallSummary {
    pub scenarios: usize,
    pub degraded: usize,
    pub detected: usize,
    pub significant: usize,
    /// Significant-changepoint count per scenario, zeros and degraded
    /// scenarios included. `None` when there are no scenarios.
    pub significant_count: Option<Stats>,
    /// Pooled over every significant changepoint of every scenario.
    pub stats: SignificantStats,
}

/// Per-scenario rows in canonical label order plus the overall row.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SummaryRecord {
    pub scenarios: Vec<ScenarioSummary>,
    pub overall: OverallSummary,
}

#[derive(Clone, Copy, Debug)]
struct SignificantPoint {
    time: f64,
    magnitude: f64,
    concentration: f64,
    statistic: f64,
    p_value: f64,
}

fn significant_points(result: &ScenarioResult) -> Vec<SignificantPoint> {
    result
        .significant()
        .filter_map(|cp| {
            let outcome = cp.significance.outcome()?;
            Some(SignificantPoint {
                time: cp.time,
                magnitude: cp.magnitude.unwrap_or_else(|| outcome.magnitude()),
                concentration: cp.concentration,
                statistic: outcome.statistic,
                p_value: outcome.p_value,
            })
        })
        .collect()
}

/// Summarizes scenario results.
///
/// Results are sorted into canonical label order before any accumulation, so
/// the record does not depend on the order of `results`.
pub fn aggregate(results: &[ScenarioResult]) -> SummaryRecord {
    let mut ordered: Vec<&ScenarioResult> = results.iter().collect();
    ordered.sort_by(|left, right| left.label.canonical_cmp(&right.label));

    let mut scenarios = Vec::with_capacity(ordered.len());
    let mut pooled = vec![];
    let mut counts = Vec::with_capacity(ordered.len());
    let mut detected = 0;
    let mut degraded = 0;

    for result in ordered {
        let points = significant_points(result);
        detected += result.changepoints.len();
        if result.is_degraded() {
            degraded += 1;
        }
        counts.push(points.len() as f64);
        scenarios.push(ScenarioSummary {
            label: result.label.clone(),
            status: result.status.clone(),
            detected: result.changepoints.len(),
            significant: points.len(),
            stats: SignificantStats::from_points(&points),
        });
        pooled.extend(points);
    }

    let overall = OverallSummary {
        scenarios: scenarios.len(),
        degraded,
        detected,
        significant: pooled.len(),
        significant_count: Stats::from_values(&counts),
        stats: SignificantStats::from_points(&pooled),
    };
    SummaryRecord { scenarios, overall }
}
