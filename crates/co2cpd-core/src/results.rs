// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{Diagnostics, ScenarioLabel, Stopping};

/// Outcome of a two-sample mean-shift test around one changepoint.
///
/// `statistic` follows the `before − after` convention, so a decaying
/// series produces positive statistics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TestOutcome {
    pub statistic: f64,
    pub df: f64,
    pub p_value: f64,
    pub is_significant: bool,
    pub mean_before: f64,
    pub mean_after: f64,
    pub n_before: usize,
    pub n_after: usize,
}

impl TestOutcome {
    /// Size of the mean shift, `mean_after − mean_before`.
    pub fn magnitude(&self) -> f64 {
        self.mean_after - self.mean_before
    }
}

/// Significance of a changepoint: either tested, or recorded as untestable
/// with the reason the evaluator gave.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Significance {
    Tested(TestOutcome),
    Untestable { reason: String },
}

impl Significance {
    pub fn is_significant(&self) -> bool {
        matches!(self, Self::Tested(outcome) if outcome.is_significant)
    }

    /// Test statistic, NaN when untestable.
    pub fn statistic(&self) -> f64 {
        match self {
            Self::Tested(outcome) => outcome.statistic,
            Self::Untestable { .. } => f64::NAN,
        }
    }

    /// Two-sided p-value, NaN when untestable.
    pub fn p_value(&self) -> f64 {
        match self {
            Self::Tested(outcome) => outcome.p_value,
            Self::Untestable { .. } => f64::NAN,
        }
    }

    pub fn outcome(&self) -> Option<&TestOutcome> {
        match self {
            Self::Tested(outcome) => Some(outcome),
            Self::Untestable { .. } => None,
        }
    }
}

/// A detected boundary with its evaluation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Changepoint {
    pub index: usize,
    pub time: f64,
    pub concentration: f64,
    /// `mean(after) − mean(before)` over the test window; `None` when one
    /// side is empty.
    pub magnitude: Option<f64>,
    pub significance: Significance,
}

impl Changepoint {
    pub fn is_significant(&self) -> bool {
        self.significance.is_significant()
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum ScenarioStatus {
    Analyzed,
    /// The scenario could not be segmented; it carries no changepoints.
    Degraded { reason: String },
}

/// Per-scenario analysis record.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioResult {
    pub label: ScenarioLabel,
    pub n: usize,
    pub window_size: usize,
    pub test_window: usize,
    pub stopping: Stopping,
    pub changepoints: Vec<Changepoint>,
    pub status: ScenarioStatus,
    pub diagnostics: Diagnostics,
}

impl ScenarioResult {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ScenarioStatus::Degraded { .. })
    }

    pub fn significant(&self) -> impl Iterator<Item = &Changepoint> {
        self.changepoints.iter().filter(|cp| cp.is_significant())
    }

    pub fn n_significant(&self) -> usize {
        self.significant().count()
    }

    pub fn degraded_reason(&self) -> Option<&str> {
        match &self.status {
            ScenarioStatus::Analyzed => None,
            ScenarioStatus::Degraded { reason } => Some(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Changepoint, ScenarioResult, ScenarioStatus, Significance, TestOutcome};
    use crate::{Diagnostics, ScenarioLabel, Stopping};

    fn outcome(is_significant: bool) -> TestOutcome {
        TestOutcome {
            statistic: 12.5,
            df: 97.3,
            p_value: if is_significant { 1e-9 } else { 0.4 },
            is_significant,
            mean_before: 450.0,
            mean_after: 400.0,
            n_before: 50,
            n_after: 50,
        }
    }

    fn changepoint(index: usize, significance: Significance) -> Changepoint {
        Changepoint {
            index,
            time: index as f64,
            concentration: 400.0,
            magnitude: significance.outcome().map(TestOutcome::magnitude),
            significance,
        }
    }

    #[test]
    fn untestable_significance_reports_nan_and_not_significant() {
        let significance = Significance::Untestable {
            reason: "insufficient sample".to_string(),
        };
        assert!(!significance.is_significant());
        assert!(significance.statistic().is_nan());
        assert!(significance.p_value().is_nan());
        assert!(significance.outcome().is_none());
    }

    #[test]
    fn magnitude_is_after_minus_before() {
        assert_eq!(outcome(true).magnitude(), -50.0);
    }

    #[test]
    fn scenario_result_counts_only_significant_changepoints() {
        let result = ScenarioResult {
            label: ScenarioLabel::parse("p1"),
            n: 1000,
            window_size: 50,
            test_window: 50,
            stopping: Stopping::KnownK(3),
            changepoints: vec![
                changepoint(100, Significance::Tested(outcome(true))),
                changepoint(300, Significance::Tested(outcome(false))),
                changepoint(
                    990,
                    Significance::Untestable {
                        reason: "edge".to_string(),
                    },
                ),
            ],
            status: ScenarioStatus::Analyzed,
            diagnostics: Diagnostics::default(),
        };
        assert_eq!(result.n_significant(), 1);
        assert_eq!(result.significant().next().map(|cp| cp.index), Some(100));
        assert!(!result.is_degraded());
        assert!(result.degraded_reason().is_none());
    }
}
