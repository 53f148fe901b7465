// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpdError;

/// Default significance level for the mean-shift test.
pub const DEFAULT_SIGNIFICANCE_LEVEL: f64 = 0.05;
/// Default number of changepoints reported per scenario.
pub const DEFAULT_N_CHANGEPOINTS: usize = 1;
/// Auto window size is `series length / AUTO_WINDOW_DIVISOR`, at least
/// [`MIN_AUTO_WINDOW`].
pub const AUTO_WINDOW_DIVISOR: usize = 20;
pub const MIN_AUTO_WINDOW: usize = 2;

/// Penalty used by [`Stopping::Penalized`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Penalty {
    /// `params_per_segment * ln(n)`.
    BIC,
    /// `2 * params_per_segment`.
    AIC,
    /// Explicit threshold on the window score.
    Manual(f64),
}

/// How many changepoints the segmenter reports.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub enum Stopping {
    /// Report up to `k` changepoints.
    KnownK(usize),
    /// Report every peak whose score exceeds the penalty.
    Penalized(Penalty),
}

impl Default for Stopping {
    fn default() -> Self {
        Self::KnownK(DEFAULT_N_CHANGEPOINTS)
    }
}

/// Two-sample test used by the significance evaluator.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TTestVariant {
    /// Unequal variances, Welch–Satterthwaite degrees of freedom.
    #[default]
    Welch,
    /// Pooled variance, `n1 + n2 - 2` degrees of freedom.
    Student,
}

/// Window discrepancy cost used by the segmenter.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CostKind {
    /// Sum of squared deviations from the segment mean.
    #[default]
    L2,
    /// Gaussian negative log-likelihood with segment mean and variance.
    Normal,
}

/// Immutable configuration record passed into every core call.
///
/// `None` for `window_size` selects [`auto_window_size`] per series;
/// `None` for `test_window` or `test_gap` reuses the resolved window size.
/// `test_gap` is the number of observations on each side of a changepoint
/// left out of the significance test; the default keeps the two detection
/// windows that selected the changepoint out of its test.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub window_size: Option<usize>,
    pub stopping: Stopping,
    pub significance_level: f64,
    pub test_window: Option<usize>,
    pub test_gap: Option<usize>,
    pub test_variant: TTestVariant,
    pub cost: CostKind,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            window_size: None,
            stopping: Stopping::default(),
            significance_level: DEFAULT_SIGNIFICANCE_LEVEL,
            test_window: None,
            test_gap: None,
            test_variant: TTestVariant::default(),
            cost: CostKind::default(),
        }
    }
}

/// Window parameters resolved for one series.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedParams {
    pub window_size: usize,
    pub test_window: usize,
    pub test_gap: usize,
}

impl AnalysisConfig {
    /// Checks every option; failures are [`CpdError::InvalidParameter`].
    pub fn validate(&self) -> Result<(), CpdError> {
        validate_stopping(&self.stopping)?;

        if self.window_size == Some(0) {
            return Err(CpdError::invalid_parameter(
                "window_size must be >= 1; got 0",
            ));
        }
        if self.test_window == Some(0) {
            return Err(CpdError::invalid_parameter(
                "test_window must be >= 1; got 0",
            ));
        }
        if !self.significance_level.is_finite()
            || self.significance_level <= 0.0
            || self.significance_level >= 1.0
        {
            return Err(CpdError::invalid_parameter(format!(
                "significance_level must lie in (0, 1); got {}",
                self.significance_level
            )));
        }
        Ok(())
    }

    /// Resolves the window sizes for a series of length `n`.
    pub fn resolve(&self, n: usize) -> ResolvedParams {
        let window_size = self.window_size.unwrap_or_else(|| auto_window_size(n));
        ResolvedParams {
            window_size,
            test_window: self.test_window.unwrap_or(window_size),
            test_gap: self.test_gap.unwrap_or(window_size),
        }
    }
}

/// Default window size for a series of length `n`.
pub fn auto_window_size(n: usize) -> usize {
    (n / AUTO_WINDOW_DIVISOR).max(MIN_AUTO_WINDOW)
}

pub fn validate_stopping(stopping: &Stopping) -> Result<(), CpdError> {
    if let Stopping::Penalized(Penalty::Manual(beta)) = stopping
        && (!beta.is_finite() || *beta <= 0.0)
    {
        return Err(CpdError::invalid_parameter(format!(
            "manual penalty must be finite and > 0.0; got {beta}"
        )));
    }
    Ok(())
}

/// Resolves a penalty to the score threshold `beta`.
pub fn penalty_value(
    penalty: &Penalty,
    n: usize,
    params_per_segment: usize,
) -> Result<f64, CpdError> {
    if params_per_segment == 0 {
        return Err(CpdError::invalid_parameter(
            "params_per_segment must be >= 1; got 0",
        ));
    }
    let beta = match penalty {
        Penalty::BIC => params_per_segment as f64 * (n.max(2) as f64).ln(),
        Penalty::AIC => 2.0 * params_per_segment as f64,
        Penalty::Manual(beta) => *beta,
    };
    if !beta.is_finite() || beta <= 0.0 {
        return Err(CpdError::invalid_parameter(format!(
            "resolved penalty must be finite and > 0.0; got beta={beta}"
        )));
    }
    Ok(beta)
}

/// Converts a signed option from an outer surface (CLI, config file) that
/// must be strictly positive.
pub fn positive_param(name: &str, value: i64) -> Result<usize, CpdError> {
    if value <= 0 {
        return Err(CpdError::invalid_parameter(format!(
            "{name} must be > 0; got {value}"
        )));
    }
    usize::try_from(value)
        .map_err(|_| CpdError::invalid_parameter(format!("{name} is too large: {value}")))
}

/// Converts a signed option that must be non-negative.
pub fn non_negative_param(name: &str, value: i64) -> Result<usize, CpdError> {
    if value < 0 {
        return Err(CpdError::invalid_parameter(format!(
            "{name} must be >= 0; got {value}"
        )));
    }
    usize::try_from(value)
        .map_err(|_| CpdError::invalid_parameter(format!("{name} is too large: {value}")))
}
