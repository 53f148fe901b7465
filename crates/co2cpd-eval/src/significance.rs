// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_core::{CpdError, TTestVariant, TestOutcome};
use statrs::distribution::{ContinuousCDF, StudentsT};

const MIN_SAMPLE: usize = 2;

/// Two-sample mean-shift test around a candidate changepoint.
///
/// The before sample is `[index − gap − test_window, index − gap)` and the
/// after sample is `[index + gap, index + gap + test_window)`, both clipped to
/// the series bounds. The gap is 0 unless set with [`Self::with_gap`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SignificanceTest {
    test_window: usize,
    gap: usize,
    level: f64,
    variant: TTestVariant,
}

impl SignificanceTest {
    pub fn new(test_window: usize, level: f64, variant: TTestVariant) -> Result<Self, CpdError> {
        if test_window == 0 {
            return Err(CpdError::invalid_parameter(
                "test_window must be >= 1; got 0",
            ));
        }
        if !level.is_finite() || level <= 0.0 || level >= 1.0 {
            return Err(CpdError::invalid_parameter(format!(
                "significance level must lie in (0, 1); got {level}"
            )));
        }
        Ok(Self {
            test_window,
            gap: 0,
            level,
            variant,
        })
    }

    /// Keeps `gap` observations on each side of the index out of both
    /// samples. A gap of the detection window size leaves the windows that
    /// selected the index out of the test.
    pub fn with_gap(self, gap: usize) -> Self {
        Self { gap, ..self }
    }

    pub fn test_window(&self) -> usize {
        self.test_window
    }

    pub fn gap(&self) -> usize {
        self.gap
    }

    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn variant(&self) -> TTestVariant {
        self.variant
    }

    /// The clipped before and after samples this test compares at `index`.
    pub fn samples<'a>(
        &self,
        values: &'a [f64],
        index: usize,
    ) -> Result<(&'a [f64], &'a [f64]), CpdError> {
        gapped_samples(values, index, self.test_window, self.gap)
    }

    /// `mean(after) − mean(before)` over [`Self::samples`]; `None` when a
    /// side is empty or the index is out of range.
    pub fn mean_shift(&self, values: &[f64], index: usize) -> Option<f64> {
        let (before, after) = self.samples(values, index).ok()?;
        shift_between(before, after)
    }

    pub fn evaluate(&self, values: &[f64], index: usize) -> Result<TestOutcome, CpdError> {
        let (before, after) = self.samples(values, index)?;
        if before.len() < MIN_SAMPLE || after.len() < MIN_SAMPLE {
            return Err(CpdError::insufficient_sample(before.len(), after.len()));
        }

        let before = SampleMoments::from_slice(before, "before")?;
        let after = SampleMoments::from_slice(after, "after")?;
        let (statistic, df) = match self.variant {
            TTestVariant::Welch => welch_statistic(&before, &after),
            TTestVariant::Student => student_statistic(&before, &after),
        };
        let p_value = two_sided_p_value(statistic, df)?;

        Ok(TestOutcome {
            statistic,
            df,
            p_value,
            is_significant: p_value < self.level,
            mean_before: before.mean,
            mean_after: after.mean,
            n_before: before.n,
            n_after: after.n,
        })
    }
}

/// Tests whether the mean shifts at `index`.
///
/// Fails with `InsufficientSample` when either clipped side holds fewer than
/// two observations and with `InvalidParameter` for `index > values.len()`,
/// `test_window == 0` or `level` outside `(0, 1)`.
pub fn evaluate(
    values: &[f64],
    index: usize,
    test_window: usize,
    level: f64,
    variant: TTestVariant,
) -> Result<TestOutcome, CpdError> {
    SignificanceTest::new(test_window, level, variant)?.evaluate(values, index)
}

/// Returns the before and after samples around `index`, clipped to bounds.
pub fn draw_samples(
    values: &[f64],
    index: usize,
    test_window: usize,
) -> Result<(&[f64], &[f64]), CpdError> {
    gapped_samples(values, index, test_window, 0)
}

/// `mean(after) − mean(before)` over the clipped samples; `None` when a side
/// is empty or the index is out of range.
pub fn mean_shift(values: &[f64], index: usize, test_window: usize) -> Option<f64> {
    let (before, after) = draw_samples(values, index, test_window).ok()?;
    shift_between(before, after)
}

fn shift_between(before: &[f64], after: &[f64]) -> Option<f64> {
    if before.is_empty() || after.is_empty() {
        return None;
    }
    Some(mean(after) - mean(before))
}

fn gapped_samples(
    values: &[f64],
    index: usize,
    test_window: usize,
    gap: usize,
) -> Result<(&[f64], &[f64]), CpdError> {
    let n = values.len();
    if index > n {
        return Err(CpdError::invalid_parameter(format!(
            "changepoint index {index} is beyond series length {n}"
        )));
    }
    let before_end = index.saturating_sub(gap);
    let before_start = before_end.saturating_sub(test_window);
    let after_start = index.saturating_add(gap).min(n);
    let after_end = after_start.saturating_add(test_window).min(n);
    Ok((
        &values[before_start..before_end],
        &values[after_start..after_end],
    ))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

#[derive(Clone, Copy, Debug)]
struct SampleMoments {
    n: usize,
    mean: f64,
    variance: f64,
}

impl SampleMoments {
    fn from_slice(values: &[f64], side: &str) -> Result<Self, CpdError> {
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(CpdError::numerical_issue(format!(
                "non-finite {side} sample value {value} at offset {idx}"
            )));
        }
        let n = values.len();
        let mean = mean(values);
        let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
        Ok(Self {
            n,
            mean,
            variance: sum_sq / (n - 1) as f64,
        })
    }
}

fn pooled_df(before: &SampleMoments, after: &SampleMoments) -> f64 {
    (before.n + after.n - 2) as f64
}

// Zero standard error: equal means are no evidence of a shift, different
// means are an exact separation.
fn degenerate_statistic(before: &SampleMoments, after: &SampleMoments) -> f64 {
    let diff = before.mean - after.mean;
    if diff == 0.0 {
        0.0
    } else {
        diff.signum() * f64::INFINITY
    }
}

fn welch_statistic(before: &SampleMoments, after: &SampleMoments) -> (f64, f64) {
    let se_before = before.variance / before.n as f64;
    let se_after = after.variance / after.n as f64;
    let se_sq = se_before + se_after;
    if se_sq <= 0.0 {
        return (degenerate_statistic(before, after), pooled_df(before, after));
    }

    let statistic = (before.mean - after.mean) / se_sq.sqrt();
    let df = se_sq * se_sq
        / (se_before * se_before / (before.n - 1) as f64
            + se_after * se_after / (after.n - 1) as f64);
    (statistic, df)
}

fn student_statistic(before: &SampleMoments, after: &SampleMoments) -> (f64, f64) {
    let df = pooled_df(before, after);
    let pooled_var = ((before.n - 1) as f64 * before.variance
        + (after.n - 1) as f64 * after.variance)
        / df;
    let se_sq = pooled_var * (1.0 / before.n as f64 + 1.0 / after.n as f64);
    if se_sq <= 0.0 {
        return (degenerate_statistic(before, after), df);
    }
    ((before.mean - after.mean) / se_sq.sqrt(), df)
}

fn two_sided_p_value(statistic: f64, df: f64) -> Result<f64, CpdError> {
    if statistic.is_nan() || !df.is_finite() || df <= 0.0 {
        return Err(CpdError::numerical_issue(format!(
            "t-test produced statistic={statistic}, df={df}"
        )));
    }
    if statistic.is_infinite() {
        return Ok(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df)
        .map_err(|err| CpdError::numerical_issue(format!("student-t with df={df}: {err}")))?;
    Ok((2.0 * dist.sf(statistic.abs())).min(1.0))
}
