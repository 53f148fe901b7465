// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_core::CpdError;

/// Segment cost over half-open intervals `[start, end)` of a univariate
/// series, answered in O(1) from a precomputed cache.
pub trait CostModel {
    type Cache;

    fn name(&self) -> &'static str;

    /// Rejects inputs the model cannot score.
    fn validate(&self, values: &[f64]) -> Result<(), CpdError> {
        if values.is_empty() {
            return Err(CpdError::invalid_parameter(format!(
                "{} requires n >= 1; got n=0",
                self.name()
            )));
        }
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(CpdError::numerical_issue(format!(
                "{} requires finite values; got {value} at t={idx}",
                self.name()
            )));
        }
        Ok(())
    }

    fn precompute(&self, values: &[f64]) -> Result<Self::Cache, CpdError>;

    fn segment_cost(&self, cache: &Self::Cache, start: usize, end: usize) -> f64;

    /// Free parameters per segment, used by BIC/AIC penalties.
    fn penalty_params_per_segment(&self) -> usize;
}

/// Prefix sums of `x − mean` and `(x − mean)²`, each of length `n + 1`.
///
/// Centering keeps the sum-of-squares identity well conditioned for
/// concentration levels far from zero.
pub fn centered_prefix_sums(values: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = values.len();
    let center = if n == 0 {
        0.0
    } else {
        values.iter().sum::<f64>() / n as f64
    };

    let mut prefix_sum = Vec::with_capacity(n + 1);
    let mut prefix_sum_sq = Vec::with_capacity(n + 1);
    prefix_sum.push(0.0);
    prefix_sum_sq.push(0.0);

    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &value in values {
        let centered = value - center;
        sum += centered;
        sum_sq += centered * centered;
        prefix_sum.push(sum);
        prefix_sum_sq.push(sum_sq);
    }

    (prefix_sum, prefix_sum_sq)
}

#[cfg(test)]
mod tests {
    use super::centered_prefix_sums;

    #[test]
    fn prefix_sums_have_leading_zero_and_are_centered() {
        let (sum, sum_sq) = centered_prefix_sums(&[1.0, 2.0, 3.0]);
        assert_eq!(sum.len(), 4);
        assert_eq!(sum_sq.len(), 4);
        assert_eq!(sum[0], 0.0);
        assert_eq!(sum_sq[0], 0.0);
        assert!(sum[3].abs() < 1e-12);
        assert!((sum_sq[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn empty_input_yields_single_zero() {
        let (sum, sum_sq) = centered_prefix_sums(&[]);
        assert_eq!(sum, vec![0.0]);
        assert_eq!(sum_sq, vec![0.0]);
    }
}
