// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::model::{CostModel, centered_prefix_sums};
use co2cpd_core::CpdError;

const ABSOLUTE_VARIANCE_FLOOR: f64 = 1e-12;
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-10;

/// Gaussian cost with per-segment mean and variance.
///
/// `cost([a, b)) = m · ln(σ̂²)` with the MLE variance, omitting additive
/// terms linear in `m` that cancel in window scores. Variances are floored
/// relative to the whole-series variance so constant segments stay finite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CostNormalMeanVar;

impl CostNormalMeanVar {
    pub const fn new() -> Self {
        Self
    }
}

/// Prefix-stat cache for O(1) Normal segment-cost queries.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalCache {
    prefix_sum: Vec<f64>,
    prefix_sum_sq: Vec<f64>,
    variance_floor: f64,
    n: usize,
}

impl NormalCache {
    pub fn variance_floor(&self) -> f64 {
        self.variance_floor
    }
}

impl CostModel for CostNormalMeanVar {
    type Cache = NormalCache;

    fn name(&self) -> &'static str {
        "normal_mean_var"
    }

    fn precompute(&self, values: &[f64]) -> Result<Self::Cache, CpdError> {
        self.validate(values)?;
        let (prefix_sum, prefix_sum_sq) = centered_prefix_sums(values);
        let n = values.len();
        let total_variance = prefix_sum_sq[n] / n as f64;
        let variance_floor = (total_variance * RELATIVE_VARIANCE_FLOOR).max(ABSOLUTE_VARIANCE_FLOOR);
        Ok(NormalCache {
            prefix_sum,
            prefix_sum_sq,
            variance_floor,
            n,
        })
    }

    fn segment_cost(&self, cache: &Self::Cache, start: usize, end: usize) -> f64 {
        assert!(
            start < end,
            "segment_cost requires start < end; got start={start}, end={end}"
        );
        assert!(
            end <= cache.n,
            "segment_cost end out of bounds: end={end}, n={}",
            cache.n
        );

        let m = (end - start) as f64;
        let sum = cache.prefix_sum[end] - cache.prefix_sum[start];
        let sum_sq = cache.prefix_sum_sq[end] - cache.prefix_sum_sq[start];
        let mean = sum / m;
        let variance = (sum_sq / m - mean * mean).max(cache.variance_floor);
        m * variance.ln()
    }

    fn penalty_params_per_segment(&self) -> usize {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::CostNormalMeanVar;
    use crate::CostModel;

    fn window_score(values: &[f64], split: usize, half: usize) -> f64 {
        let model = CostNormalMeanVar::default();
        let cache = model.precompute(values).expect("precompute should succeed");
        model.segment_cost(&cache, split - half, split + half)
            - model.segment_cost(&cache, split - half, split)
            - model.segment_cost(&cache, split, split + half)
    }

    #[test]
    fn trait_contract() {
        let model = CostNormalMeanVar::default();
        assert_eq!(model.name(), "normal_mean_var");
        assert_eq!(model.penalty_params_per_segment(), 3);
    }

    #[test]
    fn segment_cost_matches_log_variance() {
        let values = [1.0, 5.0, 1.0, 5.0];
        let model = CostNormalMeanVar::default();
        let cache = model.precompute(&values).expect("precompute");
        let cost = model.segment_cost(&cache, 0, 4);
        assert!((cost - 4.0 * 4.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn constant_segments_are_floored_and_finite() {
        let values = [5.0; 8];
        let model = CostNormalMeanVar::default();
        let cache = model.precompute(&values).expect("precompute");
        let cost = model.segment_cost(&cache, 0, 8);
        assert!(cost.is_finite());
        assert!((cost - 8.0 * cache.variance_floor().ln()).abs() < 1e-9);
    }

    #[test]
    fn variance_change_scores_higher_at_the_boundary() {
        let mut values = Vec::with_capacity(40);
        for _ in 0..10 {
            values.push(-1.0);
            values.push(1.0);
        }
        for _ in 0..10 {
            values.push(-6.0);
            values.push(6.0);
        }
        let at_boundary = window_score(&values, 20, 8);
        let inside_first = window_score(&values, 10, 8);
        assert!(at_boundary > inside_first);
        assert!(at_boundary > 0.0);
    }
}
