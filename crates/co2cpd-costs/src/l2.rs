// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::model::{CostModel, centered_prefix_sums};
use co2cpd_core::CpdError;

/// Squared-error cost around the segment mean.
///
/// `cost([a, b)) = Σ (x_t − mean)²`. For two adjacent windows of equal
/// width `w` the window score `cost(whole) − cost(left) − cost(right)`
/// reduces to `w/2 · (mean_left − mean_right)²`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CostL2Mean;

impl CostL2Mean {
    pub const fn new() -> Self {
        Self
    }
}

/// Prefix-stat cache for O(1) L2 segment-cost queries.
#[derive(Clone, Debug, PartialEq)]
pub struct L2Cache {
    prefix_sum: Vec<f64>,
    prefix_sum_sq: Vec<f64>,
    n: usize,
}

impl L2Cache {
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }
}

impl CostModel for CostL2Mean {
    type Cache = L2Cache;

    fn name(&self) -> &'static str {
        "l2_mean"
    }

    fn precompute(&self, values: &[f64]) -> Result<Self::Cache, CpdError> {
        self.validate(values)?;
        let (prefix_sum, prefix_sum_sq) = centered_prefix_sums(values);
        Ok(L2Cache {
            prefix_sum,
            prefix_sum_sq,
            n: values.len(),
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
        (sum_sq - sum * sum / m).max(0.0)
    }

    fn penalty_params_per_segment(&self) -> usize {
        2
    }
}
