// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_costs::{CostL2Mean, CostModel, CostNormalMeanVar};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn naive_l2(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum()
}

fn segment_bounds(n: usize) -> impl Strategy<Value = (usize, usize)> {
    (0..n).prop_flat_map(move |start| ((start + 1)..=n).prop_map(move |end| (start, end)))
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        .. ProptestConfig::default()
    })]

    #[test]
    fn l2_cost_matches_naive_and_is_non_negative(
        (values, (start, end)) in prop::collection::vec(300.0f64..450.0, 2..96)
            .prop_flat_map(|values| {
                let n = values.len();
                (Just(values), segment_bounds(n))
            })
    ) {
        let model = CostL2Mean::default();
        let cache = model.precompute(&values).expect("precompute should succeed");
        let got = model.segment_cost(&cache, start, end);
        let expected = naive_l2(&values[start..end]);
        prop_assert!(got >= 0.0);
        prop_assert!(
            (got - expected).abs() <= 1e-6 * expected.max(1.0),
            "[{}, {}): expected {}, got {}", start, end, expected, got
        );
    }

    #[test]
    fn l2_window_score_is_shift_invariant(
        values in prop::collection::vec(-50.0f64..50.0, 8..64),
        shift in -1.0e4f64..1.0e4,
    ) {
        let n = values.len();
        let half = n / 4;
        let split = n / 2;
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();

        let model = CostL2Mean::default();
        let score = |series: &[f64]| {
            let cache = model.precompute(series).expect("precompute should succeed");
            model.segment_cost(&cache, split - half, split + half)
                - model.segment_cost(&cache, split - half, split)
                - model.segment_cost(&cache, split, split + half)
        };
        let base = score(&values);
        let moved = score(&shifted);
        prop_assert!((base - moved).abs() <= 1e-6 * base.abs().max(1.0));
    }

    #[test]
    fn normal_window_score_is_non_negative(
        values in prop::collection::vec(-50.0f64..50.0, 8..64),
    ) {
        let n = values.len();
        let half = n / 4;
        let split = n / 2;
        let model = CostNormalMeanVar::default();
        let cache = model.precompute(&values).expect("precompute should succeed");
        let score = model.segment_cost(&cache, split - half, split + half)
            - model.segment_cost(&cache, split - half, split)
            - model.segment_cost(&cache, split, split + half);
        prop_assert!(score.is_finite());
        prop_assert!(score >= -1e-6, "score={}", score);
    }
}
