// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_core::{
    AnalysisConfig, Changepoint, CostKind, CpdError, Diagnostics, ResolvedParams,
    ScenarioResult, ScenarioStatus, Series, Significance,
};
use co2cpd_costs::{CostL2Mean, CostModel, CostNormalMeanVar};
use co2cpd_eval::SignificanceTest;
use co2cpd_offline::{Segmentation, SlidingWindow, SlidingWindowConfig};
use std::borrow::Cow;
use std::time::Instant;
use tracing::{debug, warn};

/// Analyzes one scenario: segments the series, then tests every boundary.
///
/// Each boundary is tested on samples placed `test_gap` observations away
/// from it, so with the default gap the test does not reuse the detection
/// windows whose contrast selected the boundary.
///
/// Only `InvalidParameter` is returned as an error. A series that cannot be
/// segmented yields a [`ScenarioStatus::Degraded`] result with no
/// changepoints, and a boundary that cannot be tested keeps
/// [`Significance::Untestable`].
pub fn analyze(series: &Series, config: &AnalysisConfig) -> Result<ScenarioResult, CpdError> {
    config.validate()?;

    let started_at = Instant::now();
    let params = config.resolve(series.len());
    let tester = SignificanceTest::new(
        params.test_window,
        config.significance_level,
        config.test_variant,
    )?
    .with_gap(params.test_gap);

    let segmentation = match segment_series(series.values(), params, config) {
        Ok(segmentation) => segmentation,
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => return Ok(degraded(series, config, params, err, started_at)),
    };

    let changepoints: Vec<Changepoint> = segmentation
        .change_points
        .iter()
        .map(|&index| assemble_changepoint(series, index, &tester))
        .collect::<Result<_, _>>()?;

    let mut diagnostics = Diagnostics {
        n: series.len(),
        notes: vec![format!(
            "test_window={}, test_gap={}, significance_level={}, test={:?}",
            params.test_window, params.test_gap, config.significance_level, config.test_variant
        )],
        ..Diagnostics::default()
    };
    diagnostics.absorb(segmentation.diagnostics);
    let untestable = changepoints
        .iter()
        .filter(|cp| matches!(cp.significance, Significance::Untestable { .. }))
        .count();
    if untestable > 0 {
        diagnostics.warnings.push(format!(
            "{untestable} changepoint(s) could not be tested with test_window={}, test_gap={}",
            params.test_window, params.test_gap
        ));
    }
    diagnostics.runtime_ms = Some(elapsed_ms(started_at));

    let result = ScenarioResult {
        label: series.label().clone(),
        n: series.len(),
        window_size: params.window_size,
        test_window: params.test_window,
        stopping: config.stopping.clone(),
        changepoints,
        status: ScenarioStatus::Analyzed,
        diagnostics,
    };
    debug!(
        scenario = %result.label,
        n = result.n,
        window_size = result.window_size,
        detected = result.changepoints.len(),
        significant = result.n_significant(),
        "scenario analyzed"
    );
    Ok(result)
}

fn segment_series(
    values: &[f64],
    params: ResolvedParams,
    config: &AnalysisConfig,
) -> Result<Segmentation, CpdError> {
    let window_config = SlidingWindowConfig {
        stopping: config.stopping.clone(),
        window_size: params.window_size,
        params_per_segment: 0,
    };
    match config.cost {
        CostKind::L2 => detect_with(CostL2Mean::default(), window_config, values),
        CostKind::Normal => detect_with(CostNormalMeanVar::default(), window_config, values),
    }
}

fn detect_with<C: CostModel>(
    cost_model: C,
    config: SlidingWindowConfig,
    values: &[f64],
) -> Result<Segmentation, CpdError> {
    SlidingWindow::new(cost_model, config)?.detect(values)
}

fn assemble_changepoint(
    series: &Series,
    index: usize,
    tester: &SignificanceTest,
) -> Result<Changepoint, CpdError> {
    let (Some(&time), Some(&concentration)) = (series.time().get(index), series.values().get(index))
    else {
        return Err(CpdError::numerical_issue(format!(
            "changepoint index {index} outside series '{}' of length {}",
            series.label(),
            series.len()
        )));
    };

    let significance = match tester.evaluate(series.values(), index) {
        Ok(outcome) => Significance::Tested(outcome),
        Err(err) if err.is_fatal() => return Err(err),
        Err(err) => Significance::Untestable {
            reason: err.to_string(),
        },
    };

    Ok(Changepoint {
        index,
        time,
        concentration,
        magnitude: tester.mean_shift(series.values(), index),
        significance,
    })
}

fn degraded(
    series: &Series,
    config: &AnalysisConfig,
    params: ResolvedParams,
    err: CpdError,
    started_at: Instant,
) -> ScenarioResult {
    let reason = err.to_string();
    warn!(scenario = %series.label(), n = series.len(), %reason, "scenario degraded");

    ScenarioResult {
        label: series.label().clone(),
        n: series.len(),
        window_size: params.window_size,
        test_window: params.test_window,
        stopping: config.stopping.clone(),
        changepoints: vec![],
        status: ScenarioStatus::Degraded {
            reason: reason.clone(),
        },
        diagnostics: Diagnostics {
            n: series.len(),
            runtime_ms: Some(elapsed_ms(started_at)),
            warnings: vec![reason],
            algorithm: Cow::Borrowed("sliding_window"),
            ..Diagnostics::default()
        },
    }
}

fn elapsed_ms(started_at: Instant) -> u64 {
    u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::analyze;
    use co2cpd_core::{
        AnalysisConfig, CostKind, CpdError, Penalty, ScenarioLabel, ScenarioStatus, Series,
        Significance, Stopping, TTestVariant,
    };
    use co2cpd_eval::{SignificanceTest, evaluate};

    fn series(name: &str, values: Vec<f64>) -> Series {
        let time = (0..values.len()).map(|idx| 2000.0 + idx as f64).collect();
        Series::new(ScenarioLabel::parse(name), time, values).expect("valid series")
    }

    fn two_level(first: f64, second: f64, half: usize) -> Vec<f64> {
        let mut values = vec![first; half];
        values.extend(std::iter::repeat_n(second, half));
        for (idx, value) in values.iter_mut().enumerate() {
            *value += [0.3, -0.1, -0.2, 0.1, -0.1][idx % 5];
        }
        values
    }

    #[test]
    fn detects_and_tests_a_clear_shift() {
        let scenario = series("p3", two_level(420.0, 380.0, 100));
        let config = AnalysisConfig {
            window_size: Some(20),
            ..AnalysisConfig::default()
        };
        let result = analyze(&scenario, &config).expect("analyze");

        assert_eq!(result.status, ScenarioStatus::Analyzed);
        assert_eq!((result.window_size, result.test_window), (20, 20));
        assert_eq!(result.changepoints.len(), 1);
        let cp = &result.changepoints[0];
        assert_eq!(cp.index, 100);
        assert_eq!(cp.time, 2100.0);
        assert_eq!(cp.concentration, scenario.values()[100]);
        let magnitude = cp.magnitude.expect("both sides present");
        assert!((magnitude + 40.0).abs() < 1e-9, "magnitude={magnitude}");
        assert!(cp.is_significant());
        assert!(cp.significance.statistic() > 0.0);
        assert_eq!(result.diagnostics.cost_model, "l2_mean");
    }

    #[test]
    fn test_samples_skip_the_detection_windows_by_default() {
        let scenario = series("p3", two_level(420.0, 380.0, 100));
        let config = AnalysisConfig {
            window_size: Some(20),
            test_window: Some(10),
            ..AnalysisConfig::default()
        };
        let gapped = analyze(&scenario, &config).expect("analyze");
        assert!(gapped.diagnostics.notes[0].contains("test_gap=20"));
        let expected = SignificanceTest::new(10, 0.05, TTestVariant::Welch)
            .expect("test")
            .with_gap(20)
            .evaluate(scenario.values(), 100)
            .expect("evaluate");
        assert_eq!(
            gapped.changepoints[0].significance,
            Significance::Tested(expected)
        );

        let adjacent = analyze(
            &scenario,
            &AnalysisConfig {
                test_gap: Some(0),
                ..config
            },
        )
        .expect("analyze");
        assert!(adjacent.diagnostics.notes[0].contains("test_gap=0"));
        let expected = evaluate(scenario.values(), 100, 10, 0.05, TTestVariant::Welch)
            .expect("evaluate");
        assert_eq!(
            adjacent.changepoints[0].significance,
            Significance::Tested(expected)
        );
    }

    #[test]
    fn auto_window_is_resolved_per_series() {
        let scenario = series("p1", two_level(400.0, 390.0, 100));
        let result = analyze(&scenario, &AnalysisConfig::default()).expect("analyze");
        assert_eq!(result.window_size, 10);
        assert_eq!(result.test_window, 10);
    }

    #[test]
    fn short_series_degrades_instead_of_failing() {
        let scenario = series("p2", vec![400.0, 399.0, 398.0, 397.0, 396.0]);
        let config = AnalysisConfig {
            window_size: Some(5),
            ..AnalysisConfig::default()
        };
        let result = analyze(&scenario, &config).expect("degraded, not failed");
        assert!(result.is_degraded());
        assert!(result.changepoints.is_empty());
        let reason = result.degraded_reason().expect("reason");
        assert!(reason.contains("insufficient data"), "{reason}");
        assert_eq!(result.diagnostics.warnings, vec![reason.to_string()]);
    }

    #[test]
    fn narrow_test_window_marks_changepoints_untestable() {
        let scenario = series("p4", two_level(420.0, 380.0, 50));
        let config = AnalysisConfig {
            window_size: Some(10),
            test_window: Some(1),
            ..AnalysisConfig::default()
        };
        let result = analyze(&scenario, &config).expect("analyze");
        assert_eq!(result.status, ScenarioStatus::Analyzed);
        assert_eq!(result.changepoints.len(), 1);
        let cp = &result.changepoints[0];
        assert!(matches!(cp.significance, Significance::Untestable { .. }));
        assert!(!cp.is_significant());
        assert!(cp.significance.statistic().is_nan());
        assert!(cp.magnitude.is_some());
        assert_eq!(result.diagnostics.warnings.len(), 1);
    }

    #[test]
    fn invalid_configuration_is_fatal() {
        let scenario = series("p1", two_level(400.0, 390.0, 50));
        let config = AnalysisConfig {
            significance_level: 1.5,
            ..AnalysisConfig::default()
        };
        let err = analyze(&scenario, &config).expect_err("invalid level");
        assert!(matches!(err, CpdError::InvalidParameter(_)));
    }

    #[test]
    fn zero_changepoints_requested_is_not_degraded() {
        let scenario = series("p1", vec![400.0, 399.0, 398.0]);
        let config = AnalysisConfig {
            window_size: Some(10),
            stopping: Stopping::KnownK(0),
            ..AnalysisConfig::default()
        };
        let result = analyze(&scenario, &config).expect("analyze");
        assert_eq!(result.status, ScenarioStatus::Analyzed);
        assert!(result.changepoints.is_empty());
    }

    #[test]
    fn normal_cost_and_penalized_stopping_are_supported() {
        let scenario = series("p6", two_level(420.0, 380.0, 100));
        let config = AnalysisConfig {
            window_size: Some(20),
            stopping: Stopping::Penalized(Penalty::BIC),
            cost: CostKind::Normal,
            ..AnalysisConfig::default()
        };
        let result = analyze(&scenario, &config).expect("analyze");
        assert_eq!(result.diagnostics.cost_model, "normal_mean_var");
        assert!(result.changepoints.iter().any(|cp| cp.index.abs_diff(100) <= 2));
    }
}
