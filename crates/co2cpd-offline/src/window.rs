// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use co2cpd_core::{CpdError, Diagnostics, Penalty, Stopping, penalty_value, validate_stopping};
use co2cpd_costs::{CostL2Mean, CostModel};
use std::borrow::Cow;
use std::time::Instant;

const AUTO_PARAMS_PER_SEGMENT: usize = 0;
const DEFAULT_WINDOW_SIZE: usize = 10;

/// Configuration for [`SlidingWindow`].
///
/// `window_size` is the width of each of the two adjacent windows, so a
/// candidate boundary `i` compares `[i − w, i)` against `[i, i + w)`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct SlidingWindowConfig {
    pub stopping: Stopping,
    pub window_size: usize,
    pub params_per_segment: usize,
}

impl Default for SlidingWindowConfig {
    fn default() -> Self {
        Self {
            stopping: Stopping::default(),
            window_size: DEFAULT_WINDOW_SIZE,
            params_per_segment: AUTO_PARAMS_PER_SEGMENT,
        }
    }
}

impl SlidingWindowConfig {
    fn validate(&self) -> Result<(), CpdError> {
        validate_stopping(&self.stopping)?;

        if self.window_size == 0 {
            return Err(CpdError::invalid_parameter(
                "SlidingWindowConfig.window_size must be >= 1; got 0",
            ));
        }
        Ok(())
    }

    fn required_len(&self) -> Result<usize, CpdError> {
        self.window_size.checked_mul(2).ok_or_else(|| {
            CpdError::invalid_parameter(format!(
                "SlidingWindowConfig.window_size={} overflows the required series length",
                self.window_size
            ))
        })
    }
}

/// Window discrepancy at one candidate boundary.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CandidateScore {
    pub split: usize,
    pub score: f64,
}

/// Output of [`SlidingWindow::detect`].
#[derive(Clone, Debug, PartialEq)]
pub struct Segmentation {
    /// Ascending changepoint indices, pairwise at least `window_size` apart.
    pub change_points: Vec<usize>,
    /// Score curve over every candidate in `[w, n − w]`.
    pub scores: Vec<CandidateScore>,
    pub diagnostics: Diagnostics,
}

/// Sliding-window local discrepancy segmenter.
#[derive(Debug)]
pub struct SlidingWindow<C: CostModel> {
    cost_model: C,
    config: SlidingWindowConfig,
}

impl<C: CostModel> SlidingWindow<C> {
    pub fn new(cost_model: C, config: SlidingWindowConfig) -> Result<Self, CpdError> {
        config.validate()?;
        Ok(Self { cost_model, config })
    }

    pub fn cost_model(&self) -> &C {
        &self.cost_model
    }

    pub fn config(&self) -> &SlidingWindowConfig {
        &self.config
    }

    /// Changepoint indices only.
    pub fn segment(&self, values: &[f64]) -> Result<Vec<usize>, CpdError> {
        Ok(self.detect(values)?.change_points)
    }

    pub fn detect(&self, values: &[f64]) -> Result<Segmentation, CpdError> {
        self.config.validate()?;

        let started_at = Instant::now();
        let n = values.len();
        let window_size = self.config.window_size;
        let mut notes = vec![format!("window_size={window_size}")];
        let mut warnings = vec![];

        if self.config.stopping == Stopping::KnownK(0) {
            notes.push("stopping=KnownK(0); scoring skipped".to_string());
            return Ok(Segmentation {
                change_points: vec![],
                scores: vec![],
                diagnostics: self.diagnostics(n, started_at, notes, warnings, &RuntimeStats::default()),
            });
        }

        let required = self.config.required_len()?;
        if n < required {
            return Err(CpdError::insufficient_data(n, required));
        }

        let cache = self.cost_model.precompute(values)?;
        let mut runtime = RuntimeStats::default();
        let scores = compute_candidate_scores(&self.cost_model, &cache, n, window_size, &mut runtime)?;

        let mut ranked_candidates = extract_peaks(&scores);
        runtime.peaks_considered = ranked_candidates.len();
        rank_candidates(&mut ranked_candidates);

        let change_points = match &self.config.stopping {
            Stopping::KnownK(k) => {
                notes.push(format!("stopping=KnownK({k})"));
                let selected = select_known_k(&ranked_candidates, window_size, n, *k)?;
                if selected.len() < *k {
                    warnings.push(format!(
                        "KnownK({k}) requested but only {} admissible peaks were found among {} candidates",
                        selected.len(),
                        scores.len()
                    ));
                }
                selected
            }
            Stopping::Penalized(penalty) => {
                let (params_per_segment, params_source) = self.resolve_params_per_segment();
                let beta = penalty_value(penalty, n, params_per_segment)?;
                notes.push(format!(
                    "stopping=Penalized({}), beta={beta}, params_per_segment={params_per_segment} ({params_source})",
                    penalty_name(penalty)
                ));
                select_penalized(&ranked_candidates, window_size, n, beta)?
            }
        };

        notes.push(format!(
            "final_change_count={}, cost_evals={}, candidates_considered={}, peak_candidates={}",
            change_points.len(),
            runtime.cost_evals,
            scores.len(),
            runtime.peaks_considered
        ));

        Ok(Segmentation {
            change_points,
            diagnostics: self.diagnostics(n, started_at, notes, warnings, &runtime),
            scores,
        })
    }

    fn resolve_params_per_segment(&self) -> (usize, &'static str) {
        if self.config.params_per_segment == AUTO_PARAMS_PER_SEGMENT {
            (
                self.cost_model.penalty_params_per_segment(),
                "model_default_auto",
            )
        } else {
            (self.config.params_per_segment, "config_override")
        }
    }

    fn diagnostics(
        &self,
        n: usize,
        started_at: Instant,
        notes: Vec<String>,
        warnings: Vec<String>,
        runtime: &RuntimeStats,
    ) -> Diagnostics {
        Diagnostics {
            n,
            runtime_ms: Some(u64::try_from(started_at.elapsed().as_millis()).unwrap_or(u64::MAX)),
            notes,
            warnings,
            algorithm: Cow::Borrowed("sliding_window"),
            cost_model: Cow::Borrowed(self.cost_model.name()),
            cost_evals: Some(runtime.cost_evals),
            peaks_considered: Some(runtime.peaks_considered),
            ..Diagnostics::default()
        }
    }
}

/// Segments `values` with the L2 window cost.
///
/// Returns ascending indices in `[window_size, n − window_size]`, pairwise
/// separated by at least `window_size`. `Stopping::KnownK(0)` always yields
/// an empty vector.
pub fn segment(
    values: &[f64],
    window_size: usize,
    stopping: Stopping,
) -> Result<Vec<usize>, CpdError> {
    SlidingWindow::new(
        CostL2Mean::default(),
        SlidingWindowConfig {
            stopping,
            window_size,
            params_per_segment: AUTO_PARAMS_PER_SEGMENT,
        },
    )?
    .segment(values)
}

fn penalty_name(penalty: &Penalty) -> String {
    match penalty {
        Penalty::BIC => "BIC".to_string(),
        Penalty::AIC => "AIC".to_string(),
        Penalty::Manual(beta) => format!("Manual({beta})"),
    }
}

#[derive(Default, Clone, Copy, Debug)]
struct RuntimeStats {
    cost_evals: usize,
    peaks_considered: usize,
}

fn checked_counter_increment(counter: &mut usize, name: &str) -> Result<(), CpdError> {
    *counter = counter
        .checked_add(1)
        .ok_or_else(|| CpdError::numerical_issue(format!("{name} counter overflow")))?;
    Ok(())
}

fn evaluate_segment_cost<C: CostModel>(
    model: &C,
    cache: &C::Cache,
    start: usize,
    end: usize,
    runtime: &mut RuntimeStats,
) -> Result<f64, CpdError> {
    checked_counter_increment(&mut runtime.cost_evals, "cost_evals")?;

    let segment_cost = model.segment_cost(cache, start, end);
    if !segment_cost.is_finite() {
        return Err(CpdError::numerical_issue(format!(
            "non-finite segment cost at [{start}, {end}): {segment_cost}"
        )));
    }
    Ok(segment_cost)
}

fn compute_candidate_scores<C: CostModel>(
    model: &C,
    cache: &C::Cache,
    n: usize,
    window_size: usize,
    runtime: &mut RuntimeStats,
) -> Result<Vec<CandidateScore>, CpdError> {
    let last = n - window_size;
    let mut out = Vec::with_capacity(last + 1 - window_size);

    for split in window_size..=last {
        let start = split - window_size;
        let end = split + window_size;

        let whole_cost = evaluate_segment_cost(model, cache, start, end, runtime)?;
        let left_cost = evaluate_segment_cost(model, cache, start, split, runtime)?;
        let right_cost = evaluate_segment_cost(model, cache, split, end, runtime)?;
        let score = whole_cost - left_cost - right_cost;
        if !score.is_finite() {
            return Err(CpdError::numerical_issue(format!(
                "non-finite score at split={split}, window=[{start}, {end}): whole={whole_cost}, left={left_cost}, right={right_cost}, score={score}"
            )));
        }

        out.push(CandidateScore { split, score });
    }

    Ok(out)
}

fn extract_peaks(scores: &[CandidateScore]) -> Vec<CandidateScore> {
    if scores.is_empty() {
        return vec![];
    }

    let mut peaks = Vec::with_capacity(scores.len());
    for idx in 0..scores.len() {
        let current = scores[idx];
        let left_ok = idx == 0 || current.score > scores[idx - 1].score;
        let right_ok = idx + 1 == scores.len() || current.score >= scores[idx + 1].score;
        if left_ok && right_ok {
            peaks.push(current);
        }
    }

    if peaks.is_empty() {
        scores.to_vec()
    } else {
        peaks
    }
}

fn rank_candidates(scores: &mut [CandidateScore]) {
    scores.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| left.split.cmp(&right.split))
    });
}

fn can_insert_split(selected: &[usize], split: usize, min_separation: usize, n: usize) -> bool {
    match selected.binary_search(&split) {
        Ok(_) => false,
        Err(insert_idx) => {
            let prev = if insert_idx == 0 {
                0
            } else {
                selected[insert_idx - 1]
            };
            let next = if insert_idx == selected.len() {
                n
            } else {
                selected[insert_idx]
            };
            split.saturating_sub(prev) >= min_separation
                && next.saturating_sub(split) >= min_separation
        }
    }
}

fn insert_sorted_unique(values: &mut Vec<usize>, value: usize) -> Result<(), CpdError> {
    match values.binary_search(&value) {
        Ok(_) => Err(CpdError::numerical_issue(format!(
            "duplicate split selected at {value}; internal SlidingWindow state is inconsistent"
        ))),
        Err(idx) => {
            values.insert(idx, value);
            Ok(())
        }
    }
}

fn select_known_k(
    ranked_candidates: &[CandidateScore],
    min_separation: usize,
    n: usize,
    k: usize,
) -> Result<Vec<usize>, CpdError> {
    let mut selected = Vec::with_capacity(k);
    for candidate in ranked_candidates {
        if selected.len() == k {
            break;
        }
        if can_insert_split(&selected, candidate.split, min_separation, n) {
            insert_sorted_unique(&mut selected, candidate.split)?;
        }
    }
    Ok(selected)
}

fn select_penalized(
    ranked_candidates: &[CandidateScore],
    min_separation: usize,
    n: usize,
    beta: f64,
) -> Result<Vec<usize>, CpdError> {
    let mut selected = vec![];
    for candidate in ranked_candidates {
        if candidate.score <= beta {
            break;
        }
        if can_insert_split(&selected, candidate.split, min_separation, n) {
            insert_sorted_unique(&mut selected, candidate.split)?;
        }
    }
    Ok(selected)
}
