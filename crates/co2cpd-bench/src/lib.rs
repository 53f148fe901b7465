// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Deterministic synthetic concentration series for benchmarks.

fn lcg_next(state: &mut u64) -> u64 {
    *state = state
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *state
}

// Uniform in [-0.5, 0.5).
fn jitter(state: &mut u64) -> f64 {
    (lcg_next(state) >> 11) as f64 / (1u64 << 53) as f64 - 0.5
}

/// Exponential decay from `initial` with an abrupt level drop of `drop`
/// at index `step_at`, plus bounded noise of width `noise`.
pub fn decay_with_step(
    n: usize,
    initial: f64,
    step_at: usize,
    drop: f64,
    noise: f64,
    seed: u64,
) -> Vec<f64> {
    let mut state = seed;
    let tau = (n.max(1) as f64) / 3.0;
    (0..n)
        .map(|idx| {
            let level = initial * (-(idx as f64) / tau).exp();
            let shift = if idx >= step_at { drop } else { 0.0 };
            level - shift + noise * jitter(&mut state)
        })
        .collect()
}

/// Time axis `1..=n` in years.
pub fn yearly_time(n: usize) -> Vec<f64> {
    (1..=n).map(|t| t as f64).collect()
}
