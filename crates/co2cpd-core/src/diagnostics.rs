// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use std::borrow::Cow;

/// Diagnostics schema version for scenario run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// Structured diagnostics captured while analyzing one scenario.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostics {
    pub n: usize,
    pub schema_version: u32,
    pub runtime_ms: Option<u64>,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
    pub algorithm: Cow<'static, str>,
    pub cost_model: Cow<'static, str>,
    pub cost_evals: Option<usize>,
    pub peaks_considered: Option<usize>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            runtime_ms: None,
            notes: vec![],
            warnings: vec![],
            algorithm: Cow::Borrowed(""),
            cost_model: Cow::Borrowed(""),
            cost_evals: None,
            peaks_considered: None,
        }
    }
}

impl Diagnostics {
    /// Appends notes and warnings from a nested stage.
    pub fn absorb(&mut self, other: Diagnostics) {
        self.notes.extend(other.notes);
        self.warnings.extend(other.warnings);
        if self.algorithm.is_empty() {
            self.algorithm = other.algorithm;
        }
        if self.cost_model.is_empty() {
            self.cost_model = other.cost_model;
        }
        self.cost_evals = self.cost_evals.or(other.cost_evals);
        self.peaks_considered = self.peaks_considered.or(other.peaks_considered);
    }
}
