// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::CpdError;
use std::cmp::Ordering;
use std::fmt;

const PGC_SUFFIX: &str = "pgc";
const THOUSAND_PGC_PREFIX: char = 'p';
const THOUSAND: f64 = 1000.0;

/// Scenario identifier: the column header of the input table plus the
/// release magnitude (PgC) it encodes, when it encodes one.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ScenarioLabel {
    pub name: String,
    pub magnitude_pgc: Option<f64>,
}

impl ScenarioLabel {
    pub fn new(name: impl Into<String>, magnitude_pgc: Option<f64>) -> Self {
        Self {
            name: name.into(),
            magnitude_pgc,
        }
    }

    /// Parses a column header.
    ///
    /// Recognised forms are a plain number (`"3000"`), a number with a PgC
    /// suffix (`"3000PgC"`, `"3,000 PgC"`) and the `p<k>` shorthand for
    /// `k` thousand PgC (`"p3"`). Anything else keeps `magnitude_pgc = None`.
    pub fn parse(header: &str) -> Self {
        let name = header.trim().to_string();
        let magnitude_pgc = parse_magnitude(&name);
        Self {
            name,
            magnitude_pgc,
        }
    }

    /// Human-readable label used in reports and plot titles.
    pub fn display_name(&self) -> String {
        match self.magnitude_pgc {
            Some(magnitude) => format!("{} PgC", format_magnitude(magnitude)),
            None => self.name.clone(),
        }
    }

    /// Canonical ordering: known magnitudes ascending, unknown magnitudes
    /// last, then by header text.
    pub fn canonical_cmp(&self, other: &Self) -> Ordering {
        let by_magnitude = match (self.magnitude_pgc, other.magnitude_pgc) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        };
        by_magnitude.then_with(|| self.name.cmp(&other.name))
    }
}

impl fmt::Display for ScenarioLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn parse_magnitude(name: &str) -> Option<f64> {
    let lowered = name.to_ascii_lowercase();
    let numeric = lowered
        .strip_suffix(PGC_SUFFIX)
        .unwrap_or(&lowered)
        .trim()
        .replace([',', '_'], "");

    if let Ok(value) = numeric.parse::<f64>()
        && value.is_finite()
        && value >= 0.0
    {
        return Some(value);
    }

    let thousands = lowered.strip_prefix(THOUSAND_PGC_PREFIX)?.parse::<u32>().ok()?;
    Some(f64::from(thousands) * THOUSAND)
}

fn format_magnitude(magnitude: f64) -> String {
    if magnitude.fract() != 0.0 || magnitude.abs() >= 1.0e15 {
        return format!("{magnitude}");
    }

    let digits = format!("{}", magnitude.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx).is_multiple_of(3) {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if magnitude < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// One scenario's concentration series over a strictly increasing time axis.
///
/// Construction validates the invariants; the fields are private so a
/// `Series` cannot change after it is built.
#[derive(Clone, Debug, PartialEq)]
pub struct Series {
    label: ScenarioLabel,
    time: Vec<f64>,
    values: Vec<f64>,
}

impl Series {
    pub fn new(label: ScenarioLabel, time: Vec<f64>, values: Vec<f64>) -> Result<Self, CpdError> {
        if values.is_empty() {
            return Err(CpdError::data_format(format!(
                "series '{label}' must contain at least one observation"
            )));
        }
        if time.len() != values.len() {
            return Err(CpdError::data_format(format!(
                "series '{label}' length mismatch: time has {}, values has {}",
                time.len(),
                values.len()
            )));
        }
        if let Some((idx, t)) = time.iter().copied().enumerate().find(|(_, t)| !t.is_finite()) {
            return Err(CpdError::data_format(format!(
                "series '{label}' has non-finite time {t} at row {idx}"
            )));
        }
        if let Some(idx) = time.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(CpdError::data_format(format!(
                "series '{label}' time must be strictly increasing: t[{}]={} is not after t[{idx}]={}",
                idx + 1,
                time[idx + 1],
                time[idx]
            )));
        }
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(CpdError::data_format(format!(
                "series '{label}' has missing or non-finite value {value} at row {idx}"
            )));
        }

        Ok(Self {
            label,
            time,
            values,
        })
    }

    pub fn label(&self) -> &ScenarioLabel {
        &self.label
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Owns every scenario series of a run, in input column order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SeriesStore {
    series: Vec<Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from one shared time axis and per-scenario columns.
    pub fn from_columns(
        time: &[f64],
        columns: impl IntoIterator<Item = (ScenarioLabel, Vec<f64>)>,
    ) -> Result<Self, CpdError> {
        let mut store = Self::new();
        for (label, values) in columns {
            store.insert(Series::new(label, time.to_vec(), values)?)?;
        }
        Ok(store)
    }

    /// Adds a series; scenario names must be unique.
    pub fn insert(&mut self, series: Series) -> Result<(), CpdError> {
        if self.get(&series.label.name).is_some() {
            return Err(CpdError::data_format(format!(
                "duplicate scenario '{}'",
                series.label
            )));
        }
        self.series.push(series);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Series> {
        self.series.iter().find(|series| series.label.name == name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Series> {
        self.series.iter()
    }

    pub fn as_slice(&self) -> &[Series] {
        &self.series
    }

    pub fn labels(&self) -> impl Iterator<Item = &ScenarioLabel> {
        self.series.iter().map(Series::label)
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl<'a> IntoIterator for &'a SeriesStore {
    type Item = &'a Series;
    type IntoIter = std::slice::Iter<'a, Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
