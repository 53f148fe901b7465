// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Error taxonomy shared by the co2cpd crates.
///
/// `InvalidParameter` and `DataFormat` abort a run before any scenario is
/// analyzed. The remaining variants are recovered by the analyzer and turn
/// into flagged, partial results.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CpdError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("insufficient data: series has {n} observations, window requires at least {required}")]
    InsufficientData { n: usize, required: usize },
    #[error(
        "insufficient sample: need at least 2 observations on each side, got before={before}, after={after}"
    )]
    InsufficientSample { before: usize, after: usize },
    #[error("data format error: {0}")]
    DataFormat(String),
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl CpdError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }

    pub fn insufficient_data(n: usize, required: usize) -> Self {
        Self::InsufficientData { n, required }
    }

    pub fn insufficient_sample(before: usize, after: usize) -> Self {
        Self::InsufficientSample { before, after }
    }

    pub fn data_format(message: impl Into<String>) -> Self {
        Self::DataFormat(message.into())
    }

    pub fn numerical_issue(message: impl Into<String>) -> Self {
        Self::NumericalIssue(message.into())
    }

    /// Returns true for errors that must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidParameter(_) | Self::DataFormat(_))
    }
}

#[cfg(test)]
mod tests {
    use super::CpdError;

    #[test]
    fn constructors_map_to_expected_variants() {
        assert!(matches!(
            CpdError::invalid_parameter("window_size"),
            CpdError::InvalidParameter(_)
        ));
        assert!(matches!(
            CpdError::data_format("ragged row"),
            CpdError::DataFormat(_)
        ));
        assert!(matches!(
            CpdError::numerical_issue("nan"),
            CpdError::NumericalIssue(_)
        ));
        assert_eq!(
            CpdError::insufficient_data(10, 20),
            CpdError::InsufficientData { n: 10, required: 20 }
        );
        assert_eq!(
            CpdError::insufficient_sample(1, 3),
            CpdError::InsufficientSample {
                before: 1,
                after: 3
            }
        );
    }

    #[test]
    fn only_configuration_and_format_errors_are_fatal() {
        assert!(CpdError::invalid_parameter("x").is_fatal());
        assert!(CpdError::data_format("x").is_fatal());
        assert!(!CpdError::insufficient_data(1, 4).is_fatal());
        assert!(!CpdError::insufficient_sample(0, 5).is_fatal());
        assert!(!CpdError::numerical_issue("x").is_fatal());
    }

    #[test]
    fn display_messages_carry_context() {
        let err = CpdError::insufficient_data(7, 100);
        assert!(err.to_string().contains("7 observations"));
        assert!(err.to_string().contains("at least 100"));

        let err = CpdError::insufficient_sample(1, 4);
        assert!(err.to_string().contains("before=1, after=4"));
    }
}
