//! Domain error types.
//!
//! Only malformed input aborts a call. Short series and degenerate ratios are
//! reported as undefined (`None`) values instead of errors.

/// Top-level error type for quantcore.
#[derive(Debug, thiserror::Error)]
pub enum QuantError {
    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("insufficient data: need {required} bars, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("data source error: {reason}")]
    DataSource { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl QuantError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        QuantError::InvalidInput {
            reason: reason.into(),
        }
    }
}

impl From<&QuantError> for std::process::ExitCode {
    fn from(err: &QuantError) -> Self {
        let code: u8 = match err {
            QuantError::Io(_) => 1,
            QuantError::ConfigParse { .. }
            | QuantError::ConfigMissing { .. }
            | QuantError::ConfigInvalid { .. } => 2,
            QuantError::DataSource { .. } => 3,
            QuantError::InvalidInput { .. } => 4,
            QuantError::InsufficientData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_helper_builds_invalid_input() {
        let err = QuantError::invalid("duplicate date 2024-01-02");
        assert!(matches!(err, QuantError::InvalidInput { .. }));
        assert_eq!(
            err.to_string(),
            "invalid input: duplicate date 2024-01-02"
        );
    }

    #[test]
    fn insufficient_data_message() {
        let err = QuantError::InsufficientData {
            required: 1,
            available: 0,
        };
        assert_eq!(err.to_string(), "insufficient data: need 1 bars, have 0");
    }

    #[test]
    fn config_invalid_message() {
        let err = QuantError::ConfigInvalid {
            section: "risk".into(),
            key: "confidence".into(),
            reason: "must be between 0 and 1".into(),
        };
        assert_eq!(
            err.to_string(),
            "invalid config value [risk] confidence: must be between 0 and 1"
        );
    }
}
