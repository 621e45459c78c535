//! Domain error types.

/// Top-level error type for fxwatch.
#[derive(Debug, thiserror::Error)]
pub enum FxError {
    #[error("no rate samples in the requested range")]
    EmptySeries,

    #[error("insufficient data for {view}: have {have} samples, need {minimum}")]
    InsufficientData {
        view: &'static str,
        have: usize,
        minimum: usize,
    },

    #[error("invalid alert rule: {reason}")]
    InvalidRule { reason: String },

    #[error("alert rule {id} not found")]
    RuleNotFound { id: i64 },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

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

    #[error("import error at line {line}: {reason}")]
    Import { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&FxError> for std::process::ExitCode {
    fn from(err: &FxError) -> Self {
        let code: u8 = match err {
            FxError::Io(_) => 1,
            FxError::ConfigParse { .. }
            | FxError::ConfigMissing { .. }
            | FxError::ConfigInvalid { .. } => 2,
            FxError::Database { .. } | FxError::DatabaseQuery { .. } => 3,
            FxError::InvalidRule { .. } | FxError::RuleNotFound { .. } => 4,
            FxError::EmptySeries | FxError::InsufficientData { .. } => 5,
            FxError::Import { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_data_message() {
        let err = FxError::InsufficientData {
            view: "volatility",
            have: 4,
            minimum: 10,
        };
        assert_eq!(
            err.to_string(),
            "insufficient data for volatility: have 4 samples, need 10"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: FxError = io.into();
        assert!(matches!(err, FxError::Io(_)));
    }

    #[test]
    fn config_missing_message() {
        let err = FxError::ConfigMissing {
            section: "sqlite".into(),
            key: "path".into(),
        };
        assert_eq!(err.to_string(), "missing config key [sqlite] path");
    }
}
