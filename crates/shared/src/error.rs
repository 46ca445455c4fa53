//! Application-wide error types.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Errors raised while booting a binary, before any request is served.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The database could not be reached.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AppError::Configuration("missing field `url`".into()), "Configuration error: missing field `url`")]
    #[case(AppError::Database("connection refused".into()), "Database error: connection refused")]
    fn test_error_display(#[case] err: AppError, #[case] expected: &str) {
        assert_eq!(err.to_string(), expected);
    }

    #[test]
    fn test_config_error_converts() {
        let err: AppError = config::ConfigError::NotFound("database.url".into()).into();
        assert!(matches!(err, AppError::Configuration(ref m) if m.contains("database.url")));
    }
}
