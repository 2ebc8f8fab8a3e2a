use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Source file not found: {path}")]
    SourceNotFound { path: String },

    #[error("Source unavailable ({origin}): {reason}")]
    SourceUnavailable { origin: String, reason: String },

    #[error("Malformed source payload ({origin}): {reason}")]
    SourceMalformed { origin: String, reason: String },

    #[error("Failed to write table '{table}': {reason}")]
    SinkWriteError { table: String, reason: String },

    #[error("Table '{table}' not found in {location}")]
    TableNotFound { location: String, table: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("Background task failed: {0}")]
    TaskError(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value for '{field}': '{value}' ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Source,
    Sink,
    Verify,
    Config,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::SourceNotFound { .. }
            | EtlError::SourceUnavailable { .. }
            | EtlError::SourceMalformed { .. } => ErrorCategory::Source,
            EtlError::SinkWriteError { .. } => ErrorCategory::Sink,
            EtlError::TableNotFound { .. } => ErrorCategory::Verify,
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorCategory::Config,
            EtlError::DatabaseError(_)
            | EtlError::TaskError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 遠端暫時不可用，稍後重試即可
            EtlError::SourceUnavailable { .. } => ErrorSeverity::Medium,
            EtlError::TableNotFound { .. } => ErrorSeverity::Medium,
            EtlError::SourceNotFound { .. }
            | EtlError::SourceMalformed { .. }
            | EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            EtlError::SinkWriteError { .. }
            | EtlError::DatabaseError(_)
            | EtlError::TaskError(_)
            | EtlError::IoError(_)
            | EtlError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            EtlError::SourceNotFound { path } => {
                format!("Check that '{}' exists and the path is relative to the working directory", path)
            }
            EtlError::SourceUnavailable { .. } => {
                "Check network connectivity and the endpoint URL, then re-run".to_string()
            }
            EtlError::SourceMalformed { .. } => {
                "The source must be a JSON array of objects or a CSV file with a header row".to_string()
            }
            EtlError::SinkWriteError { .. } => {
                "Check that the database file is writable and not locked by another process".to_string()
            }
            EtlError::TableNotFound { .. } => {
                "Run the pipeline at least once before verifying".to_string()
            }
            EtlError::ConfigError { .. }
            | EtlError::MissingConfigError { .. }
            | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and try again".to_string()
            }
            EtlError::DatabaseError(_) => "Inspect the database file for corruption".to_string(),
            EtlError::TaskError(_) => "Re-run the pipeline; the worker thread was interrupted".to_string(),
            EtlError::IoError(_) => "Check file permissions and available disk space".to_string(),
            EtlError::SerializationError(_) => "Check the data format".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Source => format!("Could not read source data: {}", self),
            ErrorCategory::Sink => format!("Could not load data into the database: {}", self),
            ErrorCategory::Verify => format!("Verification failed: {}", self),
            ErrorCategory::Config => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("Unexpected system error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = EtlError::SourceNotFound {
            path: "data/update.csv".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Source);
        assert_eq!(err.severity(), ErrorSeverity::High);
        assert!(err.recovery_suggestion().contains("data/update.csv"));

        let err = EtlError::TableNotFound {
            location: "users.db".to_string(),
            table: "registered_users".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Verify);
        assert!(err.user_friendly_message().starts_with("Verification failed"));
    }
}
