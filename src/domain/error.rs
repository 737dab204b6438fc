//! Domain error types.

/// Top-level error type for tradejournal.
#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("{message}")]
    Validation { field: String, message: String },

    #[error("{resource} not found")]
    NotFound { resource: &'static str },

    #[error("{reason}")]
    Authentication { reason: String },

    #[error("{message}")]
    Conflict { field: String, message: String },

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

    #[error("password hashing failed: {reason}")]
    PasswordHash { reason: String },

    #[error("import failed at line {line}: {reason}")]
    Import { line: u64, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl JournalError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        JournalError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn conflict(field: impl Into<String>, message: impl Into<String>) -> Self {
        JournalError::Conflict {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn authentication(reason: impl Into<String>) -> Self {
        JournalError::Authentication {
            reason: reason.into(),
        }
    }

    /// Field name carried by validation and conflict errors.
    pub fn field(&self) -> Option<&str> {
        match self {
            JournalError::Validation { field, .. } | JournalError::Conflict { field, .. } => {
                Some(field)
            }
            _ => None,
        }
    }

    /// True for failures the caller caused, as opposed to storage or I/O faults.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            JournalError::Validation { .. }
                | JournalError::NotFound { .. }
                | JournalError::Authentication { .. }
                | JournalError::Conflict { .. }
                | JournalError::Import { .. }
        )
    }
}

impl From<&JournalError> for std::process::ExitCode {
    fn from(err: &JournalError) -> Self {
        let code: u8 = match err {
            JournalError::Io(_) | JournalError::PasswordHash { .. } => 1,
            JournalError::ConfigParse { .. }
            | JournalError::ConfigMissing { .. }
            | JournalError::ConfigInvalid { .. } => 2,
            JournalError::Database { .. } | JournalError::DatabaseQuery { .. } => 3,
            JournalError::Validation { .. }
            | JournalError::NotFound { .. }
            | JournalError::Authentication { .. }
            | JournalError::Conflict { .. } => 4,
            JournalError::Import { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
