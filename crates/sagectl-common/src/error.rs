use thiserror::Error as ThisError;

/// Failure taxonomy shared by every control-plane operation.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// Network, auth, throttling or validation failure reported by the hosting API.
    #[error("{operation} failed: {code}: {message}")]
    RemoteService {
        operation: String,
        code: String,
        message: String,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: String, name: String },

    /// Bad or missing local input (arguments, credentials, catalog data).
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub fn remote(
        operation: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::RemoteService {
            operation: operation.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
