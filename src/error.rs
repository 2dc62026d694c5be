//! Error types for the overlay bridge

use thiserror::Error;

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, RelayError>;

/// Errors that can occur while talking to the platform or starting up
#[derive(Error, Debug)]
pub enum RelayError {
    /// Invalid or missing startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream chat platform call failed
    #[error("Platform error: {0}")]
    Platform(String),

    /// Requested upstream entity does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<twilight_http::Error> for RelayError {
    fn from(err: twilight_http::Error) -> Self {
        use twilight_http::error::ErrorType;

        match err.kind() {
            ErrorType::Response { status, .. } if status.get() == 404 => {
                Self::NotFound(err.to_string())
            }
            _ => Self::Platform(err.to_string()),
        }
    }
}

impl From<twilight_http::response::DeserializeBodyError> for RelayError {
    fn from(err: twilight_http::response::DeserializeBodyError) -> Self {
        Self::Platform(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(RelayError::NotFound("user 1".into()).is_not_found());
        assert!(!RelayError::Platform("boom".into()).is_not_found());
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::Config("Discord token required".into());
        assert_eq!(err.to_string(), "Configuration error: Discord token required");
    }
}
