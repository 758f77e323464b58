/// Centralized error types for deepfix using thiserror
///
/// Analysis never raises: parse, resolution and filesystem failures degrade into
/// ordinary data. The only errors that leave the crate come from configuration,
/// input validation and the model transport.
use thiserror::Error;

/// Main error type for deepfix
#[derive(Error, Debug)]
pub enum DeepfixError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by the model-call boundary
#[derive(Error, Debug, Clone)]
pub enum ModelError {
    #[error("Quota or overload on model '{model}': {message}")]
    Quota { model: String, message: String },

    #[error("Request to model '{model}' failed: {message}")]
    RequestFailed { model: String, message: String },

    #[error("Model '{model}' returned an unusable response: {message}")]
    InvalidResponse { model: String, message: String },

    #[error("No API keys configured")]
    NoApiKeys,

    #[error("No models configured")]
    NoModels,
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),

    #[error("Configuration file not found: {0}")]
    FileNotFound(String),
}

/// Errors related to input validation
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Path does not exist: {0}")]
    PathNotFound(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("Unknown language: {0}")]
    UnknownLanguage(String),

    #[error("Empty {0}")]
    Empty(String),
}

/// Markers that identify a quota, rate-limit or overload failure in error text
const QUOTA_MARKERS: &[&str] = &[
    "429",
    "quota",
    "rate limit",
    "resource exhausted",
    "resource_exhausted",
    "503",
    "overloaded",
];

/// Check whether an error message describes a quota or overload condition
pub fn is_quota_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    QUOTA_MARKERS.iter().any(|marker| lower.contains(marker))
}

impl ModelError {
    /// Classify a transport failure message into a quota or generic error
    pub fn classify(model: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        if is_quota_message(&message) {
            ModelError::Quota {
                model: model.to_string(),
                message,
            }
        } else {
            ModelError::RequestFailed {
                model: model.to_string(),
                message,
            }
        }
    }

    /// Quota and overload failures are retried with rotation or backoff
    pub fn is_quota(&self) -> bool {
        matches!(self, ModelError::Quota { .. })
    }

    /// The raw message carried by this error, if any
    pub fn message(&self) -> &str {
        match self {
            ModelError::Quota { message, .. }
            | ModelError::RequestFailed { message, .. }
            | ModelError::InvalidResponse { message, .. } => message,
            ModelError::NoApiKeys | ModelError::NoModels => "",
        }
    }
}

// Conversion from anyhow::Error to DeepfixError
impl From<anyhow::Error> for DeepfixError {
    fn from(err: anyhow::Error) -> Self {
        DeepfixError::Other(format!("{:#}", err))
    }
}

// Helper methods for DeepfixError
impl DeepfixError {
    /// Create a new error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        DeepfixError::Other(msg.into())
    }

    /// Check if this is a user error (validation, bad config) vs system error
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            DeepfixError::Validation(_) | DeepfixError::Config(ConfigError::InvalidValue { .. })
        )
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(self, DeepfixError::Model(err) if err.is_quota())
            || matches!(self, DeepfixError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DeepfixError::Validation(ValidationError::PathNotFound("/test".to_string()));
        assert_eq!(
            err.to_string(),
            "Validation error: Path does not exist: /test"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: DeepfixError = io_err.into();
        assert!(matches!(err, DeepfixError::Io(_)));
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("test error");
        let err: DeepfixError = anyhow_err.into();
        assert!(matches!(err, DeepfixError::Other(_)));
    }

    #[test]
    fn test_is_user_error() {
        let user_err = DeepfixError::Validation(ValidationError::Empty("log".to_string()));
        assert!(user_err.is_user_error());

        let system_err =
            DeepfixError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "test"));
        assert!(!system_err.is_user_error());
    }

    #[test]
    fn test_classify_quota_messages() {
        for message in [
            "HTTP 429 Too Many Requests",
            "Quota exceeded for project",
            "Rate limit reached",
            "RESOURCE_EXHAUSTED",
            "503 Service Unavailable",
            "The model is overloaded",
        ] {
            let err = ModelError::classify("m", message);
            assert!(err.is_quota(), "expected quota for: {}", message);
        }
    }

    #[test]
    fn test_classify_other_messages() {
        let err = ModelError::classify("m", "400 invalid argument");
        assert!(!err.is_quota());
        assert_eq!(err.message(), "400 invalid argument");
    }

    #[test]
    fn test_is_retryable() {
        let retryable = DeepfixError::Model(ModelError::classify("m", "429"));
        assert!(retryable.is_retryable());

        let not_retryable = DeepfixError::Model(ModelError::classify("m", "bad request"));
        assert!(!not_retryable.is_retryable());
    }

    #[test]
    fn test_config_error_invalid_value() {
        let err = ConfigError::InvalidValue {
            key: "model.max_retries".to_string(),
            reason: "must be greater than 0".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration value for 'model.max_retries': must be greater than 0"
        );
    }
}
