//! Error types for the typecast core library
//!
//! Fatal conditions live here. Recoverable validation findings are not errors:
//! they are [`Diagnostic`](crate::types::Diagnostic) values that drive the
//! repair loop and surface through `TranslationOutcome::Failed`.

use thiserror::Error;

/// Main error type for typecast operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema generation cannot represent the shape graph
    #[error("Unsupported shape: {message}")]
    UnsupportedShape {
        message: String,
        shape: Option<String>,
    },

    /// A vocabulary was registered twice under the same name
    #[error("Duplicate vocabulary: '{name}' is already registered")]
    DuplicateVocabulary { name: String },

    /// A shape referenced a vocabulary that was never registered
    #[error("Unknown vocabulary: '{name}' is not registered")]
    UnknownVocabulary { name: String },

    /// Failure raised by the language-model backend, propagated verbatim
    #[error("Backend error: {backend} - {message}")]
    Backend {
        backend: String,
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The request was cancelled by the caller
    #[error("Translation cancelled")]
    Cancelled,

    /// JSON serialization errors outside the validation path
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Backend configuration errors (missing credentials, bad endpoint)
    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Construct a backend error with a plain message
    pub fn backend(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Backend {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnknownVocabulary {
            name: "sentiment".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unknown vocabulary: 'sentiment' is not registered"
        );
    }

    #[test]
    fn test_backend_helper() {
        let err = Error::backend("openai", "connection refused");
        assert!(err.to_string().contains("openai"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_json_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json { .. }));
    }
}
