//! Error types for alttext.
//!
//! Completion failures are normalized into [`CompletionError`] regardless of
//! which vendor produced them, so callers only ever match on one taxonomy.

use thiserror::Error;

/// Top-level error type for alttext operations.
#[derive(Error, Debug)]
pub enum AltTextError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Completion request errors
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Terminal outcome of a failed completion request.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    /// A required provider field, the image, or the prompt is missing.
    /// Raised before any network call is made.
    #[error("Incomplete configuration: {0}")]
    InvalidConfiguration(String),

    /// The provider answered successfully but produced no usable text.
    #[error("No response: the provider returned no content")]
    EmptyResponse,

    /// Network failure or non-2xx HTTP status.
    ///
    /// `status` and `body` are the raw values from the provider when an HTTP
    /// response was received; `partial` holds text already streamed before
    /// the failure.
    #[error("{}", transport_message(.status, .body))]
    Transport {
        status: Option<u16>,
        body: String,
        partial: String,
    },

    /// A single stream event could not be decoded. Skipped inside the stream
    /// reader; never the terminal result of a request.
    #[error("Malformed stream chunk: {0}")]
    MalformedChunk(String),

    /// The caller cancelled the request while it was in flight.
    #[error("Request cancelled")]
    Cancelled { partial: String },

    /// The input image could not be decoded or re-encoded.
    #[error("Image error: {0}")]
    Image(String),
}

fn transport_message(status: &Option<u16>, body: &str) -> String {
    match status {
        Some(code) => format!("HTTP {code}: {body}"),
        None => format!("Request failed: {body}"),
    }
}

impl CompletionError {
    /// Build a transport error from a failure that produced no HTTP response.
    pub(crate) fn network(err: impl std::fmt::Display) -> Self {
        Self::Transport {
            status: None,
            body: err.to_string(),
            partial: String::new(),
        }
    }

    /// Text generated before the request failed or was cancelled, if any.
    pub fn partial_text(&self) -> Option<&str> {
        match self {
            Self::Transport { partial, .. } | Self::Cancelled { partial } if !partial.is_empty() => {
                Some(partial.as_str())
            }
            _ => None,
        }
    }

    /// Attach already-accumulated text to a mid-stream failure.
    pub(crate) fn with_partial(self, text: &str) -> Self {
        match self {
            Self::Transport { status, body, .. } => Self::Transport {
                status,
                body,
                partial: text.to_string(),
            },
            Self::Cancelled { .. } => Self::Cancelled {
                partial: text.to_string(),
            },
            other => other,
        }
    }
}

/// Convenience type alias for alttext results.
pub type Result<T> = std::result::Result<T, AltTextError>;

/// Convenience type alias for completion results.
pub type CompletionResult<T> = std::result::Result<T, CompletionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_display_includes_status_and_body() {
        let err = CompletionError::Transport {
            status: Some(401),
            body: "{\"error\":\"bad key\"}".to_string(),
            partial: String::new(),
        };
        assert_eq!(err.to_string(), "HTTP 401: {\"error\":\"bad key\"}");
    }

    #[test]
    fn test_network_error_has_no_status() {
        let err = CompletionError::network("connection refused");
        assert_eq!(err.to_string(), "Request failed: connection refused");
        assert!(err.partial_text().is_none());
    }

    #[test]
    fn test_partial_text_only_when_non_empty() {
        let err = CompletionError::Cancelled {
            partial: "A ".to_string(),
        };
        assert_eq!(err.partial_text(), Some("A "));

        let err = CompletionError::Cancelled {
            partial: String::new(),
        };
        assert!(err.partial_text().is_none());
        assert!(CompletionError::EmptyResponse.partial_text().is_none());
    }

    #[test]
    fn test_with_partial_leaves_other_kinds_alone() {
        let err = CompletionError::EmptyResponse.with_partial("abc");
        assert_eq!(err, CompletionError::EmptyResponse);

        let err = CompletionError::network("reset").with_partial("abc");
        assert_eq!(err.partial_text(), Some("abc"));
    }
}
