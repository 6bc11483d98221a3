//! Error types for the Onshape client library.

use thiserror::Error;

/// The main error type for all Onshape client operations.
#[derive(Error, Debug)]
pub enum OnshapeError {
    /// Missing or invalid credentials, or an unresolvable auth type.
    ///
    /// Always raised before any network attempt.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failure to canonicalize or sign a request.
    #[error("Signing error: {0}")]
    Signing(String),

    /// The vendor rejected the credentials (401/403), or a token refresh failed.
    #[error("Authentication failed{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Authentication {
        /// HTTP status returned by the vendor, if any
        status: Option<u16>,
        /// Message from the vendor or the refresh exchange
        message: String,
        /// Scheme-specific hints that never contain secret material
        hints: Vec<String>,
    },

    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP request with middleware failed
    #[error("HTTP request failed: {0}")]
    TransportMiddleware(#[from] reqwest_middleware::Error),

    /// Request timed out
    #[error("Request timed out")]
    Timeout,

    /// Onshape API returned a non-success status unrelated to authentication
    #[error("Onshape API error (HTTP {status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or reason phrase
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid response from the API
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl OnshapeError {
    /// Build an authentication error without hints.
    pub fn authentication(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Authentication {
            status,
            message: message.into(),
            hints: Vec::new(),
        }
    }

    /// Check if this is a configuration error.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    /// Check if this is an authentication error.
    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }

    /// Check if this is a network-level failure.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::TransportMiddleware(_) | Self::Timeout
        )
    }

    /// The HTTP status code carried by this error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { status, .. } => *status,
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Diagnostic hints attached to an authentication failure.
    pub fn hints(&self) -> &[String] {
        match self {
            Self::Authentication { hints, .. } => hints,
            _ => &[],
        }
    }
}
