// Error handling module
// Defines the auth and API error taxonomy surfaced by the client

use thiserror::Error;

/// Errors from the token refresh lifecycle.
///
/// Cloneable because a single in-flight refresh outcome is shared by every
/// request that was waiting on it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Refresh was attempted with no refresh token in the store
    #[error("No refresh token stored")]
    MissingRefreshToken,

    /// The refresh exchange itself failed (transport error or error status)
    #[error("Token refresh failed: {reason}")]
    RefreshRequestFailed { reason: String },

    /// The password grant was rejected; carries the server's explanation
    #[error("Login failed: {reason}")]
    LoginFailed { reason: String },
}

/// Errors surfaced to callers of the HTTP pipeline and the endpoint wrappers.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The request was cancelled before it was sent (no access token stored).
    /// Distinct from a network error: the caller was redirected to login.
    #[error("Request cancelled: no access token available")]
    RequestCancelled,

    /// Token lifecycle failure while recovering from a 401
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    /// Error status from the backend, response body preserved
    #[error("Backend error: {status} - {message}")]
    Backend { status: u16, message: String },

    /// Transport-level failure (connect, timeout, decode)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Status code of a backend error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias for API operations
pub type Result<T> = std::result::Result<T, ApiError>;
