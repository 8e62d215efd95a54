//! Error types for promo-runner
//!
//! This module provides the error taxonomy for the engine:
//! - [`AuthError`] - session handshake failures, terminal for a run
//! - [`GatewayError`] - a single backend call failed (transport or business level)
//! - [`Error`] - the top-level type tying everything together
//!
//! Gateway failures are always caught at the call site and converted into a
//! recorded per-item failure; only authentication failures abort a run.

use thiserror::Error;

/// Result type alias for promo-runner operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for promo-runner
///
/// This is the primary error type used throughout the library. Each variant
/// includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Session handshake failed - the run cannot proceed
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// A single backend call failed
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),

    /// HTTP client construction or low-level network failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "endpoints.arena_base")
        key: Option<String>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Session handshake errors
///
/// Every variant is terminal for the run that hit it: without a valid session
/// no business call is attempted and no summary is produced.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Credential-to-token exchange against the portal domain failed
    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    /// Signing-parameter fetch failed (a dependency of the activity login)
    #[error("signing parameter fetch failed: {0}")]
    SigningParams(String),

    /// Activity login on the game domain failed
    #[error("activity login failed: {0}")]
    ActivityLogin(String),
}

/// Errors produced by a single backend call
///
/// Callers receive either a decoded payload or one of these - never a raw
/// protocol exception. Retry policy, where needed, belongs to callers.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Transport-level failure (timeout, connection reset, non-success HTTP status)
    #[error("transport error: {0}")]
    Transport(String),

    /// The backend accepted the request but signaled failure in the envelope
    #[error("backend rejected request (code {code}): {message}")]
    Business {
        /// The non-zero business code, from whichever envelope level carried it
        code: i64,
        /// The backend's human-readable message, if any
        message: String,
    },

    /// The response body could not be decoded into the expected envelope
    #[error("malformed response envelope: {0}")]
    Envelope(String),
}

impl GatewayError {
    /// Returns the business code if this is a business-level rejection
    pub fn business_code(&self) -> Option<i64> {
        match self {
            GatewayError::Business { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}
