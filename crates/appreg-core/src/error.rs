//! Error taxonomy shared by the repository, the tree synchronizer and the
//! domain services.
//!
//! Every variant owns its payload and the enum is `Clone`: a single failure
//! can be fanned out to several waiters of a coalesced fetch, and observers
//! receive the error by reference while the caller still gets it by value.

use thiserror::Error;

/// Result alias used throughout the workspace.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Failures surfaced by directory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    /// Token acquisition failed or the token was rejected.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The addressed directory object does not exist (HTTP 404 or the
    /// matching OData code).
    #[error("object not found: {0}")]
    NotFound(String),

    /// The caller lacks a required Graph permission.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// The service returned a structured OData error that maps to no more
    /// specific variant.
    #[error("directory service error: {code}: {message}")]
    Service { code: String, message: String },

    /// Connection-level failure: DNS, TLS, timeout, malformed response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response body could not be decoded into the expected shape.
    #[error("response decode error: {0}")]
    Decode(String),

    /// The service throttled the request and retries were exhausted.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Locally collected input failed validation before any remote call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A mutation was requested for a node that is already busy.
    #[error("another operation is already running for this item")]
    OperationInProgress,

    /// A cached tree path no longer exists. Raised when the tree changed
    /// underneath an in-flight operation; callers treat it as stale state,
    /// not as a user-actionable failure.
    #[error("tree path no longer exists: {0}")]
    PathVanished(String),
}

impl DirectoryError {
    /// True when retrying the same call without changing anything could
    /// plausibly succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RateLimited { .. } | Self::Service { .. }
        )
    }

    /// True for failures of the tree cache itself rather than of the
    /// requested operation. These are logged, never rendered as prompts.
    #[must_use]
    pub fn is_stale_cache(&self) -> bool {
        matches!(self, Self::PathVanished(_))
    }
}
