//! CLI error type and exit codes
//!
//! Exit codes:
//! - 0: success
//! - 1: general error (I/O, configuration)
//! - 2: authentication or permission problem
//! - 3: network problem
//! - 4: validation problem, missing object, or busy node
//! - 5: directory service error

use appreg_core::DirectoryError;
use thiserror::Error;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("Not authenticated: {0}")]
    Auth(String),

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Another operation is still running on that item.")]
    Busy,

    #[error("The cached tree went stale: {0}")]
    Stale(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Microsoft Graph throttled the request. Retry after {0}s.")]
    RateLimited(u64),

    #[error("Microsoft Graph error {code}: {message}")]
    Graph { code: String, message: String },

    #[error("Unexpected response from Microsoft Graph: {0}")]
    Decode(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Auth(_) | CliError::Forbidden(_) => 2,
            CliError::Network(_) | CliError::RateLimited(_) => 3,
            CliError::Validation(_) | CliError::NotFound(_) | CliError::Busy => 4,
            CliError::Stale(_) => 4,
            CliError::Graph { .. } | CliError::Decode(_) => 5,
            CliError::Config(_) | CliError::Io(_) => 1,
        }
    }

    /// Print the error to stderr with appropriate formatting
    pub fn print(&self) {
        let use_color = std::env::var("NO_COLOR").is_err();

        if use_color {
            eprintln!("\x1b[31mError:\x1b[0m {}", self);
        } else {
            eprintln!("Error: {}", self);
        }

        if let Some(suggestion) = self.suggestion() {
            if use_color {
                eprintln!("\n\x1b[33mSuggestion:\x1b[0m {}", suggestion);
            } else {
                eprintln!("\nSuggestion: {}", suggestion);
            }
        }
    }

    /// Get a suggested action for this error
    fn suggestion(&self) -> Option<&'static str> {
        match self {
            CliError::Auth(_) => Some(
                "Set APPREG_TOKEN to a Microsoft Graph access token (for example from \
                 'az account get-access-token'), or pass --offline to explore a demo directory.",
            ),
            CliError::Forbidden(_) => Some(
                "The token needs the Application.ReadWrite.All permission to manage \
                 app registrations.",
            ),
            CliError::NotFound(_) => Some(
                "The object may have been changed or deleted outside this session. \
                 Re-run the command to reload the tree.",
            ),
            CliError::Stale(_) => Some(
                "Something else changed the application while this command ran. \
                 Re-run the command to reload the tree.",
            ),
            CliError::Busy => Some("Wait for the running operation to finish and try again."),
            _ => None,
        }
    }
}

impl From<DirectoryError> for CliError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Auth(message) => CliError::Auth(message),
            DirectoryError::Forbidden(message) => CliError::Forbidden(message),
            DirectoryError::NotFound(message) => CliError::NotFound(message),
            DirectoryError::InvalidInput(message) => CliError::Validation(message),
            DirectoryError::OperationInProgress => CliError::Busy,
            DirectoryError::PathVanished(path) => CliError::Stale(path),
            DirectoryError::Transport(message) => CliError::Network(message),
            DirectoryError::RateLimited { retry_after_secs } => {
                CliError::RateLimited(retry_after_secs)
            }
            DirectoryError::Service { code, message } => CliError::Graph { code, message },
            DirectoryError::Decode(message) => CliError::Decode(message),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Io(err.to_string())
    }
}
