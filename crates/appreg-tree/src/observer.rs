//! Progress and failure reporting for mutations.
//!
//! The runner reports through exactly one observer, so every operation in
//! the system surfaces errors the same way. Hosts plug in their own
//! implementation (the CLI prints, tests record).

use tracing::{info, warn};

use appreg_core::DirectoryError;

/// Receives the lifecycle of each mutation.
pub trait OperationObserver: Send + Sync {
    /// The operation entered its remote phase; show progress.
    fn operation_started(&self, label: &str);

    /// The remote phase ended (either way); clear progress.
    fn operation_finished(&self, label: &str);

    /// The operation failed and the failure is user-actionable.
    fn operation_failed(&self, label: &str, error: &DirectoryError);
}

/// Observer that only writes the log. Default when no UI is attached.
#[derive(Debug, Default)]
pub struct LogObserver;

impl OperationObserver for LogObserver {
    fn operation_started(&self, label: &str) {
        info!(operation = label, "started");
    }

    fn operation_finished(&self, label: &str) {
        info!(operation = label, "finished");
    }

    fn operation_failed(&self, label: &str, error: &DirectoryError) {
        warn!(operation = label, error = %error, "failed");
    }
}
