//! Progress reporting for mutation operations.

use appreg_core::DirectoryError;
use appreg_tree::OperationObserver;
use tracing::debug;

use crate::output::print_info;

/// Prints a progress line when an operation enters its remote phase.
///
/// Failures are not printed here: the error propagates to the top-level
/// handler, which prints it once together with a suggestion.
pub struct PrinterObserver;

impl OperationObserver for PrinterObserver {
    fn operation_started(&self, label: &str) {
        print_info(&format!("{label}..."));
    }

    fn operation_finished(&self, _label: &str) {}

    fn operation_failed(&self, label: &str, error: &DirectoryError) {
        debug!(operation = label, error = %error, "operation failed");
    }
}
