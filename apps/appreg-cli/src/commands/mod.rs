//! CLI command implementations

pub mod apps;
pub mod audience;
pub mod creds;
pub mod flags;
pub mod owners;
pub mod roles;
pub mod scopes;
pub mod tree;
pub mod uris;
pub mod watch;

use appreg_services::Outcome;

use crate::output::print_success;

/// Translates a flow outcome into terminal feedback. Backing out of a
/// prompt is not an error; it just ends the command.
pub(crate) fn report(outcome: Outcome, success: &str) {
    match outcome {
        Outcome::Completed(()) => print_success(success),
        Outcome::Aborted => println!("Cancelled."),
    }
}
