//! The mutation protocol: one runner for every write.
//!
//! Every mutation follows the same three phases:
//!
//! 1. **Begin**: mark the target node (and, for operations that change a
//!    sibling collection, its parent) busy and announce the change. This
//!    happens before the remote call is issued, so the busy state is
//!    always observable first.
//! 2. **Execute**: run the remote operation. The cache is never edited
//!    speculatively during this phase.
//! 3. **Complete**: on success, clear the busy state and refresh the
//!    affected scope from remote truth; on failure, restore the visual
//!    state (the cached collections were never touched), report through
//!    the one shared observer, and announce the change.

use std::future::Future;
use std::sync::Arc;

use tracing::{instrument, warn};

use appreg_core::DirectoryResult;

use crate::observer::OperationObserver;
use crate::path::NodePath;
use crate::sync::TreeSynchronizer;

/// What Complete refreshes after a successful remote phase.
#[derive(Debug, Clone)]
pub enum Refresh {
    /// Nothing to refresh; the mutation has no cached footprint.
    None,
    /// Re-list the application roots.
    Roots,
    /// Reload the subtree at this path.
    Subtree(NodePath),
}

/// Which node the protocol drives.
#[derive(Debug, Clone)]
pub enum MutationTarget {
    /// Operations above any node, e.g. creating an application.
    Root,
    Node { path: NodePath, mark_parent: bool },
}

/// One planned mutation.
#[derive(Debug, Clone)]
pub struct MutationPlan {
    /// Progress label, e.g. `Adding app role 'Reader'`.
    pub label: String,
    pub target: MutationTarget,
    pub refresh: Refresh,
}

impl MutationPlan {
    /// Plan for a root-level operation.
    #[must_use]
    pub fn root(label: impl Into<String>, refresh: Refresh) -> Self {
        Self {
            label: label.into(),
            target: MutationTarget::Root,
            refresh,
        }
    }

    /// Plan that marks only the target node busy.
    #[must_use]
    pub fn node(label: impl Into<String>, path: NodePath, refresh: Refresh) -> Self {
        Self {
            label: label.into(),
            target: MutationTarget::Node {
                path,
                mark_parent: false,
            },
            refresh,
        }
    }

    /// Plan that marks the target and its parent busy. Used when the
    /// operation changes the parent's child collection (add, delete).
    #[must_use]
    pub fn node_and_parent(label: impl Into<String>, path: NodePath, refresh: Refresh) -> Self {
        Self {
            label: label.into(),
            target: MutationTarget::Node {
                path,
                mark_parent: true,
            },
            refresh,
        }
    }
}

/// Drives [`MutationPlan`]s through the three phases.
pub struct MutationRunner {
    sync: Arc<TreeSynchronizer>,
    observer: Arc<dyn OperationObserver>,
}

impl MutationRunner {
    #[must_use]
    pub fn new(sync: Arc<TreeSynchronizer>, observer: Arc<dyn OperationObserver>) -> Self {
        Self { sync, observer }
    }

    /// Runs one mutation. `op` performs the remote phase and must contain
    /// every remote call the mutation needs, including any read-modify-write
    /// read. Returns the operation's value, or the error after rollback and
    /// reporting.
    #[instrument(skip(self, plan, op), fields(label = %plan.label))]
    pub async fn run<T, F, Fut>(&self, plan: MutationPlan, op: F) -> DirectoryResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = DirectoryResult<T>>,
    {
        if let MutationTarget::Node { path, mark_parent } = &plan.target {
            if let Err(e) = self.sync.begin_busy(path, *mark_parent).await {
                if e.is_stale_cache() {
                    warn!(error = %e, "mutation target vanished before start");
                } else {
                    self.observer.operation_failed(&plan.label, &e);
                }
                return Err(e);
            }
        }
        self.observer.operation_started(&plan.label);

        let result = op().await;

        self.observer.operation_finished(&plan.label);
        match result {
            Ok(value) => {
                if let MutationTarget::Node { path, mark_parent } = &plan.target {
                    self.sync.end_busy_ok(path, *mark_parent).await;
                }
                self.apply_refresh(&plan).await?;
                Ok(value)
            }
            Err(e) => {
                if let MutationTarget::Node { path, mark_parent } = &plan.target {
                    self.sync.end_busy_err(path, *mark_parent).await;
                }
                self.observer.operation_failed(&plan.label, &e);
                Err(e)
            }
        }
    }

    /// Refresh failures after a successful remote phase are reported: the
    /// remote change is in place but the cache may be stale. A vanished
    /// path is the one exception; there is nothing left to refresh.
    async fn apply_refresh(&self, plan: &MutationPlan) -> DirectoryResult<()> {
        let result = match &plan.refresh {
            Refresh::None => Ok(()),
            Refresh::Roots => self.sync.load_roots().await.map(|_| ()),
            Refresh::Subtree(path) => self.sync.reload(path).await,
        };
        match result {
            Ok(()) => Ok(()),
            Err(e) if e.is_stale_cache() => {
                warn!(error = %e, "refresh target vanished after mutation");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh after successful mutation failed");
                self.observer.operation_failed(&plan.label, &e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_constructors_set_parent_marking() {
        let path = NodePath::application(appreg_core::ObjectId::new());
        let plain = MutationPlan::node("x", path.clone(), Refresh::None);
        let with_parent = MutationPlan::node_and_parent("x", path, Refresh::None);
        assert!(matches!(
            plain.target,
            MutationTarget::Node {
                mark_parent: false,
                ..
            }
        ));
        assert!(matches!(
            with_parent.target,
            MutationTarget::Node {
                mark_parent: true,
                ..
            }
        ));
    }
}
