//! Change notifications from the cache to whatever renders it.

use tokio::sync::broadcast;
use tracing::trace;

use crate::path::NodePath;

/// Scope of a cache change. Consumers re-read the named scope; payloads are
/// never carried in the event itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeChange {
    /// The root list changed.
    Roots,
    /// The node at this path, or something under it, changed.
    Subtree(NodePath),
}

const CHANNEL_CAPACITY: usize = 256;

/// Broadcast fan-out for [`TreeChange`]. Sending never blocks and never
/// fails; a send without subscribers is simply dropped.
#[derive(Debug)]
pub(crate) struct ChangePublisher {
    tx: broadcast::Sender<TreeChange>,
}

impl ChangePublisher {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<TreeChange> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, change: TreeChange) {
        trace!(?change, "tree change");
        let _ = self.tx.send(change);
    }
}
