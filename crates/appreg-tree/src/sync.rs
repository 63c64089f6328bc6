//! The tree synchronizer: sole writer of the cache tree.
//!
//! All reads of remote state, all cache edits and all change notifications
//! go through this type. Consumers get owned snapshots; nothing outside
//! this module ever holds a reference into the tree.
//!
//! Lock order is `pending` before `tree`, everywhere. Neither lock is held
//! across a remote call. Cache edits and the notification that announces
//! them happen inside the same critical section, so no observer can see
//! the edit without the event or the event without the edit.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, instrument, warn};

use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult, ObjectId};

use crate::build;
use crate::events::{ChangePublisher, TreeChange};
use crate::node::{NodeId, NodeKind, NodeSnapshot, TreeNode, VisualState};
use crate::path::NodePath;
use crate::tree::CacheTree;

type FetchOutcome = Result<(), DirectoryError>;

fn vanished(path: &NodePath) -> DirectoryError {
    DirectoryError::PathVanished(path.to_string())
}

fn snapshot_at(tree: &CacheTree, id: NodeId) -> Option<NodeSnapshot> {
    let node = tree.node(id)?;
    let path = tree.path_of(id)?;
    Some(NodeSnapshot {
        id,
        path,
        kind: node.kind,
        app: node.app,
        local_value: node.local_value.clone(),
        label: node.label.clone(),
        description: node.description.clone(),
        data: node.data.clone(),
        visual: node.visual(),
        children_resolved: node.children_resolved(),
    })
}

fn child_snapshots(tree: &CacheTree, id: NodeId) -> Vec<NodeSnapshot> {
    tree.children(id)
        .map(|ids| ids.iter().filter_map(|c| snapshot_at(tree, *c)).collect())
        .unwrap_or_default()
}

/// Keeps the cache tree consistent with remote state.
pub struct TreeSynchronizer {
    repo: Arc<dyn DirectoryRepository>,
    tree: RwLock<CacheTree>,
    /// One entry per node with a fetch in flight. Later callers subscribe
    /// instead of fetching again.
    pending: Mutex<HashMap<NodeId, broadcast::Sender<FetchOutcome>>>,
    changes: ChangePublisher,
}

impl TreeSynchronizer {
    #[must_use]
    pub fn new(repo: Arc<dyn DirectoryRepository>) -> Self {
        Self {
            repo,
            tree: RwLock::new(CacheTree::new()),
            pending: Mutex::new(HashMap::new()),
            changes: ChangePublisher::new(),
        }
    }

    /// Stream of change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeChange> {
        self.changes.subscribe()
    }

    /// Publishes a change without touching the tree.
    pub fn notify(&self, change: TreeChange) {
        self.changes.publish(change);
    }

    /// Lists the application registrations and rebuilds the root level.
    /// Everything below the roots starts out unresolved.
    #[instrument(skip(self))]
    pub async fn load_roots(&self) -> DirectoryResult<Vec<NodeSnapshot>> {
        let apps = self.repo.list_applications().await?;
        let nodes: Vec<TreeNode> = apps.into_iter().map(build::application_node).collect();

        let mut tree = self.tree.write().await;
        let ids = tree.set_roots(nodes);
        let snapshots = ids.iter().filter_map(|id| snapshot_at(&tree, *id)).collect();
        self.changes.publish(TreeChange::Roots);
        Ok(snapshots)
    }

    /// Snapshots of the current root level, without any fetching.
    pub async fn roots(&self) -> Vec<NodeSnapshot> {
        let tree = self.tree.read().await;
        tree.roots()
            .iter()
            .filter_map(|id| snapshot_at(&tree, *id))
            .collect()
    }

    /// Snapshot of one node, without any fetching.
    pub async fn snapshot(&self, path: &NodePath) -> Option<NodeSnapshot> {
        let tree = self.tree.read().await;
        let id = tree.find(path)?;
        snapshot_at(&tree, id)
    }

    /// Returns the children of the node at `path`, fetching them on first
    /// use. Cached children are returned without remote traffic; concurrent
    /// calls for the same unresolved node share a single fetch.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn resolve_children(&self, path: &NodePath) -> DirectoryResult<Vec<NodeSnapshot>> {
        enum Step {
            Ready(Vec<NodeSnapshot>),
            Wait(NodeId, broadcast::Receiver<FetchOutcome>),
            Fetch(NodeId, NodeKind),
        }

        let step = {
            let mut pending = self.pending.lock().await;
            let tree = self.tree.read().await;
            let Some(id) = tree.find(path) else {
                return Err(vanished(path));
            };
            let Some(node) = tree.node(id) else {
                return Err(vanished(path));
            };
            if node.children_resolved() {
                Step::Ready(child_snapshots(&tree, id))
            } else if !node.kind.has_children() {
                // Leaves resolve empty without remote traffic.
                Step::Ready(Vec::new())
            } else if let Some(tx) = pending.get(&id) {
                Step::Wait(id, tx.subscribe())
            } else {
                let (tx, _rx) = broadcast::channel(1);
                pending.insert(id, tx);
                Step::Fetch(id, node.kind)
            }
        };

        match step {
            Step::Ready(snapshots) => Ok(snapshots),
            Step::Wait(id, mut rx) => {
                debug!("coalescing onto fetch in flight");
                match rx.recv().await {
                    Ok(Ok(())) => {
                        let tree = self.tree.read().await;
                        Ok(child_snapshots(&tree, id))
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(DirectoryError::Transport(
                        "child resolution was interrupted".into(),
                    )),
                }
            }
            Step::Fetch(id, kind) => self.fetch_and_install(path, id, kind).await,
        }
    }

    /// Makes the node at `path` reachable by resolving every level above
    /// it (loading roots first when the tree is empty), then returns its
    /// snapshot. Levels that are already resolved cost nothing.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn ensure_path(&self, path: &NodePath) -> DirectoryResult<NodeSnapshot> {
        let mut prefix = NodePath::application(path.app);
        if self.snapshot(&prefix).await.is_none() {
            self.load_roots().await?;
        }
        for segment in &path.segments {
            self.resolve_children(&prefix).await?;
            prefix = match &segment.value {
                Some(value) => prefix.child_value(segment.kind, value.clone()),
                None => prefix.child(segment.kind),
            };
        }
        match self.snapshot(&prefix).await {
            Some(snapshot) => Ok(snapshot),
            None => Err(vanished(&prefix)),
        }
    }

    /// Discards the cached subtree at `path` and re-resolves it from remote
    /// state. For a collection entry this refreshes just that entry via its
    /// group's field set; for a group it re-fetches the children; for an
    /// application root it re-reads the label and rebuilds the fixed level
    /// below it.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn reload(&self, path: &NodePath) -> DirectoryResult<()> {
        let kind = path.kind();
        if kind == NodeKind::Application {
            self.reload_application(path).await
        } else if kind.has_children() {
            self.reload_group(path).await
        } else {
            self.reload_leaf(path).await
        }
    }

    // --- mutation protocol support -------------------------------------

    /// Marks the target (and optionally its parent) busy in one critical
    /// section and announces it. Fails without side effects when the target
    /// is gone or either node is already busy.
    pub(crate) async fn begin_busy(
        &self,
        path: &NodePath,
        mark_parent: bool,
    ) -> DirectoryResult<()> {
        let mut tree = self.tree.write().await;
        let Some(id) = tree.find(path) else {
            return Err(vanished(path));
        };
        if tree.node(id).map(TreeNode::visual) == Some(VisualState::Busy) {
            return Err(DirectoryError::OperationInProgress);
        }
        let parent_id = match (mark_parent, path.parent()) {
            (true, Some(parent_path)) => {
                let Some(parent_id) = tree.find(&parent_path) else {
                    return Err(vanished(&parent_path));
                };
                if tree.node(parent_id).map(TreeNode::visual) == Some(VisualState::Busy) {
                    return Err(DirectoryError::OperationInProgress);
                }
                Some(parent_id)
            }
            _ => None,
        };

        tree.set_visual(id, VisualState::Busy);
        if let Some(parent_id) = parent_id {
            tree.set_visual(parent_id, VisualState::Busy);
        }
        self.changes.publish(TreeChange::Subtree(busy_scope(path, mark_parent)));
        Ok(())
    }

    /// Clears busy state after a successful remote phase.
    pub(crate) async fn end_busy_ok(&self, path: &NodePath, mark_parent: bool) {
        self.end_busy(path, mark_parent, VisualState::Idle).await;
    }

    /// Restores the pre-mutation picture after a failed remote phase: the
    /// cached collections were never touched, so rollback is the visual
    /// state alone. The target keeps an error marker.
    pub(crate) async fn end_busy_err(&self, path: &NodePath, mark_parent: bool) {
        self.end_busy(path, mark_parent, VisualState::Error).await;
    }

    async fn end_busy(&self, path: &NodePath, mark_parent: bool, target_state: VisualState) {
        let mut tree = self.tree.write().await;
        let Some(id) = tree.find(path) else {
            debug!(path = %path, "busy node vanished before completion");
            return;
        };
        tree.set_visual(id, target_state);
        if mark_parent {
            if let Some(parent_id) = path.parent().and_then(|p| tree.find(&p)) {
                tree.set_visual(parent_id, VisualState::Idle);
            }
        }
        self.changes.publish(TreeChange::Subtree(busy_scope(path, mark_parent)));
    }

    // --- internals ------------------------------------------------------

    async fn fetch_and_install(
        &self,
        path: &NodePath,
        id: NodeId,
        kind: NodeKind,
    ) -> DirectoryResult<Vec<NodeSnapshot>> {
        let fetched = self.fetch_children_nodes(path.app, kind).await;

        let mut pending = self.pending.lock().await;
        let mut tree = self.tree.write().await;

        let outcome: FetchOutcome = match fetched {
            Ok(children) => {
                if tree.set_children(id, children).is_some() {
                    tree.set_visual(id, VisualState::Idle);
                    Ok(())
                } else {
                    warn!(path = %path, "node removed while its children were fetched");
                    Err(vanished(path))
                }
            }
            Err(e) => {
                tree.set_visual(id, VisualState::Error);
                Err(e)
            }
        };

        let snapshots = if outcome.is_ok() {
            child_snapshots(&tree, id)
        } else {
            Vec::new()
        };
        if let Some(tx) = pending.remove(&id) {
            let _ = tx.send(outcome.clone());
        }
        self.changes.publish(TreeChange::Subtree(path.clone()));

        outcome.map(|()| snapshots)
    }

    async fn fetch_children_nodes(
        &self,
        app: ObjectId,
        kind: NodeKind,
    ) -> DirectoryResult<Vec<TreeNode>> {
        let mut nodes = match kind {
            NodeKind::Application => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                // Fixed semantic order, not sorted.
                return Ok(build::application_children(app, &facet));
            }
            NodeKind::AppRoleGroup => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                facet
                    .app_roles
                    .unwrap_or_default()
                    .into_iter()
                    .map(|r| build::role_node(app, r))
                    .collect()
            }
            NodeKind::CredentialGroup => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                let mut nodes: Vec<TreeNode> = facet
                    .password_credentials
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| build::password_node(app, c))
                    .collect();
                nodes.extend(
                    facet
                        .key_credentials
                        .unwrap_or_default()
                        .into_iter()
                        .map(|c| build::certificate_node(app, c)),
                );
                nodes
            }
            NodeKind::ScopeGroup => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                facet
                    .api
                    .and_then(|a| a.oauth2_permission_scopes)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|s| build::scope_node(app, s))
                    .collect()
            }
            NodeKind::RedirectUriGroup => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                facet
                    .web
                    .and_then(|w| w.redirect_uris)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|u| build::redirect_uri_node(app, u))
                    .collect()
            }
            NodeKind::OwnerGroup => self
                .repo
                .list_owners(&app)
                .await?
                .into_iter()
                .map(|o| build::owner_node(app, o))
                .collect(),
            _ => Vec::new(),
        };
        // Credential and owner lists display sorted; array-backed kinds
        // keep the remote array order.
        if matches!(kind, NodeKind::CredentialGroup | NodeKind::OwnerGroup) {
            nodes.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
        }
        Ok(nodes)
    }

    async fn reload_application(&self, path: &NodePath) -> DirectoryResult<()> {
        let mut fields = vec![appreg_core::ApplicationField::DisplayName];
        fields.extend_from_slice(NodeKind::Application.facet_fields());

        let fetched = self.repo.read_fields(&path.app, &fields).await;
        let mut tree = self.tree.write().await;
        let Some(id) = tree.find(path) else {
            return Err(vanished(path));
        };
        match fetched {
            Ok(facet) => {
                if let Some(node) = tree.node_mut(id) {
                    if let Some(name) = &facet.display_name {
                        node.label = name.clone();
                    }
                }
                let children = build::application_children(path.app, &facet);
                tree.set_children(id, children);
                tree.set_visual(id, VisualState::Idle);
                self.changes.publish(TreeChange::Subtree(path.clone()));
                Ok(())
            }
            Err(e) => {
                tree.set_visual(id, VisualState::Error);
                self.changes.publish(TreeChange::Subtree(path.clone()));
                Err(e)
            }
        }
    }

    async fn reload_group(&self, path: &NodePath) -> DirectoryResult<()> {
        {
            let mut tree = self.tree.write().await;
            let Some(id) = tree.find(path) else {
                return Err(vanished(path));
            };
            tree.clear_children(id);
        }
        // A resolution already in flight for this node may win the install;
        // its notification triggers another render either way.
        self.resolve_children(path).await.map(|_| ())
    }

    async fn reload_leaf(&self, path: &NodePath) -> DirectoryResult<()> {
        let Some(segment) = path.last() else {
            return self.reload_application(path).await;
        };
        let kind = segment.kind;
        let value = segment.value.clone();

        match self.fetch_leaf_node(path.app, kind, value.as_deref()).await {
            Ok(replacement) => {
                let mut tree = self.tree.write().await;
                let Some(id) = tree.find(path) else {
                    return Err(vanished(path));
                };
                match replacement {
                    Some(node) => {
                        tree.replace_node(id, node);
                    }
                    // The backing entry is gone remotely; drop it here too.
                    None => tree.remove_node(id),
                }
                let scope = path
                    .parent()
                    .unwrap_or_else(|| NodePath::application(path.app));
                self.changes.publish(TreeChange::Subtree(scope));
                Ok(())
            }
            Err(e) => {
                let mut tree = self.tree.write().await;
                if let Some(id) = tree.find(path) {
                    tree.set_visual(id, VisualState::Error);
                    self.changes.publish(TreeChange::Subtree(path.clone()));
                }
                Err(e)
            }
        }
    }

    /// Fetches the single remote entry backing a leaf and rebuilds its
    /// node. `Ok(None)` means the entry no longer exists remotely.
    async fn fetch_leaf_node(
        &self,
        app: ObjectId,
        kind: NodeKind,
        value: Option<&str>,
    ) -> DirectoryResult<Option<TreeNode>> {
        match kind {
            NodeKind::AppRole => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                Ok(facet
                    .app_roles
                    .unwrap_or_default()
                    .into_iter()
                    .find(|r| value.is_some_and(|v| v == r.id.to_string()))
                    .map(|r| build::role_node(app, r)))
            }
            NodeKind::PasswordCredential => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                Ok(facet
                    .password_credentials
                    .unwrap_or_default()
                    .into_iter()
                    .find(|c| value.is_some_and(|v| v == c.key_id.to_string()))
                    .map(|c| build::password_node(app, c)))
            }
            NodeKind::CertificateCredential => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                Ok(facet
                    .key_credentials
                    .unwrap_or_default()
                    .into_iter()
                    .find(|c| value.is_some_and(|v| v == c.key_id.to_string()))
                    .map(|c| build::certificate_node(app, c)))
            }
            NodeKind::PermissionScope => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                Ok(facet
                    .api
                    .and_then(|a| a.oauth2_permission_scopes)
                    .unwrap_or_default()
                    .into_iter()
                    .find(|s| value.is_some_and(|v| v == s.id.to_string()))
                    .map(|s| build::scope_node(app, s)))
            }
            NodeKind::RedirectUri => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                Ok(facet
                    .web
                    .and_then(|w| w.redirect_uris)
                    .unwrap_or_default()
                    .into_iter()
                    .find(|u| value == Some(u.as_str()))
                    .map(|u| build::redirect_uri_node(app, u)))
            }
            NodeKind::Audience => {
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                let audience = facet.sign_in_audience.unwrap_or_default();
                Ok(Some(build::audience_node(app, audience)))
            }
            NodeKind::TokenFlowFlag => {
                let Some(flow) = value.and_then(appreg_core::model::TokenFlow::parse) else {
                    return Err(DirectoryError::InvalidInput(format!(
                        "unknown token flow {value:?}"
                    )));
                };
                let facet = self.repo.read_fields(&app, kind.facet_fields()).await?;
                let grant = build::grant_of(&facet);
                Ok(Some(build::token_flag_node(app, flow, flow.read(&grant))))
            }
            NodeKind::Owner => {
                let owners = self.repo.list_owners(&app).await?;
                Ok(owners
                    .into_iter()
                    .find(|o| value.is_some_and(|v| v == o.id.to_string()))
                    .map(|o| build::owner_node(app, o)))
            }
            _ => Err(DirectoryError::InvalidInput(format!(
                "{kind} is not a collection entry"
            ))),
        }
    }
}

fn busy_scope(path: &NodePath, mark_parent: bool) -> NodePath {
    if mark_parent {
        path.parent()
            .unwrap_or_else(|| NodePath::application(path.app))
    } else {
        path.clone()
    }
}
