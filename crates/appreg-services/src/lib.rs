//! Guided mutation flows on top of the cache tree.
//!
//! Each service walks the user through one mutation: gather and validate
//! every answer first (cheap, against cached state), then hand a single
//! operation to the [`MutationRunner`], which brackets it with busy state
//! and refreshes the affected scope afterwards. Flows never edit the cache
//! themselves and never issue a remote call before the protocol starts, so
//! backing out of any prompt leaves no trace anywhere.

use std::sync::Arc;

use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationRunner, NodePath, NodeSnapshot, OperationObserver, TreeSynchronizer, VisualState,
};

mod arrays;

pub mod app_roles;
pub mod applications;
pub mod audience;
pub mod credentials;
pub mod owners;
pub mod prompt;
pub mod redirect_uris;
pub mod scopes;
pub mod token_flags;
pub mod validate;

pub use prompt::{InputRequest, InputValidator, Prompter};

/// How a guided flow ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    /// The mutation ran to completion.
    Completed(T),
    /// The user backed out before anything was submitted. Nothing was
    /// marked busy and no remote call was made.
    Aborted,
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Aborted => None,
        }
    }
}

/// Every flow, wired against one synchronizer, repository, observer and
/// prompter.
pub struct Services {
    pub applications: applications::ApplicationService,
    pub roles: app_roles::AppRoleService,
    pub credentials: credentials::CredentialService,
    pub scopes: scopes::PermissionScopeService,
    pub redirect_uris: redirect_uris::RedirectUriService,
    pub audience: audience::SignInAudienceService,
    pub token_flags: token_flags::TokenFlowService,
    pub owners: owners::OwnerService,
}

impl Services {
    #[must_use]
    pub fn new(
        sync: Arc<TreeSynchronizer>,
        repo: Arc<dyn DirectoryRepository>,
        observer: Arc<dyn OperationObserver>,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        let runner = Arc::new(MutationRunner::new(Arc::clone(&sync), observer));
        Self {
            applications: applications::ApplicationService::new(&sync, &repo, &runner, &prompter),
            roles: app_roles::AppRoleService::new(&sync, &repo, &runner, &prompter),
            credentials: credentials::CredentialService::new(&sync, &repo, &runner, &prompter),
            scopes: scopes::PermissionScopeService::new(&sync, &repo, &runner, &prompter),
            redirect_uris: redirect_uris::RedirectUriService::new(&sync, &repo, &runner, &prompter),
            audience: audience::SignInAudienceService::new(&sync, &repo, &runner, &prompter),
            token_flags: token_flags::TokenFlowService::new(&sync, &repo, &runner, &prompter),
            owners: owners::OwnerService::new(&sync, &repo, &runner, &prompter),
        }
    }
}

/// Snapshot of the node at `path`, or the stale-cache error when the path
/// no longer resolves.
pub(crate) async fn current(
    sync: &TreeSynchronizer,
    path: &NodePath,
) -> DirectoryResult<NodeSnapshot> {
    match sync.snapshot(path).await {
        Some(node) => Ok(node),
        None => Err(DirectoryError::PathVanished(path.to_string())),
    }
}

/// Like [`current`], but refuses nodes that are already part of a running
/// mutation, so a flow rejects before its first prompt rather than after
/// the user answered everything.
pub(crate) async fn ready_node(
    sync: &TreeSynchronizer,
    path: &NodePath,
) -> DirectoryResult<NodeSnapshot> {
    let node = current(sync, path).await?;
    if node.visual == VisualState::Busy {
        return Err(DirectoryError::OperationInProgress);
    }
    Ok(node)
}

pub(crate) fn parent_of(path: &NodePath) -> DirectoryResult<NodePath> {
    path.parent()
        .ok_or_else(|| DirectoryError::InvalidInput(format!("{path} has no parent")))
}
