//! Guided flows for the web redirect URIs.
//!
//! URIs have no server-side id; the URI string itself is the identity.
//! Edits therefore replace the old string in place, and the group is
//! refreshed afterwards since the entry's address changes with its value.

use std::sync::Arc;

use tracing::instrument;

use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationPlan, MutationRunner, NodePath, NodeSnapshot, Refresh, TreeSynchronizer,
};

use crate::prompt::{InputRequest, Prompter};
use crate::{arrays, parent_of, ready_node, validate, Outcome};

pub struct RedirectUriService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl RedirectUriService {
    pub(crate) fn new(
        sync: &Arc<TreeSynchronizer>,
        repo: &Arc<dyn DirectoryRepository>,
        runner: &Arc<MutationRunner>,
        prompter: &Arc<dyn Prompter>,
    ) -> Self {
        Self {
            sync: Arc::clone(sync),
            repo: Arc::clone(repo),
            runner: Arc::clone(runner),
            prompter: Arc::clone(prompter),
        }
    }

    /// Adds a redirect URI under the group at `group`.
    #[instrument(skip_all, fields(group = %group))]
    pub async fn add(&self, group: &NodePath) -> DirectoryResult<Outcome> {
        ready_node(&self.sync, group).await?;
        let siblings = self.sync.resolve_children(group).await?;
        let taken = sibling_uris(&siblings);

        let uri_check = move |input: &str| {
            validate::redirect_uri(input)
                .or_else(|| validate::unique_among(input, &taken, "redirect URI"))
        };
        let Some(uri) = self
            .prompter
            .input(
                InputRequest::new("Redirect URI")
                    .with_placeholder("https://app.example.com/auth/callback")
                    .with_validator(&uri_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let plan = MutationPlan::node(
            format!("Adding redirect URI '{uri}'"),
            group.clone(),
            Refresh::Subtree(group.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = group.app;
        self.runner
            .run(plan, move || async move {
                arrays::modify_redirect_uris(repo.as_ref(), &app, move |uris| {
                    if uris.iter().any(|u| u.eq_ignore_ascii_case(&uri)) {
                        return Err(DirectoryError::InvalidInput(format!(
                            "redirect URI '{uri}' is already configured"
                        )));
                    }
                    uris.push(uri);
                    Ok(())
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Replaces the URI at `path` with a new value, preserving its
    /// position in the list.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn edit(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let old = uri_of(&node)?;
        let group = parent_of(path)?;
        let siblings = self.sync.resolve_children(&group).await?;
        let mut taken = sibling_uris(&siblings);
        taken.retain(|u| !u.eq_ignore_ascii_case(&old));

        let uri_check = move |input: &str| {
            validate::redirect_uri(input)
                .or_else(|| validate::unique_among(input, &taken, "redirect URI"))
        };
        let Some(uri) = self
            .prompter
            .input(
                InputRequest::new("Redirect URI")
                    .with_default(&old)
                    .with_validator(&uri_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        if uri == old {
            return Ok(Outcome::Completed(()));
        }

        let plan = MutationPlan::node(
            format!("Updating redirect URI '{old}'"),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let missing = missing_message(&old);
        self.runner
            .run(plan, move || async move {
                arrays::modify_redirect_uris(repo.as_ref(), &app, move |uris| {
                    match uris.iter().position(|u| u.eq_ignore_ascii_case(&old)) {
                        Some(index) => {
                            uris[index] = uri;
                            Ok(())
                        }
                        None => Err(DirectoryError::NotFound(missing)),
                    }
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Removes the URI at `path` after confirmation.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let uri = uri_of(&node)?;

        let question =
            format!("Remove redirect URI '{uri}'? Sign-in replies to it will be rejected.");
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let group = parent_of(path)?;
        let plan = MutationPlan::node_and_parent(
            format!("Removing redirect URI '{uri}'"),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let missing = missing_message(&uri);
        self.runner
            .run(plan, move || async move {
                arrays::modify_redirect_uris(repo.as_ref(), &app, move |uris| {
                    let before = uris.len();
                    uris.retain(|u| !u.eq_ignore_ascii_case(&uri));
                    if uris.len() == before {
                        return Err(DirectoryError::NotFound(missing));
                    }
                    Ok(())
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }
}

fn uri_of(node: &NodeSnapshot) -> DirectoryResult<String> {
    node.data
        .as_redirect_uri()
        .map(str::to_string)
        .ok_or_else(|| {
            DirectoryError::InvalidInput(format!("not a redirect URI: {}", node.path))
        })
}

fn sibling_uris(siblings: &[NodeSnapshot]) -> Vec<String> {
    siblings
        .iter()
        .filter_map(|s| s.data.as_redirect_uri())
        .map(str::to_string)
        .collect()
}

fn missing_message(uri: &str) -> String {
    format!("redirect URI '{uri}' no longer exists")
}
