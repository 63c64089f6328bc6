//! Owner flows. Owners are directory links, not embedded arrays: adding
//! one resolves the user first and then links it, both inside the same
//! operation.

use std::sync::Arc;

use tracing::instrument;

use appreg_core::model::OwnerSummary;
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationPlan, MutationRunner, NodePath, NodeSnapshot, Refresh, TreeSynchronizer,
};

use crate::prompt::{InputRequest, Prompter};
use crate::{parent_of, ready_node, validate, Outcome};

pub struct OwnerService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl OwnerService {
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

    /// Looks up a user by principal name or object id and links it as an
    /// owner of the application owning `group`.
    #[instrument(skip_all, fields(group = %group))]
    pub async fn add(&self, group: &NodePath) -> DirectoryResult<Outcome> {
        ready_node(&self.sync, group).await?;
        let siblings = self.sync.resolve_children(group).await?;
        let taken: Vec<String> = siblings
            .iter()
            .filter_map(|s| s.data.as_owner())
            .filter_map(|o| o.user_principal_name.clone())
            .collect();

        let principal_check = move |input: &str| {
            validate::required(input).or_else(|| validate::unique_among(input, &taken, "owner"))
        };
        let Some(principal) = self
            .prompter
            .input(
                InputRequest::new("User principal name or object id")
                    .with_placeholder("user@contoso.com")
                    .with_validator(&principal_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let plan = MutationPlan::node(
            format!("Adding owner '{principal}'"),
            group.clone(),
            Refresh::Subtree(group.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = group.app;
        self.runner
            .run(plan, move || async move {
                let user = repo.find_user(&principal).await?;
                repo.add_owner(&app, &user.id).await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Unlinks the owner at `path`, warning when it is the last one left.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn remove(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let owner = owner_of(&node)?;
        let group = parent_of(path)?;
        let siblings = self.sync.resolve_children(&group).await?;

        let question = if siblings.len() <= 1 {
            format!(
                "Remove owner '{}'? The application will be left without owners.",
                owner.label()
            )
        } else {
            format!("Remove owner '{}'?", owner.label())
        };
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let plan = MutationPlan::node_and_parent(
            format!("Removing owner '{}'", owner.label()),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let user = owner.id;
        self.runner
            .run(plan, move || async move { repo.remove_owner(&app, &user).await })
            .await?;
        Ok(Outcome::Completed(()))
    }
}

fn owner_of(node: &NodeSnapshot) -> DirectoryResult<OwnerSummary> {
    node.data
        .as_owner()
        .cloned()
        .ok_or_else(|| DirectoryError::InvalidInput(format!("not an owner: {}", node.path)))
}
