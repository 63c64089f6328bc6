//! Sign-in audience flow, plus the option list shared with application
//! creation.

use std::sync::Arc;

use tracing::instrument;

use appreg_core::model::{ApplicationPatch, SignInAudience};
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{MutationPlan, MutationRunner, NodePath, Refresh, TreeSynchronizer};

use crate::prompt::Prompter;
use crate::{ready_node, Outcome};

pub(crate) fn audience_options() -> Vec<String> {
    SignInAudience::ALL
        .iter()
        .map(|a| a.describe().to_string())
        .collect()
}

pub(crate) fn audience_at(index: usize) -> DirectoryResult<SignInAudience> {
    SignInAudience::ALL
        .get(index)
        .copied()
        .ok_or_else(|| DirectoryError::InvalidInput(format!("no audience option {index}")))
}

fn audience_default(current: SignInAudience) -> usize {
    SignInAudience::ALL
        .iter()
        .position(|a| *a == current)
        .unwrap_or(0)
}

pub struct SignInAudienceService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl SignInAudienceService {
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

    /// Changes who can sign in to the application owning the audience node
    /// at `path`.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn change(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let Some(current) = node.data.as_audience() else {
            return Err(DirectoryError::InvalidInput(format!(
                "not a sign-in audience node: {path}"
            )));
        };

        let Some(choice) = self
            .prompter
            .select(
                "Supported account types",
                &audience_options(),
                audience_default(current),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let audience = audience_at(choice)?;
        if audience == current {
            return Ok(Outcome::Completed(()));
        }

        let plan = MutationPlan::node(
            format!("Setting sign-in audience to {}", audience.describe()),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        self.runner
            .run(plan, move || async move {
                let patch = ApplicationPatch {
                    sign_in_audience: Some(audience),
                    ..Default::default()
                };
                repo.write_fields(&app, &patch).await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }
}
