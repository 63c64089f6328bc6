//! Flows on the application registrations themselves: create, rename,
//! delete.

use std::sync::Arc;

use tracing::instrument;

use appreg_core::model::{ApplicationPatch, ApplicationSummary, NewApplication};
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{MutationPlan, MutationRunner, NodePath, Refresh, TreeSynchronizer};

use crate::audience::{audience_at, audience_options};
use crate::prompt::{InputRequest, Prompter};
use crate::{ready_node, validate, Outcome};

pub struct ApplicationService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl ApplicationService {
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

    /// Registers a new application and re-lists the roots on success.
    #[instrument(skip_all)]
    pub async fn create(&self) -> DirectoryResult<Outcome<ApplicationSummary>> {
        let Some(name) = self
            .prompter
            .input(InputRequest::new("Application name").with_validator(&validate::display_name))
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(choice) = self
            .prompter
            .select("Supported account types", &audience_options(), 0)
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let audience = audience_at(choice)?;

        let plan = MutationPlan::root(format!("Creating application '{name}'"), Refresh::Roots);
        let repo = Arc::clone(&self.repo);
        let body = NewApplication {
            display_name: name,
            sign_in_audience: Some(audience),
        };
        let summary = self
            .runner
            .run(plan, move || async move {
                repo.create_application(&body).await
            })
            .await?;
        Ok(Outcome::Completed(summary))
    }

    /// Renames the application at `path`.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn rename(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        if !path.is_application_root() {
            return Err(DirectoryError::InvalidInput(format!(
                "not an application: {path}"
            )));
        }
        let node = ready_node(&self.sync, path).await?;

        let Some(name) = self
            .prompter
            .input(
                InputRequest::new("New display name")
                    .with_default(&node.label)
                    .with_validator(&validate::display_name),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        if name == node.label {
            return Ok(Outcome::Completed(()));
        }

        let plan = MutationPlan::node(
            format!("Renaming '{}' to '{name}'", node.label),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = node.app;
        self.runner
            .run(plan, move || async move {
                let patch = ApplicationPatch {
                    display_name: Some(name),
                    ..Default::default()
                };
                repo.write_fields(&app, &patch).await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Deletes the application at `path` after confirmation.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        if !path.is_application_root() {
            return Err(DirectoryError::InvalidInput(format!(
                "not an application: {path}"
            )));
        }
        let node = ready_node(&self.sync, path).await?;

        let question = format!(
            "Permanently delete application '{}'? This cannot be undone.",
            node.label
        );
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let plan = MutationPlan::node(
            format!("Deleting application '{}'", node.label),
            path.clone(),
            Refresh::Roots,
        );
        let repo = Arc::clone(&self.repo);
        let app = node.app;
        self.runner
            .run(plan, move || async move { repo.delete_application(&app).await })
            .await?;
        Ok(Outcome::Completed(()))
    }
}
