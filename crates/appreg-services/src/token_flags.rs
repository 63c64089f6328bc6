//! Toggle flows for the two implicit grant flags under
//! `web.implicitGrantSettings`.

use std::sync::Arc;

use tracing::instrument;

use appreg_core::model::{ApplicationPatch, ImplicitGrantSettings, WebApplication};
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{MutationPlan, MutationRunner, NodePath, Refresh, TreeSynchronizer};

use crate::prompt::Prompter;
use crate::{ready_node, Outcome};

pub struct TokenFlowService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl TokenFlowService {
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

    /// Flips the flag at `path`. The patch carries only the flag being
    /// changed, so the other one keeps its remote value. Turning a flag
    /// off asks for confirmation first.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn toggle(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let Some((flow, enabled)) = node.data.as_token_flag() else {
            return Err(DirectoryError::InvalidInput(format!(
                "not a token issuance flag: {path}"
            )));
        };

        if enabled {
            let question = format!(
                "Disable {}? Clients using the implicit flow stop receiving these tokens.",
                flow.describe()
            );
            let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
                return Ok(Outcome::Aborted);
            };
            if !confirmed {
                return Ok(Outcome::Aborted);
            }
        }

        let verb = if enabled { "Disabling" } else { "Enabling" };
        let plan = MutationPlan::node(
            format!("{verb} {}", flow.describe()),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        self.runner
            .run(plan, move || async move {
                let patch = ApplicationPatch {
                    web: Some(WebApplication {
                        redirect_uris: None,
                        implicit_grant_settings: Some(ImplicitGrantSettings::single_flag(
                            flow, !enabled,
                        )),
                    }),
                    ..Default::default()
                };
                repo.write_fields(&app, &patch).await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }
}
