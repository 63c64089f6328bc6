//! Guided flows for client secrets and certificates.
//!
//! Secrets can be added and deleted; certificates only deleted, since
//! uploading key material is out of scope for the cache. Deleting either
//! kind goes through the same flow, dispatched on the node kind.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use appreg_core::model::PasswordCredential;
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationPlan, MutationRunner, NodeKind, NodePath, Refresh, TreeSynchronizer,
};

use crate::prompt::{InputRequest, Prompter};
use crate::{arrays, parent_of, ready_node, validate, Outcome};

enum Target {
    Password(Uuid),
    Certificate(Uuid),
}

pub struct CredentialService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl CredentialService {
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

    /// Registers a new client secret under the credential group at
    /// `group`. The expiry is bounded by
    /// [`validate::MAX_CREDENTIAL_LIFETIME_DAYS`].
    #[instrument(skip_all, fields(group = %group))]
    pub async fn add_secret(&self, group: &NodePath) -> DirectoryResult<Outcome> {
        ready_node(&self.sync, group).await?;

        let Some(label) = self
            .prompter
            .input(InputRequest::new("Secret description").with_validator(&validate::display_name))
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(expires) = self
            .prompter
            .input(
                InputRequest::new("Expires on")
                    .with_placeholder("YYYY-MM-DD")
                    .with_validator(&validate::expiry_date),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let end = validate::parse_expiry(&expires)?;

        let credential = PasswordCredential {
            key_id: Uuid::new_v4(),
            display_name: Some(label.clone()),
            start_date_time: Some(Utc::now()),
            end_date_time: Some(end),
            hint: None,
            secret_text: None,
        };

        let plan = MutationPlan::node(
            format!("Adding client secret '{label}'"),
            group.clone(),
            Refresh::Subtree(group.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = group.app;
        self.runner
            .run(plan, move || async move {
                arrays::modify_passwords(repo.as_ref(), &app, move |credentials| {
                    credentials.push(credential);
                    Ok(())
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Deletes the secret or certificate at `path` after confirmation.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let target = match node.kind {
            NodeKind::PasswordCredential => node
                .data
                .as_password()
                .map(|c| Target::Password(c.key_id)),
            NodeKind::CertificateCredential => node
                .data
                .as_certificate()
                .map(|c| Target::Certificate(c.key_id)),
            _ => None,
        };
        let Some(target) = target else {
            return Err(DirectoryError::InvalidInput(format!(
                "not a credential: {path}"
            )));
        };

        let label = node.label.clone();
        let question = format!(
            "Delete credential '{label}'? Clients authenticating with it will be locked out."
        );
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let group = parent_of(path)?;
        let plan = MutationPlan::node_and_parent(
            format!("Deleting credential '{label}'"),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let missing = format!("credential '{label}' no longer exists");
        match target {
            Target::Password(key_id) => {
                self.runner
                    .run(plan, move || async move {
                        arrays::modify_passwords(repo.as_ref(), &app, move |credentials| {
                            let before = credentials.len();
                            credentials.retain(|c| c.key_id != key_id);
                            if credentials.len() == before {
                                return Err(DirectoryError::NotFound(missing));
                            }
                            Ok(())
                        })
                        .await
                    })
                    .await?;
            }
            Target::Certificate(key_id) => {
                self.runner
                    .run(plan, move || async move {
                        arrays::modify_certificates(repo.as_ref(), &app, move |credentials| {
                            let before = credentials.len();
                            credentials.retain(|c| c.key_id != key_id);
                            if credentials.len() == before {
                                return Err(DirectoryError::NotFound(missing));
                            }
                            Ok(())
                        })
                        .await
                    })
                    .await?;
            }
        }
        Ok(Outcome::Completed(()))
    }
}
