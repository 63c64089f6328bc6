//! Guided flows for the delegated permission scopes under
//! `api.oauth2PermissionScopes`. Same shape as the app role flows: cached
//! uniqueness check while typing, authoritative check inside the write.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use appreg_core::model::{ConsentType, PermissionScope};
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationPlan, MutationRunner, NodePath, NodeSnapshot, Refresh, TreeSynchronizer,
};

use crate::prompt::{InputRequest, Prompter};
use crate::{arrays, parent_of, ready_node, validate, Outcome};

pub struct PermissionScopeService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl PermissionScopeService {
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

    /// Adds a scope under the scope group at `group`.
    #[instrument(skip_all, fields(group = %group))]
    pub async fn add(&self, group: &NodePath) -> DirectoryResult<Outcome> {
        ready_node(&self.sync, group).await?;
        let siblings = self.sync.resolve_children(group).await?;
        let taken = sibling_values(&siblings);

        let value_check = move |input: &str| {
            validate::claim_value(input)
                .or_else(|| validate::unique_among(input, &taken, "scope name"))
        };
        let Some(value) = self
            .prompter
            .input(
                InputRequest::new("Scope name")
                    .with_placeholder("e.g. Tasks.Read")
                    .with_validator(&value_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(consent_choice) = self
            .prompter
            .select("Who can consent", &consent_options(), 0)
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(display_name) = self
            .prompter
            .input(
                InputRequest::new("Admin consent display name")
                    .with_validator(&validate::display_name),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(description) = self
            .prompter
            .input(
                InputRequest::new("Admin consent description").with_validator(&validate::required),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(enabled) = self
            .prompter
            .confirm("Enable the scope right away?", true)
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let scope = PermissionScope {
            id: Uuid::new_v4(),
            value: Some(value.clone()),
            consent: consent_at(consent_choice),
            is_enabled: enabled,
            admin_consent_display_name: Some(display_name),
            admin_consent_description: Some(description),
            user_consent_display_name: None,
            user_consent_description: None,
        };

        let plan = MutationPlan::node(
            format!("Adding permission scope '{value}'"),
            group.clone(),
            Refresh::Subtree(group.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = group.app;
        self.runner
            .run(plan, move || async move {
                arrays::modify_scopes(repo.as_ref(), &app, move |scopes| {
                    if let Some(value) = &scope.value {
                        if scopes
                            .iter()
                            .any(|s| s.value.as_deref() == Some(value.as_str()))
                        {
                            return Err(DirectoryError::InvalidInput(format!(
                                "scope name '{value}' is already in use"
                            )));
                        }
                    }
                    scopes.push(scope);
                    Ok(())
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Edits name, consent setting and admin consent texts of the scope at
    /// `path`. User consent texts and the enabled flag are carried over.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn edit(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let scope = scope_of(&node)?;
        let group = parent_of(path)?;
        let siblings = self.sync.resolve_children(&group).await?;
        let mut taken = sibling_values(&siblings);
        if let Some(own) = &scope.value {
            taken.retain(|v| !v.eq_ignore_ascii_case(own));
        }

        let current_value = scope.value.clone().unwrap_or_default();
        let value_check = move |input: &str| {
            validate::claim_value(input)
                .or_else(|| validate::unique_among(input, &taken, "scope name"))
        };
        let Some(value) = self
            .prompter
            .input(
                InputRequest::new("Scope name")
                    .with_default(&current_value)
                    .with_validator(&value_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(consent_choice) = self
            .prompter
            .select(
                "Who can consent",
                &consent_options(),
                consent_default(scope.consent),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let current_display = scope.admin_consent_display_name.clone().unwrap_or_default();
        let Some(display_name) = self
            .prompter
            .input(
                InputRequest::new("Admin consent display name")
                    .with_default(&current_display)
                    .with_validator(&validate::display_name),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let current_description = scope.admin_consent_description.clone().unwrap_or_default();
        let Some(description) = self
            .prompter
            .input(
                InputRequest::new("Admin consent description")
                    .with_default(&current_description)
                    .with_validator(&validate::required),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let updated = PermissionScope {
            id: scope.id,
            value: Some(value.clone()),
            consent: consent_at(consent_choice),
            is_enabled: scope.is_enabled,
            admin_consent_display_name: Some(display_name),
            admin_consent_description: Some(description),
            user_consent_display_name: scope.user_consent_display_name.clone(),
            user_consent_description: scope.user_consent_description.clone(),
        };

        let plan = MutationPlan::node(
            format!("Updating permission scope '{value}'"),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let missing = missing_message(&scope.label());
        self.runner
            .run(plan, move || async move {
                arrays::modify_scopes(repo.as_ref(), &app, move |scopes| {
                    let id = updated.id;
                    match scopes.iter_mut().find(|s| s.id == id) {
                        Some(slot) => {
                            *slot = updated;
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

    /// Enables or disables the scope at `path`, confirming before a
    /// disable.
    #[instrument(skip_all, fields(path = %path, enabled))]
    pub async fn set_enabled(&self, path: &NodePath, enabled: bool) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let scope = scope_of(&node)?;
        if scope.is_enabled == enabled {
            return Ok(Outcome::Completed(()));
        }
        if !enabled {
            let question = format!(
                "Disable scope '{}'? Clients granted it lose access.",
                scope.label()
            );
            let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
                return Ok(Outcome::Aborted);
            };
            if !confirmed {
                return Ok(Outcome::Aborted);
            }
        }

        let verb = if enabled { "Enabling" } else { "Disabling" };
        let plan = MutationPlan::node(
            format!("{verb} permission scope '{}'", scope.label()),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let id = scope.id;
        let missing = missing_message(&scope.label());
        self.runner
            .run(plan, move || async move {
                arrays::modify_scopes(repo.as_ref(), &app, move |scopes| {
                    match scopes.iter_mut().find(|s| s.id == id) {
                        Some(slot) => {
                            slot.is_enabled = enabled;
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

    /// Deletes the scope at `path`, disabling first in the same operation
    /// when it is still enabled.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let scope = scope_of(&node)?;
        let label = scope.label();

        let question = if scope.is_enabled {
            format!("Scope '{label}' is enabled. Disable it and delete?")
        } else {
            format!("Delete scope '{label}'?")
        };
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let group = parent_of(path)?;
        let plan = MutationPlan::node_and_parent(
            format!("Deleting permission scope '{label}'"),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let id = scope.id;
        let was_enabled = scope.is_enabled;
        let missing = missing_message(&label);
        self.runner
            .run(plan, move || async move {
                if was_enabled {
                    let disable_missing = missing.clone();
                    arrays::modify_scopes(repo.as_ref(), &app, move |scopes| {
                        match scopes.iter_mut().find(|s| s.id == id) {
                            Some(slot) => {
                                slot.is_enabled = false;
                                Ok(())
                            }
                            None => Err(DirectoryError::NotFound(disable_missing)),
                        }
                    })
                    .await?;
                }
                arrays::modify_scopes(repo.as_ref(), &app, move |scopes| {
                    let before = scopes.len();
                    scopes.retain(|s| s.id != id);
                    if scopes.len() == before {
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

fn scope_of(node: &NodeSnapshot) -> DirectoryResult<PermissionScope> {
    node.data.as_scope().cloned().ok_or_else(|| {
        DirectoryError::InvalidInput(format!("not a permission scope: {}", node.path))
    })
}

fn sibling_values(siblings: &[NodeSnapshot]) -> Vec<String> {
    siblings
        .iter()
        .filter_map(|s| s.data.as_scope())
        .filter_map(|s| s.value.clone())
        .collect()
}

fn missing_message(label: &str) -> String {
    format!("permission scope '{label}' no longer exists")
}

fn consent_options() -> Vec<String> {
    [ConsentType::Admin, ConsentType::User]
        .iter()
        .map(|c| c.describe().to_string())
        .collect()
}

fn consent_at(choice: usize) -> ConsentType {
    if choice == 1 {
        ConsentType::User
    } else {
        ConsentType::Admin
    }
}

fn consent_default(consent: ConsentType) -> usize {
    match consent {
        ConsentType::Admin => 0,
        ConsentType::User => 1,
    }
}
