//! Guided flows for the `appRoles` collection.
//!
//! Uniqueness of the role value is checked twice: against cached siblings
//! while the user types (fast feedback, no remote call), and again against
//! the freshly read array inside the write, which is the authoritative
//! check.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use appreg_core::model::{AllowedMemberType, AppRole};
use appreg_core::{DirectoryError, DirectoryRepository, DirectoryResult};
use appreg_tree::{
    MutationPlan, MutationRunner, NodePath, NodeSnapshot, Refresh, TreeSynchronizer,
};

use crate::prompt::{InputRequest, Prompter};
use crate::{arrays, parent_of, ready_node, validate, Outcome};

const MEMBER_TYPE_OPTIONS: [&str; 3] = ["Users and groups", "Applications", "Both"];

pub struct AppRoleService {
    sync: Arc<TreeSynchronizer>,
    repo: Arc<dyn DirectoryRepository>,
    runner: Arc<MutationRunner>,
    prompter: Arc<dyn Prompter>,
}

impl AppRoleService {
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

    /// Adds a role under the `appRoles` group at `group`.
    #[instrument(skip_all, fields(group = %group))]
    pub async fn add(&self, group: &NodePath) -> DirectoryResult<Outcome> {
        ready_node(&self.sync, group).await?;
        let siblings = self.sync.resolve_children(group).await?;
        let taken = sibling_values(&siblings);

        let Some(display_name) = self
            .prompter
            .input(InputRequest::new("Role display name").with_validator(&validate::display_name))
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let value_check = move |input: &str| {
            validate::claim_value(input)
                .or_else(|| validate::unique_among(input, &taken, "role value"))
        };
        let Some(value) = self
            .prompter
            .input(
                InputRequest::new("Role value")
                    .with_placeholder("e.g. Task.Read")
                    .with_validator(&value_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(description) = self
            .prompter
            .input(InputRequest::new("Description").with_validator(&validate::required))
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(member_choice) = self
            .prompter
            .select("Allowed member types", &member_type_options(), 0)
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(enabled) = self
            .prompter
            .confirm("Enable the role right away?", true)
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let role = AppRole {
            id: Uuid::new_v4(),
            allowed_member_types: member_types_at(member_choice),
            description: Some(description),
            display_name: Some(display_name.clone()),
            is_enabled: enabled,
            value: Some(value),
        };

        let plan = MutationPlan::node(
            format!("Adding app role '{display_name}'"),
            group.clone(),
            Refresh::Subtree(group.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = group.app;
        self.runner
            .run(plan, move || async move {
                arrays::modify_roles(repo.as_ref(), &app, move |roles| {
                    if let Some(value) = &role.value {
                        if roles
                            .iter()
                            .any(|r| r.value.as_deref() == Some(value.as_str()))
                        {
                            return Err(DirectoryError::InvalidInput(format!(
                                "role value '{value}' is already in use"
                            )));
                        }
                    }
                    roles.push(role);
                    Ok(())
                })
                .await
            })
            .await?;
        Ok(Outcome::Completed(()))
    }

    /// Edits name, value, description and member types of the role at
    /// `path`. The enabled flag is left alone; that is its own flow.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn edit(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let role = role_of(&node)?;
        let group = parent_of(path)?;
        let siblings = self.sync.resolve_children(&group).await?;
        let mut taken = sibling_values(&siblings);
        if let Some(own) = &role.value {
            taken.retain(|v| !v.eq_ignore_ascii_case(own));
        }

        let Some(display_name) = self
            .prompter
            .input(
                InputRequest::new("Role display name")
                    .with_default(&role.label())
                    .with_validator(&validate::display_name),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let current_value = role.value.clone().unwrap_or_default();
        let value_check = move |input: &str| {
            validate::claim_value(input)
                .or_else(|| validate::unique_among(input, &taken, "role value"))
        };
        let Some(value) = self
            .prompter
            .input(
                InputRequest::new("Role value")
                    .with_default(&current_value)
                    .with_validator(&value_check),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let current_description = role.description.clone().unwrap_or_default();
        let Some(description) = self
            .prompter
            .input(
                InputRequest::new("Description")
                    .with_default(&current_description)
                    .with_validator(&validate::required),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };
        let Some(member_choice) = self
            .prompter
            .select(
                "Allowed member types",
                &member_type_options(),
                member_default(&role.allowed_member_types),
            )
            .await?
        else {
            return Ok(Outcome::Aborted);
        };

        let updated = AppRole {
            id: role.id,
            allowed_member_types: member_types_at(member_choice),
            description: Some(description),
            display_name: Some(display_name.clone()),
            is_enabled: role.is_enabled,
            value: Some(value),
        };

        let plan = MutationPlan::node(
            format!("Updating app role '{display_name}'"),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let missing = missing_message(&role.label());
        self.runner
            .run(plan, move || async move {
                arrays::modify_roles(repo.as_ref(), &app, move |roles| {
                    let id = updated.id;
                    match roles.iter_mut().find(|r| r.id == id) {
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

    /// Enables or disables the role at `path`. Disabling asks for
    /// confirmation first since assignments relying on the role stop
    /// working.
    #[instrument(skip_all, fields(path = %path, enabled))]
    pub async fn set_enabled(&self, path: &NodePath, enabled: bool) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let role = role_of(&node)?;
        if role.is_enabled == enabled {
            return Ok(Outcome::Completed(()));
        }
        if !enabled {
            let question = format!(
                "Disable role '{}'? Assignments that rely on it stop working.",
                role.label()
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
            format!("{verb} app role '{}'", role.label()),
            path.clone(),
            Refresh::Subtree(path.clone()),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let id = role.id;
        let missing = missing_message(&role.label());
        self.runner
            .run(plan, move || async move {
                arrays::modify_roles(repo.as_ref(), &app, move |roles| {
                    match roles.iter_mut().find(|r| r.id == id) {
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

    /// Deletes the role at `path`. The directory refuses to drop an
    /// enabled role, so for one the flow offers to disable and delete in
    /// a single operation: two writes, the second against the state the
    /// first produced.
    #[instrument(skip_all, fields(path = %path))]
    pub async fn delete(&self, path: &NodePath) -> DirectoryResult<Outcome> {
        let node = ready_node(&self.sync, path).await?;
        let role = role_of(&node)?;
        let label = role.label();

        let question = if role.is_enabled {
            format!("Role '{label}' is enabled. Disable it and delete?")
        } else {
            format!("Delete role '{label}'?")
        };
        let Some(confirmed) = self.prompter.confirm(&question, false).await? else {
            return Ok(Outcome::Aborted);
        };
        if !confirmed {
            return Ok(Outcome::Aborted);
        }

        let group = parent_of(path)?;
        let plan = MutationPlan::node_and_parent(
            format!("Deleting app role '{label}'"),
            path.clone(),
            Refresh::Subtree(group),
        );
        let repo = Arc::clone(&self.repo);
        let app = path.app;
        let id = role.id;
        let was_enabled = role.is_enabled;
        let missing = missing_message(&label);
        self.runner
            .run(plan, move || async move {
                if was_enabled {
                    let disable_missing = missing.clone();
                    arrays::modify_roles(repo.as_ref(), &app, move |roles| {
                        match roles.iter_mut().find(|r| r.id == id) {
                            Some(slot) => {
                                slot.is_enabled = false;
                                Ok(())
                            }
                            None => Err(DirectoryError::NotFound(disable_missing)),
                        }
                    })
                    .await?;
                }
                arrays::modify_roles(repo.as_ref(), &app, move |roles| {
                    let before = roles.len();
                    roles.retain(|r| r.id != id);
                    if roles.len() == before {
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

fn role_of(node: &NodeSnapshot) -> DirectoryResult<AppRole> {
    node.data.as_role().cloned().ok_or_else(|| {
        DirectoryError::InvalidInput(format!("not an app role: {}", node.path))
    })
}

fn sibling_values(siblings: &[NodeSnapshot]) -> Vec<String> {
    siblings
        .iter()
        .filter_map(|s| s.data.as_role())
        .filter_map(|r| r.value.clone())
        .collect()
}

fn missing_message(label: &str) -> String {
    format!("app role '{label}' no longer exists")
}

fn member_type_options() -> Vec<String> {
    MEMBER_TYPE_OPTIONS.iter().map(|s| (*s).to_string()).collect()
}

fn member_types_at(choice: usize) -> Vec<AllowedMemberType> {
    match choice {
        1 => vec![AllowedMemberType::Application],
        2 => vec![AllowedMemberType::User, AllowedMemberType::Application],
        _ => vec![AllowedMemberType::User],
    }
}

fn member_default(types: &[AllowedMemberType]) -> usize {
    let user = types.contains(&AllowedMemberType::User);
    let application = types.contains(&AllowedMemberType::Application);
    match (user, application) {
        (true, true) => 2,
        (false, true) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_type_choices_round_trip() {
        for choice in 0..MEMBER_TYPE_OPTIONS.len() {
            assert_eq!(member_default(&member_types_at(choice)), choice);
        }
    }
}
