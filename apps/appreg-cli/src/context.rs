//! Wires one CLI invocation to a directory: repository, synchronizer,
//! services, and the helpers commands use to turn arguments into tree paths.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use appreg_core::model::{
    AllowedMemberType, AppRole, ConsentType, PasswordCredential, PermissionScope,
};
use appreg_core::{DirectoryRepository, ObjectId};
use appreg_graph::{
    GraphClient, GraphDirectoryRepository, MemoryDirectoryRepository, StaticTokenProvider,
};
use appreg_services::Services;
use appreg_tree::{NodeData, NodeKind, NodePath, NodeSnapshot, TreeSynchronizer};
use dialoguer::Select;

use crate::config::Settings;
use crate::error::{CliError, CliResult};
use crate::observer::PrinterObserver;
use crate::prompter::DialoguerPrompter;
use crate::GlobalArgs;

pub struct Context {
    pub sync: Arc<TreeSynchronizer>,
    pub services: Services,
    pub settings: Settings,
}

impl Context {
    /// Builds the full stack for one invocation. Online mode requires a
    /// token; offline mode runs against a seeded in-memory directory.
    pub async fn connect(global: &GlobalArgs) -> CliResult<Self> {
        let settings = Settings::resolve(global)?;

        let repo: Arc<dyn DirectoryRepository> = if settings.offline {
            Arc::new(demo_directory().await)
        } else {
            let token = settings
                .token
                .clone()
                .ok_or_else(|| CliError::Auth("no access token configured".to_string()))?;
            let client = GraphClient::new(
                Arc::new(StaticTokenProvider::new(token)),
                &settings.graph_url,
            )?;
            Arc::new(GraphDirectoryRepository::new(client))
        };

        let sync = Arc::new(TreeSynchronizer::new(Arc::clone(&repo)));
        let services = Services::new(
            Arc::clone(&sync),
            repo,
            Arc::new(PrinterObserver),
            Arc::new(DialoguerPrompter),
        );

        Ok(Self {
            sync,
            services,
            settings,
        })
    }

    /// Loads the root level and finds one application by object id, appId,
    /// or display name.
    pub async fn find_app(&self, needle: &str) -> CliResult<NodeSnapshot> {
        let roots = self.sync.load_roots().await?;
        if roots.is_empty() {
            return Err(CliError::NotFound(
                "no applications are visible to this account".to_string(),
            ));
        }

        if let Ok(id) = needle.parse::<ObjectId>() {
            if let Some(root) = roots.iter().find(|r| r.app == id) {
                return Ok(root.clone());
            }
        }
        if let Some(root) = roots.iter().find(|r| {
            r.data
                .as_application()
                .is_some_and(|a| a.app_id.to_string() == needle)
        }) {
            return Ok(root.clone());
        }

        let named: Vec<&NodeSnapshot> = roots
            .iter()
            .filter(|r| r.label.eq_ignore_ascii_case(needle))
            .collect();
        match named.len() {
            1 => Ok(named[0].clone()),
            0 => Err(CliError::NotFound(format!(
                "no application matches '{needle}'. Known applications: {}",
                sample_labels(&roots)
            ))),
            n => Err(CliError::Validation(format!(
                "'{needle}' matches {n} applications; use the object id instead"
            ))),
        }
    }

    /// Materializes one of the application's child groups and returns its
    /// path. Flows and child picks expect the group to be in the cache.
    pub async fn group(&self, root: &NodeSnapshot, kind: NodeKind) -> CliResult<NodePath> {
        let path = root.path.child(kind);
        self.sync.ensure_path(&path).await?;
        Ok(path)
    }

    /// Resolves a group's children and picks one, either by matching the
    /// given needle or by asking interactively. `Ok(None)` means the user
    /// cancelled the pick.
    pub async fn pick_child(
        &self,
        group: &NodePath,
        needle: Option<&str>,
        what: &str,
    ) -> CliResult<Option<NodeSnapshot>> {
        let children = self.sync.resolve_children(group).await?;
        if children.is_empty() {
            return Err(CliError::NotFound(format!(
                "the application has no {what} entries"
            )));
        }

        let Some(needle) = needle else {
            return self.pick_interactively(&children, what);
        };

        let exact: Vec<&NodeSnapshot> = children
            .iter()
            .filter(|c| {
                c.local_value.as_deref() == Some(needle)
                    || c.label.eq_ignore_ascii_case(needle)
                    || secondary_value(c).is_some_and(|v| v.eq_ignore_ascii_case(needle))
            })
            .collect();
        match exact.len() {
            1 => return Ok(Some(exact[0].clone())),
            0 => {}
            n => {
                return Err(CliError::Validation(format!(
                    "'{needle}' matches {n} {what} entries; use the id instead"
                )))
            }
        }

        // Fall back to an id prefix, the way one pastes half a UUID.
        let prefixed: Vec<&NodeSnapshot> = children
            .iter()
            .filter(|c| c.local_value.as_deref().is_some_and(|v| v.starts_with(needle)))
            .collect();
        match prefixed.len() {
            1 => Ok(Some(prefixed[0].clone())),
            0 => Err(CliError::NotFound(format!(
                "no {what} matches '{needle}'. Available: {}",
                sample_labels(&children)
            ))),
            n => Err(CliError::Validation(format!(
                "'{needle}' is a prefix of {n} {what} ids; spell out more of the id"
            ))),
        }
    }

    fn pick_interactively(
        &self,
        children: &[NodeSnapshot],
        what: &str,
    ) -> CliResult<Option<NodeSnapshot>> {
        if !atty::is(atty::Stream::Stdin) {
            return Err(CliError::Validation(format!(
                "pass the {what} to target, or run in an interactive terminal"
            )));
        }

        let items: Vec<String> = children
            .iter()
            .map(|c| match &c.description {
                Some(description) => format!("{} ({description})", c.label),
                None => c.label.clone(),
            })
            .collect();
        let choice = Select::new()
            .with_prompt(format!("Which {what}?"))
            .items(&items)
            .default(0)
            .interact_opt()
            .map_err(|e| CliError::Io(e.to_string()))?;

        Ok(choice.map(|index| children[index].clone()))
    }
}

/// Wire values a user is likely to type that are not the node's label:
/// role and scope values, owner principal names.
fn secondary_value(snapshot: &NodeSnapshot) -> Option<&str> {
    match &snapshot.data {
        NodeData::Role(role) => role.value.as_deref(),
        NodeData::Scope(scope) => scope.value.as_deref(),
        NodeData::Owner(owner) => owner.user_principal_name.as_deref(),
        _ => None,
    }
}

fn sample_labels(nodes: &[NodeSnapshot]) -> String {
    const SHOWN: usize = 8;
    let mut labels: Vec<&str> = nodes.iter().take(SHOWN).map(|n| n.label.as_str()).collect();
    if nodes.len() > SHOWN {
        labels.push("...");
    }
    labels.join(", ")
}

/// The directory behind `--offline`: two applications, one of them fleshed
/// out enough to try every command against.
async fn demo_directory() -> MemoryDirectoryRepository {
    let repo = MemoryDirectoryRepository::new();
    let payroll = repo.seed_application("Payroll Portal").await;
    repo.seed_application("Device Inventory").await;
    let ana = repo.seed_user("ana@contoso.example", "Ana Bell").await;

    repo.update_application(&payroll, |app| {
        app.app_roles.push(AppRole {
            id: Uuid::new_v4(),
            allowed_member_types: vec![AllowedMemberType::User],
            description: Some("Read payroll reports".to_string()),
            display_name: Some("Report reader".to_string()),
            is_enabled: true,
            value: Some("Reports.Read".to_string()),
        });
        app.app_roles.push(AppRole {
            id: Uuid::new_v4(),
            allowed_member_types: vec![AllowedMemberType::Application],
            description: Some("Export raw payroll data".to_string()),
            display_name: Some("Exporter".to_string()),
            is_enabled: false,
            value: Some("Data.Export".to_string()),
        });
        app.scopes.push(PermissionScope {
            id: Uuid::new_v4(),
            value: Some("Payslips.Read".to_string()),
            consent: ConsentType::Admin,
            is_enabled: true,
            admin_consent_display_name: Some("Read payslips".to_string()),
            admin_consent_description: Some("Allows reading payslip documents".to_string()),
            user_consent_display_name: None,
            user_consent_description: None,
        });
        app.password_credentials.push(PasswordCredential {
            key_id: Uuid::new_v4(),
            display_name: Some("ci secret".to_string()),
            start_date_time: Some(Utc::now()),
            end_date_time: Some(Utc::now() + Duration::days(90)),
            hint: None,
            secret_text: None,
        });
        app.redirect_uris
            .push("https://payroll.contoso.example/auth/callback".to_string());
        app.implicit_grant.enable_id_token_issuance = Some(true);
        app.owners.push(ana);
    })
    .await;

    repo
}
