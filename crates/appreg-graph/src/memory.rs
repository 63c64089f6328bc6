//! In-memory [`DirectoryRepository`] for tests and offline runs.
//!
//! Behaves like the real backend for the mirrored slice of the application
//! object, including the rules that shape the mutation protocol: array
//! facets are replaced wholesale by a patch, and an enabled role or scope
//! cannot be removed in the same write that would delete it.
//!
//! Test hooks: a call journal, one-shot failure injection per operation,
//! and a pause gate that holds an operation open so tests can observe
//! intermediate states deterministically.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{watch, Mutex};

use appreg_core::fields::ApplicationField;
use appreg_core::model::{
    ApiApplication, AppRole, ApplicationFacet, ApplicationPatch, ApplicationSummary,
    ImplicitGrantSettings, KeyCredential, NewApplication, OwnerSummary, PasswordCredential,
    PermissionScope, SignInAudience, WebApplication,
};
use appreg_core::{AppId, DirectoryError, DirectoryRepository, DirectoryResult, ObjectId};
use async_trait::async_trait;

/// One recorded repository call with the arguments it received.
#[derive(Debug, Clone)]
pub enum RepoCall {
    ListApplications,
    ReadFields {
        id: ObjectId,
        fields: Vec<ApplicationField>,
    },
    WriteFields {
        id: ObjectId,
        patch: ApplicationPatch,
    },
    CreateApplication {
        display_name: String,
    },
    DeleteApplication {
        id: ObjectId,
    },
    ListOwners {
        id: ObjectId,
    },
    AddOwner {
        id: ObjectId,
        user: ObjectId,
    },
    RemoveOwner {
        id: ObjectId,
        owner: ObjectId,
    },
    FindUser {
        principal: String,
    },
}

impl RepoCall {
    /// Stable name used by failure injection and pause gates.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ListApplications => "list_applications",
            Self::ReadFields { .. } => "read_fields",
            Self::WriteFields { .. } => "write_fields",
            Self::CreateApplication { .. } => "create_application",
            Self::DeleteApplication { .. } => "delete_application",
            Self::ListOwners { .. } => "list_owners",
            Self::AddOwner { .. } => "add_owner",
            Self::RemoveOwner { .. } => "remove_owner",
            Self::FindUser { .. } => "find_user",
        }
    }
}

/// Remote-side state of one application registration.
#[derive(Debug, Clone)]
pub struct StoredApplication {
    pub id: ObjectId,
    pub app_id: AppId,
    pub display_name: String,
    pub sign_in_audience: SignInAudience,
    pub app_roles: Vec<AppRole>,
    pub password_credentials: Vec<PasswordCredential>,
    pub key_credentials: Vec<KeyCredential>,
    pub scopes: Vec<PermissionScope>,
    pub redirect_uris: Vec<String>,
    pub implicit_grant: ImplicitGrantSettings,
    pub owners: Vec<ObjectId>,
}

impl StoredApplication {
    fn new(display_name: &str) -> Self {
        Self {
            id: ObjectId::new(),
            app_id: AppId::new(),
            display_name: display_name.to_string(),
            sign_in_audience: SignInAudience::default(),
            app_roles: Vec::new(),
            password_credentials: Vec::new(),
            key_credentials: Vec::new(),
            scopes: Vec::new(),
            redirect_uris: Vec::new(),
            implicit_grant: ImplicitGrantSettings::default(),
            owners: Vec::new(),
        }
    }

    fn summary(&self) -> ApplicationSummary {
        ApplicationSummary {
            id: self.id,
            app_id: self.app_id,
            display_name: Some(self.display_name.clone()),
        }
    }
}

#[derive(Default)]
struct MemoryState {
    apps: HashMap<ObjectId, StoredApplication>,
    users: Vec<OwnerSummary>,
    journal: Vec<RepoCall>,
    failures: HashMap<String, VecDeque<DirectoryError>>,
    pauses: HashMap<String, watch::Receiver<bool>>,
}

/// Releases one pause gate. Dropping the handle releases it as well.
pub struct PauseHandle {
    tx: watch::Sender<bool>,
}

impl PauseHandle {
    pub fn release(&self) {
        let _ = self.tx.send(true);
    }
}

/// See the module docs.
#[derive(Default)]
pub struct MemoryDirectoryRepository {
    inner: Mutex<MemoryState>,
}

impl MemoryDirectoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an application with the given name and returns its object id.
    pub async fn seed_application(&self, display_name: &str) -> ObjectId {
        let app = StoredApplication::new(display_name);
        let id = app.id;
        self.inner.lock().await.apps.insert(id, app);
        id
    }

    /// Adds a directory user that `find_user` and owner listings resolve.
    pub async fn seed_user(&self, principal: &str, display_name: &str) -> ObjectId {
        let user = OwnerSummary {
            id: ObjectId::new(),
            display_name: Some(display_name.to_string()),
            user_principal_name: Some(principal.to_string()),
        };
        let id = user.id;
        self.inner.lock().await.users.push(user);
        id
    }

    /// Mutates stored state directly, bypassing the repository contract.
    /// Used by tests to arrange data and to simulate out-of-band changes.
    pub async fn update_application<F>(&self, id: &ObjectId, f: F)
    where
        F: FnOnce(&mut StoredApplication),
    {
        let mut state = self.inner.lock().await;
        if let Some(app) = state.apps.get_mut(id) {
            f(app);
        }
    }

    /// Snapshot of one stored application.
    pub async fn application(&self, id: &ObjectId) -> Option<StoredApplication> {
        self.inner.lock().await.apps.get(id).cloned()
    }

    /// Everything the repository has been asked to do, in order.
    pub async fn journal(&self) -> Vec<RepoCall> {
        self.inner.lock().await.journal.clone()
    }

    /// Number of journaled calls with the given name.
    pub async fn calls_named(&self, name: &str) -> usize {
        self.inner
            .lock()
            .await
            .journal
            .iter()
            .filter(|c| c.name() == name)
            .count()
    }

    /// All patches submitted through `write_fields`, in order.
    pub async fn writes(&self) -> Vec<ApplicationPatch> {
        self.inner
            .lock()
            .await
            .journal
            .iter()
            .filter_map(|c| match c {
                RepoCall::WriteFields { patch, .. } => Some(patch.clone()),
                _ => None,
            })
            .collect()
    }

    /// Makes the next call with the given name fail with `err`.
    pub async fn fail_next(&self, op: &str, err: DirectoryError) {
        self.inner
            .lock()
            .await
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(err);
    }

    /// Holds every call with the given name open until the returned handle
    /// is released. The call is journaled only after it passes the gate.
    pub async fn pause(&self, op: &str) -> PauseHandle {
        let (tx, rx) = watch::channel(false);
        self.inner.lock().await.pauses.insert(op.to_string(), rx);
        PauseHandle { tx }
    }

    async fn gate(&self, op: &str) {
        let rx = { self.inner.lock().await.pauses.get(op).cloned() };
        if let Some(mut rx) = rx {
            while !*rx.borrow() {
                // A closed channel means the handle was dropped; proceed.
                if rx.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    /// Journals the call, then applies any injected failure.
    async fn admit(&self, call: RepoCall) -> DirectoryResult<()> {
        self.gate(call.name()).await;
        let mut state = self.inner.lock().await;
        let name = call.name();
        state.journal.push(call);
        if let Some(err) = state
            .failures
            .get_mut(name)
            .and_then(VecDeque::pop_front)
        {
            return Err(err);
        }
        Ok(())
    }
}

fn not_found(id: &ObjectId) -> DirectoryError {
    DirectoryError::NotFound(format!("application {id} does not exist"))
}

/// Mirrors the service-side rule that an enabled entry must be disabled
/// before it can disappear from the array.
fn check_enabled_removal<T, I, E>(
    old: &[T],
    new: &[T],
    id_of: I,
    enabled: E,
    what: &str,
) -> DirectoryResult<()>
where
    I: Fn(&T) -> uuid::Uuid,
    E: Fn(&T) -> bool,
{
    for entry in old {
        let still_present = new.iter().any(|n| id_of(n) == id_of(entry));
        if enabled(entry) && !still_present {
            return Err(DirectoryError::Service {
                code: "Request_BadRequest".into(),
                message: format!(
                    "{what} {} is enabled and cannot be removed; disable it first",
                    id_of(entry)
                ),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl DirectoryRepository for MemoryDirectoryRepository {
    async fn list_applications(&self) -> DirectoryResult<Vec<ApplicationSummary>> {
        self.admit(RepoCall::ListApplications).await?;
        let state = self.inner.lock().await;
        let mut apps: Vec<ApplicationSummary> =
            state.apps.values().map(StoredApplication::summary).collect();
        apps.sort_by(|a, b| a.label().to_lowercase().cmp(&b.label().to_lowercase()));
        Ok(apps)
    }

    async fn read_fields(
        &self,
        id: &ObjectId,
        fields: &[ApplicationField],
    ) -> DirectoryResult<ApplicationFacet> {
        self.admit(RepoCall::ReadFields {
            id: *id,
            fields: fields.to_vec(),
        })
        .await?;
        let state = self.inner.lock().await;
        let app = state.apps.get(id).ok_or_else(|| not_found(id))?;

        let mut facet = ApplicationFacet::default();
        for field in fields {
            match field {
                ApplicationField::DisplayName => {
                    facet.display_name = Some(app.display_name.clone());
                }
                ApplicationField::SignInAudience => {
                    facet.sign_in_audience = Some(app.sign_in_audience);
                }
                ApplicationField::AppRoles => {
                    facet.app_roles = Some(app.app_roles.clone());
                }
                ApplicationField::PasswordCredentials => {
                    facet.password_credentials = Some(app.password_credentials.clone());
                }
                ApplicationField::KeyCredentials => {
                    facet.key_credentials = Some(app.key_credentials.clone());
                }
                ApplicationField::Api => {
                    facet.api = Some(ApiApplication {
                        oauth2_permission_scopes: Some(app.scopes.clone()),
                    });
                }
                ApplicationField::Web => {
                    facet.web = Some(WebApplication {
                        redirect_uris: Some(app.redirect_uris.clone()),
                        implicit_grant_settings: Some(app.implicit_grant),
                    });
                }
                ApplicationField::Id | ApplicationField::AppId => {}
            }
        }
        Ok(facet)
    }

    async fn write_fields(&self, id: &ObjectId, patch: &ApplicationPatch) -> DirectoryResult<()> {
        self.admit(RepoCall::WriteFields {
            id: *id,
            patch: patch.clone(),
        })
        .await?;
        let mut state = self.inner.lock().await;
        let app = state.apps.get_mut(id).ok_or_else(|| not_found(id))?;

        if let Some(roles) = &patch.app_roles {
            check_enabled_removal(&app.app_roles, roles, |r| r.id, |r| r.is_enabled, "app role")?;
            app.app_roles = roles.clone();
        }
        if let Some(api) = &patch.api {
            if let Some(scopes) = &api.oauth2_permission_scopes {
                check_enabled_removal(&app.scopes, scopes, |s| s.id, |s| s.is_enabled, "scope")?;
                app.scopes = scopes.clone();
            }
        }
        if let Some(name) = &patch.display_name {
            app.display_name = name.clone();
        }
        if let Some(audience) = patch.sign_in_audience {
            app.sign_in_audience = audience;
        }
        if let Some(creds) = &patch.password_credentials {
            app.password_credentials = creds.clone();
        }
        if let Some(creds) = &patch.key_credentials {
            app.key_credentials = creds.clone();
        }
        if let Some(web) = &patch.web {
            if let Some(uris) = &web.redirect_uris {
                app.redirect_uris = uris.clone();
            }
            if let Some(grant) = &web.implicit_grant_settings {
                if let Some(v) = grant.enable_id_token_issuance {
                    app.implicit_grant.enable_id_token_issuance = Some(v);
                }
                if let Some(v) = grant.enable_access_token_issuance {
                    app.implicit_grant.enable_access_token_issuance = Some(v);
                }
            }
        }
        Ok(())
    }

    async fn create_application(
        &self,
        new: &NewApplication,
    ) -> DirectoryResult<ApplicationSummary> {
        self.admit(RepoCall::CreateApplication {
            display_name: new.display_name.clone(),
        })
        .await?;
        let mut state = self.inner.lock().await;
        let mut app = StoredApplication::new(&new.display_name);
        if let Some(audience) = new.sign_in_audience {
            app.sign_in_audience = audience;
        }
        let summary = app.summary();
        state.apps.insert(app.id, app);
        Ok(summary)
    }

    async fn delete_application(&self, id: &ObjectId) -> DirectoryResult<()> {
        self.admit(RepoCall::DeleteApplication { id: *id }).await?;
        let mut state = self.inner.lock().await;
        state.apps.remove(id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    async fn list_owners(&self, id: &ObjectId) -> DirectoryResult<Vec<OwnerSummary>> {
        self.admit(RepoCall::ListOwners { id: *id }).await?;
        let state = self.inner.lock().await;
        let app = state.apps.get(id).ok_or_else(|| not_found(id))?;
        Ok(app
            .owners
            .iter()
            .map(|owner| {
                state
                    .users
                    .iter()
                    .find(|u| u.id == *owner)
                    .cloned()
                    .unwrap_or_else(|| OwnerSummary {
                        id: *owner,
                        display_name: None,
                        user_principal_name: None,
                    })
            })
            .collect())
    }

    async fn add_owner(&self, id: &ObjectId, user: &ObjectId) -> DirectoryResult<()> {
        self.admit(RepoCall::AddOwner {
            id: *id,
            user: *user,
        })
        .await?;
        let mut state = self.inner.lock().await;
        let known_user = state.users.iter().any(|u| u.id == *user);
        let app = state.apps.get_mut(id).ok_or_else(|| not_found(id))?;
        if !known_user {
            return Err(DirectoryError::NotFound(format!(
                "directory user {user} does not exist"
            )));
        }
        if app.owners.contains(user) {
            return Err(DirectoryError::Service {
                code: "Request_BadRequest".into(),
                message: "One or more added object references already exist".into(),
            });
        }
        app.owners.push(*user);
        Ok(())
    }

    async fn remove_owner(&self, id: &ObjectId, owner: &ObjectId) -> DirectoryResult<()> {
        self.admit(RepoCall::RemoveOwner {
            id: *id,
            owner: *owner,
        })
        .await?;
        let mut state = self.inner.lock().await;
        let app = state.apps.get_mut(id).ok_or_else(|| not_found(id))?;
        let before = app.owners.len();
        app.owners.retain(|o| o != owner);
        if app.owners.len() == before {
            return Err(DirectoryError::NotFound(format!(
                "{owner} is not an owner of {id}"
            )));
        }
        Ok(())
    }

    async fn find_user(&self, principal: &str) -> DirectoryResult<OwnerSummary> {
        self.admit(RepoCall::FindUser {
            principal: principal.to_string(),
        })
        .await?;
        let state = self.inner.lock().await;
        let by_id: Option<ObjectId> = principal.parse().ok();
        state
            .users
            .iter()
            .find(|u| {
                u.user_principal_name.as_deref() == Some(principal)
                    || by_id.is_some_and(|id| u.id == id)
            })
            .cloned()
            .ok_or_else(|| {
                DirectoryError::NotFound(format!("directory user {principal} does not exist"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, value: &str, enabled: bool) -> AppRole {
        AppRole {
            id: uuid::Uuid::new_v4(),
            allowed_member_types: vec![appreg_core::model::AllowedMemberType::User],
            description: Some(format!("{name} role")),
            display_name: Some(name.to_string()),
            is_enabled: enabled,
            value: Some(value.to_string()),
        }
    }

    #[tokio::test]
    async fn test_read_fields_returns_only_requested_fields() {
        let repo = MemoryDirectoryRepository::new();
        let id = repo.seed_application("Payroll").await;
        let facet = repo
            .read_fields(&id, &[ApplicationField::AppRoles])
            .await
            .unwrap();
        assert_eq!(facet.app_roles, Some(vec![]));
        assert!(facet.display_name.is_none());
        assert!(facet.web.is_none());
    }

    #[tokio::test]
    async fn test_removing_enabled_role_in_one_write_is_rejected() {
        let repo = MemoryDirectoryRepository::new();
        let id = repo.seed_application("Payroll").await;
        repo.update_application(&id, |app| {
            app.app_roles.push(role("Reader", "reader", true));
        })
        .await;

        let patch = ApplicationPatch {
            app_roles: Some(vec![]),
            ..Default::default()
        };
        let err = repo.write_fields(&id, &patch).await.unwrap_err();
        assert!(matches!(err, DirectoryError::Service { .. }));

        // Unchanged remote state after the rejected write.
        let app = repo.application(&id).await.unwrap();
        assert_eq!(app.app_roles.len(), 1);
    }

    #[tokio::test]
    async fn test_disable_then_remove_succeeds() {
        let repo = MemoryDirectoryRepository::new();
        let id = repo.seed_application("Payroll").await;
        let r = role("Reader", "reader", true);
        let role_id = r.id;
        repo.update_application(&id, |app| app.app_roles.push(r)).await;

        let mut disabled = repo.application(&id).await.unwrap().app_roles;
        for r in &mut disabled {
            if r.id == role_id {
                r.is_enabled = false;
            }
        }
        repo.write_fields(
            &id,
            &ApplicationPatch {
                app_roles: Some(disabled),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        repo.write_fields(
            &id,
            &ApplicationPatch {
                app_roles: Some(vec![]),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(repo.application(&id).await.unwrap().app_roles.is_empty());
    }

    #[tokio::test]
    async fn test_fail_next_fails_exactly_once() {
        let repo = MemoryDirectoryRepository::new();
        let id = repo.seed_application("Payroll").await;
        repo.fail_next("read_fields", DirectoryError::Transport("boom".into()))
            .await;

        let err = repo
            .read_fields(&id, &[ApplicationField::DisplayName])
            .await
            .unwrap_err();
        assert_eq!(err, DirectoryError::Transport("boom".into()));

        let ok = repo
            .read_fields(&id, &[ApplicationField::DisplayName])
            .await
            .unwrap();
        assert_eq!(ok.display_name.as_deref(), Some("Payroll"));
        assert_eq!(repo.calls_named("read_fields").await, 2);
    }

    #[tokio::test]
    async fn test_pause_holds_call_until_released() {
        let repo = std::sync::Arc::new(MemoryDirectoryRepository::new());
        let id = repo.seed_application("Payroll").await;
        let gate = repo.pause("read_fields").await;

        let task = tokio::spawn({
            let repo = std::sync::Arc::clone(&repo);
            async move { repo.read_fields(&id, &[ApplicationField::DisplayName]).await }
        });

        tokio::task::yield_now().await;
        assert_eq!(repo.calls_named("read_fields").await, 0);

        gate.release();
        task.await.unwrap().unwrap();
        assert_eq!(repo.calls_named("read_fields").await, 1);
    }

    #[tokio::test]
    async fn test_find_user_by_principal_and_id() {
        let repo = MemoryDirectoryRepository::new();
        let uid = repo.seed_user("ana@contoso.com", "Ana Bell").await;
        let by_upn = repo.find_user("ana@contoso.com").await.unwrap();
        assert_eq!(by_upn.id, uid);
        let by_id = repo.find_user(&uid.to_string()).await.unwrap();
        assert_eq!(by_id.display_name.as_deref(), Some("Ana Bell"));
    }
}
