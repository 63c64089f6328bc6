//! Read-modify-write helpers for the application's array facets.
//!
//! Graph replaces `appRoles`, credential lists, scopes and redirect URIs
//! wholesale on write, so every mutation of an entry re-reads the current
//! array inside the operation, edits it in place and submits the whole
//! thing back. The cached copy is never used as the write base.

use appreg_core::model::{
    ApiApplication, AppRole, ApplicationPatch, KeyCredential, PasswordCredential,
    PermissionScope, WebApplication,
};
use appreg_core::{ApplicationField, DirectoryRepository, DirectoryResult, ObjectId};

pub(crate) async fn modify_roles<F>(
    repo: &dyn DirectoryRepository,
    app: &ObjectId,
    mutate: F,
) -> DirectoryResult<()>
where
    F: FnOnce(&mut Vec<AppRole>) -> DirectoryResult<()>,
{
    let facet = repo.read_fields(app, &[ApplicationField::AppRoles]).await?;
    let mut roles = facet.app_roles.unwrap_or_default();
    mutate(&mut roles)?;
    let patch = ApplicationPatch {
        app_roles: Some(roles),
        ..Default::default()
    };
    repo.write_fields(app, &patch).await
}

pub(crate) async fn modify_passwords<F>(
    repo: &dyn DirectoryRepository,
    app: &ObjectId,
    mutate: F,
) -> DirectoryResult<()>
where
    F: FnOnce(&mut Vec<PasswordCredential>) -> DirectoryResult<()>,
{
    let facet = repo
        .read_fields(app, &[ApplicationField::PasswordCredentials])
        .await?;
    let mut credentials = facet.password_credentials.unwrap_or_default();
    mutate(&mut credentials)?;
    let patch = ApplicationPatch {
        password_credentials: Some(credentials),
        ..Default::default()
    };
    repo.write_fields(app, &patch).await
}

pub(crate) async fn modify_certificates<F>(
    repo: &dyn DirectoryRepository,
    app: &ObjectId,
    mutate: F,
) -> DirectoryResult<()>
where
    F: FnOnce(&mut Vec<KeyCredential>) -> DirectoryResult<()>,
{
    let facet = repo
        .read_fields(app, &[ApplicationField::KeyCredentials])
        .await?;
    let mut credentials = facet.key_credentials.unwrap_or_default();
    mutate(&mut credentials)?;
    let patch = ApplicationPatch {
        key_credentials: Some(credentials),
        ..Default::default()
    };
    repo.write_fields(app, &patch).await
}

pub(crate) async fn modify_scopes<F>(
    repo: &dyn DirectoryRepository,
    app: &ObjectId,
    mutate: F,
) -> DirectoryResult<()>
where
    F: FnOnce(&mut Vec<PermissionScope>) -> DirectoryResult<()>,
{
    let facet = repo.read_fields(app, &[ApplicationField::Api]).await?;
    let mut scopes = facet
        .api
        .and_then(|api| api.oauth2_permission_scopes)
        .unwrap_or_default();
    mutate(&mut scopes)?;
    let patch = ApplicationPatch {
        api: Some(ApiApplication {
            oauth2_permission_scopes: Some(scopes),
        }),
        ..Default::default()
    };
    repo.write_fields(app, &patch).await
}

pub(crate) async fn modify_redirect_uris<F>(
    repo: &dyn DirectoryRepository,
    app: &ObjectId,
    mutate: F,
) -> DirectoryResult<()>
where
    F: FnOnce(&mut Vec<String>) -> DirectoryResult<()>,
{
    let facet = repo.read_fields(app, &[ApplicationField::Web]).await?;
    let mut uris = facet
        .web
        .and_then(|web| web.redirect_uris)
        .unwrap_or_default();
    mutate(&mut uris)?;
    // The grant settings are left out of the patch so they stay untouched.
    let patch = ApplicationPatch {
        web: Some(WebApplication {
            redirect_uris: Some(uris),
            implicit_grant_settings: None,
        }),
        ..Default::default()
    };
    repo.write_fields(app, &patch).await
}
