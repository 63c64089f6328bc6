//! End-to-end flow tests: scripted prompts, in-memory directory, real
//! synchronizer and mutation protocol underneath.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};

use appreg_core::model::{AllowedMemberType, ConsentType, PasswordCredential, SignInAudience};
use appreg_core::DirectoryError;
use appreg_graph::memory::RepoCall;
use appreg_services::Outcome;
use uuid::Uuid;

use common::{
    app_path, audience_path, credentials_path, flag_path, flows_with, owner_path, owners_path,
    role, role_path, roles_path, scope, scope_path, scopes_path, secret_path, text, uri_path,
    uris_path, Answer, ObserverEvent,
};

#[tokio::test]
async fn test_add_role_end_to_end() {
    let fx = flows_with(vec![
        text("Reader"),
        text("Task.Read"),
        text("Read-only access to tasks"),
        Answer::Choice(0),
        Answer::Yes,
    ])
    .await;
    let group = roles_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.roles.add(&group).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    // The submitted patch touches only the roles array.
    let writes = fx.repo.writes().await;
    assert_eq!(writes.len(), 1);
    let roles = writes[0].app_roles.as_ref().unwrap();
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].display_name.as_deref(), Some("Reader"));
    assert_eq!(roles[0].value.as_deref(), Some("Task.Read"));
    assert!(roles[0].is_enabled);
    assert_eq!(roles[0].allowed_member_types, vec![AllowedMemberType::User]);
    assert!(writes[0].display_name.is_none());
    assert!(writes[0].web.is_none());

    // Remote state and refreshed cache agree.
    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.app_roles.len(), 1);
    let children = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "Reader");

    let events = fx.observer.events();
    assert!(matches!(&events[0], ObserverEvent::Started(label) if label.contains("Reader")));
    assert!(matches!(&events[1], ObserverEvent::Finished(_)));
}

#[tokio::test]
async fn test_role_value_collision_never_reaches_the_repository() {
    let fx = flows_with(vec![text("Reader Two"), text("task.read")]).await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Reader", "task.read", true));
        })
        .await;
    let group = roles_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.roles.add(&group).await.unwrap();
    assert!(outcome.is_aborted());

    let rejections = fx.prompter.rejections();
    assert_eq!(rejections.len(), 1);
    assert!(rejections[0].contains("already in use"));
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
    assert!(fx.observer.events().is_empty());
}

#[tokio::test]
async fn test_add_builds_its_write_from_fresh_remote_state() {
    let fx = flows_with(vec![
        text("Gamma"),
        text("gamma"),
        text("Third role"),
        Answer::Choice(0),
        Answer::Yes,
    ])
    .await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Alpha", "alpha", true));
        })
        .await;
    let group = roles_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();
    fx.sync.resolve_children(&group).await.unwrap();

    // Cache still shows only Alpha after this out-of-band addition.
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Beta", "beta", false));
        })
        .await;

    fx.services.roles.add(&group).await.unwrap();

    let writes = fx.repo.writes().await;
    let submitted = writes.last().unwrap().app_roles.as_ref().unwrap();
    let mut values: Vec<&str> = submitted.iter().filter_map(|r| r.value.as_deref()).collect();
    values.sort_unstable();
    assert_eq!(values, vec!["alpha", "beta", "gamma"]);
}

#[tokio::test]
async fn test_declining_enabled_role_delete_makes_no_remote_calls() {
    let fx = flows_with(vec![Answer::No]).await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();
    let calls_before = fx.repo.journal().await.len();

    let outcome = fx.services.roles.delete(&path).await.unwrap();
    assert!(outcome.is_aborted());
    assert_eq!(fx.repo.journal().await.len(), calls_before);
    assert!(fx.observer.events().is_empty());
    assert!(fx.prompter.confirmations()[0].contains("Disable it and delete?"));
}

#[tokio::test]
async fn test_enabled_role_delete_disables_then_removes() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.roles.delete(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let writes = fx.repo.writes().await;
    assert_eq!(writes.len(), 2);
    let first = writes[0].app_roles.as_ref().unwrap();
    assert_eq!(first.len(), 1);
    assert!(!first[0].is_enabled);
    let second = writes[1].app_roles.as_ref().unwrap();
    assert!(second.is_empty());

    assert!(fx.repo.application(&fx.app).await.unwrap().app_roles.is_empty());
    let children = fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();
    assert!(children.is_empty());
}

#[tokio::test]
async fn test_backing_out_mid_flow_leaves_no_trace() {
    let fx = flows_with(vec![text("Reader"), Answer::Back]).await;
    let group = roles_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.roles.add(&group).await.unwrap();
    assert!(outcome.is_aborted());
    assert_eq!(fx.prompter.remaining(), 0);
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
    assert!(fx.observer.events().is_empty());
}

#[tokio::test]
async fn test_set_enabled_is_a_noop_when_state_matches() {
    let fx = flows_with(vec![]).await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.roles.set_enabled(&path, true).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_disabling_role_confirms_and_refreshes_the_leaf() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.roles.set_enabled(&path, false).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert!(!stored.app_roles[0].is_enabled);

    // The leaf refresh picked up the disabled marker.
    let node = fx.sync.snapshot(&path).await.unwrap();
    assert!(node.description.unwrap().contains("disabled"));
}

#[tokio::test]
async fn test_edit_role_rewrites_the_entry_in_place() {
    let fx = flows_with(vec![
        text("Auditor"),
        text("auditor"),
        text("Audit access"),
        Answer::Choice(2),
    ])
    .await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.roles.edit(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.app_roles.len(), 1);
    let updated = &stored.app_roles[0];
    assert_eq!(updated.id, reader_id);
    assert_eq!(updated.display_name.as_deref(), Some("Auditor"));
    assert_eq!(updated.value.as_deref(), Some("auditor"));
    assert!(updated.is_enabled);
    assert_eq!(
        updated.allowed_member_types,
        vec![AllowedMemberType::User, AllowedMemberType::Application]
    );

    // Same path still resolves; the label follows the new name.
    let node = fx.sync.snapshot(&path).await.unwrap();
    assert_eq!(node.label, "Auditor");
}

#[tokio::test]
async fn test_secret_expiry_is_validated_before_anything_runs() {
    let fx = flows_with(vec![text("ci token"), text("2020-01-01")]).await;
    let group = credentials_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.credentials.add_secret(&group).await.unwrap();
    assert!(outcome.is_aborted());
    assert!(fx.prompter.rejections()[0].contains("future"));
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_add_secret_stores_end_of_expiry_day() {
    let expiry = Utc::now().date_naive() + Duration::days(90);
    let fx = flows_with(vec![
        text("ci token"),
        text(&expiry.format("%Y-%m-%d").to_string()),
    ])
    .await;
    let group = credentials_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.credentials.add_secret(&group).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.password_credentials.len(), 1);
    let cred = &stored.password_credentials[0];
    assert_eq!(cred.display_name.as_deref(), Some("ci token"));
    assert_eq!(cred.end_date_time.unwrap().date_naive(), expiry);

    let children = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "ci token");
}

#[tokio::test]
async fn test_delete_secret_after_confirmation() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let key_id = Uuid::new_v4();
    fx.repo
        .update_application(&fx.app, |app| {
            app.password_credentials.push(PasswordCredential {
                key_id,
                display_name: Some("ci token".into()),
                start_date_time: Some(Utc::now()),
                end_date_time: Some(Utc::now() + Duration::days(30)),
                hint: None,
                secret_text: None,
            });
        })
        .await;
    let path = secret_path(fx.app, key_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.credentials.delete(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));
    assert!(fx
        .repo
        .application(&fx.app)
        .await
        .unwrap()
        .password_credentials
        .is_empty());
}

#[tokio::test]
async fn test_redirect_uri_format_is_enforced() {
    let fx = flows_with(vec![text("not a uri")]).await;
    let group = uris_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.redirect_uris.add(&group).await.unwrap();
    assert!(outcome.is_aborted());
    assert!(fx.prompter.rejections()[0].contains("absolute URI"));
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_add_redirect_uri_round_trip() {
    let fx = flows_with(vec![text("https://app.contoso.com/auth/callback")]).await;
    let group = uris_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.redirect_uris.add(&group).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(
        stored.redirect_uris,
        vec!["https://app.contoso.com/auth/callback".to_string()]
    );
    // The grant settings were not part of the patch.
    let writes = fx.repo.writes().await;
    let web = writes[0].web.as_ref().unwrap();
    assert!(web.implicit_grant_settings.is_none());
}

#[tokio::test]
async fn test_edit_redirect_uri_keeps_list_position() {
    let fx = flows_with(vec![text("https://c.contoso.com/cb")]).await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.redirect_uris = vec![
                "https://a.contoso.com/cb".to_string(),
                "https://b.contoso.com/cb".to_string(),
            ];
        })
        .await;
    let path = uri_path(fx.app, "https://a.contoso.com/cb");
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.redirect_uris.edit(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(
        stored.redirect_uris,
        vec![
            "https://c.contoso.com/cb".to_string(),
            "https://b.contoso.com/cb".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_toggle_token_flag_leaves_the_other_flag_alone() {
    let fx = flows_with(vec![]).await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.implicit_grant.enable_access_token_issuance = Some(true);
        })
        .await;
    let path = flag_path(fx.app, "idToken");
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.token_flags.toggle(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let writes = fx.repo.writes().await;
    let grant = writes[0]
        .web
        .as_ref()
        .unwrap()
        .implicit_grant_settings
        .unwrap();
    assert_eq!(grant.enable_id_token_issuance, Some(true));
    assert!(grant.enable_access_token_issuance.is_none());

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.implicit_grant.enable_id_token_issuance, Some(true));
    assert_eq!(stored.implicit_grant.enable_access_token_issuance, Some(true));

    let node = fx.sync.snapshot(&path).await.unwrap();
    assert_eq!(node.description.as_deref(), Some("enabled"));
}

#[tokio::test]
async fn test_disabling_token_flag_requires_confirmation() {
    let fx = flows_with(vec![Answer::No]).await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.implicit_grant.enable_id_token_issuance = Some(true);
        })
        .await;
    let path = flag_path(fx.app, "idToken");
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.token_flags.toggle(&path).await.unwrap();
    assert!(outcome.is_aborted());
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_change_audience_writes_and_refreshes_the_leaf() {
    let fx = flows_with(vec![Answer::Choice(1)]).await;
    let path = audience_path(fx.app);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.audience.change(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.sign_in_audience, SignInAudience::MultipleOrgs);

    let node = fx.sync.snapshot(&path).await.unwrap();
    assert_eq!(node.description.as_deref(), Some("Multitenant"));
}

#[tokio::test]
async fn test_create_application_appears_in_roots() {
    let fx = flows_with(vec![text("Billing"), Answer::Choice(0)]).await;

    let outcome = fx.services.applications.create().await.unwrap();
    let summary = outcome.completed().unwrap();
    assert_eq!(summary.label(), "Billing");

    let labels: Vec<String> = fx.sync.roots().await.iter().map(|n| n.label.clone()).collect();
    assert_eq!(labels, vec!["Billing".to_string(), "Payroll".to_string()]);
}

#[tokio::test]
async fn test_rename_application_updates_the_root_label() {
    let fx = flows_with(vec![text("Payroll v2")]).await;
    let path = app_path(fx.app);

    let outcome = fx.services.applications.rename(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let stored = fx.repo.application(&fx.app).await.unwrap();
    assert_eq!(stored.display_name, "Payroll v2");
    let node = fx.sync.snapshot(&path).await.unwrap();
    assert_eq!(node.label, "Payroll v2");
}

#[tokio::test]
async fn test_rename_to_the_same_name_writes_nothing() {
    let fx = flows_with(vec![text("Payroll")]).await;
    let path = app_path(fx.app);

    let outcome = fx.services.applications.rename(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_delete_application_clears_the_root() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let path = app_path(fx.app);

    let outcome = fx.services.applications.delete(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    assert!(fx.repo.application(&fx.app).await.is_none());
    assert!(fx.sync.roots().await.is_empty());
}

#[tokio::test]
async fn test_add_owner_resolves_the_user_then_links_it() {
    let fx = flows_with(vec![text("ana@contoso.com")]).await;
    let user = fx.repo.seed_user("ana@contoso.com", "Ana Bell").await;
    let group = owners_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.owners.add(&group).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let journal = fx.repo.journal().await;
    let find = journal
        .iter()
        .position(|c| matches!(c, RepoCall::FindUser { .. }))
        .unwrap();
    let link = journal
        .iter()
        .position(|c| matches!(c, RepoCall::AddOwner { .. }))
        .unwrap();
    assert!(find < link);

    assert_eq!(fx.repo.application(&fx.app).await.unwrap().owners, vec![user]);
    let children = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "Ana Bell");
}

#[tokio::test]
async fn test_removing_the_last_owner_warns_about_it() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let user = fx.repo.seed_user("ana@contoso.com", "Ana Bell").await;
    fx.repo
        .update_application(&fx.app, |app| app.owners.push(user))
        .await;
    let path = owner_path(fx.app, user);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.owners.remove(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let confirmations = fx.prompter.confirmations();
    assert!(confirmations[0].contains("left without owners"));
    assert!(fx.repo.application(&fx.app).await.unwrap().owners.is_empty());
}

#[tokio::test]
async fn test_add_scope_nests_the_patch_under_api() {
    let fx = flows_with(vec![
        text("Tasks.Read"),
        Answer::Choice(0),
        text("Read tasks"),
        text("Allows the app to read tasks"),
        Answer::Yes,
    ])
    .await;
    let group = scopes_path(fx.app);
    fx.sync.ensure_path(&group).await.unwrap();

    let outcome = fx.services.scopes.add(&group).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let writes = fx.repo.writes().await;
    assert_eq!(writes.len(), 1);
    let scopes = writes[0]
        .api
        .as_ref()
        .unwrap()
        .oauth2_permission_scopes
        .as_ref()
        .unwrap();
    assert_eq!(scopes.len(), 1);
    assert_eq!(scopes[0].value.as_deref(), Some("Tasks.Read"));
    assert_eq!(scopes[0].consent, ConsentType::Admin);
    assert!(writes[0].app_roles.is_none());

    let children = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "Tasks.Read");
}

#[tokio::test]
async fn test_enabled_scope_delete_disables_first() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let tasks = scope("Tasks.Read", true);
    let scope_id = tasks.id;
    fx.repo
        .update_application(&fx.app, |app| app.scopes.push(tasks))
        .await;
    let path = scope_path(fx.app, scope_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let outcome = fx.services.scopes.delete(&path).await.unwrap();
    assert_eq!(outcome, Outcome::Completed(()));

    let writes = fx.repo.writes().await;
    assert_eq!(writes.len(), 2);
    let first = writes[0].api.as_ref().unwrap().oauth2_permission_scopes.as_ref().unwrap();
    assert!(!first[0].is_enabled);
    let second = writes[1].api.as_ref().unwrap().oauth2_permission_scopes.as_ref().unwrap();
    assert!(second.is_empty());
    assert!(fx.repo.application(&fx.app).await.unwrap().scopes.is_empty());
}

#[tokio::test]
async fn test_busy_node_rejects_a_second_flow_before_its_prompts() {
    let fx = flows_with(vec![Answer::Yes]).await;
    let reader = role("Reader", "reader", true);
    let reader_id = reader.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(reader))
        .await;
    let path = role_path(fx.app, reader_id);
    fx.sync.ensure_path(&path).await.unwrap();

    let gate = fx.repo.pause("write_fields").await;
    let services = Arc::clone(&fx.services);
    let held_path = path.clone();
    let task =
        tokio::spawn(async move { services.roles.set_enabled(&held_path, false).await });
    tokio::task::yield_now().await;

    // The first flow is parked inside its write; the busy marking is up.
    let err = fx.services.roles.edit(&path).await.unwrap_err();
    assert_eq!(err, DirectoryError::OperationInProgress);
    assert_eq!(fx.prompter.remaining(), 0);

    gate.release();
    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome, Outcome::Completed(()));
    assert_eq!(fx.repo.calls_named("write_fields").await, 1);
}
