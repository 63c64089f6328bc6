//! Behaviour of lazy resolution: caching, coalescing, failure handling,
//! and full/partial reloads.

mod common;

use appreg_core::DirectoryError;
use appreg_tree::{NodeKind, NodePath, TreeChange, VisualState};

use common::{credentials_path, fixture, role, roles_path, secret};

#[tokio::test]
async fn test_children_are_fetched_once_and_cached() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Reader", "reader", true));
        })
        .await;

    let first = fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();
    let second = fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();

    assert_eq!(first.len(), 1);
    assert_eq!(first[0].label, "Reader");
    assert_eq!(second[0].label, "Reader");
    // The second expansion came from the cache.
    assert_eq!(fx.repo.calls_named("read_fields").await, 1);
}

#[tokio::test]
async fn test_concurrent_resolution_coalesces_into_one_fetch() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Reader", "reader", true));
            app.app_roles.push(role("Writer", "writer", true));
        })
        .await;

    let gate = fx.repo.pause("read_fields").await;
    let a = tokio::spawn({
        let sync = fx.sync.clone();
        let path = roles_path(fx.app);
        async move { sync.resolve_children(&path).await }
    });
    let b = tokio::spawn({
        let sync = fx.sync.clone();
        let path = roles_path(fx.app);
        async move { sync.resolve_children(&path).await }
    });

    tokio::task::yield_now().await;
    gate.release();

    let first = a.await.unwrap().unwrap();
    let second = b.await.unwrap().unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    assert_eq!(fx.repo.calls_named("read_fields").await, 1);
}

#[tokio::test]
async fn test_resolution_failure_marks_group_and_recovers() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.password_credentials.push(secret("ci secret", 90));
        })
        .await;
    fx.repo
        .fail_next(
            "read_fields",
            DirectoryError::Service {
                code: "ServiceUnavailable".into(),
                message: "try again".into(),
            },
        )
        .await;

    let path = credentials_path(fx.app);
    let err = fx.sync.resolve_children(&path).await.unwrap_err();
    assert!(matches!(err, DirectoryError::Service { .. }));

    let group = fx.sync.snapshot(&path).await.unwrap();
    assert_eq!(group.visual, VisualState::Error);
    assert!(!group.children_resolved);

    // The next expansion retries and succeeds.
    let children = fx.sync.resolve_children(&path).await.unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].label, "ci secret");
    assert_eq!(
        fx.sync.snapshot(&path).await.unwrap().visual,
        VisualState::Idle
    );
}

#[tokio::test]
async fn test_leaf_resolution_is_local_and_empty() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let leaf = common::role_path(fx.app, r.id);
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(r))
        .await;

    fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();
    let fetches_before = fx.repo.calls_named("read_fields").await;

    let children = fx.sync.resolve_children(&leaf).await.unwrap();
    assert!(children.is_empty());
    assert_eq!(fx.repo.calls_named("read_fields").await, fetches_before);
}

#[tokio::test]
async fn test_application_expansion_builds_the_fixed_level() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.implicit_grant.enable_id_token_issuance = Some(true);
        })
        .await;

    let children = fx
        .sync
        .resolve_children(&NodePath::application(fx.app))
        .await
        .unwrap();

    let kinds: Vec<NodeKind> = children.iter().map(|c| c.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NodeKind::AppRoleGroup,
            NodeKind::CredentialGroup,
            NodeKind::ScopeGroup,
            NodeKind::RedirectUriGroup,
            NodeKind::OwnerGroup,
            NodeKind::Audience,
            NodeKind::TokenFlowFlag,
            NodeKind::TokenFlowFlag,
        ]
    );

    let id_flag = children
        .iter()
        .find(|c| c.local_value.as_deref() == Some("idToken"))
        .unwrap();
    assert_eq!(id_flag.description.as_deref(), Some("enabled"));
    let access_flag = children
        .iter()
        .find(|c| c.local_value.as_deref() == Some("accessToken"))
        .unwrap();
    assert_eq!(access_flag.description.as_deref(), Some("disabled"));
}

#[tokio::test]
async fn test_changes_are_announced_per_scope() {
    let fx = fixture().await;
    let mut rx = fx.sync.subscribe();

    fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();
    assert_eq!(
        rx.recv().await.unwrap(),
        TreeChange::Subtree(roles_path(fx.app))
    );

    fx.sync.load_roots().await.unwrap();
    assert_eq!(rx.recv().await.unwrap(), TreeChange::Roots);
}

#[tokio::test]
async fn test_reload_group_picks_up_remote_changes() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Reader", "reader", true));
        })
        .await;

    let path = roles_path(fx.app);
    assert_eq!(fx.sync.resolve_children(&path).await.unwrap().len(), 1);

    // Out-of-band change, invisible to the cache until a reload.
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Auditor", "auditor", true));
        })
        .await;
    assert_eq!(fx.sync.resolve_children(&path).await.unwrap().len(), 1);

    fx.sync.reload(&path).await.unwrap();
    let after = fx.sync.resolve_children(&path).await.unwrap();
    let labels: Vec<&str> = after.iter().map(|c| c.label.as_str()).collect();
    // Remote array order, not sorted.
    assert_eq!(labels, ["Reader", "Auditor"]);
}

#[tokio::test]
async fn test_reload_leaf_rebuilds_one_entry_in_place() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let role_id = r.id;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(r);
            app.app_roles.push(role("Writer", "writer", true));
        })
        .await;

    let group = roles_path(fx.app);
    fx.sync.resolve_children(&group).await.unwrap();

    fx.repo
        .update_application(&fx.app, |app| {
            for r in &mut app.app_roles {
                if r.id == role_id {
                    r.display_name = Some("Reader (restricted)".into());
                }
            }
        })
        .await;

    let leaf = common::role_path(fx.app, role_id);
    fx.sync.reload(&leaf).await.unwrap();

    let children = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(children.len(), 2);
    let renamed = children
        .iter()
        .find(|c| c.local_value.as_deref() == Some(role_id.to_string().as_str()))
        .unwrap();
    assert_eq!(renamed.label, "Reader (restricted)");
}

#[tokio::test]
async fn test_reload_leaf_drops_entries_that_vanished_remotely() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let role_id = r.id;
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(r))
        .await;

    let group = roles_path(fx.app);
    fx.sync.resolve_children(&group).await.unwrap();

    fx.repo
        .update_application(&fx.app, |app| app.app_roles.clear())
        .await;

    let leaf = common::role_path(fx.app, role_id);
    fx.sync.reload(&leaf).await.unwrap();

    assert!(fx.sync.snapshot(&leaf).await.is_none());
    assert!(fx.sync.resolve_children(&group).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_path_is_reported_as_vanished() {
    let fx = fixture().await;
    let other = NodePath::application(appreg_core::ObjectId::new());
    let err = fx.sync.resolve_children(&other).await.unwrap_err();
    assert!(matches!(err, DirectoryError::PathVanished(_)));
}

#[tokio::test]
async fn test_audience_reload_refreshes_the_label() {
    let fx = fixture().await;
    fx.sync
        .resolve_children(&NodePath::application(fx.app))
        .await
        .unwrap();

    fx.repo
        .update_application(&fx.app, |app| {
            app.sign_in_audience = appreg_core::model::SignInAudience::MultipleOrgs;
        })
        .await;

    let audience = NodePath::application(fx.app).child(NodeKind::Audience);
    fx.sync.reload(&audience).await.unwrap();

    let node = fx.sync.snapshot(&audience).await.unwrap();
    assert_eq!(node.description.as_deref(), Some("Multitenant"));
}
