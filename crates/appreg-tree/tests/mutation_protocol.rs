//! Behaviour of the Begin / Execute / Complete protocol: busy bracketing,
//! rollback on failure, busy-conflict rejection, refresh on success.

mod common;

use std::sync::Arc;

use appreg_core::model::ApplicationPatch;
use appreg_core::{DirectoryError, DirectoryRepository};
use appreg_tree::{MutationPlan, NodePath, Refresh, TreeChange, VisualState};

use common::{fixture, role, role_path, roles_path};

fn rename_patch(name: &str) -> ApplicationPatch {
    ApplicationPatch {
        display_name: Some(name.to_string()),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_busy_is_visible_before_the_remote_write() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let target = role_path(fx.app, r.id);
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(r))
        .await;
    fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();

    let mut rx = fx.sync.subscribe();
    let gate = fx.repo.pause("write_fields").await;

    let task = tokio::spawn({
        let runner = fx.runner.clone();
        let repo = fx.repo.clone();
        let app = fx.app;
        let plan = MutationPlan::node("Renaming role", target.clone(), Refresh::None);
        async move {
            runner
                .run(plan, move || async move {
                    repo.write_fields(&app, &rename_patch("ignored")).await
                })
                .await
        }
    });

    // Begin announced the busy state; the write is still gated.
    assert_eq!(rx.recv().await.unwrap(), TreeChange::Subtree(target.clone()));
    assert_eq!(
        fx.sync.snapshot(&target).await.unwrap().visual,
        VisualState::Busy
    );
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
    assert_eq!(fx.observer.started_count(), 1);

    gate.release();
    task.await.unwrap().unwrap();

    assert_eq!(
        fx.sync.snapshot(&target).await.unwrap().visual,
        VisualState::Idle
    );
    assert_eq!(fx.repo.calls_named("write_fields").await, 1);
}

#[tokio::test]
async fn test_failed_mutation_rolls_back_and_reports_once() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let target = role_path(fx.app, r.id);
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(r);
            app.app_roles.push(role("Writer", "writer", true));
        })
        .await;

    let group = roles_path(fx.app);
    let before = fx.sync.resolve_children(&group).await.unwrap();

    fx.repo
        .fail_next(
            "write_fields",
            DirectoryError::Service {
                code: "Request_BadRequest".into(),
                message: "rejected".into(),
            },
        )
        .await;

    let plan = MutationPlan::node_and_parent(
        "Deleting role 'Reader'",
        target.clone(),
        Refresh::Subtree(group.clone()),
    );
    let repo = fx.repo.clone();
    let app = fx.app;
    let err = fx
        .runner
        .run(plan, move || async move {
            repo.write_fields(&app, &rename_patch("unused")).await
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::Service { .. }));

    // Structurally identical children: same entries, same order.
    let after = fx.sync.resolve_children(&group).await.unwrap();
    assert_eq!(after.len(), before.len());
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.label, b.label);
        assert_eq!(a.local_value, b.local_value);
    }

    // Target keeps an error marker, the parent is usable again.
    assert_eq!(
        fx.sync.snapshot(&target).await.unwrap().visual,
        VisualState::Error
    );
    assert_eq!(
        fx.sync.snapshot(&group).await.unwrap().visual,
        VisualState::Idle
    );
    assert_eq!(fx.observer.failures().len(), 1);
}

#[tokio::test]
async fn test_second_mutation_on_busy_node_is_rejected() {
    let fx = fixture().await;
    let r = role("Reader", "reader", true);
    let target = role_path(fx.app, r.id);
    fx.repo
        .update_application(&fx.app, |app| app.app_roles.push(r))
        .await;
    fx.sync.resolve_children(&roles_path(fx.app)).await.unwrap();

    let mut rx = fx.sync.subscribe();
    let gate = fx.repo.pause("write_fields").await;
    let first = tokio::spawn({
        let runner = fx.runner.clone();
        let repo = fx.repo.clone();
        let app = fx.app;
        let plan = MutationPlan::node("First change", target.clone(), Refresh::None);
        async move {
            runner
                .run(plan, move || async move {
                    repo.write_fields(&app, &rename_patch("first")).await
                })
                .await
        }
    });
    rx.recv().await.unwrap();

    // Second operation is turned away before any remote call.
    let repo = fx.repo.clone();
    let app = fx.app;
    let err = fx
        .runner
        .run(
            MutationPlan::node("Second change", target.clone(), Refresh::None),
            move || async move { repo.write_fields(&app, &rename_patch("second")).await },
        )
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::OperationInProgress);
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);

    gate.release();
    first.await.unwrap().unwrap();
    assert_eq!(fx.repo.calls_named("write_fields").await, 1);
    assert_eq!(fx.observer.failures(), vec![DirectoryError::OperationInProgress]);
}

#[tokio::test]
async fn test_vanished_target_fails_quietly() {
    let fx = fixture().await;
    let missing = role_path(fx.app, uuid::Uuid::new_v4());

    let repo = fx.repo.clone();
    let app = fx.app;
    let err = fx
        .runner
        .run(
            MutationPlan::node("Editing role", missing, Refresh::None),
            move || async move { repo.write_fields(&app, &rename_patch("x")).await },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, DirectoryError::PathVanished(_)));
    // Stale cache is logged, not reported, and nothing was started.
    assert!(fx.observer.events().is_empty());
    assert_eq!(fx.repo.calls_named("write_fields").await, 0);
}

#[tokio::test]
async fn test_success_refreshes_the_named_subtree() {
    let fx = fixture().await;
    fx.repo
        .update_application(&fx.app, |app| {
            app.app_roles.push(role("Reader", "reader", true));
        })
        .await;

    let group = roles_path(fx.app);
    assert_eq!(fx.sync.resolve_children(&group).await.unwrap().len(), 1);

    // The remote phase adds a role through a fresh read-modify-write.
    let repo: Arc<_> = fx.repo.clone();
    let app = fx.app;
    let plan = MutationPlan::node(
        "Adding app role 'Auditor'",
        group.clone(),
        Refresh::Subtree(group.clone()),
    );
    fx.runner
        .run(plan, move || async move {
            let facet = repo
                .read_fields(&app, &[appreg_core::ApplicationField::AppRoles])
                .await?;
            let mut roles = facet.app_roles.unwrap_or_default();
            roles.push(role("Auditor", "auditor", true));
            repo.write_fields(
                &app,
                &ApplicationPatch {
                    app_roles: Some(roles),
                    ..Default::default()
                },
            )
            .await
        })
        .await
        .unwrap();

    let children = fx.sync.resolve_children(&group).await.unwrap();
    let labels: Vec<&str> = children.iter().map(|c| c.label.as_str()).collect();
    assert_eq!(labels, vec!["Reader", "Auditor"]);
    assert_eq!(
        fx.sync.snapshot(&group).await.unwrap().visual,
        VisualState::Idle
    );
}

#[tokio::test]
async fn test_root_operation_refreshes_the_root_list() {
    let fx = fixture().await;
    let mut rx = fx.sync.subscribe();

    let repo = fx.repo.clone();
    let plan = MutationPlan::root("Creating application 'Billing'", Refresh::Roots);
    let created = fx
        .runner
        .run(plan, move || async move {
            repo.create_application(&appreg_core::model::NewApplication {
                display_name: "Billing".into(),
                sign_in_audience: None,
            })
            .await
        })
        .await
        .unwrap();
    assert_eq!(created.display_name.as_deref(), Some("Billing"));

    assert_eq!(rx.recv().await.unwrap(), TreeChange::Roots);
    let roots = fx.sync.roots().await;
    let labels: Vec<&str> = roots.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["Billing", "Payroll"]);
}
