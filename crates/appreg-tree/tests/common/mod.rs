#![allow(dead_code)]

//! Fixtures shared by the synchronizer and mutation protocol tests.

use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use uuid::Uuid;

use appreg_core::model::{AllowedMemberType, AppRole, PasswordCredential};
use appreg_core::{DirectoryError, ObjectId};
use appreg_graph::MemoryDirectoryRepository;
use appreg_tree::{
    MutationRunner, NodeKind, NodePath, OperationObserver, TreeSynchronizer,
};

/// Everything the observer was told, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    Started(String),
    Finished(String),
    Failed(String, DirectoryError),
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn failures(&self) -> Vec<DirectoryError> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ObserverEvent::Failed(_, err) => Some(err),
                _ => None,
            })
            .collect()
    }

    pub fn started_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, ObserverEvent::Started(_)))
            .count()
    }
}

impl OperationObserver for RecordingObserver {
    fn operation_started(&self, label: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ObserverEvent::Started(label.to_string()));
    }

    fn operation_finished(&self, label: &str) {
        self.events
            .lock()
            .unwrap()
            .push(ObserverEvent::Finished(label.to_string()));
    }

    fn operation_failed(&self, label: &str, error: &DirectoryError) {
        self.events
            .lock()
            .unwrap()
            .push(ObserverEvent::Failed(label.to_string(), error.clone()));
    }
}

pub struct Fixture {
    pub repo: Arc<MemoryDirectoryRepository>,
    pub sync: Arc<TreeSynchronizer>,
    pub runner: Arc<MutationRunner>,
    pub observer: Arc<RecordingObserver>,
    pub app: ObjectId,
}

/// One seeded application with loaded roots.
pub async fn fixture() -> Fixture {
    let repo = Arc::new(MemoryDirectoryRepository::new());
    let app = repo.seed_application("Payroll").await;
    let sync = Arc::new(TreeSynchronizer::new(repo.clone()));
    let observer = Arc::new(RecordingObserver::default());
    let runner = Arc::new(MutationRunner::new(sync.clone(), observer.clone()));
    sync.load_roots().await.expect("load roots");
    Fixture {
        repo,
        sync,
        runner,
        observer,
        app,
    }
}

pub fn role(name: &str, value: &str, enabled: bool) -> AppRole {
    AppRole {
        id: Uuid::new_v4(),
        allowed_member_types: vec![AllowedMemberType::User],
        description: Some(format!("{name} access")),
        display_name: Some(name.to_string()),
        is_enabled: enabled,
        value: Some(value.to_string()),
    }
}

pub fn secret(name: &str, days_until_expiry: i64) -> PasswordCredential {
    PasswordCredential {
        key_id: Uuid::new_v4(),
        display_name: Some(name.to_string()),
        start_date_time: Some(Utc::now()),
        end_date_time: Some(Utc::now() + Duration::days(days_until_expiry)),
        hint: None,
        secret_text: None,
    }
}

pub fn roles_path(app: ObjectId) -> NodePath {
    NodePath::application(app).child(NodeKind::AppRoleGroup)
}

pub fn role_path(app: ObjectId, role_id: Uuid) -> NodePath {
    roles_path(app).child_value(NodeKind::AppRole, role_id.to_string())
}

pub fn credentials_path(app: ObjectId) -> NodePath {
    NodePath::application(app).child(NodeKind::CredentialGroup)
}
