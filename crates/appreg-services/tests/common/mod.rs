#![allow(dead_code)]

//! Fixtures for the flow tests: a scripted prompter standing in for the
//! user, a recording observer, and one seeded application wired through
//! the full service stack.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use appreg_core::model::{AllowedMemberType, AppRole, PermissionScope};
use appreg_core::{DirectoryError, DirectoryResult, ObjectId};
use appreg_graph::MemoryDirectoryRepository;
use appreg_services::prompt::{InputRequest, Prompter};
use appreg_services::Services;
use appreg_tree::{NodeKind, NodePath, OperationObserver, TreeSynchronizer};

/// One scripted reply. `Back` backs out of whichever prompt comes next.
#[derive(Debug, Clone)]
pub enum Answer {
    Text(String),
    Choice(usize),
    Yes,
    No,
    Back,
}

pub fn text(s: &str) -> Answer {
    Answer::Text(s.to_string())
}

/// Replays a fixed list of answers. A text answer the validator rejects is
/// recorded and turns into a back-out, so tests can assert both that the
/// rejection happened and that the flow aborted cleanly.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    rejections: Mutex<Vec<String>>,
    confirmations: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: Vec<Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            rejections: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
        }
    }

    pub fn rejections(&self) -> Vec<String> {
        self.rejections.lock().unwrap().clone()
    }

    /// The confirm questions that were asked, in order.
    pub fn confirmations(&self) -> Vec<String> {
        self.confirmations.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    fn next(&self, title: &str) -> Answer {
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted answer left for prompt '{title}'"))
    }
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&self, request: InputRequest<'_>) -> DirectoryResult<Option<String>> {
        match self.next(request.title) {
            Answer::Text(answer) => {
                if let Some(validator) = request.validator {
                    if let Some(message) = validator(&answer) {
                        self.rejections.lock().unwrap().push(message);
                        return Ok(None);
                    }
                }
                Ok(Some(answer))
            }
            Answer::Back => Ok(None),
            other => panic!("prompt '{}' expected text, got {other:?}", request.title),
        }
    }

    async fn select(
        &self,
        title: &str,
        options: &[String],
        _default: usize,
    ) -> DirectoryResult<Option<usize>> {
        match self.next(title) {
            Answer::Choice(index) => {
                assert!(
                    index < options.len(),
                    "scripted choice {index} out of range for '{title}'"
                );
                Ok(Some(index))
            }
            Answer::Back => Ok(None),
            other => panic!("prompt '{title}' expected a choice, got {other:?}"),
        }
    }

    async fn confirm(&self, message: &str, _default: bool) -> DirectoryResult<Option<bool>> {
        self.confirmations
            .lock()
            .unwrap()
            .push(message.to_string());
        match self.next(message) {
            Answer::Yes => Ok(Some(true)),
            Answer::No => Ok(Some(false)),
            Answer::Back => Ok(None),
            other => panic!("prompt '{message}' expected yes/no, got {other:?}"),
        }
    }
}

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

pub struct Flows {
    pub repo: Arc<MemoryDirectoryRepository>,
    pub sync: Arc<TreeSynchronizer>,
    pub services: Arc<Services>,
    pub prompter: Arc<ScriptedPrompter>,
    pub observer: Arc<RecordingObserver>,
    pub app: ObjectId,
}

/// One seeded application, loaded roots, and the given prompt script.
pub async fn flows_with(answers: Vec<Answer>) -> Flows {
    let repo = Arc::new(MemoryDirectoryRepository::new());
    let app = repo.seed_application("Payroll").await;
    let sync = Arc::new(TreeSynchronizer::new(repo.clone()));
    let prompter = Arc::new(ScriptedPrompter::new(answers));
    let observer = Arc::new(RecordingObserver::default());
    let services = Arc::new(Services::new(
        sync.clone(),
        repo.clone(),
        observer.clone(),
        prompter.clone(),
    ));
    sync.load_roots().await.expect("load roots");
    Flows {
        repo,
        sync,
        services,
        prompter,
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

pub fn scope(value: &str, enabled: bool) -> PermissionScope {
    PermissionScope {
        id: Uuid::new_v4(),
        value: Some(value.to_string()),
        consent: appreg_core::model::ConsentType::Admin,
        is_enabled: enabled,
        admin_consent_display_name: Some(value.to_string()),
        admin_consent_description: Some(format!("Grants {value}")),
        user_consent_display_name: None,
        user_consent_description: None,
    }
}

pub fn app_path(app: ObjectId) -> NodePath {
    NodePath::application(app)
}

pub fn roles_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::AppRoleGroup)
}

pub fn role_path(app: ObjectId, role_id: Uuid) -> NodePath {
    roles_path(app).child_value(NodeKind::AppRole, role_id.to_string())
}

pub fn scopes_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::ScopeGroup)
}

pub fn scope_path(app: ObjectId, scope_id: Uuid) -> NodePath {
    scopes_path(app).child_value(NodeKind::PermissionScope, scope_id.to_string())
}

pub fn credentials_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::CredentialGroup)
}

pub fn secret_path(app: ObjectId, key_id: Uuid) -> NodePath {
    credentials_path(app).child_value(NodeKind::PasswordCredential, key_id.to_string())
}

pub fn uris_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::RedirectUriGroup)
}

pub fn uri_path(app: ObjectId, uri: &str) -> NodePath {
    uris_path(app).child_value(NodeKind::RedirectUri, uri)
}

pub fn audience_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::Audience)
}

pub fn flag_path(app: ObjectId, flow: &str) -> NodePath {
    app_path(app).child_value(NodeKind::TokenFlowFlag, flow)
}

pub fn owners_path(app: ObjectId) -> NodePath {
    app_path(app).child(NodeKind::OwnerGroup)
}

pub fn owner_path(app: ObjectId, owner: ObjectId) -> NodePath {
    owners_path(app).child_value(NodeKind::Owner, owner.to_string())
}
