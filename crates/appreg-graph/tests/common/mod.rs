//! Shared fixtures for repository tests against a mock Graph endpoint.

use std::sync::Arc;

use serde_json::{json, Value};
use wiremock::MockServer;

use appreg_graph::{GraphClient, GraphDirectoryRepository, StaticTokenProvider};

/// Builds a repository that talks to the given mock server.
pub fn repository_for(server: &MockServer) -> GraphDirectoryRepository {
    let tokens = Arc::new(StaticTokenProvider::new("test-token"));
    let client = GraphClient::new(tokens, server.uri()).expect("client");
    GraphDirectoryRepository::new(client)
}

pub fn application_json(id: &str, app_id: &str, display_name: &str) -> Value {
    json!({
        "id": id,
        "appId": app_id,
        "displayName": display_name,
    })
}

pub fn odata_page(items: Vec<Value>, next_link: Option<&str>) -> Value {
    match next_link {
        Some(link) => json!({ "value": items, "@odata.nextLink": link }),
        None => json!({ "value": items }),
    }
}

pub fn odata_error(code: &str, message: &str) -> Value {
    json!({ "error": { "code": code, "message": message } })
}
