//! Builds tree nodes out of wire models: labels, descriptions, payloads.

use chrono::{DateTime, Utc};

use appreg_core::model::{
    AppRole, ApplicationFacet, ApplicationSummary, ImplicitGrantSettings, KeyCredential,
    OwnerSummary, PasswordCredential, PermissionScope, SignInAudience, TokenFlow,
};
use appreg_core::ObjectId;

use crate::node::{NodeData, NodeKind, TreeNode};

pub(crate) fn application_node(summary: ApplicationSummary) -> TreeNode {
    TreeNode::new(NodeKind::Application, summary.id, summary.label())
        .with_description(summary.app_id.to_string())
        .with_data(NodeData::Application(summary))
}

/// The fixed children of an application root: the collection groups, then
/// the audience and token flag leaves built from the fetched facet.
pub(crate) fn application_children(app: ObjectId, facet: &ApplicationFacet) -> Vec<TreeNode> {
    let audience = facet.sign_in_audience.unwrap_or_default();
    let grant = facet
        .web
        .as_ref()
        .and_then(|w| w.implicit_grant_settings)
        .unwrap_or_default();

    let mut children = vec![
        TreeNode::new(NodeKind::AppRoleGroup, app, "App roles"),
        TreeNode::new(NodeKind::CredentialGroup, app, "Credentials"),
        TreeNode::new(NodeKind::ScopeGroup, app, "Permission scopes"),
        TreeNode::new(NodeKind::RedirectUriGroup, app, "Redirect URIs"),
        TreeNode::new(NodeKind::OwnerGroup, app, "Owners"),
        audience_node(app, audience),
    ];
    for flow in TokenFlow::ALL {
        children.push(token_flag_node(app, flow, flow.read(&grant)));
    }
    children
}

pub(crate) fn role_node(app: ObjectId, role: AppRole) -> TreeNode {
    let mut parts = Vec::new();
    if let Some(value) = &role.value {
        parts.push(value.clone());
    }
    if !role.is_enabled {
        parts.push("disabled".to_string());
    }
    let node = TreeNode::new(NodeKind::AppRole, app, role.label()).with_value(role.id.to_string());
    let node = if parts.is_empty() {
        node
    } else {
        node.with_description(parts.join(", "))
    };
    node.with_data(NodeData::Role(role))
}

fn expiry_text(end: Option<DateTime<Utc>>) -> Option<String> {
    let end = end?;
    let word = if end < Utc::now() { "expired" } else { "expires" };
    Some(format!("{word} {}", end.format("%Y-%m-%d")))
}

pub(crate) fn password_node(app: ObjectId, cred: PasswordCredential) -> TreeNode {
    let label = cred
        .display_name
        .clone()
        .unwrap_or_else(|| "Client secret".to_string());
    let node = TreeNode::new(NodeKind::PasswordCredential, app, label)
        .with_value(cred.key_id.to_string());
    let node = match expiry_text(cred.end_date_time) {
        Some(text) => node.with_description(text),
        None => node,
    };
    node.with_data(NodeData::Password(cred))
}

pub(crate) fn certificate_node(app: ObjectId, cred: KeyCredential) -> TreeNode {
    let label = cred
        .display_name
        .clone()
        .unwrap_or_else(|| "Certificate".to_string());
    let node = TreeNode::new(NodeKind::CertificateCredential, app, label)
        .with_value(cred.key_id.to_string());
    let node = match expiry_text(cred.end_date_time) {
        Some(text) => node.with_description(text),
        None => node,
    };
    node.with_data(NodeData::Certificate(cred))
}

pub(crate) fn scope_node(app: ObjectId, scope: PermissionScope) -> TreeNode {
    let mut parts = vec![scope.consent.describe().to_string()];
    if !scope.is_enabled {
        parts.push("disabled".to_string());
    }
    TreeNode::new(NodeKind::PermissionScope, app, scope.label())
        .with_value(scope.id.to_string())
        .with_description(parts.join(", "))
        .with_data(NodeData::Scope(scope))
}

pub(crate) fn redirect_uri_node(app: ObjectId, uri: String) -> TreeNode {
    TreeNode::new(NodeKind::RedirectUri, app, uri.clone())
        .with_value(uri.clone())
        .with_data(NodeData::RedirectUri(uri))
}

pub(crate) fn audience_node(app: ObjectId, audience: SignInAudience) -> TreeNode {
    TreeNode::new(NodeKind::Audience, app, "Sign-in audience")
        .with_description(audience.describe())
        .with_data(NodeData::Audience(audience))
}

pub(crate) fn token_flag_node(app: ObjectId, flow: TokenFlow, enabled: bool) -> TreeNode {
    TreeNode::new(NodeKind::TokenFlowFlag, app, flow.describe())
        .with_value(flow.as_str())
        .with_description(if enabled { "enabled" } else { "disabled" })
        .with_data(NodeData::TokenFlag { flow, enabled })
}

pub(crate) fn owner_node(app: ObjectId, owner: OwnerSummary) -> TreeNode {
    let node =
        TreeNode::new(NodeKind::Owner, app, owner.label()).with_value(owner.id.to_string());
    let node = match &owner.user_principal_name {
        Some(upn) if *upn != owner.label() => node.with_description(upn.clone()),
        _ => node,
    };
    node.with_data(NodeData::Owner(owner))
}

/// Extracts the grant settings a token flag node reads, for reuse by the
/// leaf refresh path.
pub(crate) fn grant_of(facet: &ApplicationFacet) -> ImplicitGrantSettings {
    facet
        .web
        .as_ref()
        .and_then(|w| w.implicit_grant_settings)
        .unwrap_or_default()
}
