//! Node types of the cache tree.
//!
//! A node mirrors one remote entity (or a fixed grouping of them) and keeps
//! the typed payload it was built from, so consumers can read cached state
//! without another fetch.

use appreg_core::model::{
    AppRole, ApplicationSummary, KeyCredential, OwnerSummary, PasswordCredential, PermissionScope,
    SignInAudience, TokenFlow,
};
use appreg_core::{ApplicationField, ObjectId};

use crate::path::NodePath;

/// Arena key of a node. Stable for the lifetime of the node, never reused
/// within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Root node of one application registration.
    Application,
    AppRoleGroup,
    AppRole,
    CredentialGroup,
    PasswordCredential,
    CertificateCredential,
    ScopeGroup,
    PermissionScope,
    RedirectUriGroup,
    RedirectUri,
    Audience,
    TokenFlowFlag,
    OwnerGroup,
    Owner,
}

impl NodeKind {
    /// Stable name used in paths and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::AppRoleGroup => "appRoles",
            Self::AppRole => "appRole",
            Self::CredentialGroup => "credentials",
            Self::PasswordCredential => "passwordCredential",
            Self::CertificateCredential => "certificateCredential",
            Self::ScopeGroup => "scopes",
            Self::PermissionScope => "scope",
            Self::RedirectUriGroup => "redirectUris",
            Self::RedirectUri => "redirectUri",
            Self::Audience => "signInAudience",
            Self::TokenFlowFlag => "tokenFlow",
            Self::OwnerGroup => "owners",
            Self::Owner => "owner",
        }
    }

    /// True for kinds whose children are resolved from remote state.
    /// Everything else is a leaf and resolves to an empty list locally.
    #[must_use]
    pub fn has_children(&self) -> bool {
        matches!(
            self,
            Self::Application
                | Self::AppRoleGroup
                | Self::CredentialGroup
                | Self::ScopeGroup
                | Self::RedirectUriGroup
                | Self::OwnerGroup
        )
    }

    /// The fields a fetch for this kind's backing data reads. Owner nodes
    /// use the owners navigation instead and need no fields.
    #[must_use]
    pub fn facet_fields(&self) -> &'static [ApplicationField] {
        match self {
            Self::Application => &[ApplicationField::SignInAudience, ApplicationField::Web],
            Self::AppRoleGroup | Self::AppRole => &[ApplicationField::AppRoles],
            Self::CredentialGroup | Self::PasswordCredential | Self::CertificateCredential => &[
                ApplicationField::PasswordCredentials,
                ApplicationField::KeyCredentials,
            ],
            Self::ScopeGroup | Self::PermissionScope => &[ApplicationField::Api],
            Self::RedirectUriGroup | Self::RedirectUri | Self::TokenFlowFlag => {
                &[ApplicationField::Web]
            }
            Self::Audience => &[ApplicationField::SignInAudience],
            Self::OwnerGroup | Self::Owner => &[],
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Presentation state of a node, driven by the mutation protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisualState {
    #[default]
    Idle,
    Busy,
    Error,
}

/// Typed payload the node was built from.
#[derive(Debug, Clone, Default)]
pub enum NodeData {
    #[default]
    None,
    Application(ApplicationSummary),
    Role(AppRole),
    Password(PasswordCredential),
    Certificate(KeyCredential),
    Scope(PermissionScope),
    RedirectUri(String),
    Audience(SignInAudience),
    TokenFlag { flow: TokenFlow, enabled: bool },
    Owner(OwnerSummary),
}

impl NodeData {
    #[must_use]
    pub fn as_role(&self) -> Option<&AppRole> {
        match self {
            Self::Role(role) => Some(role),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_scope(&self) -> Option<&PermissionScope> {
        match self {
            Self::Scope(scope) => Some(scope),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_password(&self) -> Option<&PasswordCredential> {
        match self {
            Self::Password(cred) => Some(cred),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_certificate(&self) -> Option<&KeyCredential> {
        match self {
            Self::Certificate(cred) => Some(cred),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_redirect_uri(&self) -> Option<&str> {
        match self {
            Self::RedirectUri(uri) => Some(uri),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_audience(&self) -> Option<SignInAudience> {
        match self {
            Self::Audience(audience) => Some(*audience),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_token_flag(&self) -> Option<(TokenFlow, bool)> {
        match self {
            Self::TokenFlag { flow, enabled } => Some((*flow, *enabled)),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_owner(&self) -> Option<&OwnerSummary> {
        match self {
            Self::Owner(owner) => Some(owner),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_application(&self) -> Option<&ApplicationSummary> {
        match self {
            Self::Application(summary) => Some(summary),
            _ => None,
        }
    }
}

/// One cached node.
///
/// `children` distinguishes "never resolved" (`None`) from "resolved and
/// empty" (`Some` of an empty list). The parent link is an arena id, never
/// an owning reference.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub kind: NodeKind,
    /// Directory object id of the owning application.
    pub app: ObjectId,
    /// Distinguishes this node among siblings of the same kind: role id,
    /// credential key id, scope id, the redirect URI itself, owner id,
    /// token flow name. `None` for singletons and groups.
    pub local_value: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub data: NodeData,
    pub(crate) visual: VisualState,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Option<Vec<NodeId>>,
}

impl TreeNode {
    #[must_use]
    pub fn new(kind: NodeKind, app: ObjectId, label: impl Into<String>) -> Self {
        Self {
            kind,
            app,
            local_value: None,
            label: label.into(),
            description: None,
            data: NodeData::None,
            visual: VisualState::Idle,
            parent: None,
            children: None,
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.local_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, data: NodeData) -> Self {
        self.data = data;
        self
    }

    #[must_use]
    pub fn visual(&self) -> VisualState {
        self.visual
    }

    #[must_use]
    pub fn children_resolved(&self) -> bool {
        self.children.is_some()
    }
}

/// Copy of a node handed to consumers. Holds no reference into the tree;
/// the id and path can be used to ask the synchronizer for more.
#[derive(Debug, Clone)]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub path: NodePath,
    pub kind: NodeKind,
    pub app: ObjectId,
    pub local_value: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub data: NodeData,
    pub visual: VisualState,
    pub children_resolved: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_kinds_have_children() {
        assert!(NodeKind::Application.has_children());
        assert!(NodeKind::AppRoleGroup.has_children());
        assert!(!NodeKind::AppRole.has_children());
        assert!(!NodeKind::Audience.has_children());
    }

    #[test]
    fn test_leaf_refresh_uses_same_fields_as_its_group() {
        assert_eq!(
            NodeKind::AppRole.facet_fields(),
            NodeKind::AppRoleGroup.facet_fields()
        );
        assert_eq!(
            NodeKind::PasswordCredential.facet_fields(),
            NodeKind::CredentialGroup.facet_fields()
        );
    }
}
