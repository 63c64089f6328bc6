//! Wire models for the slice of the application object the cache mirrors.
//!
//! Field names follow the Graph JSON shape (`camelCase`, nullable fields as
//! `Option`). Patch types serialize only the fields that are present so a
//! partial update never clobbers unrelated remote state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{AppId, ObjectId};

/// Accepted account types for an application registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignInAudience {
    /// Single tenant.
    #[default]
    #[serde(rename = "AzureADMyOrg")]
    MyOrg,
    /// Any organizational directory.
    #[serde(rename = "AzureADMultipleOrgs")]
    MultipleOrgs,
    /// Any organizational directory and personal Microsoft accounts.
    #[serde(rename = "AzureADandPersonalMicrosoftAccount")]
    MultipleOrgsAndPersonal,
    /// Personal Microsoft accounts only.
    #[serde(rename = "PersonalMicrosoftAccount")]
    PersonalOnly,
}

impl SignInAudience {
    pub const ALL: [SignInAudience; 4] = [
        SignInAudience::MyOrg,
        SignInAudience::MultipleOrgs,
        SignInAudience::MultipleOrgsAndPersonal,
        SignInAudience::PersonalOnly,
    ];

    /// The literal value Graph expects on the wire.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MyOrg => "AzureADMyOrg",
            Self::MultipleOrgs => "AzureADMultipleOrgs",
            Self::MultipleOrgsAndPersonal => "AzureADandPersonalMicrosoftAccount",
            Self::PersonalOnly => "PersonalMicrosoftAccount",
        }
    }

    /// Human-readable description used in pickers and node labels.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::MyOrg => "Single tenant",
            Self::MultipleOrgs => "Multitenant",
            Self::MultipleOrgsAndPersonal => "Multitenant and personal accounts",
            Self::PersonalOnly => "Personal accounts only",
        }
    }
}

impl std::fmt::Display for SignInAudience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The two token issuance flags under `web.implicitGrantSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenFlow {
    IdToken,
    AccessToken,
}

impl TokenFlow {
    pub const ALL: [TokenFlow; 2] = [TokenFlow::IdToken, TokenFlow::AccessToken];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IdToken => "idToken",
            Self::AccessToken => "accessToken",
        }
    }

    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::IdToken => "ID token issuance",
            Self::AccessToken => "Access token issuance",
        }
    }

    /// Parses the short form used in node paths and CLI arguments.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "idToken" => Some(Self::IdToken),
            "accessToken" => Some(Self::AccessToken),
            _ => None,
        }
    }

    /// Reads this flag out of the grant settings, treating absent as off.
    #[must_use]
    pub fn read(&self, grant: &ImplicitGrantSettings) -> bool {
        match self {
            Self::IdToken => grant.enable_id_token_issuance.unwrap_or(false),
            Self::AccessToken => grant.enable_access_token_issuance.unwrap_or(false),
        }
    }
}

impl std::fmt::Display for TokenFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Principal types that may be assigned an app role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllowedMemberType {
    User,
    Application,
}

/// An entry of the application's `appRoles` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppRole {
    pub id: Uuid,
    #[serde(default)]
    pub allowed_member_types: Vec<AllowedMemberType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl AppRole {
    /// Label shown for this role, falling back to the id when the remote
    /// object carries no display name.
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// A client secret on the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordCredential {
    pub key_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Only present in the response of the creating request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_text: Option<String>,
}

/// A certificate registered on the application. Read and delete only; the
/// key material itself is never mirrored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyCredential {
    pub key_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub usage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date_time: Option<DateTime<Utc>>,
}

/// Who can consent to a delegated permission scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsentType {
    Admin,
    User,
}

impl ConsentType {
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Admin => "Administrators only",
            Self::User => "Administrators and users",
        }
    }
}

/// An entry of `api.oauth2PermissionScopes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionScope {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(rename = "type")]
    pub consent: ConsentType,
    pub is_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_consent_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_consent_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_consent_display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_consent_description: Option<String>,
}

impl PermissionScope {
    #[must_use]
    pub fn label(&self) -> String {
        self.value.clone().unwrap_or_else(|| self.id.to_string())
    }
}

/// `web.implicitGrantSettings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicitGrantSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_id_token_issuance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_access_token_issuance: Option<bool>,
}

impl ImplicitGrantSettings {
    /// A patch body that sets exactly one flag and leaves the other alone.
    #[must_use]
    pub fn single_flag(flag: TokenFlow, enabled: bool) -> Self {
        match flag {
            TokenFlow::IdToken => Self {
                enable_id_token_issuance: Some(enabled),
                enable_access_token_issuance: None,
            },
            TokenFlow::AccessToken => Self {
                enable_id_token_issuance: None,
                enable_access_token_issuance: Some(enabled),
            },
        }
    }
}

/// The `web` facet of the application object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uris: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub implicit_grant_settings: Option<ImplicitGrantSettings>,
}

/// The `api` facet of the application object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiApplication {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_permission_scopes: Option<Vec<PermissionScope>>,
}

/// The summary row returned by the root listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationSummary {
    pub id: ObjectId,
    pub app_id: AppId,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ApplicationSummary {
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .unwrap_or_else(|| self.app_id.to_string())
    }
}

/// Body for creating a new application registration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApplication {
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<SignInAudience>,
}

/// Partial update body. Only populated fields are serialized, so one patch
/// touches exactly the properties the mutation is about.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign_in_audience: Option<SignInAudience>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_credentials: Option<Vec<PasswordCredential>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_credentials: Option<Vec<KeyCredential>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiApplication>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web: Option<WebApplication>,
}

/// Field-scoped read result. Every facet is optional; only the requested
/// fields come back populated.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationFacet {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub sign_in_audience: Option<SignInAudience>,
    #[serde(default)]
    pub app_roles: Option<Vec<AppRole>>,
    #[serde(default)]
    pub password_credentials: Option<Vec<PasswordCredential>>,
    #[serde(default)]
    pub key_credentials: Option<Vec<KeyCredential>>,
    #[serde(default)]
    pub api: Option<ApiApplication>,
    #[serde(default)]
    pub web: Option<WebApplication>,
}

/// A directory user shown as an application owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: ObjectId,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
}

impl OwnerSummary {
    #[must_use]
    pub fn label(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| self.id.to_string())
    }
}
