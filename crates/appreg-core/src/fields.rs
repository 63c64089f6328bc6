//! Field names for scoped reads of the application object.
//!
//! Reads always name the fields they want; nothing ever fetches the whole
//! object. The enum keeps the `$select` vocabulary closed and typo-free.

/// A selectable top-level field of the application object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ApplicationField {
    Id,
    AppId,
    DisplayName,
    SignInAudience,
    AppRoles,
    PasswordCredentials,
    KeyCredentials,
    Api,
    Web,
}

impl ApplicationField {
    /// The wire name used in `$select` clauses and response bodies.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::AppId => "appId",
            Self::DisplayName => "displayName",
            Self::SignInAudience => "signInAudience",
            Self::AppRoles => "appRoles",
            Self::PasswordCredentials => "passwordCredentials",
            Self::KeyCredentials => "keyCredentials",
            Self::Api => "api",
            Self::Web => "web",
        }
    }
}

impl std::fmt::Display for ApplicationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Renders a deduplicated `$select` clause in a stable order.
#[must_use]
pub fn select_clause(fields: &[ApplicationField]) -> String {
    let mut sorted: Vec<ApplicationField> = fields.to_vec();
    sorted.sort();
    sorted.dedup();
    sorted
        .iter()
        .map(ApplicationField::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
