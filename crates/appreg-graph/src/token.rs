//! Token acquisition boundary.
//!
//! The client only needs "give me a bearer token now"; how the token is
//! obtained (device code, client credentials, a build-time secret) stays
//! outside this crate.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use appreg_core::{DirectoryError, DirectoryResult};

/// Supplies bearer tokens for Graph requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a token that is valid right now. Implementations are
    /// expected to cache and refresh internally.
    async fn bearer_token(&self) -> DirectoryResult<SecretString>;
}

/// A provider that hands out one fixed token.
///
/// Useful for short-lived CLI sessions where the caller already holds a
/// token (`az account get-access-token`, CI secrets) and for tests.
pub struct StaticTokenProvider {
    token: SecretString,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> DirectoryResult<SecretString> {
        if self.token.expose_secret().is_empty() {
            return Err(DirectoryError::Auth("no access token configured".into()));
        }
        Ok(self.token.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_provider_returns_token() {
        let provider = StaticTokenProvider::new("tok-123");
        let token = provider.bearer_token().await.unwrap();
        assert_eq!(token.expose_secret(), "tok-123");
    }

    #[tokio::test]
    async fn test_empty_token_is_an_auth_error() {
        let provider = StaticTokenProvider::new("");
        let err = provider.bearer_token().await.unwrap_err();
        assert!(matches!(err, DirectoryError::Auth(_)));
    }
}
