//! The remote repository contract.
//!
//! Everything above this trait (tree synchronizer, domain services, CLI)
//! is backend-agnostic: the Graph client and the in-memory test repository
//! both implement it.

use async_trait::async_trait;

use crate::error::DirectoryResult;
use crate::fields::ApplicationField;
use crate::ids::ObjectId;
use crate::model::{
    ApplicationFacet, ApplicationPatch, ApplicationSummary, NewApplication, OwnerSummary,
};

/// Access to application registrations in a directory.
///
/// All operations address a single application by its directory object id.
/// Reads are field-scoped; writes are partial patches. Array-valued facets
/// (roles, credentials, scopes, redirect URIs) are replaced wholesale by a
/// patch, which is why mutations re-read them first.
#[async_trait]
pub trait DirectoryRepository: Send + Sync {
    /// Lists every application registration visible to the caller.
    async fn list_applications(&self) -> DirectoryResult<Vec<ApplicationSummary>>;

    /// Reads exactly the named fields of one application.
    async fn read_fields(
        &self,
        id: &ObjectId,
        fields: &[ApplicationField],
    ) -> DirectoryResult<ApplicationFacet>;

    /// Applies a partial update to one application.
    async fn write_fields(&self, id: &ObjectId, patch: &ApplicationPatch) -> DirectoryResult<()>;

    /// Creates a new application registration and returns its summary.
    async fn create_application(
        &self,
        new: &NewApplication,
    ) -> DirectoryResult<ApplicationSummary>;

    /// Deletes an application registration.
    async fn delete_application(&self, id: &ObjectId) -> DirectoryResult<()>;

    /// Lists the owners of one application.
    async fn list_owners(&self, id: &ObjectId) -> DirectoryResult<Vec<OwnerSummary>>;

    /// Adds a directory user as an owner.
    async fn add_owner(&self, id: &ObjectId, user: &ObjectId) -> DirectoryResult<()>;

    /// Removes an owner reference.
    async fn remove_owner(&self, id: &ObjectId, owner: &ObjectId) -> DirectoryResult<()>;

    /// Resolves a directory user by user principal name or object id.
    async fn find_user(&self, principal: &str) -> DirectoryResult<OwnerSummary>;
}
