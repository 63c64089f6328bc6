//! [`DirectoryRepository`] backed by Microsoft Graph.

use async_trait::async_trait;
use serde_json::json;
use tracing::instrument;

use appreg_core::fields::{select_clause, ApplicationField};
use appreg_core::model::{
    ApplicationFacet, ApplicationPatch, ApplicationSummary, NewApplication, OwnerSummary,
};
use appreg_core::{DirectoryRepository, DirectoryResult, ObjectId};

use crate::client::GraphClient;

const SUMMARY_FIELDS: [ApplicationField; 3] = [
    ApplicationField::Id,
    ApplicationField::AppId,
    ApplicationField::DisplayName,
];

/// Application registrations resource layer on top of [`GraphClient`].
pub struct GraphDirectoryRepository {
    client: GraphClient,
}

impl GraphDirectoryRepository {
    #[must_use]
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DirectoryRepository for GraphDirectoryRepository {
    #[instrument(skip(self))]
    async fn list_applications(&self) -> DirectoryResult<Vec<ApplicationSummary>> {
        let path = format!(
            "/applications?$select={}&$top=999",
            select_clause(&SUMMARY_FIELDS)
        );
        let mut apps: Vec<ApplicationSummary> = self.client.get_all_pages(&path).await?;
        apps.sort_by(|a, b| a.label().to_lowercase().cmp(&b.label().to_lowercase()));
        Ok(apps)
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn read_fields(
        &self,
        id: &ObjectId,
        fields: &[ApplicationField],
    ) -> DirectoryResult<ApplicationFacet> {
        let path = format!("/applications/{id}?$select={}", select_clause(fields));
        self.client.get_json(&path).await
    }

    #[instrument(skip(self, patch), fields(id = %id))]
    async fn write_fields(&self, id: &ObjectId, patch: &ApplicationPatch) -> DirectoryResult<()> {
        self.client
            .patch_json(&format!("/applications/{id}"), patch)
            .await
    }

    #[instrument(skip(self, new))]
    async fn create_application(
        &self,
        new: &NewApplication,
    ) -> DirectoryResult<ApplicationSummary> {
        self.client.post_json("/applications", new).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_application(&self, id: &ObjectId) -> DirectoryResult<()> {
        self.client.delete(&format!("/applications/{id}")).await
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn list_owners(&self, id: &ObjectId) -> DirectoryResult<Vec<OwnerSummary>> {
        let path =
            format!("/applications/{id}/owners?$select=id,displayName,userPrincipalName");
        self.client.get_all_pages(&path).await
    }

    #[instrument(skip(self), fields(id = %id, user = %user))]
    async fn add_owner(&self, id: &ObjectId, user: &ObjectId) -> DirectoryResult<()> {
        let body = json!({
            "@odata.id": format!("{}/directoryObjects/{user}", self.client.base_url()),
        });
        self.client
            .post_empty(&format!("/applications/{id}/owners/$ref"), &body)
            .await
    }

    #[instrument(skip(self), fields(id = %id, owner = %owner))]
    async fn remove_owner(&self, id: &ObjectId, owner: &ObjectId) -> DirectoryResult<()> {
        self.client
            .delete(&format!("/applications/{id}/owners/{owner}/$ref"))
            .await
    }

    #[instrument(skip(self))]
    async fn find_user(&self, principal: &str) -> DirectoryResult<OwnerSummary> {
        let path = format!("/users/{principal}?$select=id,displayName,userPrincipalName");
        self.client.get_json(&path).await
    }
}
