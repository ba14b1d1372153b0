//! JSON-file-backed registry

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;

use crate::errors::ControlError;
use crate::models::credentials::{BearerTokenRecord, ExternalUser};
use crate::models::deployment::Deployment;
use crate::registry::Registry;
use crate::storage::layout::StorageLayout;

/// Registry backed by JSON files under the storage layout
pub struct FileRegistry {
    layout: StorageLayout,
}

impl FileRegistry {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout }
    }

    async fn read_users(&self) -> Result<HashMap<String, ExternalUser>, ControlError> {
        let file = self.layout.users_file();
        if !file.exists().await {
            return Ok(HashMap::new());
        }
        file.read_json().await
    }

    async fn read_tokens(&self) -> Result<HashMap<String, BearerTokenRecord>, ControlError> {
        let file = self.layout.tokens_file();
        if !file.exists().await {
            return Ok(HashMap::new());
        }
        file.read_json().await
    }
}

#[async_trait]
impl Registry for FileRegistry {
    async fn save_deployments(&self, deployments: &[Deployment]) -> Result<(), ControlError> {
        let persisted: Vec<&Deployment> = deployments
            .iter()
            .filter(|d| !d.metadata.dont_persist)
            .collect();

        debug!(
            "Persisting {} of {} deployments",
            persisted.len(),
            deployments.len()
        );

        self.layout
            .deployments_file()
            .write_json(&persisted)
            .await
            .map_err(|e| ControlError::PersistenceFailed(e.to_string()))
    }

    async fn get_deployments(&self) -> Result<Vec<Deployment>, ControlError> {
        let file = self.layout.deployments_file();
        if !file.exists().await {
            return Ok(Vec::new());
        }
        file.read_json().await
    }

    async fn save_external_user(&self, user: &ExternalUser) -> Result<(), ControlError> {
        let mut users = self.read_users().await?;
        users.insert(user.external_id.clone(), user.clone());
        self.layout
            .users_file()
            .write_json(&users)
            .await
            .map_err(|e| ControlError::PersistenceFailed(e.to_string()))
    }

    async fn get_external_user(&self, id: &str) -> Result<Option<ExternalUser>, ControlError> {
        Ok(self.read_users().await?.remove(id))
    }

    async fn save_bearer_token(&self, token: &BearerTokenRecord) -> Result<(), ControlError> {
        let mut tokens = self.read_tokens().await?;
        tokens.insert(token.id.clone(), token.clone());
        let file = self.layout.tokens_file();
        file.write_json(&tokens)
            .await
            .map_err(|e| ControlError::PersistenceFailed(e.to_string()))?;
        file.set_permissions_600().await?;
        Ok(())
    }

    async fn get_bearer_token(&self, id: &str) -> Result<Option<BearerTokenRecord>, ControlError> {
        Ok(self.read_tokens().await?.remove(id))
    }
}
