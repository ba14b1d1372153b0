//! Durable registry for deployments and credentials

mod file_registry;

pub use file_registry::FileRegistry;

use async_trait::async_trait;

use crate::errors::ControlError;
use crate::models::credentials::{BearerTokenRecord, ExternalUser};
use crate::models::deployment::Deployment;

/// Durable key-value storage contract. No business logic; the bus owns
/// every decision about what gets written.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Replace the stored deployment set. Records flagged `dont_persist`
    /// must be skipped.
    async fn save_deployments(&self, deployments: &[Deployment]) -> Result<(), ControlError>;

    /// Read all stored deployments
    async fn get_deployments(&self) -> Result<Vec<Deployment>, ControlError>;

    async fn save_external_user(&self, user: &ExternalUser) -> Result<(), ControlError>;

    async fn get_external_user(&self, id: &str) -> Result<Option<ExternalUser>, ControlError>;

    async fn save_bearer_token(&self, token: &BearerTokenRecord) -> Result<(), ControlError>;

    async fn get_bearer_token(&self, id: &str) -> Result<Option<BearerTokenRecord>, ControlError>;
}
