//! Deployment bus: single authoritative owner of the active deployment set.
//!
//! Every mutation is a serialized read-modify-recompile-push-persist
//! sequence. The in-memory list is committed only after the edge engine
//! accepts the recompiled table, so memory, edge state and registry can
//! never disagree after a failed push.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::edge::EdgeEngine;
use crate::errors::ControlError;
use crate::models::deployment::{Deployment, DeploymentContent, DeploymentMetadata};
use crate::models::url::Url;
use crate::registry::Registry;
use crate::routes::compiler;
use crate::routes::ADMIN_ROUTE_PATH;

pub struct DeploymentBus {
    registry: Arc<dyn Registry>,
    edge: Arc<dyn EdgeEngine>,

    /// Authoritative in-memory list; the lock serializes mutations for the
    /// full duration of their push/persist sequence.
    deployments: Mutex<Vec<Deployment>>,

    /// Upstream for the bootstrapped admin meta-route, when enabled
    admin_upstream: Option<String>,
}

impl DeploymentBus {
    pub fn new(
        registry: Arc<dyn Registry>,
        edge: Arc<dyn EdgeEngine>,
        admin_upstream: Option<String>,
    ) -> Self {
        Self {
            registry,
            edge,
            deployments: Mutex::new(Vec::new()),
            admin_upstream,
        }
    }

    /// Read all deployments from the registry and push the complete set to
    /// the edge engine. Any failure here is fatal: a non-serving control
    /// plane is useless.
    pub async fn load(&self) -> Result<(), ControlError> {
        let mut list = self.registry.get_deployments().await?;

        if let Some(upstream) = &self.admin_upstream {
            list.push(admin_deployment(upstream));
        }

        let table = compiler::compile(&list)?;
        self.edge.deploy_all(&table).await?;

        info!("Loaded {} deployments, {} routes live", list.len(), table.len());

        let mut guard = self.deployments.lock().await;
        *guard = list;
        Ok(())
    }

    /// Snapshot of the current deployment set
    pub async fn list(&self) -> Vec<Deployment> {
        self.deployments.lock().await.clone()
    }

    /// Exact-match lookup by URL
    pub async fn get_deployment_by_url(&self, url: &Url) -> Result<Deployment, ControlError> {
        self.deployments
            .lock()
            .await
            .iter()
            .find(|d| d.url() == url)
            .cloned()
            .ok_or_else(|| ControlError::NotFound(format!("no deployment at {}", url)))
    }

    /// Upsert by URL: replace metadata in place (content untouched) or
    /// create a new content-less deployment.
    pub async fn setup_deployment(&self, metadata: DeploymentMetadata) -> Result<(), ControlError> {
        let mut guard = self.deployments.lock().await;

        let mut candidate = guard.clone();
        match candidate.iter_mut().find(|d| *d.url() == metadata.url) {
            Some(existing) => {
                info!("Updating deployment metadata for {}", metadata.url);
                existing.metadata = metadata;
            }
            None => {
                info!("Creating deployment at {}", metadata.url);
                candidate.push(Deployment::new(metadata));
            }
        }

        self.commit(&mut guard, candidate).await
    }

    /// Replace the content of an existing deployment
    pub async fn put_deployment_content_by_url(
        &self,
        url: &Url,
        mut content: DeploymentContent,
    ) -> Result<(), ControlError> {
        let mut guard = self.deployments.lock().await;

        let mut candidate = guard.clone();
        let deployment = candidate
            .iter_mut()
            .find(|d| d.url() == url)
            .ok_or_else(|| ControlError::NotFound(format!("no deployment at {}", url)))?;

        info!(
            "Attaching {:?} content to {}",
            content.served_thing_type, url
        );
        content.has_content = true;
        deployment.content = Some(content);

        self.commit(&mut guard, candidate).await
    }

    /// Remove a deployment
    pub async fn delete_deployment(&self, url: &Url) -> Result<(), ControlError> {
        let mut guard = self.deployments.lock().await;

        let mut candidate = guard.clone();
        let before = candidate.len();
        candidate.retain(|d| d.url() != url);
        if candidate.len() == before {
            return Err(ControlError::NotFound(format!("no deployment at {}", url)));
        }

        info!("Deleting deployment at {}", url);
        self.commit(&mut guard, candidate).await
    }

    /// Recompile, push, commit, persist. The candidate replaces the live
    /// list only after the edge engine accepts the table; a registry write
    /// failure after that keeps the committed list (it matches what the
    /// edge now serves) and surfaces as `PersistenceFailed`.
    async fn commit(
        &self,
        guard: &mut Vec<Deployment>,
        candidate: Vec<Deployment>,
    ) -> Result<(), ControlError> {
        let table = compiler::compile(&candidate)?;

        if let Err(e) = self.edge.deploy_all(&table).await {
            warn!("Edge push failed, mutation rolled back: {}", e);
            return Err(e);
        }

        *guard = candidate;

        self.registry.save_deployments(guard).await.map_err(|e| match e {
            ControlError::PersistenceFailed(_) => e,
            other => ControlError::PersistenceFailed(other.to_string()),
        })
    }
}

/// The admin API's own route: proxied through the edge like everything
/// else, but never persisted.
fn admin_deployment(upstream: &str) -> Deployment {
    let mut metadata = DeploymentMetadata::new(Url::new("", ADMIN_ROUTE_PATH));
    metadata.dont_persist = true;

    Deployment {
        metadata,
        content: Some(DeploymentContent::reverse_proxy(upstream)),
    }
}
