//! Application state management

use std::sync::Arc;

use tracing::{info, warn};

use crate::app::options::AppOptions;
use crate::authn::federated::{KeySetCache, OidcVerifier};
use crate::authn::resolver::PermissionResolver;
use crate::bus::DeploymentBus;
use crate::edge::{EdgeEngine, HttpEdgeClient};
use crate::errors::ControlError;
use crate::registry::{FileRegistry, Registry};

/// Main application state
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub edge: Arc<dyn EdgeEngine>,
    pub bus: Arc<DeploymentBus>,
    pub keys: Arc<KeySetCache>,
    pub resolver: Arc<PermissionResolver>,

    stop_edge_on_shutdown: bool,
}

impl AppState {
    /// Initialize application state: storage, registry, edge client, bus
    /// (including the initial load-and-push), and the resolver chain.
    pub async fn init(options: &AppOptions) -> Result<Self, ControlError> {
        info!("Initializing control plane state...");

        options.layout.setup().await?;

        let registry: Arc<dyn Registry> = Arc::new(FileRegistry::new(options.layout.clone()));
        let edge: Arc<dyn EdgeEngine> = Arc::new(HttpEdgeClient::new(&options.edge)?);

        let admin_upstream = format!("{}:{}", options.server.host, options.server.port);
        let bus = Arc::new(DeploymentBus::new(
            registry.clone(),
            edge.clone(),
            Some(admin_upstream),
        ));

        // A control plane that cannot serve its current set is useless;
        // load failures are fatal.
        bus.load().await?;

        let keys = Arc::new(KeySetCache::new(&options.federated)?);
        let verifier = Arc::new(OidcVerifier::new(keys.clone(), &options.federated));
        let resolver = Arc::new(PermissionResolver::new(
            registry.clone(),
            verifier,
            options.trusted_peers.clone(),
        ));

        Ok(Self {
            registry,
            edge,
            bus,
            keys,
            resolver,
            stop_edge_on_shutdown: options.stop_edge_on_shutdown,
        })
    }

    /// Shutdown application state
    pub async fn shutdown(&self) -> Result<(), ControlError> {
        info!("Shutting down control plane state...");
        if self.stop_edge_on_shutdown {
            if let Err(e) = self.edge.stop().await {
                warn!("Edge engine stop failed: {}", e);
            }
        }
        Ok(())
    }
}
