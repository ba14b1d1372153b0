//! Server state

use std::sync::Arc;

use crate::authn::resolver::PermissionResolver;
use crate::bus::DeploymentBus;
use crate::registry::Registry;
use crate::storage::layout::StorageLayout;

/// Server state shared across handlers
pub struct ServerState {
    pub bus: Arc<DeploymentBus>,
    pub registry: Arc<dyn Registry>,
    pub resolver: Arc<PermissionResolver>,
    pub layout: StorageLayout,
}

impl ServerState {
    pub fn new(
        bus: Arc<DeploymentBus>,
        registry: Arc<dyn Registry>,
        resolver: Arc<PermissionResolver>,
        layout: StorageLayout,
    ) -> Self {
        Self {
            bus,
            registry,
            resolver,
            layout,
        }
    }
}
