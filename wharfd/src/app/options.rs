//! Application configuration options

use std::net::IpAddr;
use std::time::Duration;

use crate::storage::layout::StorageLayout;
use crate::storage::settings::{EdgeSettings, FederatedSettings, ServerSettings};
use crate::workers::keyset_refresh;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Admin API server configuration
    pub server: ServerSettings,

    /// Edge engine admin endpoint
    pub edge: EdgeSettings,

    /// Federated-actor verification
    pub federated: FederatedSettings,

    /// Storage layout paths
    pub layout: StorageLayout,

    /// Pre-resolved peer addresses trusted like loopback
    pub trusted_peers: Vec<IpAddr>,

    /// Key set refresh worker options
    pub keyset_worker: keyset_refresh::Options,

    /// Stop the edge engine when the control plane shuts down
    pub stop_edge_on_shutdown: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            server: ServerSettings::default(),
            edge: EdgeSettings::default(),
            federated: FederatedSettings::default(),
            layout: StorageLayout::default(),
            trusted_peers: Vec::new(),
            keyset_worker: keyset_refresh::Options::default(),
            stop_edge_on_shutdown: false,
        }
    }
}

/// Lifecycle options
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum delay for graceful shutdown
    pub max_shutdown_delay: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            max_shutdown_delay: Duration::from_secs(30),
        }
    }
}
