//! Settings file management

use serde::{Deserialize, Serialize};

use crate::logs::LogLevel;

/// Daemon settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Admin API server configuration
    #[serde(default)]
    pub server: ServerSettings,

    /// Edge engine admin endpoint configuration
    #[serde(default)]
    pub edge: EdgeSettings,

    /// Federated-actor verification configuration
    #[serde(default)]
    pub federated: FederatedSettings,

    /// Remote addresses trusted as local automation peers
    #[serde(default)]
    pub trusted_peers: Vec<String>,

    /// Base directory for durable state
    #[serde(default)]
    pub storage_dir: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            server: ServerSettings::default(),
            edge: EdgeSettings::default(),
            federated: FederatedSettings::default(),
            trusted_peers: Vec::new(),
            storage_dir: None,
        }
    }
}

/// Admin API server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_server_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_server_port")]
    pub port: u16,
}

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8675
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
        }
    }
}

/// Edge engine admin endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    /// Base URL of the edge engine's admin endpoint
    #[serde(default = "default_edge_endpoint")]
    pub admin_endpoint: String,

    /// Timeout for route table pushes, in seconds
    #[serde(default = "default_push_timeout")]
    pub push_timeout_secs: u64,
}

fn default_edge_endpoint() -> String {
    "http://127.0.0.1:2019".to_string()
}

fn default_push_timeout() -> u64 {
    30
}

impl Default for EdgeSettings {
    fn default() -> Self {
        Self {
            admin_endpoint: default_edge_endpoint(),
            push_timeout_secs: default_push_timeout(),
        }
    }
}

/// Federated-actor verification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedSettings {
    /// Expected token issuer
    #[serde(default = "default_issuer")]
    pub issuer: String,

    /// Signing-key-set URL
    #[serde(default = "default_keys_url")]
    pub keys_url: String,

    /// Expected audience claim
    #[serde(default)]
    pub audience: String,

    /// Key set refresh interval, in seconds
    #[serde(default = "default_keys_refresh")]
    pub keys_refresh_secs: u64,
}

fn default_issuer() -> String {
    "https://token.actions.githubusercontent.com".to_string()
}

fn default_keys_url() -> String {
    "https://token.actions.githubusercontent.com/.well-known/jwks".to_string()
}

fn default_keys_refresh() -> u64 {
    3600
}

impl Default for FederatedSettings {
    fn default() -> Self {
        Self {
            issuer: default_issuer(),
            keys_url: default_keys_url(),
            audience: String::new(),
            keys_refresh_secs: default_keys_refresh(),
        }
    }
}
