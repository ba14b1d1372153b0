//! Edge engine contract

mod client;

pub use client::HttpEdgeClient;

use async_trait::async_trait;

use crate::errors::ControlError;
use crate::routes::table::RouteTable;

/// The external serving process that actually accepts connections.
/// The control plane only ever hands it a complete, ordered route table.
#[async_trait]
pub trait EdgeEngine: Send + Sync {
    /// Replace the engine's entire route table. Ordering is significant;
    /// first match wins.
    async fn deploy_all(&self, table: &RouteTable) -> Result<(), ControlError>;

    /// Ask the engine to stop serving
    async fn stop(&self) -> Result<(), ControlError>;
}
