//! Signing-key-set refresh worker.
//!
//! Keeps the federated key-set cache primed so permission resolution never
//! blocks on network I/O once warm.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use crate::authn::federated::KeySetCache;

/// Key set refresh worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Refresh interval
    pub refresh_interval: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(3600),
        }
    }
}

/// Run the key set refresh worker
pub async fn run<S, F>(
    options: &Options,
    keys: Arc<KeySetCache>,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Key set refresh worker starting...");

    // Prime the cache so the first federated request never fetches inline
    if let Err(e) = keys.refresh().await {
        error!("Initial key set fetch failed: {}", e);
    }

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Key set refresh worker shutting down...");
                return;
            }
            _ = sleep_fn(options.refresh_interval) => {
                // Continue with refresh
            }
        }

        debug!("Refreshing signing key set...");
        if let Err(e) = keys.refresh().await {
            error!("Key set refresh failed: {}", e);
            // Will retry on next interval; the stale set stays usable
        }
    }
}
