//! HTTP client for the edge engine's admin endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, error};

use crate::edge::EdgeEngine;
use crate::errors::ControlError;
use crate::routes::table::RouteTable;
use crate::storage::settings::EdgeSettings;

/// Pushes route tables to the edge engine over its admin API.
///
/// The push carries an explicit timeout: the bus serializes all mutations
/// behind it, so a hung admin endpoint must fail rather than stall every
/// future administrative request.
pub struct HttpEdgeClient {
    client: Client,
    admin_endpoint: String,
}

impl HttpEdgeClient {
    pub fn new(settings: &EdgeSettings) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.push_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            admin_endpoint: settings.admin_endpoint.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl EdgeEngine for HttpEdgeClient {
    async fn deploy_all(&self, table: &RouteTable) -> Result<(), ControlError> {
        let url = format!("{}/load", self.admin_endpoint);
        debug!("POST {} ({} routes)", url, table.len());

        let response = self
            .client
            .post(&url)
            .json(table)
            .send()
            .await
            .map_err(|e| ControlError::UpstreamPushFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!("Edge engine rejected route table: {} - {}", status, body);
            return Err(ControlError::UpstreamPushFailed(format!(
                "{}: {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn stop(&self) -> Result<(), ControlError> {
        let url = format!("{}/stop", self.admin_endpoint);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .map_err(|e| ControlError::ServerError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ControlError::ServerError(format!(
                "edge stop failed: {}",
                response.status()
            )));
        }

        Ok(())
    }
}
