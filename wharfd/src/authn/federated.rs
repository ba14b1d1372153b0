//! Federated-actor token verification.
//!
//! Tokens are JWTs signed by a third-party identity provider (a CI
//! platform's OIDC issuer). Signature, audience and expiry are checked
//! against the issuer's published key set, which is cached with a bounded
//! refresh interval so request handling never blocks on network I/O once
//! primed.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{decode, decode_header, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::errors::ControlError;
use crate::storage::settings::FederatedSettings;

/// Claims carried by a federated-actor token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederatedClaims {
    /// Subject (workflow identity)
    pub sub: String,

    /// Source repository, e.g. "owner/repo"
    pub repository: String,

    /// Git ref the workflow ran on, e.g. "refs/heads/main"
    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,

    /// Expiration timestamp
    pub exp: i64,
}

impl FederatedClaims {
    /// Branch name, when the token carries a branch ref
    pub fn branch(&self) -> Option<&str> {
        self.git_ref.as_deref()?.strip_prefix("refs/heads/")
    }
}

/// Verification seam; the HTTP resolver tests mock this
#[async_trait]
pub trait FederatedVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<FederatedClaims, ControlError>;
}

/// Remote signing-key set with a bounded-staleness cache
pub struct KeySetCache {
    client: Client,
    keys_url: String,
    refresh_interval: Duration,
    cached: RwLock<Option<(JwkSet, Instant)>>,
}

impl KeySetCache {
    pub fn new(settings: &FederatedSettings) -> Result<Self, ControlError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            keys_url: settings.keys_url.clone(),
            refresh_interval: Duration::from_secs(settings.keys_refresh_secs),
            cached: RwLock::new(None),
        })
    }

    /// Current key set, fetching if missing or stale
    pub async fn get(&self) -> Result<JwkSet, ControlError> {
        {
            let cached = self.cached.read().await;
            if let Some((keys, fetched_at)) = cached.as_ref() {
                if fetched_at.elapsed() < self.refresh_interval {
                    return Ok(keys.clone());
                }
            }
        }

        self.refresh().await
    }

    /// Force a fetch from the key set URL
    pub async fn refresh(&self) -> Result<JwkSet, ControlError> {
        debug!("Fetching signing key set from {}", self.keys_url);

        let keys: JwkSet = self
            .client
            .get(&self.keys_url)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| ControlError::TokenError(format!("key set fetch failed: {}", e)))?
            .json()
            .await?;

        info!("Signing key set refreshed ({} keys)", keys.keys.len());

        let mut cached = self.cached.write().await;
        *cached = Some((keys.clone(), Instant::now()));
        Ok(keys)
    }
}

/// Verifier backed by the issuer's published key set
pub struct OidcVerifier {
    keys: std::sync::Arc<KeySetCache>,
    issuer: String,
    audience: String,
}

impl OidcVerifier {
    pub fn new(keys: std::sync::Arc<KeySetCache>, settings: &FederatedSettings) -> Self {
        Self {
            keys,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
        }
    }
}

#[async_trait]
impl FederatedVerifier for OidcVerifier {
    async fn verify(&self, token: &str) -> Result<FederatedClaims, ControlError> {
        let header = decode_header(token)
            .map_err(|e| ControlError::Unauthenticated(format!("malformed token: {}", e)))?;
        let kid = header
            .kid
            .ok_or_else(|| ControlError::Unauthenticated("token missing key id".to_string()))?;

        let keys = self.keys.get().await?;
        let jwk = keys
            .find(&kid)
            .ok_or_else(|| ControlError::Unauthenticated("unknown signing key".to_string()))?;
        let key = DecodingKey::from_jwk(jwk)
            .map_err(|e| ControlError::TokenError(format!("bad signing key: {}", e)))?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<FederatedClaims>(token, &key, &validation)
            .map_err(|e| ControlError::Unauthenticated(format!("token rejected: {}", e)))?;

        Ok(data.claims)
    }
}
