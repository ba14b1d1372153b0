//! Permission resolver chain.
//!
//! Classifies an inbound request into exactly one actor kind. The chain
//! is tried in a fixed priority order; the first classifier that accepts
//! the request determines the result, regardless of what later classifiers
//! would have said.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tracing::debug;

use crate::authn::bearer::{parse_bearer, verify_secret};
use crate::authn::federated::FederatedVerifier;
use crate::authn::permissions::Permissions;
use crate::errors::ControlError;
use crate::registry::Registry;

/// Scheme token marking a federated-actor authorization header,
/// distinguishing it from plain bearer tokens
pub const FEDERATED_SCHEME: &str = "GithubOIDC";

pub struct PermissionResolver {
    registry: Arc<dyn Registry>,
    verifier: Arc<dyn FederatedVerifier>,

    /// Pre-resolved peer addresses trusted like loopback
    trusted_peers: Vec<IpAddr>,
}

impl PermissionResolver {
    pub fn new(
        registry: Arc<dyn Registry>,
        verifier: Arc<dyn FederatedVerifier>,
        trusted_peers: Vec<IpAddr>,
    ) -> Self {
        Self {
            registry,
            verifier,
            trusted_peers,
        }
    }

    /// Classify a request into a capability set, or fail with
    /// `Unauthenticated` when no classifier accepts it.
    pub async fn resolve(
        &self,
        remote: SocketAddr,
        authorization: Option<&str>,
    ) -> Result<Permissions, ControlError> {
        // 1. Local: loopback and trusted peers are fully privileged.
        //    Checked first, so a malformed header cannot demote a local
        //    caller.
        let ip = remote.ip();
        if ip.is_loopback() || self.trusted_peers.contains(&ip) {
            debug!("Resolved {} as local caller", ip);
            return Ok(Permissions::Local);
        }

        let header = authorization.unwrap_or("").trim();

        // 2. Federated actor
        if let Some(token) = header
            .strip_prefix(FEDERATED_SCHEME)
            .and_then(|rest| rest.strip_prefix(' '))
        {
            let claims = self.verifier.verify(token.trim()).await?;

            let full_permissions = match self
                .registry
                .get_external_user(&claims.repository)
                .await?
            {
                Some(user) => user.full_permissions,
                None => false,
            };

            debug!(
                "Resolved federated actor {} (full={})",
                claims.repository, full_permissions
            );
            return Ok(Permissions::Federated {
                full_permissions,
                repository: claims.repository.clone(),
                branch: claims.branch().map(String::from),
            });
        }

        // 3. Bearer token
        if let Some((id, secret)) = parse_bearer(header) {
            let record = self
                .registry
                .get_bearer_token(id)
                .await?
                .ok_or_else(|| {
                    ControlError::Unauthenticated("unknown token identifier".to_string())
                })?;

            if !verify_secret(secret, &record.token_hash) {
                return Err(ControlError::Unauthenticated(
                    "token secret mismatch".to_string(),
                ));
            }

            debug!("Resolved bearer token {}", record.id);
            return Ok(Permissions::Token {
                full_permissions: record.full_permissions,
            });
        }

        // 4. No classifier accepted the request
        Err(ControlError::Unauthenticated(
            "no credentials presented".to_string(),
        ))
    }
}
