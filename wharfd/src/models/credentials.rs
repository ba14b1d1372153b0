//! Credential records

use serde::{Deserialize, Serialize};

use crate::models::deployment::ExternalSourceType;

/// Identity record for a federated actor, e.g. a repository's CI identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalUser {
    pub external_source_type: ExternalSourceType,

    /// Claimed identity, e.g. "owner/repo"
    pub external_id: String,

    /// Grants capabilities beyond the actor's own deployments
    #[serde(default)]
    pub full_permissions: bool,
}

/// A persisted bearer token. The secret half is never stored; only its
/// argon2id hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerTokenRecord {
    /// Public lookup key (hex)
    pub id: String,

    /// Salted one-way hash of the secret half
    pub token_hash: String,

    #[serde(default)]
    pub full_permissions: bool,
}
