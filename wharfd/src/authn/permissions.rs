//! Per-request capability values.
//!
//! One variant per classifier; capability rules are dispatched through a
//! single match per check. Never persisted.

use crate::models::deployment::{Deployment, ExternalSourceType};

/// The capability set computed for one administrative request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permissions {
    /// Loopback or trusted-peer caller. Anything able to reach the control
    /// plane locally is already privileged by host-level access control.
    Local,

    /// Verified federated actor (e.g. a CI workflow identity)
    Federated {
        /// Elevated via a registered external-user record
        full_permissions: bool,

        /// Claimed repository coordinate, e.g. "owner/repo"
        repository: String,

        /// Claimed branch, when present in the token
        branch: Option<String>,
    },

    /// Bearer token; its stored flag applies uniformly to all operations
    Token { full_permissions: bool },
}

impl Permissions {
    pub fn can_create_deployment(&self) -> bool {
        match self {
            Permissions::Local => true,
            Permissions::Federated {
                full_permissions, ..
            } => *full_permissions,
            Permissions::Token { full_permissions } => *full_permissions,
        }
    }

    pub fn can_modify_deployment(&self, deployment: &Deployment) -> bool {
        match self {
            Permissions::Local => true,
            Permissions::Federated {
                full_permissions,
                repository,
                branch,
            } => *full_permissions || scope_matches(deployment, repository, branch.as_deref()),
            Permissions::Token { full_permissions } => *full_permissions,
        }
    }

    pub fn can_view_deployment(&self, deployment: &Deployment) -> bool {
        match self {
            Permissions::Local => true,
            Permissions::Federated {
                full_permissions,
                repository,
                branch,
            } => *full_permissions || scope_matches(deployment, repository, branch.as_deref()),
            Permissions::Token { full_permissions } => *full_permissions,
        }
    }

    pub fn can_create_credentials(&self) -> bool {
        match self {
            Permissions::Local => true,
            Permissions::Federated {
                full_permissions, ..
            } => *full_permissions,
            Permissions::Token { full_permissions } => *full_permissions,
        }
    }
}

/// A scoped federated actor may touch a deployment only when its recorded
/// source is exactly the claimed repository, or that repository suffixed
/// with `#branch`.
fn scope_matches(deployment: &Deployment, repository: &str, branch: Option<&str>) -> bool {
    if deployment.metadata.external_source_type != Some(ExternalSourceType::GithubRepo) {
        return false;
    }
    let Some(source) = &deployment.metadata.external_source else {
        return false;
    };

    if source == repository {
        return true;
    }
    match branch {
        Some(branch) => *source == format!("{}#{}", repository, branch),
        None => false,
    }
}
