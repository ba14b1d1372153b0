//! Request matchers built from deployment URLs

use serde::{Deserialize, Serialize};

use crate::errors::ControlError;
use crate::models::url::Url;

/// A matcher clause handed to the edge engine. A non-empty domain becomes
/// a host match; a non-empty path becomes a path-prefix match with a
/// catch-all suffix appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Path pattern including the trailing `*`, e.g. `/app*`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl RouteMatcher {
    /// Build a matcher from a URL. Returns `None` when the URL has neither
    /// domain nor path (a catch-all route).
    ///
    /// `require_fqdn` enforces that the domain contains a dot; requested
    /// for end-user deployments but not for internal meta-routes.
    pub fn from_url(url: &Url, require_fqdn: bool) -> Result<Option<Self>, ControlError> {
        // An empty domain would yield a host-less route matching every
        // tenant's host, so it fails the same check as a bare name.
        if require_fqdn && !url.has_fqdn() {
            return Err(ControlError::ValidationError(format!(
                "domain '{}' is not fully qualified",
                url.domain
            )));
        }

        let host = if url.domain.is_empty() {
            None
        } else {
            Some(url.domain.clone())
        };

        let path = if url.path.is_empty() {
            None
        } else {
            Some(format!("{}*", url.path))
        };

        if host.is_none() && path.is_none() {
            return Ok(None);
        }

        Ok(Some(Self { host, path }))
    }

    /// The path prefix without its catch-all suffix
    pub fn path_prefix(&self) -> Option<&str> {
        self.path.as_deref().map(|p| p.trim_end_matches('*'))
    }
}
