//! Deployment URL: identity key and matcher source

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::ControlError;

/// A deployment location: a domain plus an optional path prefix.
///
/// The domain may be empty for internal meta-routes that match on path
/// alone. A non-empty path always carries a leading slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Url {
    /// Host to match ("" for host-less routes)
    #[serde(default)]
    pub domain: String,

    /// Path prefix to match ("" for host-only routes)
    #[serde(default)]
    pub path: String,
}

impl Url {
    /// Create a URL, normalizing the path to carry a leading slash
    pub fn new(domain: impl Into<String>, path: impl Into<String>) -> Self {
        let domain = domain.into();
        let path = normalize_path(path.into());
        Self { domain, path }
    }

    /// Host-only URL
    pub fn host(domain: impl Into<String>) -> Self {
        Self::new(domain, "")
    }

    /// Parse the `"domain/path"` form used in API paths.
    ///
    /// Everything up to the first `/` is the domain; the remainder
    /// (including the slash) is the path prefix.
    pub fn parse(s: &str) -> Result<Self, ControlError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ControlError::ValidationError("empty url".to_string()));
        }
        match s.split_once('/') {
            Some((domain, rest)) => Ok(Self::new(domain, format!("/{}", rest))),
            None => Ok(Self::host(s)),
        }
    }

    /// Whether the domain looks fully qualified (contains a dot)
    pub fn has_fqdn(&self) -> bool {
        self.domain.contains('.')
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.domain, self.path)
    }
}

fn normalize_path(path: String) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}
