//! Deployment records

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::url::Url;

/// Where a deployment's content originates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalSourceType {
    GithubRepo,
}

/// What kind of thing is served at a deployment's URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServedThingType {
    StaticFiles,
    DockerContainer,
    Redirect,
    ReverseProxy,

    /// Unrecognized type in a stored record; skipped at compile time
    #[serde(other)]
    Unknown,
}

/// Identity and provenance of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentMetadata {
    /// Unique key
    pub url: Url,

    /// Optional provenance coordinate, e.g. "owner/repo" or "owner/repo#branch"
    #[serde(default)]
    pub external_source: Option<String>,

    #[serde(default)]
    pub external_source_type: Option<ExternalSourceType>,

    #[serde(default)]
    pub tags: BTreeSet<String>,

    /// If false, the URL's path prefix is stripped before reaching content
    #[serde(default)]
    pub preserve_external_path: bool,

    /// True only for internally bootstrapped deployments (admin route);
    /// excluded from durable storage
    #[serde(default)]
    pub dont_persist: bool,
}

impl DeploymentMetadata {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            external_source: None,
            external_source_type: None,
            tags: BTreeSet::new(),
            preserve_external_path: false,
            dont_persist: false,
        }
    }
}

/// What a deployment serves, if anything yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentContent {
    /// False while the deployment only reserves its URL
    pub has_content: bool,

    pub served_thing_type: ServedThingType,

    /// Interpreted per type: content root for StaticFiles, host:port for
    /// DockerContainer/ReverseProxy, target URL for Redirect
    pub served_thing: String,

    /// Rewrite unresolved requests to the fallback document
    #[serde(default)]
    pub spa_mode: bool,
}

impl DeploymentContent {
    pub fn static_files(root: impl Into<String>, spa_mode: bool) -> Self {
        Self {
            has_content: true,
            served_thing_type: ServedThingType::StaticFiles,
            served_thing: root.into(),
            spa_mode,
        }
    }

    pub fn docker_container(upstream: impl Into<String>) -> Self {
        Self {
            has_content: true,
            served_thing_type: ServedThingType::DockerContainer,
            served_thing: upstream.into(),
            spa_mode: false,
        }
    }

    pub fn reverse_proxy(upstream: impl Into<String>) -> Self {
        Self {
            has_content: true,
            served_thing_type: ServedThingType::ReverseProxy,
            served_thing: upstream.into(),
            spa_mode: false,
        }
    }

    pub fn redirect(target: impl Into<String>) -> Self {
        Self {
            has_content: true,
            served_thing_type: ServedThingType::Redirect,
            served_thing: target.into(),
            spa_mode: false,
        }
    }
}

/// The unit of configuration: a URL plus what is served there
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(flatten)]
    pub metadata: DeploymentMetadata,

    #[serde(default)]
    pub content: Option<DeploymentContent>,
}

impl Deployment {
    /// A fresh deployment reserving its URL, no content yet
    pub fn new(metadata: DeploymentMetadata) -> Self {
        Self {
            metadata,
            content: None,
        }
    }

    pub fn url(&self) -> &Url {
        &self.metadata.url
    }

    pub fn has_content(&self) -> bool {
        self.content.as_ref().map(|c| c.has_content).unwrap_or(false)
    }
}
