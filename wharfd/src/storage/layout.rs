//! Storage layout configuration

use std::path::PathBuf;

use crate::filesys::dir::Dir;
use crate::filesys::file::File;

/// On-disk layout for the control plane
#[derive(Debug, Clone)]
pub struct StorageLayout {
    /// Base directory for all storage
    pub base_dir: PathBuf,
}

impl StorageLayout {
    /// Create a new storage layout
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Durable deployment records
    pub fn deployments_file(&self) -> File {
        File::new(self.base_dir.join("deployments.json"))
    }

    /// Registered external users
    pub fn users_file(&self) -> File {
        File::new(self.base_dir.join("users.json"))
    }

    /// Bearer token records (hashes only)
    pub fn tokens_file(&self) -> File {
        File::new(self.base_dir.join("tokens.json"))
    }

    /// Settings file
    pub fn settings_file(&self) -> File {
        File::new(self.base_dir.join("settings.json"))
    }

    /// Content roots for static-file deployments
    pub fn sites_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("sites"))
    }

    /// Content root for one deployment, keyed by its URL
    pub fn site_dir(&self, key: &str) -> Dir {
        self.sites_dir().subdir(&sanitize_site_key(key))
    }

    /// Stub directory served for deployments without content
    pub fn placeholder_dir(&self) -> Dir {
        Dir::new(self.base_dir.join("placeholder"))
    }

    /// Setup the storage layout (create directories)
    pub async fn setup(&self) -> Result<(), crate::errors::ControlError> {
        Dir::new(self.base_dir.clone()).create().await?;
        self.sites_dir().create().await?;
        self.placeholder_dir().create().await?;
        Ok(())
    }
}

impl Default for StorageLayout {
    fn default() -> Self {
        #[cfg(target_os = "linux")]
        let base_dir = PathBuf::from("/var/lib/wharf");

        #[cfg(not(target_os = "linux"))]
        let base_dir = std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".wharf");

        Self::new(base_dir)
    }
}

/// Flatten a deployment URL into a single safe directory name
fn sanitize_site_key(key: &str) -> String {
    key.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}
