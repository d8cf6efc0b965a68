//! Appdata layout
//! Every on-disk location the manager reads or writes, derived from one root

use crate::domain::{DomainError, Namespace, TargetPlatform};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// A relative root is resolved against the current directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::path::absolute(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/<namespace>`: the store file of a namespace
    pub fn store_file(&self, namespace: Namespace) -> PathBuf {
        self.root.join(namespace.id())
    }

    /// `<root>/files/<namespace>`
    pub fn files_dir(&self, namespace: Namespace) -> PathBuf {
        self.root.join("files").join(namespace.id())
    }

    /// `<root>/files/<namespace>/<name>`
    pub fn entry_file(&self, namespace: Namespace, name: &str) -> PathBuf {
        self.files_dir(namespace).join(name)
    }

    /// `<root>/bin`
    pub fn bin_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    /// `<root>/bin/<engine binary>`
    pub fn engine_binary(&self, platform: &TargetPlatform) -> PathBuf {
        self.bin_dir().join(platform.engine_binary_name())
    }

    /// `<root>/logs`
    pub fn log_file(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Entry names must stay a single component under `files/<namespace>/`
pub fn validate_entry_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(DomainError::InvalidConfiguration(format!(
            "invalid entry name {name:?}"
        )));
    }
    Ok(())
}
