//! Resource Registry
//!
//! Semantic layer over the Lists, Lua, Blobs and Settings stores. File-backed
//! entries own a materialized file under `files/<namespace>/<name>`; profiles
//! live as an ordered array inside Settings.
//!
//! Refreshing a namespace fetches every entry that has a sync URL. One entry
//! failing is logged and skipped. A fetched file identical (by SHA-256) to the
//! one on disk is not rewritten and does not count as a change.

use crate::constants::keys;
use crate::domain::services::NamedPath;
use crate::domain::{
    ports::Fetcher, DomainError, FileEntry, Namespace, ProfileEntry, SyncScope,
};
use crate::infrastructure::{validate_entry_name, AppPaths, PersistentStore};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct ResourceRegistry {
    paths: AppPaths,
    lists: PersistentStore,
    lua: PersistentStore,
    blobs: PersistentStore,
    settings: PersistentStore,
    fetcher: Arc<dyn Fetcher>,
}

impl ResourceRegistry {
    pub fn new(paths: AppPaths, fetcher: Arc<dyn Fetcher>) -> Self {
        Self::with_idle_unload(paths, fetcher, crate::constants::store::DEFAULT_IDLE_UNLOAD)
    }

    pub fn with_idle_unload(paths: AppPaths, fetcher: Arc<dyn Fetcher>, idle: Duration) -> Self {
        let store = |ns: Namespace| {
            PersistentStore::with_idle_unload(ns.id(), paths.store_file(ns), idle)
        };
        Self {
            lists: store(Namespace::Lists),
            lua: store(Namespace::Lua),
            blobs: store(Namespace::Blobs),
            settings: store(Namespace::Settings),
            paths,
            fetcher,
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn settings(&self) -> &PersistentStore {
        &self.settings
    }

    pub fn store(&self, namespace: Namespace) -> &PersistentStore {
        match namespace {
            Namespace::Lists => &self.lists,
            Namespace::Lua => &self.lua,
            Namespace::Blobs => &self.blobs,
            Namespace::Settings => &self.settings,
        }
    }

    /// Drop every cached namespace so the next access rereads disk
    pub async fn unload_all(&self) {
        for store in [&self.lists, &self.lua, &self.blobs, &self.settings] {
            store.unload().await;
        }
    }

    // ------------------------------------------------------------------
    // Profiles
    // ------------------------------------------------------------------

    /// Profiles in user order
    pub async fn profiles(&self) -> Result<Vec<ProfileEntry>, DomainError> {
        Ok(self
            .settings
            .get_as::<Vec<ProfileEntry>>(keys::PROFILES)
            .await?
            .unwrap_or_default())
    }

    pub async fn set_profiles(&self, profiles: &[ProfileEntry]) -> Result<(), DomainError> {
        self.settings.set(keys::PROFILES, profiles).await
    }

    /// Replace the whole profile list, fetching the content of every profile
    /// with a sync URL first. Fetch failures keep the supplied content.
    pub async fn replace_profiles(&self, mut profiles: Vec<ProfileEntry>) -> Result<(), DomainError> {
        for profile in profiles.iter_mut() {
            let Some(url) = profile.sync_url().map(str::to_string) else {
                continue;
            };
            match self.fetcher.fetch_text(&url).await {
                Ok(content) => profile.content = content,
                Err(e) => warn!(profile = %profile.name, error = %e, "Failed to fetch profile"),
            }
        }
        self.set_profiles(&profiles).await
    }

    /// Refresh profile content from sync URLs. Returns whether any content changed.
    pub async fn sync_profiles(&self, scope: &SyncScope) -> Result<bool, DomainError> {
        let mut profiles = self.profiles().await?;
        let mut updated = false;

        for profile in profiles.iter_mut() {
            if !scope.includes(&profile.name) {
                continue;
            }
            let Some(url) = profile.sync_url().map(str::to_string) else {
                continue;
            };

            match self.fetcher.fetch_text(&url).await {
                Ok(content) if content == profile.content => {
                    debug!(profile = %profile.name, "Profile unchanged");
                }
                Ok(content) => {
                    info!(profile = %profile.name, "Profile updated");
                    profile.content = content;
                    updated = true;
                }
                Err(e) => {
                    let err = DomainError::ResourceSync {
                        name: profile.name.clone(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Skipping profile");
                }
            }
        }

        if updated {
            self.set_profiles(&profiles).await?;
        }
        Ok(updated)
    }

    // ------------------------------------------------------------------
    // File-backed entries
    // ------------------------------------------------------------------

    pub async fn entries(&self, namespace: Namespace) -> Result<Vec<(String, FileEntry)>, DomainError> {
        self.store(namespace).get_all_as::<FileEntry>().await
    }

    pub async fn entry(&self, namespace: Namespace, name: &str) -> Result<Option<FileEntry>, DomainError> {
        self.store(namespace).get_as::<FileEntry>(name).await
    }

    /// Materialized content of an entry, `None` when no file exists
    pub async fn read_content(&self, namespace: Namespace, name: &str) -> Result<Option<Vec<u8>>, DomainError> {
        match tokio::fs::read(self.entry_file(namespace, name)?).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Metadata plus materialized content of an entry
    pub async fn read_entry(
        &self,
        namespace: Namespace,
        name: &str,
    ) -> Result<Option<(FileEntry, Option<Vec<u8>>)>, DomainError> {
        let Some(entry) = self.entry(namespace, name).await? else {
            return Ok(None);
        };
        let content = self.read_content(namespace, name).await?;
        Ok(Some((entry, content)))
    }

    /// Create or update an entry, renaming it first when `previous` names a
    /// different existing entry. With a sync URL the remote content wins over
    /// `content`; a failed fetch falls back to `content`.
    pub async fn put_entry(
        &self,
        namespace: Namespace,
        previous: Option<&str>,
        name: &str,
        entry: FileEntry,
        content: Option<Vec<u8>>,
    ) -> Result<(), DomainError> {
        self.entry_file(namespace, name)?;
        if let Some(old) = previous.filter(|old| *old != name) {
            self.rename_entry(namespace, old, name).await?;
        }

        let mut content = content;
        if let Some(url) = entry.sync_url() {
            match self.fetcher.fetch_bytes(url).await {
                Ok(bytes) => content = Some(bytes),
                Err(e) => warn!(namespace = %namespace, entry = %name, error = %e, "Failed to fetch entry"),
            }
        }

        self.store(namespace).set(name, &entry).await?;

        if let Some(bytes) = content {
            self.write_file(namespace, name, &bytes).await?;
        }
        Ok(())
    }

    /// Move an entry and its materialized file to a new name
    pub async fn rename_entry(&self, namespace: Namespace, old: &str, new: &str) -> Result<(), DomainError> {
        let old_path = self.entry_file(namespace, old)?;
        let new_path = self.entry_file(namespace, new)?;
        if old == new {
            return Ok(());
        }
        let entry = self.entry(namespace, old).await?.unwrap_or_default();
        self.store(namespace).set(new, &entry).await?;
        self.store(namespace).delete(old).await?;

        if tokio::fs::try_exists(&old_path).await? {
            if !tokio::fs::try_exists(&new_path).await? {
                tokio::fs::rename(&old_path, &new_path).await?;
            } else {
                tokio::fs::remove_file(&old_path).await?;
            }
        }
        Ok(())
    }

    /// Remove an entry and its materialized file
    pub async fn delete_entry(&self, namespace: Namespace, name: &str) -> Result<(), DomainError> {
        let path = self.entry_file(namespace, name)?;
        self.store(namespace).delete(name).await?;

        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Refresh materialized files from sync URLs. Returns whether any file changed.
    pub async fn sync_files(&self, namespace: Namespace, scope: &SyncScope) -> Result<bool, DomainError> {
        let mut updated = false;

        for (name, entry) in self.entries(namespace).await? {
            if !scope.includes(&name) {
                continue;
            }
            let Some(url) = entry.sync_url() else {
                continue;
            };
            if let Err(e) = validate_entry_name(&name) {
                warn!(namespace = %namespace, error = %e, "Skipping entry");
                continue;
            }

            match self.refresh_file(namespace, &name, url).await {
                Ok(changed) => updated |= changed,
                Err(e) => {
                    let err = DomainError::ResourceSync {
                        name: format!("{namespace}/{name}"),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Skipping entry");
                }
            }
        }

        Ok(updated)
    }

    async fn refresh_file(&self, namespace: Namespace, name: &str, url: &str) -> Result<bool, DomainError> {
        let content = self.fetcher.fetch_bytes(url).await?;

        if let Some(existing) = self.read_content(namespace, name).await? {
            let digest = Sha256::digest(&content);
            if Sha256::digest(&existing) == digest {
                debug!(
                    namespace = %namespace,
                    entry = %name,
                    sha256 = %hex::encode(digest),
                    "Content unchanged"
                );
                return Ok(false);
            }
        }

        self.write_file(namespace, name, &content).await?;
        info!(namespace = %namespace, entry = %name, size = content.len(), "Entry updated");
        Ok(true)
    }

    async fn write_file(&self, namespace: Namespace, name: &str, bytes: &[u8]) -> Result<(), DomainError> {
        let path = self.entry_file(namespace, name)?;
        tokio::fs::create_dir_all(self.paths.files_dir(namespace)).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }

    /// Materialized file of an entry, refusing Settings and unsafe names
    fn entry_file(&self, namespace: Namespace, name: &str) -> Result<PathBuf, DomainError> {
        if !namespace.is_file_backed() {
            return Err(DomainError::InvalidConfiguration(format!(
                "{namespace} entries have no file"
            )));
        }
        validate_entry_name(name)?;
        Ok(self.paths.entry_file(namespace, name))
    }

    // ------------------------------------------------------------------
    // Command-line inputs
    // ------------------------------------------------------------------

    /// Every list entry with the path of its materialized file
    pub async fn list_paths(&self) -> Result<Vec<NamedPath>, DomainError> {
        Ok(self
            .entries(Namespace::Lists)
            .await?
            .into_iter()
            .map(|(name, _)| {
                let path = self.paths.entry_file(Namespace::Lists, &name);
                (name, path)
            })
            .collect())
    }

    /// Active entries of a namespace with the paths of their materialized files
    pub async fn active_paths(&self, namespace: Namespace) -> Result<Vec<NamedPath>, DomainError> {
        Ok(self
            .entries(namespace)
            .await?
            .into_iter()
            .filter(|(_, entry)| entry.active)
            .map(|(name, _)| {
                let path = self.paths.entry_file(namespace, &name);
                (name, path)
            })
            .collect())
    }
}
