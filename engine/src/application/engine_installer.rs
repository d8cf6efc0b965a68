//! Engine Installer
//! Resolves, downloads and unpacks engine releases into `<appdata>/bin`

use crate::application::EngineProcessController;
use crate::constants::{engine, keys};
use crate::domain::services::{execute_hook, extract_binaries, patch_pe_subsystem};
use crate::domain::{
    ports::{Fetcher, ReleaseLocator},
    DomainError, EngineRelease, FileEntry, Namespace, SyncScope, TargetPlatform,
};
use crate::infrastructure::{ReleaseSource, ResourceRegistry};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Where engine releases come from and which binaries to take out of them
#[derive(Debug, Clone)]
pub struct EngineDistribution {
    pub github_base: String,
    pub raw_base: String,
    pub repo: String,
    pub family: String,
    pub platform: TargetPlatform,
}

impl Default for EngineDistribution {
    fn default() -> Self {
        Self {
            github_base: engine::GITHUB_BASE.to_string(),
            raw_base: engine::RAW_BASE.to_string(),
            repo: engine::DEFAULT_REPO.to_string(),
            family: engine::FAMILY.to_string(),
            platform: TargetPlatform::current(),
        }
    }
}

impl EngineDistribution {
    pub fn release_source(&self) -> ReleaseSource {
        ReleaseSource::new(&self.github_base, &self.repo)
    }

    /// `<github>/<repo>/releases/download/<tag>/zapret2-<tag>.tar.gz`
    pub fn archive_url(&self, tag: &str) -> String {
        format!(
            "{}/releases/download/{tag}/{}-{tag}.tar.gz",
            self.release_source().repo_url(),
            self.family
        )
    }

    /// Archive directory holding this platform's binaries
    pub fn archive_prefix(&self, tag: &str) -> String {
        format!(
            "{}-{tag}/binaries/{}/",
            self.family,
            self.platform.binaries_dir()
        )
    }

    /// Lua script of the engine source tree at `commit`
    pub fn lua_url(&self, commit: &str, name: &str) -> String {
        format!(
            "{}/{}/{commit}/lua/{name}.lua",
            self.raw_base.trim_end_matches('/'),
            self.repo
        )
    }
}

/// Stop the packet driver the windows engine loads. Failures are ignored:
/// the driver is usually not loaded at all.
pub(crate) async fn remove_packet_driver(platform: &TargetPlatform) {
    if !platform.is_windows() {
        return;
    }
    if let Err(e) = execute_hook("sc delete windivert & sc stop windivert", "driver-cleanup", None).await {
        debug!(error = %e, "Driver cleanup skipped");
    }
}

pub struct EngineInstaller {
    distribution: EngineDistribution,
    registry: Arc<ResourceRegistry>,
    fetcher: Arc<dyn Fetcher>,
    locator: Arc<dyn ReleaseLocator>,
}

impl EngineInstaller {
    pub fn new(
        distribution: EngineDistribution,
        registry: Arc<ResourceRegistry>,
        fetcher: Arc<dyn Fetcher>,
        locator: Arc<dyn ReleaseLocator>,
    ) -> Self {
        Self {
            distribution,
            registry,
            fetcher,
            locator,
        }
    }

    pub fn distribution(&self) -> &EngineDistribution {
        &self.distribution
    }

    pub fn platform(&self) -> &TargetPlatform {
        &self.distribution.platform
    }

    /// Release tags, newest first
    pub async fn available_versions(&self) -> Result<Vec<String>, DomainError> {
        Ok(self
            .locator
            .list_versions()
            .await?
            .into_iter()
            .map(|r| r.tag)
            .collect())
    }

    /// The requested release, or the latest one when `version` is `None`
    pub async fn resolve(&self, version: Option<&str>) -> Result<EngineRelease, DomainError> {
        match version {
            Some(tag) => self
                .locator
                .list_versions()
                .await?
                .into_iter()
                .find(|r| r.tag == tag)
                .ok_or_else(|| DomainError::VersionNotFound(tag.to_string())),
            None => self.locator.latest().await?.ok_or(DomainError::NoReleases),
        }
    }

    /// Family matches, a version is recorded and the binary exists
    pub async fn is_installed(&self) -> Result<bool, DomainError> {
        let settings = self.registry.settings();

        let family = settings.get_as::<String>(keys::ENGINE_FAMILY).await?;
        if family.as_deref() != Some(self.distribution.family.as_str()) {
            return Ok(false);
        }
        let version = settings.get_as::<String>(keys::ENGINE_VERSION).await?;
        if version.is_none_or(|v| v.is_empty()) {
            return Ok(false);
        }

        let binary = self.registry.paths().engine_binary(self.platform());
        Ok(tokio::fs::try_exists(binary).await?)
    }

    /// Install `version` (latest when `None`). Returns `false` when that
    /// version is already installed. The engine is stopped for the swap and
    /// started again if it is meant to be active.
    pub async fn install(
        &self,
        version: Option<&str>,
        engine: &EngineProcessController,
    ) -> Result<bool, DomainError> {
        let release = self.resolve(version).await?;

        let settings = self.registry.settings();
        let installed = settings.get_as::<String>(keys::ENGINE_VERSION).await?;
        if installed.as_deref() == Some(release.tag.as_str()) {
            debug!(version = %release.tag, "Engine already up to date");
            return Ok(false);
        }

        info!(
            from = installed.as_deref().unwrap_or("none"),
            to = %release.tag,
            "Installing engine"
        );

        engine.stop().await;
        self.deploy(&release).await?;

        if settings.get_flag(keys::ENGINE_ACTIVE).await? {
            engine.start().await?;
        }

        Ok(true)
    }

    /// Download and unpack `release`, pin the bundled Lua scripts to its
    /// commit and record it as installed. The engine must not be running.
    pub async fn deploy(&self, release: &EngineRelease) -> Result<(), DomainError> {
        let url = self.distribution.archive_url(&release.tag);
        let tarball = self.fetcher.fetch_bytes(&url).await.map_err(|e| {
            warn!(url = %url, error = %e, "Release archive unavailable");
            DomainError::TarballNotFound(release.tag.clone())
        })?;

        let prefix = self.distribution.archive_prefix(&release.tag);
        let files = tokio::task::spawn_blocking(move || extract_binaries(&tarball, &prefix))
            .await
            .map_err(|e| DomainError::UnpackFailed(e.to_string()))??;

        remove_packet_driver(self.platform()).await;

        let bin_dir = self.registry.paths().bin_dir();
        match tokio::fs::remove_dir_all(&bin_dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(&bin_dir).await?;

        for file in &files {
            tokio::fs::write(bin_dir.join(&file.name), &file.data).await?;
        }

        let binary = self.registry.paths().engine_binary(self.platform());
        if self.platform().is_windows() {
            let target = binary.clone();
            tokio::task::spawn_blocking(move || patch_pe_subsystem(&target))
                .await
                .map_err(|e| DomainError::UnpackFailed(e.to_string()))??;
        } else {
            make_executable(&binary).await?;
        }

        info!(version = %release.tag, files = files.len(), "Engine binaries unpacked");

        self.pin_lua(release).await?;

        let settings = self.registry.settings();
        settings.set(keys::ENGINE_FAMILY, &self.distribution.family).await?;
        settings.set(keys::ENGINE_VERSION, &release.tag).await?;

        Ok(())
    }

    async fn pin_lua(&self, release: &EngineRelease) -> Result<(), DomainError> {
        let lua = self.registry.store(Namespace::Lua);
        for name in engine::PINNED_LUA {
            let url = self.distribution.lua_url(&release.commit, name);
            lua.set(name, FileEntry::new(true, url)).await?;
        }

        self.registry
            .sync_files(Namespace::Lua, &SyncScope::only(engine::PINNED_LUA))
            .await?;
        Ok(())
    }
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), DomainError> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn make_executable(path: &Path) -> Result<(), DomainError> {
    tokio::fs::metadata(path).await?;
    Ok(())
}
