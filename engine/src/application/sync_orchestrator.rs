//! Sync Orchestrator
//!
//! One pass refreshes profiles, lists, lua and blobs, updates the engine,
//! checks for an application update and finally restarts the engine when
//! refreshed content is not yet live. Every step honours its `updater.*`
//! flag unless the pass is forced.

use crate::application::{EngineInstaller, EngineProcessController, SelfUpdateOutcome, SelfUpdater};
use crate::constants::{keys, sync};
use crate::domain::{DomainError, Namespace, SyncScope};
use crate::infrastructure::ResourceRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What one pass did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Some refreshed resource changed on disk
    pub content_changed: bool,
    /// A new engine version was installed
    pub engine_updated: bool,
    pub restarted: bool,
    pub self_update: Option<SelfUpdateOutcome>,
}

impl SyncReport {
    pub fn is_relaunching(&self) -> bool {
        self.self_update
            .as_ref()
            .is_some_and(SelfUpdateOutcome::is_relaunching)
    }
}

pub struct SyncOrchestrator {
    registry: Arc<ResourceRegistry>,
    installer: Arc<EngineInstaller>,
    engine: Arc<EngineProcessController>,
    self_updater: Option<Arc<SelfUpdater>>,
}

impl SyncOrchestrator {
    pub fn new(
        registry: Arc<ResourceRegistry>,
        installer: Arc<EngineInstaller>,
        engine: Arc<EngineProcessController>,
        self_updater: Option<Arc<SelfUpdater>>,
    ) -> Self {
        Self {
            registry,
            installer,
            engine,
            self_updater,
        }
    }

    async fn enabled(&self, force: bool, flag: &str) -> Result<bool, DomainError> {
        Ok(force || self.registry.settings().get_flag(flag).await?)
    }

    /// Refresh profiles and every file-backed namespace whose flag is set.
    /// Returns whether anything changed on disk.
    pub async fn refresh_resources(&self, force: bool) -> Result<bool, DomainError> {
        let scope = SyncScope::from_force(force);
        let force = scope.bypasses_policy();
        let mut changed = false;

        if self.enabled(force, keys::UPDATE_PROFILES).await? {
            changed |= self.registry.sync_profiles(&scope).await?;
        }

        for (namespace, flag) in [
            (Namespace::Lists, keys::UPDATE_LISTS),
            (Namespace::Lua, keys::UPDATE_LUA),
            (Namespace::Blobs, keys::UPDATE_BLOBS),
        ] {
            if self.enabled(force, flag).await? {
                changed |= self.registry.sync_files(namespace, &scope).await?;
            }
        }

        Ok(changed)
    }

    pub async fn sync_all(&self, force: bool) -> Result<SyncReport, DomainError> {
        let mut report = SyncReport {
            content_changed: self.refresh_resources(force).await?,
            ..Default::default()
        };
        let mut restart_pending = report.content_changed;

        if self.enabled(force, keys::UPDATE_ENGINE).await? {
            match self.installer.install(None, &self.engine).await {
                Ok(true) => {
                    // Install already restarted with the refreshed config
                    report.engine_updated = true;
                    restart_pending = false;
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, code = e.code(), "Engine update failed"),
            }
        }

        if let Some(updater) = &self.self_updater {
            if self.enabled(force, keys::UPDATE_SELF).await? {
                match updater.check_and_stage().await {
                    Ok(outcome) => report.self_update = Some(outcome),
                    Err(e) => warn!(error = %e, "Self-update failed"),
                }
            }
        }

        if report.is_relaunching() {
            info!("Update staged, skipping engine restart");
            return Ok(report);
        }

        if restart_pending && self.engine.is_started().await {
            info!("Resources changed, restarting engine");
            self.engine.restart().await?;
            report.restarted = true;
        }

        debug!(report = ?report, "Sync pass finished");
        Ok(report)
    }

    /// Current `updater.interval`, clamped to a sane minimum
    pub async fn interval(&self) -> Result<Duration, DomainError> {
        let ms = self
            .registry
            .settings()
            .get_as::<u64>(keys::UPDATE_INTERVAL)
            .await?
            .unwrap_or(sync::DEFAULT_INTERVAL_MS);
        Ok(Duration::from_millis(ms.max(sync::MIN_INTERVAL_MS)))
    }

    /// Run scheduled passes until `cancel` fires. Returns `true` when a pass
    /// staged an application update and the process should exit.
    pub async fn run_periodic(&self, cancel: CancellationToken) -> bool {
        loop {
            let interval = match self.interval().await {
                Ok(interval) => interval,
                Err(e) => {
                    warn!(error = %e, "Unreadable sync interval, using default");
                    Duration::from_millis(sync::DEFAULT_INTERVAL_MS)
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => return false,
                _ = tokio::time::sleep(interval) => {}
            }

            match self.sync_all(false).await {
                Ok(report) if report.is_relaunching() => return true,
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Scheduled sync failed"),
            }
        }
    }
}
