//! Application context
//! Composition root: every component is built once here and shared by `Arc`

use crate::application::{
    DefaultResources, EngineDistribution, EngineInstaller, EngineProcessController,
    SelfUpdater, SyncOrchestrator,
};
use crate::constants::{app, fetch, store};
use crate::domain::{
    ports::{Fetcher, ReleaseLocator, UpdateStager},
    DomainError,
};
use crate::infrastructure::{
    AppPaths, HttpFetcher, ReleaseSource, ResourceRegistry, ShellUpdateStager, TagPageLocator,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Everything needed to wire an application instance
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Appdata root
    pub home: PathBuf,
    pub distribution: EngineDistribution,
    /// Release source of this application; `None` disables self-update
    pub self_update: Option<ReleaseSource>,
    pub defaults: DefaultResources,
    pub idle_unload: Duration,
    pub fetch_attempts: u32,
    pub fetch_backoff: Duration,
    pub restart_pause: Duration,
    pub activation_settle: Duration,
}

impl AppOptions {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let distribution = EngineDistribution::default();
        let defaults = DefaultResources::builtin(&distribution.platform);
        Self {
            home: home.into(),
            self_update: None,
            distribution,
            defaults,
            idle_unload: store::DEFAULT_IDLE_UNLOAD,
            fetch_attempts: fetch::DEFAULT_ATTEMPTS,
            fetch_backoff: fetch::DEFAULT_BACKOFF,
            restart_pause: app::RESTART_PAUSE,
            activation_settle: app::ACTIVATION_SETTLE,
        }
    }
}

/// Adapters behind the domain ports
pub struct Ports {
    pub fetcher: Arc<dyn Fetcher>,
    pub locator: Arc<dyn ReleaseLocator>,
    /// Stager plus the asset name to download; only used with self-update
    pub stager: Option<(Arc<dyn UpdateStager>, String)>,
}

pub struct AppContext {
    options: AppOptions,
    cancel: CancellationToken,
    registry: Arc<ResourceRegistry>,
    installer: Arc<EngineInstaller>,
    engine: Arc<EngineProcessController>,
    orchestrator: Arc<SyncOrchestrator>,
}

impl AppContext {
    /// Wire the production adapters: reqwest fetcher, tag-page scraping and
    /// the shell handoff for self-update
    pub fn new(options: AppOptions) -> Result<Self, DomainError> {
        let cancel = CancellationToken::new();
        let fetcher: Arc<dyn Fetcher> = Arc::new(
            HttpFetcher::new()?
                .with_retry(options.fetch_attempts, options.fetch_backoff)
                .with_cancellation(cancel.clone()),
        );
        let locator: Arc<dyn ReleaseLocator> = Arc::new(TagPageLocator::new(
            options.distribution.release_source(),
            fetcher.clone(),
        )?);

        let stager = match options.self_update {
            Some(_) => {
                let stager = ShellUpdateStager::for_current_exe()?;
                let binary = stager.binary_name().ok_or_else(|| {
                    DomainError::InvalidConfiguration("executable has no file name".into())
                })?;
                Some((Arc::new(stager) as Arc<dyn UpdateStager>, binary))
            }
            None => None,
        };

        Self::with_ports(
            options,
            Ports {
                fetcher,
                locator,
                stager,
            },
            cancel,
        )
    }

    pub fn with_ports(
        options: AppOptions,
        ports: Ports,
        cancel: CancellationToken,
    ) -> Result<Self, DomainError> {
        let paths = AppPaths::new(&options.home);
        let registry = Arc::new(ResourceRegistry::with_idle_unload(
            paths,
            ports.fetcher.clone(),
            options.idle_unload,
        ));

        let installer = Arc::new(EngineInstaller::new(
            options.distribution.clone(),
            registry.clone(),
            ports.fetcher.clone(),
            ports.locator,
        ));
        let engine = Arc::new(EngineProcessController::new(
            registry.clone(),
            installer.clone(),
        ));

        let self_updater = match (&options.self_update, ports.stager) {
            (Some(source), Some((stager, binary))) => Some(Arc::new(SelfUpdater::new(
                source.clone(),
                binary,
                registry.clone(),
                ports.fetcher.clone(),
                stager,
            )?)),
            _ => None,
        };

        let orchestrator = Arc::new(SyncOrchestrator::new(
            registry.clone(),
            installer.clone(),
            engine.clone(),
            self_updater,
        ));

        Ok(Self {
            options,
            cancel,
            registry,
            installer,
            engine,
            orchestrator,
        })
    }

    pub fn options(&self) -> &AppOptions {
        &self.options
    }

    /// Aborts every in-flight and future fetch once cancelled
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn registry(&self) -> Arc<ResourceRegistry> {
        self.registry.clone()
    }

    pub fn installer(&self) -> Arc<EngineInstaller> {
        self.installer.clone()
    }

    pub fn engine(&self) -> Arc<EngineProcessController> {
        self.engine.clone()
    }

    pub fn orchestrator(&self) -> Arc<SyncOrchestrator> {
        self.orchestrator.clone()
    }
}
