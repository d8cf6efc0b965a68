//! App lifecycle
//!
//! Seeds a fresh appdata directory, brings the engine up when it is meant to
//! be active, runs the forced startup sync and keeps the periodic sync timer.

use crate::application::AppContext;
use crate::constants::keys;
use crate::domain::DomainError;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

struct Timer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct App {
    ctx: AppContext,
    /// Fired when the process should exit, e.g. after staging an update
    shutdown: CancellationToken,
    timer: Mutex<Option<Timer>>,
}

impl App {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            shutdown: CancellationToken::new(),
            timer: Mutex::new(None),
        }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.timer.lock().await.is_some()
    }

    pub async fn start(&self) -> Result<(), DomainError> {
        let mut timer = self.timer.lock().await;
        if timer.is_some() {
            return Ok(());
        }

        let registry = self.ctx.registry();
        let settings = registry.settings();

        if !settings.exists().await {
            self.ctx.options().defaults.seed(&registry).await?;
        }
        settings.set(keys::VERSION, env!("CARGO_PKG_VERSION")).await?;

        let engine = self.ctx.engine();
        if settings.get_flag(keys::ENGINE_ACTIVE).await? {
            engine.start().await?;
        }

        let orchestrator = self.ctx.orchestrator();
        let report = orchestrator.sync_all(true).await?;
        if report.is_relaunching() {
            info!("Exiting for update");
            self.shutdown.cancel();
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if orchestrator.run_periodic(cancel).await {
                    info!("Exiting for update");
                    shutdown.cancel();
                }
            }
        });
        *timer = Some(Timer { cancel, handle });

        info!(home = %registry.paths().root().display(), "Started");
        Ok(())
    }

    /// Stop the sync timer and the engine
    pub async fn stop(&self) {
        if let Some(timer) = self.timer.lock().await.take() {
            timer.cancel.cancel();
            timer.handle.abort();
        }
        self.ctx.engine().stop().await;
        info!("Stopped");
    }

    pub async fn restart(&self) -> Result<(), DomainError> {
        self.stop().await;
        tokio::time::sleep(self.ctx.options().restart_pause).await;
        self.start().await
    }

    /// Start or stop the engine and persist whether it is actually running
    pub async fn set_active(&self, active: bool) -> Result<bool, DomainError> {
        let engine = self.ctx.engine();
        if active {
            engine.start().await?;
        } else {
            engine.stop().await;
        }

        tokio::time::sleep(self.ctx.options().activation_settle).await;

        let running = engine.is_started().await;
        self.ctx
            .registry()
            .settings()
            .set(keys::ENGINE_ACTIVE, running)
            .await?;
        if running != active {
            warn!(requested = active, running = running, "Engine did not settle in the requested state");
        }
        Ok(running)
    }

    /// Wipe appdata and start over from defaults
    pub async fn reset(&self) -> Result<(), DomainError> {
        self.stop().await;

        let registry = self.ctx.registry();
        match tokio::fs::remove_dir_all(registry.paths().root()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        registry.unload_all().await;
        info!("Appdata wiped");

        self.start().await
    }

    /// Abort in-flight fetches, then stop
    pub async fn shutdown(&self) {
        self.ctx.cancel_token().cancel();
        self.stop().await;
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::application::registry::{AppOptions, Ports};
    use crate::application::{DefaultResources, EngineDistribution};
    use crate::constants::engine::PINNED_LUA;
    use crate::domain::{EngineRelease, Namespace, ProfileEntry, TargetPlatform};
    use crate::infrastructure::ReleaseSource;
    use crate::testing::{release_tarball, CannedFetcher, RecordingStager, StaticLocator, FAKE_ENGINE};
    use std::sync::Arc;
    use std::time::Duration;

    fn platform() -> TargetPlatform {
        TargetPlatform::new("linux", "x86_64")
    }

    fn app(dir: &tempfile::TempDir, fetcher: Arc<CannedFetcher>, self_update: bool) -> App {
        let distribution = EngineDistribution {
            github_base: "https://gh.test".into(),
            raw_base: "https://raw.test".into(),
            platform: platform(),
            ..Default::default()
        };
        fetcher.serve(
            &distribution.archive_url("v1"),
            release_tarball("v1", &platform(), FAKE_ENGINE.as_bytes()),
        );
        for name in PINNED_LUA {
            fetcher.serve(&distribution.lua_url("c1", name), "-- pinned");
        }
        fetcher.serve("https://r/tls.sh", "--filter-tcp=443");
        fetcher.serve("https://r/rulist.txt", "example.com");

        let mut options = AppOptions::new(dir.path());
        options.distribution = distribution;
        options.self_update = self_update.then(|| ReleaseSource::new("https://gh.test", "acme/shaper"));
        options.defaults = DefaultResources {
            profiles: vec![ProfileEntry::new("tls", true, "https://r/tls.sh")],
            lists: vec![("rulist".into(), "https://r/rulist.txt".into())],
            ..Default::default()
        };
        options.restart_pause = Duration::ZERO;
        options.activation_settle = Duration::from_millis(50);

        let ports = Ports {
            fetcher: fetcher.clone(),
            locator: Arc::new(StaticLocator::new(vec![EngineRelease::new("v1", "c1")])),
            stager: Some((Arc::new(RecordingStager::default()), "shaperd".into())),
        };
        App::new(AppContext::with_ports(options, ports, CancellationToken::new()).unwrap())
    }

    #[tokio::test]
    async fn test_first_start_seeds_and_installs() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::new(CannedFetcher::default()), false);

        app.start().await.unwrap();

        let registry = app.context().registry();
        assert!(dir.path().join("settings").exists());
        assert!(dir.path().join("files/lists/rulist").exists());
        assert_eq!(registry.profiles().await.unwrap()[0].content, "--filter-tcp=443");
        assert_eq!(
            registry.settings().get_as::<String>(keys::VERSION).await.unwrap().as_deref(),
            Some(env!("CARGO_PKG_VERSION"))
        );
        assert!(app.context().installer().is_installed().await.unwrap());
        assert!(!app.context().engine().is_started().await, "engine is not active by default");
        assert!(app.is_running().await);

        app.stop().await;
        assert!(!app.is_running().await);
    }

    #[tokio::test]
    async fn test_existing_settings_are_not_reseeded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings"), "[]").unwrap();
        let fetcher = Arc::new(CannedFetcher::default());
        let app = app(&dir, fetcher.clone(), false);

        app.start().await.unwrap();
        assert!(app.context().registry().profiles().await.unwrap().is_empty());
        assert_eq!(fetcher.hit_count("https://r/rulist.txt"), 0);
        app.stop().await;
    }

    #[tokio::test]
    async fn test_active_engine_started_on_start() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings"), r#"[["antidpi.active",true]]"#).unwrap();
        let app = app(&dir, Arc::new(CannedFetcher::default()), false);

        app.start().await.unwrap();
        assert!(app.context().engine().is_started().await);
        app.stop().await;
        assert!(!app.context().engine().is_started().await);
    }

    #[tokio::test]
    async fn test_set_active_persists_observed_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::new(CannedFetcher::default()), false);
        app.start().await.unwrap();
        let settings = app.context().registry().settings().clone();

        assert!(app.set_active(true).await.unwrap());
        assert!(settings.get_flag(keys::ENGINE_ACTIVE).await.unwrap());

        assert!(!app.set_active(false).await.unwrap());
        assert!(!settings.get_flag(keys::ENGINE_ACTIVE).await.unwrap());
        app.stop().await;
    }

    #[tokio::test]
    async fn test_reset_wipes_and_reseeds() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::new(CannedFetcher::default()), false);
        app.start().await.unwrap();
        let registry = app.context().registry();
        registry
            .put_entry(Namespace::Lists, None, "mine", Default::default(), Some(b"x".to_vec()))
            .await
            .unwrap();

        app.reset().await.unwrap();

        assert!(registry.entry(Namespace::Lists, "mine").await.unwrap().is_none());
        assert!(!dir.path().join("files/lists/mine").exists());
        assert!(dir.path().join("files/lists/rulist").exists());
        app.stop().await;
    }

    #[tokio::test]
    async fn test_staged_update_fires_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CannedFetcher::default());
        fetcher.serve(
            "https://gh.test/acme/shaper/releases/latest",
            r#"<a href="/acme/shaper/releases/tag/999.0.0">"#,
        );
        fetcher.serve(
            "https://gh.test/acme/shaper/releases/latest/download/shaperd",
            "next",
        );
        let app = app(&dir, fetcher, true);

        app.start().await.unwrap();
        assert!(app.shutdown_token().is_cancelled());
        assert!(!app.is_running().await, "no timer after a staged update");
    }

    #[tokio::test]
    async fn test_restart() {
        let dir = tempfile::tempdir().unwrap();
        let app = app(&dir, Arc::new(CannedFetcher::default()), false);
        app.start().await.unwrap();
        app.restart().await.unwrap();
        assert!(app.is_running().await);
        app.stop().await;
    }
}
