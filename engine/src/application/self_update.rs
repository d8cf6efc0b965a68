//! Self-update
//! Compares the running version with the latest published release and hands
//! a newer binary to the update stager

use crate::constants::keys;
use crate::domain::{
    ports::{Fetcher, UpdateStager},
    DomainError,
};
use crate::infrastructure::{ReleaseSource, ResourceRegistry};
use regex::Regex;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelfUpdateOutcome {
    UpToDate,
    /// A new binary was staged; the process must shut down so it can be replaced
    Relaunching { version: String },
}

impl SelfUpdateOutcome {
    pub fn is_relaunching(&self) -> bool {
        matches!(self, SelfUpdateOutcome::Relaunching { .. })
    }
}

pub struct SelfUpdater {
    source: ReleaseSource,
    binary_name: String,
    registry: Arc<ResourceRegistry>,
    fetcher: Arc<dyn Fetcher>,
    stager: Arc<dyn UpdateStager>,
    latest_tag: Regex,
}

impl SelfUpdater {
    pub fn new(
        source: ReleaseSource,
        binary_name: impl Into<String>,
        registry: Arc<ResourceRegistry>,
        fetcher: Arc<dyn Fetcher>,
        stager: Arc<dyn UpdateStager>,
    ) -> Result<Self, DomainError> {
        let latest_tag = Regex::new(&format!(
            r#"(?s)href="/{}/releases/tag/(.*?)""#,
            regex::escape(&source.repo)
        ))
        .map_err(|e| DomainError::InvalidConfiguration(format!("release pattern: {e}")))?;

        Ok(Self {
            source,
            binary_name: binary_name.into(),
            registry,
            fetcher,
            stager,
            latest_tag,
        })
    }

    /// Tag of the latest published application release
    pub async fn latest_version(&self) -> Result<Option<String>, DomainError> {
        let html = self
            .fetcher
            .fetch_text(&format!("{}/releases/latest", self.source.repo_url()))
            .await?;
        Ok(self
            .latest_tag
            .captures(&html)
            .map(|caps| caps[1].to_string()))
    }

    pub async fn check_and_stage(&self) -> Result<SelfUpdateOutcome, DomainError> {
        let Some(latest) = self.latest_version().await? else {
            debug!("No application release published");
            return Ok(SelfUpdateOutcome::UpToDate);
        };

        let current = self
            .registry
            .settings()
            .get_as::<String>(keys::VERSION)
            .await?
            .unwrap_or_default();

        if same_version(&current, &latest) {
            debug!(version = %current, "Application up to date");
            return Ok(SelfUpdateOutcome::UpToDate);
        }

        info!(from = %current, to = %latest, "Downloading application update");
        let url = format!(
            "{}/releases/latest/download/{}",
            self.source.repo_url(),
            self.binary_name
        );
        let binary = self.fetcher.fetch_bytes(&url).await?;

        let stager = self.stager.clone();
        tokio::task::spawn_blocking(move || stager.stage_update(&binary))
            .await
            .map_err(|e| DomainError::Io(e.to_string()))??;

        Ok(SelfUpdateOutcome::Relaunching { version: latest })
    }
}

/// Tags may carry a `v` prefix the crate version does not
fn same_version(current: &str, tag: &str) -> bool {
    current.trim_start_matches('v') == tag.trim_start_matches('v')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::AppPaths;
    use crate::testing::{CannedFetcher, RecordingStager};

    const LATEST: &str = "https://gh.test/acme/shaper/releases/latest";
    const DOWNLOAD: &str = "https://gh.test/acme/shaper/releases/latest/download/shaperd";

    fn updater() -> (tempfile::TempDir, Arc<CannedFetcher>, Arc<RecordingStager>, Arc<ResourceRegistry>, SelfUpdater) {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(CannedFetcher::default());
        let stager = Arc::new(RecordingStager::default());
        let registry = Arc::new(ResourceRegistry::new(AppPaths::new(dir.path()), fetcher.clone()));
        let updater = SelfUpdater::new(
            ReleaseSource::new("https://gh.test", "acme/shaper"),
            "shaperd",
            registry.clone(),
            fetcher.clone(),
            stager.clone(),
        )
        .unwrap();
        (dir, fetcher, stager, registry, updater)
    }

    fn latest_page(tag: &str) -> String {
        format!(r#"<a href="/acme/shaper/releases/tag/{tag}">{tag}</a>"#)
    }

    #[tokio::test]
    async fn test_same_version_is_noop() {
        let (_dir, fetcher, stager, registry, updater) = updater();
        fetcher.serve(LATEST, latest_page("v1.2.0"));
        registry.settings().set(keys::VERSION, "1.2.0").await.unwrap();

        assert_eq!(updater.check_and_stage().await.unwrap(), SelfUpdateOutcome::UpToDate);
        assert_eq!(fetcher.hit_count(DOWNLOAD), 0);
        assert!(stager.staged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newer_version_is_staged() {
        let (_dir, fetcher, stager, registry, updater) = updater();
        fetcher.serve(LATEST, latest_page("1.3.0"));
        fetcher.serve(DOWNLOAD, b"new-binary");
        registry.settings().set(keys::VERSION, "1.2.0").await.unwrap();

        let outcome = updater.check_and_stage().await.unwrap();
        assert_eq!(
            outcome,
            SelfUpdateOutcome::Relaunching {
                version: "1.3.0".into()
            }
        );
        assert!(outcome.is_relaunching());
        assert_eq!(*stager.staged.lock().unwrap(), vec![b"new-binary".to_vec()]);
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        let (_dir, fetcher, stager, _registry, updater) = updater();
        fetcher.serve(LATEST, latest_page("2.0.0"));

        assert!(matches!(
            updater.check_and_stage().await.unwrap_err(),
            DomainError::Http { .. }
        ));
        assert!(stager.staged.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_page_without_release() {
        let (_dir, fetcher, _stager, _registry, updater) = updater();
        fetcher.serve(LATEST, "<html>nothing here</html>");
        assert_eq!(updater.check_and_stage().await.unwrap(), SelfUpdateOutcome::UpToDate);
    }
}
