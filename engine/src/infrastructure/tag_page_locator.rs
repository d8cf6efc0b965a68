//! Tag page release locator
//!
//! Discovers engine releases by scraping the paginated tags page of the
//! hosting service: `<base>/<repo>/tags`, then `?after=<last tag>` until a
//! page yields nothing new. Each tag heading carries the release tag and the
//! commit it points at.

use crate::domain::{
    ports::{Fetcher, ReleaseLocator},
    DomainError, EngineRelease,
};
use async_trait::async_trait;
use regex::Regex;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Where releases of a repository are published
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSource {
    pub github_base: String,
    pub repo: String,
}

impl ReleaseSource {
    pub fn new(github_base: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            github_base: github_base.into().trim_end_matches('/').to_string(),
            repo: repo.into(),
        }
    }

    /// `<base>/<repo>`
    pub fn repo_url(&self) -> String {
        format!("{}/{}", self.github_base, self.repo)
    }
}

pub struct TagPageLocator {
    source: ReleaseSource,
    fetcher: Arc<dyn Fetcher>,
    pattern: Regex,
}

impl TagPageLocator {
    pub fn new(source: ReleaseSource, fetcher: Arc<dyn Fetcher>) -> Result<Self, DomainError> {
        let repo = regex::escape(&source.repo);
        let pattern = Regex::new(&format!(
            r#"(?s)<h2.*?href="/{repo}/releases/tag/(.*?)".*?href="/{repo}/commit/(.*?)""#
        ))
        .map_err(|e| DomainError::InvalidConfiguration(format!("release pattern: {e}")))?;

        Ok(Self {
            source,
            fetcher,
            pattern,
        })
    }

    fn page_url(&self, after: Option<&str>) -> String {
        match after {
            Some(tag) => format!("{}/tags?after={}", self.source.repo_url(), tag),
            None => format!("{}/tags", self.source.repo_url()),
        }
    }

    fn parse_page(&self, html: &str) -> Vec<EngineRelease> {
        self.pattern
            .captures_iter(html)
            .map(|caps| EngineRelease::new(&caps[1], &caps[2]))
            .collect()
    }
}

#[async_trait]
impl ReleaseLocator for TagPageLocator {
    async fn list_versions(&self) -> Result<Vec<EngineRelease>, DomainError> {
        let mut releases: Vec<EngineRelease> = Vec::new();
        let mut seen = HashSet::new();

        loop {
            let after = releases.last().map(|r| r.tag.clone());
            let html = self.fetcher.fetch_text(&self.page_url(after.as_deref())).await?;

            let mut fresh = 0;
            for release in self.parse_page(&html) {
                if seen.insert(release.tag.clone()) {
                    releases.push(release);
                    fresh += 1;
                }
            }

            debug!(page_after = ?after, found = fresh, "Scanned tag page");
            if fresh == 0 {
                break;
            }
        }

        Ok(releases)
    }
}
