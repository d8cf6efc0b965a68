//! Daemon configuration from environment variables
//!
//! Every setting has a default; runtime policy (sync flags, interval, engine
//! options) lives in the settings store instead.

use shaper_engine::application::{AppOptions, EngineDistribution};
use shaper_engine::infrastructure::ReleaseSource;
use std::env;
use std::path::PathBuf;

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_SELF_UPDATE: bool = false;
const HOME_DIR_NAME: &str = "shaper";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Appdata root
    pub home: PathBuf,

    /// Log filter directive
    pub log_level: String,

    /// Replace the running binary when a newer release is published
    pub self_update: bool,

    /// Repository publishing this application's releases (`owner/name`),
    /// required when self-update is on
    pub self_update_repo: Option<String>,

    /// Engine release repository override (`owner/name`)
    pub engine_repo: Option<String>,

    /// Release host override, for mirrors
    pub github_base: Option<String>,
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            home: lookup("SHAPER_HOME")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(default_home),
            log_level: lookup("SHAPER_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            self_update: lookup("SHAPER_SELF_UPDATE")
                .and_then(|s| parse_bool(&s))
                .unwrap_or(DEFAULT_SELF_UPDATE),
            self_update_repo: lookup("SHAPER_SELF_UPDATE_REPO").filter(|s| !s.is_empty()),
            engine_repo: lookup("SHAPER_ENGINE_REPO").filter(|s| !s.is_empty()),
            github_base: lookup("SHAPER_GITHUB_BASE").filter(|s| !s.is_empty()),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.home.as_os_str().is_empty() {
            return Err("SHAPER_HOME must not be empty".to_string());
        }
        if let Some(repo) = &self.engine_repo {
            check_repo("SHAPER_ENGINE_REPO", repo)?;
        }
        match (&self.self_update_repo, self.self_update) {
            (Some(repo), _) => check_repo("SHAPER_SELF_UPDATE_REPO", repo)?,
            (None, true) => {
                return Err("SHAPER_SELF_UPDATE requires SHAPER_SELF_UPDATE_REPO".to_string());
            }
            (None, false) => {}
        }
        Ok(())
    }

    pub fn app_options(&self) -> AppOptions {
        let mut options = AppOptions::new(&self.home);

        let mut distribution = EngineDistribution::default();
        if let Some(repo) = &self.engine_repo {
            distribution.repo = repo.clone();
        }
        if let Some(base) = &self.github_base {
            distribution.github_base = base.trim_end_matches('/').to_string();
        }

        options.self_update = self
            .self_update_repo
            .as_deref()
            .filter(|_| self.self_update)
            .map(|repo| ReleaseSource::new(&distribution.github_base, repo));
        options.distribution = distribution;
        options
    }
}

fn check_repo(var: &str, repo: &str) -> Result<(), String> {
    if repo.split('/').filter(|s| !s.is_empty()).count() != 2 {
        return Err(format!("{var} must be owner/name, got '{repo}'"));
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn default_home() -> PathBuf {
    dirs::data_dir()
        .or_else(dirs::home_dir)
        .map(|dir| dir.join(HOME_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(HOME_DIR_NAME))
}
