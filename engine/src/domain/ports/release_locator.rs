//! ReleaseLocator port
//! Discovery strategy for available engine versions

use crate::domain::{DomainError, EngineRelease};
use async_trait::async_trait;

/// Port for listing published engine releases
#[async_trait]
pub trait ReleaseLocator: Send + Sync {
    /// All known releases, newest first. An empty listing is not an error.
    async fn list_versions(&self) -> Result<Vec<EngineRelease>, DomainError>;

    /// Head of `list_versions`, `None` when nothing is published
    async fn latest(&self) -> Result<Option<EngineRelease>, DomainError> {
        Ok(self.list_versions().await?.into_iter().next())
    }
}
