//! Fetcher port
//! Interface for retrieving remote content

use crate::domain::DomainError;
use async_trait::async_trait;

/// Port for fetching remote resources by URL
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch the raw response body
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DomainError>;

    /// Fetch the response body as UTF-8 text (lossy)
    async fn fetch_text(&self, url: &str) -> Result<String, DomainError> {
        let bytes = self.fetch_bytes(url).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
