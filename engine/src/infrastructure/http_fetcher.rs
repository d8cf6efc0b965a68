//! HTTP Fetcher
//! reqwest implementation of the Fetcher port
//!
//! Transport failures are retried a fixed number of times with a fixed
//! backoff. A non-success status is returned immediately. Every wait is
//! raced against a cancellation token.

use crate::constants::fetch::{DEFAULT_ATTEMPTS, DEFAULT_BACKOFF};
use crate::domain::{ports::Fetcher, DomainError};
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

enum Failure {
    Transport(String),
    Status(u16),
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    attempts: u32,
    backoff: Duration,
    cancel: CancellationToken,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("shaperd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DomainError::InvalidConfiguration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            attempts: DEFAULT_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            cancel: CancellationToken::new(),
        })
    }

    pub fn with_retry(mut self, attempts: u32, backoff: Duration) -> Self {
        self.attempts = attempts.max(1);
        self.backoff = backoff;
        self
    }

    /// Abort in-flight and future requests when `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    async fn attempt(&self, url: &str) -> Result<Vec<u8>, Failure> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Failure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Failure::Status(status.as_u16()));
        }

        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| Failure::Transport(e.to_string()))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        let mut attempt = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Err(DomainError::Cancelled);
            }
            attempt += 1;

            let result = tokio::select! {
                _ = self.cancel.cancelled() => return Err(DomainError::Cancelled),
                r = self.attempt(url) => r,
            };

            match result {
                Ok(bytes) => {
                    debug!(url = %url, size = bytes.len(), "Fetched");
                    return Ok(bytes);
                }
                Err(Failure::Status(status)) => {
                    return Err(DomainError::HttpStatus {
                        url: url.to_string(),
                        status,
                    });
                }
                Err(Failure::Transport(reason)) if attempt < self.attempts => {
                    warn!(
                        url = %url,
                        attempt = attempt,
                        error = %reason,
                        "Fetch failed, retrying"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return Err(DomainError::Cancelled),
                        _ = tokio::time::sleep(self.backoff) => {}
                    }
                }
                Err(Failure::Transport(reason)) => {
                    return Err(DomainError::Http {
                        url: url.to_string(),
                        reason,
                    });
                }
            }
        }
    }
}
