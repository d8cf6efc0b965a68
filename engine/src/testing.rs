//! Shared fakes for unit tests

use crate::domain::{
    ports::{Fetcher, ReleaseLocator, UpdateStager},
    DomainError, EngineRelease, TargetPlatform,
};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Serves canned bodies; unknown URLs fail like an unreachable host
#[derive(Default)]
pub struct CannedFetcher {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    hits: Mutex<Vec<String>>,
}

impl CannedFetcher {
    pub fn serve(&self, url: &str, body: impl AsRef<[u8]>) {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), body.as_ref().to_vec());
    }

    pub fn hits(&self) -> Vec<String> {
        self.hits.lock().unwrap().clone()
    }

    pub fn hit_count(&self, url: &str) -> usize {
        self.hits.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for CannedFetcher {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, DomainError> {
        self.hits.lock().unwrap().push(url.to_string());
        self.bodies
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| DomainError::Http {
                url: url.to_string(),
                reason: "connection refused".into(),
            })
    }
}

/// Fixed release listing
#[derive(Default)]
pub struct StaticLocator {
    pub releases: Vec<EngineRelease>,
    calls: AtomicUsize,
}

impl StaticLocator {
    pub fn new(releases: Vec<EngineRelease>) -> Self {
        Self {
            releases,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseLocator for StaticLocator {
    async fn list_versions(&self) -> Result<Vec<EngineRelease>, DomainError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.releases.clone())
    }
}

/// Records staged binaries instead of replacing anything
#[derive(Default)]
pub struct RecordingStager {
    pub staged: Mutex<Vec<Vec<u8>>>,
}

impl UpdateStager for RecordingStager {
    fn stage_update(&self, binary: &[u8]) -> Result<(), DomainError> {
        self.staged.lock().unwrap().push(binary.to_vec());
        Ok(())
    }
}

/// Shell script standing in for the engine: prints one argument per line
/// followed by `ready`, then sleeps until terminated
pub const FAKE_ENGINE: &str =
    "#!/bin/sh\nfor a in \"$@\"; do echo \"$a\"; done\necho ready\nexec sleep 30\n";

/// A release archive laid out like the published ones, with `engine` as the
/// platform's engine binary plus one helper file
pub fn release_tarball(tag: &str, platform: &TargetPlatform, engine: &[u8]) -> Vec<u8> {
    let dir = format!("zapret2-{tag}/binaries/{}", platform.binaries_dir());
    let entries: Vec<(String, &[u8])> = vec![
        (format!("{dir}/{}", platform.engine_binary_name()), engine),
        (format!("{dir}/ip2net"), b"helper".as_slice()),
        (format!("zapret2-{tag}/lua/zapret-lib.lua"), b"-- bundled".as_slice()),
    ];

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, data) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

/// Poll `check` until it holds or roughly five seconds pass
pub async fn eventually<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }
    false
}
