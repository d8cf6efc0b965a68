//! File-backed key-value store
//!
//! One store per namespace. The backing file is a JSON array of `[key, value]`
//! pairs, loaded lazily and rewritten wholesale on every mutation. Every
//! operation re-arms an idle timer; when it fires the in-memory map is dropped
//! and the next access reloads from disk.
//!
//! Individual operations are atomic with respect to each other, but a caller's
//! read-modify-write sequence is not: two writers racing on the same key end
//! with last-writer-wins.

use crate::constants::store::DEFAULT_IDLE_UNLOAD;
use crate::domain::DomainError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

type Entries = Vec<(String, Value)>;

#[derive(Default)]
struct StoreState {
    /// `None` while unloaded
    entries: Option<Entries>,
    unload_task: Option<JoinHandle<()>>,
}

/// Durable key-value container for one namespace
#[derive(Clone)]
pub struct PersistentStore {
    id: String,
    path: PathBuf,
    idle_unload: Duration,
    state: Arc<Mutex<StoreState>>,
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore")
            .field("id", &self.id)
            .field("path", &self.path)
            .field("idle_unload", &self.idle_unload)
            .finish()
    }
}

impl PersistentStore {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::with_idle_unload(id, path, DEFAULT_IDLE_UNLOAD)
    }

    pub fn with_idle_unload(
        id: impl Into<String>,
        path: impl Into<PathBuf>,
        idle_unload: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            idle_unload,
            state: Arc::new(Mutex::new(StoreState::default())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the backing file exists
    pub async fn exists(&self) -> bool {
        tokio::fs::try_exists(&self.path).await.unwrap_or(false)
    }

    /// Whether the in-memory map is currently populated
    pub async fn is_loaded(&self) -> bool {
        self.state.lock().await.entries.is_some()
    }

    pub async fn get(&self, key: &str) -> Result<Option<Value>, DomainError> {
        let mut state = self.state.lock().await;
        let entries = self.load(&mut state).await?;
        let value = entries.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        self.snooze_unload(&mut state);
        Ok(value)
    }

    /// Typed `get`. A stored value of the wrong shape is a store error.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DomainError> {
        match self.get(key).await? {
            None | Some(Value::Null) => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| self.store_error(format!("key '{key}': {e}"))),
        }
    }

    /// Truthiness of a stored value: missing, null, false, 0 and "" are false
    pub async fn get_flag(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.get(key).await?.as_ref().is_some_and(is_truthy))
    }

    pub async fn set<V: Serialize>(&self, key: &str, value: V) -> Result<(), DomainError> {
        let value = serde_json::to_value(value)
            .map_err(|e| self.store_error(format!("key '{key}': {e}")))?;

        let mut state = self.state.lock().await;
        let entries = self.load(&mut state).await?;
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value,
            None => entries.push((key.to_string(), value)),
        }
        self.backup(&state).await?;
        self.snooze_unload(&mut state);

        debug!(store = %self.id, key = %key, "Stored value");
        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<(), DomainError> {
        let mut state = self.state.lock().await;
        let entries = self.load(&mut state).await?;
        entries.retain(|(k, _)| k != key);
        self.backup(&state).await?;
        self.snooze_unload(&mut state);

        debug!(store = %self.id, key = %key, "Deleted value");
        Ok(())
    }

    /// All pairs in insertion order
    pub async fn get_all(&self) -> Result<Vec<(String, Value)>, DomainError> {
        let mut state = self.state.lock().await;
        let entries = self.load(&mut state).await?.clone();
        self.snooze_unload(&mut state);
        Ok(entries)
    }

    /// All pairs decoded as `T`. Entries of the wrong shape are a store error.
    pub async fn get_all_as<T: DeserializeOwned>(&self) -> Result<Vec<(String, T)>, DomainError> {
        self.get_all()
            .await?
            .into_iter()
            .map(|(k, v)| {
                serde_json::from_value(v)
                    .map(|t| (k.clone(), t))
                    .map_err(|e| self.store_error(format!("key '{k}': {e}")))
            })
            .collect()
    }

    /// Drop the in-memory map now
    pub async fn unload(&self) {
        let mut state = self.state.lock().await;
        if let Some(task) = state.unload_task.take() {
            task.abort();
        }
        state.entries = None;
    }

    async fn load<'a>(&self, state: &'a mut StoreState) -> Result<&'a mut Entries, DomainError> {
        if let Some(task) = state.unload_task.take() {
            task.abort();
        }

        if state.entries.is_none() {
            let entries = match tokio::fs::read(&self.path).await {
                Ok(bytes) => serde_json::from_slice::<Entries>(&bytes)
                    .map_err(|e| self.store_error(e.to_string()))?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
                Err(e) => return Err(self.store_error(e.to_string())),
            };
            trace!(store = %self.id, count = entries.len(), "Loaded store");
            state.entries = Some(entries);
        }

        Ok(state.entries.get_or_insert_with(Vec::new))
    }

    async fn backup(&self, state: &StoreState) -> Result<(), DomainError> {
        let Some(entries) = state.entries.as_ref() else {
            return Err(self.store_error("store is unloaded".to_string()));
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.store_error(e.to_string()))?;
        }

        let json = serde_json::to_vec(entries).map_err(|e| self.store_error(e.to_string()))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|e| self.store_error(e.to_string()))
    }

    /// Cancel any pending unload and schedule a new one
    fn snooze_unload(&self, state: &mut StoreState) {
        if let Some(task) = state.unload_task.take() {
            task.abort();
        }

        let shared = Arc::clone(&self.state);
        let delay = self.idle_unload;
        let id = self.id.clone();
        state.unload_task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = shared.lock().await;
            state.entries = None;
            state.unload_task = None;
            trace!(store = %id, "Unloaded idle store");
        }));
    }

    fn store_error(&self, reason: String) -> DomainError {
        DomainError::Store {
            path: self.path.display().to_string(),
            reason,
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
