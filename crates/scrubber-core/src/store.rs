//! Durable key/value state storage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::fs;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::StoreError;

/// A JSON object of persisted keys.
pub type Entries = Map<String, Value>;

/// Key/value store that survives page reloads and process restarts.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read every stored key.
    async fn get_all(&self) -> Result<Entries, StoreError>;

    /// Merge `entries` into the store.
    async fn set(&self, entries: Entries) -> Result<(), StoreError>;

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;

    async fn clear(&self) -> Result<(), StoreError>;
}

/// In-memory store for testing.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: tokio::sync::RwLock<Entries>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get_all(&self) -> Result<Entries, StoreError> {
        Ok(self.entries.read().await.clone())
    }

    async fn set(&self, entries: Entries) -> Result<(), StoreError> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut store = self.entries.write().await;
        for key in keys {
            store.remove(*key);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.entries.write().await.clear();
        Ok(())
    }
}

/// Single JSON file store.
///
/// Writes go to a sibling temp file that is renamed over the original, so a
/// crash mid-write leaves the previous state intact.
pub struct FileStateStore {
    path: PathBuf,
    lock: AsyncMutex<()>,
}

impl FileStateStore {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        debug!("FileStateStore initialized at {:?}", path);
        Ok(Self {
            path,
            lock: AsyncMutex::new(()),
        })
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    async fn read(&self) -> Result<Entries, StoreError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Entries::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Object(map) => Ok(map),
            other => Err(StoreError::InvalidData(format!(
                "expected a JSON object in {:?}, found {}",
                self.path, other
            ))),
        }
    }

    async fn write(&self, entries: &Entries) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn get_all(&self) -> Result<Entries, StoreError> {
        let _guard = self.lock.lock().await;
        self.read().await
    }

    async fn set(&self, entries: Entries) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut current = match self.read().await {
            Ok(current) => current,
            Err(StoreError::Io(e)) => return Err(StoreError::Io(e)),
            Err(e) => {
                warn!("Discarding unreadable state file {:?}: {}", self.path, e);
                Entries::new()
            }
        };
        current.extend(entries);
        self.write(&current).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut current = self.read().await?;
        for key in keys {
            current.remove(*key);
        }
        self.write(&current).await
    }

    async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write path used by the controller; implementations may coalesce.
#[async_trait]
pub trait StateWriter: Send + Sync {
    /// Queue `entries` for writing.
    async fn write(&self, entries: Entries);

    /// Write everything queued now.
    async fn flush(&self) -> Result<(), StoreError>;
}

struct PendingWrites {
    entries: Entries,
    last_write: Option<Instant>,
    timer_armed: bool,
}

struct WriterInner {
    store: Arc<dyn StateStore>,
    interval: Duration,
    pending: parking_lot::Mutex<PendingWrites>,
}

impl WriterInner {
    async fn flush(&self) -> Result<(), StoreError> {
        let entries = {
            let mut pending = self.pending.lock();
            pending.last_write = Some(Instant::now());
            std::mem::take(&mut pending.entries)
        };
        if entries.is_empty() {
            return Ok(());
        }
        self.store.set(entries).await
    }
}

/// Coalesces writes to at most one store write per interval.
///
/// Writes inside the interval are merged key by key and delivered on the
/// trailing edge, so the latest value of every key always lands.
#[derive(Clone)]
pub struct ThrottledStateWriter {
    inner: Arc<WriterInner>,
}

impl ThrottledStateWriter {
    pub fn new(store: Arc<dyn StateStore>, interval: Duration) -> Self {
        Self {
            inner: Arc::new(WriterInner {
                store,
                interval,
                pending: parking_lot::Mutex::new(PendingWrites {
                    entries: Entries::new(),
                    last_write: None,
                    timer_armed: false,
                }),
            }),
        }
    }
}

#[async_trait]
impl StateWriter for ThrottledStateWriter {
    async fn write(&self, entries: Entries) {
        let wait = {
            let mut pending = self.inner.pending.lock();
            pending.entries.extend(entries);
            let since_last = pending.last_write.map(|t| t.elapsed());
            match since_last {
                Some(elapsed) if elapsed < self.inner.interval => {
                    if pending.timer_armed {
                        return;
                    }
                    pending.timer_armed = true;
                    Some(self.inner.interval - elapsed)
                }
                _ => None,
            }
        };

        match wait {
            None => {
                if let Err(e) = self.inner.flush().await {
                    warn!("State write failed: {}", e);
                }
            }
            Some(delay) => {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    inner.pending.lock().timer_armed = false;
                    if let Err(e) = inner.flush().await {
                        warn!("Deferred state write failed: {}", e);
                    }
                });
            }
        }
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.inner.flush().await
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
