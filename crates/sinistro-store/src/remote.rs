//! Remote shared key-value store.
//!
//! The remote store is reached over the network, so every call is async.
//! Paths mirror local keys under a namespace: the local key
//! `month_2026_01` lives at `months/month_2026_01`.
//!
//! # Dragonfly layout
//!
//! | Key | Type | Description |
//! |-----|------|-------------|
//! | `{namespace}/{key}` | String | JSON month record |
//! | `{namespace}:index` | Set | Every path written under the namespace |
//!
//! The index set lets [`RemoteKv::list`] enumerate a namespace without a
//! keyspace scan.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};

use fred::prelude::*;

use crate::error::StoreError;

/// Asynchronous remote key-value persistence.
pub trait RemoteKv {
    /// Read the value at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the remote call fails.
    fn get(&self, path: &str) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Store `value` at `path`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the remote call fails.
    fn set(&self, path: &str, value: &str) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Every path stored under `namespace`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the remote call fails.
    fn list(&self, namespace: &str) -> impl Future<Output = Result<Vec<String>, StoreError>> + Send;
}

/// In-memory remote store, with a switch to simulate an outage.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<MemoryRemoteState>,
}

#[derive(Debug, Default)]
struct MemoryRemoteState {
    entries: BTreeMap<String, String>,
    writes: usize,
    offline: bool,
}

impl MemoryRemote {
    /// Create an empty, online store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail (or succeed again).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the internal lock is poisoned.
    pub fn set_offline(&self, offline: bool) -> Result<(), StoreError> {
        self.lock_unchecked()?.offline = offline;
        Ok(())
    }

    /// Number of `set` calls served so far.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the internal lock is poisoned.
    pub fn write_count(&self) -> Result<usize, StoreError> {
        Ok(self.lock_unchecked()?.writes)
    }

    fn lock_unchecked(&self) -> Result<MutexGuard<'_, MemoryRemoteState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("memory remote lock poisoned: {e}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryRemoteState>, StoreError> {
        let guard = self.lock_unchecked()?;
        if guard.offline {
            return Err(StoreError::Unavailable("memory remote is offline".to_owned()));
        }
        Ok(guard)
    }
}

impl RemoteKv for MemoryRemote {
    async fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.entries.get(path).cloned())
    }

    async fn set(&self, path: &str, value: &str) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        state.writes = state.writes.saturating_add(1);
        state.entries.insert(path.to_owned(), value.to_owned());
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let prefix = format!("{namespace}/");
        Ok(self
            .lock()?
            .entries
            .keys()
            .filter(|path| path.starts_with(&prefix))
            .cloned()
            .collect())
    }
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and maintains the per-namespace
/// index set described in the module docs.
#[derive(Clone)]
pub struct DragonflyRemote {
    client: Client,
}

impl DragonflyRemote {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL cannot be parsed.
    /// Returns [`StoreError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    fn index_key(namespace: &str) -> String {
        format!("{namespace}:index")
    }
}

impl RemoteKv for DragonflyRemote {
    async fn get(&self, path: &str) -> Result<Option<String>, StoreError> {
        let value: Option<String> = self.client.get(path).await?;
        Ok(value)
    }

    async fn set(&self, path: &str, value: &str) -> Result<(), StoreError> {
        let _: () = self.client.set(path, value, None, None, false).await?;
        if let Some((namespace, _)) = path.split_once('/') {
            let _: u32 = self.client.sadd(Self::index_key(namespace), path).await?;
        }
        Ok(())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StoreError> {
        let mut paths: Vec<String> = self.client.smembers(Self::index_key(namespace)).await?;
        paths.sort();
        Ok(paths)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_remote_lists_only_the_namespace() {
        let remote = MemoryRemote::new();
        remote.set("months/month_2026_01", "{}").await.unwrap();
        remote.set("oficinas/abc", "{}").await.unwrap();
        assert_eq!(remote.list("months").await.unwrap(), vec!["months/month_2026_01"]);
        assert_eq!(remote.write_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn offline_remote_fails_every_call() {
        let remote = MemoryRemote::new();
        remote.set_offline(true).unwrap();
        assert!(matches!(
            remote.get("months/month_2026_01").await,
            Err(StoreError::Unavailable(_))
        ));
        remote.set_offline(false).unwrap();
        assert!(remote.get("months/month_2026_01").await.unwrap().is_none());
    }
}
