//! Typed month record stores over the raw key-value primitives.
//!
//! [`LocalMonthStore`] and [`RemoteMonthStore`] expose the same contract:
//! `get`, `put` (upsert keyed by `(year, month)`) and `scan` (every record,
//! with malformed ones set aside). Records are stored as JSON.
//!
//! A stored value is malformed when it does not decode, when its year or
//! month is out of range, or when its `(year, month)` does not match the
//! key it is stored under. Malformed values are reported, never fatal.

use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use sinistro_types::{KEY_PREFIX, MonthKey, MonthRecord};

use crate::error::StoreError;
use crate::local::LocalKv;
use crate::remote::RemoteKv;

/// Default remote namespace for month records.
pub const DEFAULT_NAMESPACE: &str = "months";

/// Default deadline for a single remote call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(5);

/// Every well-formed record of a store, plus the keys that failed to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthScan {
    /// Well-formed records by key.
    pub records: BTreeMap<MonthKey, MonthRecord>,
    /// Storage keys whose value is malformed.
    pub malformed: Vec<String>,
}

impl MonthScan {
    /// Records in chronological order.
    pub fn into_records(self) -> Vec<MonthRecord> {
        self.records.into_values().collect()
    }
}

/// Decode a stored value, checking it belongs under `expected`.
fn decode(storage_key: &str, raw: &str, expected: MonthKey) -> Option<MonthRecord> {
    let record: MonthRecord = match serde_json::from_str(raw) {
        Ok(record) => record,
        Err(error) => {
            tracing::warn!(key = storage_key, %error, "undecodable month record");
            return None;
        }
    };
    match record.key() {
        Ok(key) if key == expected => Some(record),
        Ok(key) => {
            tracing::warn!(key = storage_key, record_key = %key, "month record stored under the wrong key");
            None
        }
        Err(error) => {
            tracing::warn!(key = storage_key, %error, "month record with invalid year or month");
            None
        }
    }
}

/// Typed month records over a [`LocalKv`].
#[derive(Debug, Clone, Default)]
pub struct LocalMonthStore<K> {
    kv: K,
}

impl<K: LocalKv> LocalMonthStore<K> {
    /// Wrap a key-value store.
    pub const fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Borrow the underlying key-value store.
    pub const fn kv(&self) -> &K {
        &self.kv
    }

    /// Read the record for `key`.
    ///
    /// A malformed stored value reads as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn get(&self, key: MonthKey) -> Result<Option<MonthRecord>, StoreError> {
        let storage_key = key.storage_key();
        Ok(self
            .kv
            .read(&storage_key)?
            .and_then(|raw| decode(&storage_key, &raw, key)))
    }

    /// Upsert `record` under its own key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for an out-of-range year or
    /// month, or [`StoreError`] if the medium fails.
    pub fn put(&mut self, record: &MonthRecord) -> Result<(), StoreError> {
        let key = record.key()?;
        let json = serde_json::to_string(record)?;
        self.kv.write(&key.storage_key(), &json)?;
        tracing::debug!(%key, rows = record.rows.len(), "stored month locally");
        Ok(())
    }

    /// Delete the record for `key`. Only explicit calls destroy a month.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn remove(&mut self, key: MonthKey) -> Result<(), StoreError> {
        self.kv.remove(&key.storage_key())
    }

    /// Delete every month key, malformed ones included. Other keys stay.
    ///
    /// Returns the number of keys removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn clear_months(&mut self) -> Result<usize, StoreError> {
        let keys = self.month_keys()?;
        for key in &keys {
            self.kv.remove(key)?;
        }
        tracing::info!(removed = keys.len(), "cleared local months");
        Ok(keys.len())
    }

    /// Storage keys that look like month keys, including malformed ones.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn month_keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self
            .kv
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(KEY_PREFIX))
            .collect())
    }

    /// Load every month record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn scan(&self) -> Result<MonthScan, StoreError> {
        let mut scan = MonthScan::default();
        for storage_key in self.month_keys()? {
            let Ok(key) = storage_key.parse::<MonthKey>() else {
                scan.malformed.push(storage_key);
                continue;
            };
            let Some(raw) = self.kv.read(&storage_key)? else {
                continue;
            };
            match decode(&storage_key, &raw, key) {
                Some(record) => {
                    scan.records.insert(key, record);
                }
                None => scan.malformed.push(storage_key),
            }
        }
        Ok(scan)
    }

    /// Every well-formed record, in chronological order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the medium fails.
    pub fn list_all(&self) -> Result<Vec<MonthRecord>, StoreError> {
        Ok(self.scan()?.into_records())
    }
}

/// Typed month records over a [`RemoteKv`], with a per-call deadline.
#[derive(Debug, Clone)]
pub struct RemoteMonthStore<R> {
    kv: R,
    namespace: String,
    timeout: Duration,
}

impl<R: RemoteKv> RemoteMonthStore<R> {
    /// Wrap a remote store using the default namespace and timeout.
    pub fn new(kv: R) -> Self {
        Self {
            kv,
            namespace: DEFAULT_NAMESPACE.to_owned(),
            timeout: DEFAULT_REMOTE_TIMEOUT,
        }
    }

    /// Use a different namespace.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Use a different per-call deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Borrow the underlying remote store.
    pub const fn kv(&self) -> &R {
        &self.kv
    }

    /// Remote path for `key`.
    pub fn path(&self, key: MonthKey) -> String {
        format!("{}/{}", self.namespace, key.storage_key())
    }

    async fn deadline<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_elapsed| {
                tracing::warn!(operation, timeout_ms = duration_ms(self.timeout), "remote call timed out");
                StoreError::Timeout {
                    operation: operation.to_owned(),
                    timeout_ms: duration_ms(self.timeout),
                }
            })?
    }

    /// Read the record for `key`.
    ///
    /// A malformed stored value reads as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the remote call fails or times out.
    pub async fn get(&self, key: MonthKey) -> Result<Option<MonthRecord>, StoreError> {
        let path = self.path(key);
        let raw = self.deadline("get", self.kv.get(&path)).await?;
        Ok(raw.and_then(|raw| decode(&path, &raw, key)))
    }

    /// Upsert `record` under its own key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidKey`] for an out-of-range year or
    /// month, or [`StoreError`] if the remote call fails or times out.
    pub async fn put(&self, record: &MonthRecord) -> Result<(), StoreError> {
        let key = record.key()?;
        let json = serde_json::to_string(record)?;
        let path = self.path(key);
        self.deadline("set", self.kv.set(&path, &json)).await?;
        tracing::debug!(%key, rows = record.rows.len(), "stored month remotely");
        Ok(())
    }

    /// Load every month record under the namespace.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if any remote call fails or times out.
    pub async fn scan(&self) -> Result<MonthScan, StoreError> {
        let mut scan = MonthScan::default();
        let prefix = format!("{}/", self.namespace);
        let paths = self.deadline("list", self.kv.list(&self.namespace)).await?;
        for path in paths {
            let Some(key) = path
                .strip_prefix(&prefix)
                .and_then(|storage_key| storage_key.parse::<MonthKey>().ok())
            else {
                scan.malformed.push(path);
                continue;
            };
            let Some(raw) = self.deadline("get", self.kv.get(&path)).await? else {
                continue;
            };
            match decode(&path, &raw, key) {
                Some(record) => {
                    scan.records.insert(key, record);
                }
                None => scan.malformed.push(path),
            }
        }
        Ok(scan)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
