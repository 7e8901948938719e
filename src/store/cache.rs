//! Key-value cache with per-entry TTL

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::error::CacheError;

/// Byte-string cache in the style of Redis: plain values plus string sets.
///
/// Values are opaque to the cache; typed access lives in [`super::ValidationMemory`].
#[async_trait]
pub trait KeyValueCache: Send + Sync {
    /// Stores `value` unless `key` is already present. Returns whether it was written.
    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration)
        -> Result<bool, CacheError>;

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Adds `member` to the set at `key` and refreshes the set's TTL
    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError>;
}

#[derive(Debug, Clone)]
enum Entry {
    Value(String),
    Set(BTreeSet<String>),
}

#[derive(Debug, Clone)]
struct Slot {
    entry: Entry,
    expires_at: Instant,
}

/// Process-local cache. Expired entries are dropped lazily on access.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_live<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut HashMap<String, Slot>) -> R,
    ) -> Result<R, CacheError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CacheError::Backend("cache lock poisoned".to_string()))?;
        if entries
            .get(key)
            .is_some_and(|slot| slot.expires_at <= Instant::now())
        {
            entries.remove(key);
        }
        Ok(f(&mut entries))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .map(|entries| entries.values().filter(|s| s.expires_at > now).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl KeyValueCache for InMemoryCache {
    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        self.with_live(key, |entries| {
            if entries.contains_key(key) {
                return false;
            }
            entries.insert(
                key.to_string(),
                Slot {
                    entry: Entry::Value(value),
                    expires_at: Instant::now() + ttl,
                },
            );
            true
        })
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        self.with_live(key, |entries| {
            entries.insert(
                key.to_string(),
                Slot {
                    entry: Entry::Value(value),
                    expires_at: Instant::now() + ttl,
                },
            );
        })
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(None),
            Some(Slot {
                entry: Entry::Value(v),
                ..
            }) => Ok(Some(v.clone())),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        })?
    }

    async fn add_to_set(&self, key: &str, member: &str, ttl: Duration) -> Result<(), CacheError> {
        self.with_live(key, |entries| {
            let slot = entries.entry(key.to_string()).or_insert_with(|| Slot {
                entry: Entry::Set(BTreeSet::new()),
                expires_at: Instant::now() + ttl,
            });
            match &mut slot.entry {
                Entry::Set(members) => {
                    members.insert(member.to_string());
                    slot.expires_at = Instant::now() + ttl;
                    Ok(())
                }
                Entry::Value(_) => Err(CacheError::WrongType(key.to_string())),
            }
        })?
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, CacheError> {
        self.with_live(key, |entries| match entries.get(key) {
            None => Ok(Vec::new()),
            Some(Slot {
                entry: Entry::Set(members),
                ..
            }) => Ok(members.iter().cloned().collect()),
            Some(_) => Err(CacheError::WrongType(key.to_string())),
        })?
    }
}
