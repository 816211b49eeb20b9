use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{StoreError, StoreResult};

const ENTRY_EXTENSION: &str = "json";

/// Durable string storage keyed by name.
///
/// Implementations only move serialized text around; caching and
/// (de)serialization live in [`PersistentStore`].
pub trait StorageBackend: Send + Sync {
    fn read(&self, key: &str) -> StoreResult<Option<String>>;
    fn write(&self, key: &str, text: &str) -> StoreResult<()>;
    fn remove(&self, key: &str) -> StoreResult<()>;
    fn clear(&self) -> StoreResult<()>;
    fn keys(&self) -> StoreResult<Vec<String>>;
}

/// One JSON file per key under a root directory.
#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(root.as_path())?;
        Ok(Self { root })
    }

    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        let name = sanitize_key(key)?;
        Ok(self.root.join(format!("{name}.{ENTRY_EXTENSION}")))
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn write(&self, key: &str, text: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        write_text_file(path, text).map_err(|source| StoreError::Write {
            key: key.to_string(),
            source,
        })
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        for key in self.keys()? {
            self.remove(key.as_str())?;
        }
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let mut out = Vec::new();
        for entry in fs::read_dir(self.root.as_path())? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                out.push(stem.to_string());
            }
        }
        out.sort();
        Ok(out)
    }
}

/// Process-local storage, optionally capped at a byte quota so that
/// quota-exceeded writes can be reproduced.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<BTreeMap<String, String>>,
    quota: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(bytes: usize) -> Self {
        Self {
            entries: Mutex::default(),
            quota: Some(bytes),
        }
    }

    /// Stores text directly, bypassing quota checks. Useful for seeding legacy
    /// or corrupt entries.
    pub fn insert_raw(&self, key: impl Into<String>, text: impl Into<String>) {
        self.lock().insert(key.into(), text.into());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StorageBackend for MemoryBackend {
    fn read(&self, key: &str) -> StoreResult<Option<String>> {
        sanitize_key(key)?;
        Ok(self.lock().get(key).cloned())
    }

    fn write(&self, key: &str, text: &str) -> StoreResult<()> {
        sanitize_key(key)?;
        let mut entries = self.lock();
        if let Some(quota) = self.quota {
            let used: usize = entries
                .iter()
                .filter(|(existing, _)| existing.as_str() != key)
                .map(|(existing, value)| existing.len() + value.len())
                .sum();
            let needed = key.len() + text.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(StoreError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }
        entries.insert(key.to_string(), text.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock().remove(key);
        Ok(())
    }

    fn clear(&self) -> StoreResult<()> {
        self.lock().clear();
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }
}

/// Typed key-value persistence with an in-memory cache in front of a
/// [`StorageBackend`].
///
/// Reads never fail: a missing, unreadable or undecodable entry yields the
/// caller's fallback. Writes update the cache first, so a failed write still
/// leaves the session consistent and later reads observe the new value.
pub struct PersistentStore {
    backend: Box<dyn StorageBackend>,
    cache: Mutex<HashMap<String, serde_json::Value>>,
}

impl PersistentStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            cache: Mutex::default(),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::new())
    }

    pub fn open_dir(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Ok(Self::new(FileBackend::open(root)?))
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, fallback: T) -> T {
        let Some(value) = self.get_value(key) else {
            return fallback;
        };
        match serde_json::from_value::<T>(value) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!(key, error = %err, "stored value has unexpected shape, using fallback");
                fallback
            }
        }
    }

    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        if let Some(cached) = self.lock_cache().get(key) {
            return Some(cached.clone());
        }
        let raw = match self.backend.read(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                debug!(key, error = %err, "storage read failed, using fallback");
                return None;
            }
        };
        match serde_json::from_str::<serde_json::Value>(raw.as_str()) {
            Ok(value) => {
                self.lock_cache().insert(key.to_string(), value.clone());
                Some(value)
            }
            Err(err) => {
                debug!(key, error = %err, "stored value is not valid JSON, using fallback");
                None
            }
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.set_value(key, value)
    }

    pub fn set_value(&self, key: &str, value: serde_json::Value) -> StoreResult<()> {
        sanitize_key(key)?;
        let content =
            serde_json::to_string_pretty(&value).map_err(|source| StoreError::Serialize {
                key: key.to_string(),
                source,
            })?;
        self.lock_cache().insert(key.to_string(), value);
        self.backend.write(key, content.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get_value(key).is_some()
    }

    pub fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock_cache().remove(key);
        self.backend.remove(key)
    }

    pub fn clear(&self) -> StoreResult<()> {
        self.lock_cache().clear();
        self.backend.clear()
    }

    pub fn keys(&self) -> StoreResult<Vec<String>> {
        let mut keys = self.backend.keys()?;
        for key in self.lock_cache().keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, serde_json::Value>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keys are plain names: a single normal path component with no separators.
pub fn sanitize_key(value: &str) -> StoreResult<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed != value {
        return Err(StoreError::InvalidKey(value.to_string()));
    }
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(StoreError::InvalidKey(value.to_string())),
    }
    if value.contains(['/', '\\', ':']) {
        return Err(StoreError::InvalidKey(value.to_string()));
    }
    Ok(value)
}

pub(crate) fn write_text_file(path: PathBuf, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
