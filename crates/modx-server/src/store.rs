//! Durable local key-value store
//!
//! A JSON object on disk, loaded once and written through on every change.
//! Without a path it lives only in memory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use alloy_primitives::Address;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub const PRICE_ALARM_KEY: &str = "price_alarm";

pub fn swap_history_key(account: Address) -> String {
    format!("swap_history:{}", account)
}

pub fn liquidity_history_key(account: Address) -> String {
    format!("liquidity_history:{}", account)
}

pub fn profile_key(account: Address) -> String {
    format!("profile:{}", account)
}

#[derive(Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Arc<RwLock<BTreeMap<String, Value>>>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            entries: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Load from `path`. A missing or unreadable file starts empty.
    pub fn open(path: Option<&str>) -> Self {
        let Some(path) = path.map(PathBuf::from) else {
            println!("[STORE] No store path configured, using in-memory store");
            return Self::in_memory();
        };

        let entries = match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<BTreeMap<String, Value>>(&raw) {
                Ok(entries) => {
                    println!("[STORE] Loaded {} entries from {}", entries.len(), path.display());
                    entries
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Store file is corrupt, starting empty");
                    BTreeMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "Store file not found, starting empty");
                BTreeMap::new()
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Store file unreadable, starting empty");
                BTreeMap::new()
            }
        };

        Self {
            path: Some(path),
            entries: Arc::new(RwLock::new(entries)),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let value = entries.get(key)?.clone();
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Ignoring undecodable store entry");
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> AppResult<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    /// Read-modify-write `key` while holding the store lock. An entry that
    /// does not decode is handed to `apply` as absent.
    pub fn update<T, F>(&self, key: &str, apply: F) -> AppResult<()>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(Option<T>) -> T,
    {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let current = entries.get(key).cloned().and_then(|value| match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Replacing undecodable store entry");
                None
            }
        });
        let value = serde_json::to_value(apply(current))
            .map_err(|e| AppError::Internal(format!("Failed to encode {}: {}", key, e)))?;
        entries.insert(key.to_string(), value);
        self.flush(&entries)
    }

    pub fn remove(&self, key: &str) -> AppResult<()> {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        if entries.remove(key).is_some() {
            self.flush(&entries)?;
        }
        Ok(())
    }

    fn flush(&self, entries: &BTreeMap<String, Value>) -> AppResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| AppError::Internal(format!("Failed to encode store: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, raw)
            .map_err(|e| AppError::Internal(format!("Failed to write {}: {}", path.display(), e)))
    }
}
