// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Cross-view refresh flags.
//!
//! A view that mutates an activity sets the flags of the *other* views that
//! show the same data, for the acting user (and a linked partner when the
//! activity is shared). Each consuming view clears its own flag when it
//! observes it set, then refetches. Values are stored as the strings
//! `"true"` / `"false"` in a small key-value store.

use crate::error::AppError;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// The persisted flag names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshFlag {
    HomeData,
    MoodsData,
    Notifications,
}

impl RefreshFlag {
    pub const ALL: [RefreshFlag; 3] = [
        RefreshFlag::HomeData,
        RefreshFlag::MoodsData,
        RefreshFlag::Notifications,
    ];

    /// Storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshFlag::HomeData => "refreshHomeData",
            RefreshFlag::MoodsData => "refreshMoodsData",
            RefreshFlag::Notifications => "refreshNotifications",
        }
    }
}

/// Minimal string key-value store holding the flags.
pub trait FlagStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set(&self, key: &str, value: &str) -> Result<(), AppError>;
}

/// Process-local store (tests, ephemeral deployments).
#[derive(Default)]
pub struct MemoryFlagStore {
    values: DashMap<String, String>,
}

impl MemoryFlagStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStore for MemoryFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Flags persisted as a flat JSON object in one file.
///
/// The whole file is rewritten on every `set`; there are only a handful of keys.
pub struct FileFlagStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileFlagStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, AppError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) if contents.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                AppError::Storage(format!("Corrupt flag file {}: {}", self.path.display(), e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(AppError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

impl FlagStore for FileFlagStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AppError::Storage("Flag store lock poisoned".to_string()))?;
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        let _guard = self
            .lock
            .lock()
            .map_err(|_| AppError::Storage("Flag store lock poisoned".to_string()))?;

        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());

        let json = serde_json::to_string_pretty(&values)
            .map_err(|e| AppError::Storage(e.to_string()))?;
        // Write-then-rename so a crash never leaves a truncated file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .and_then(|_| fs::rename(&tmp, &self.path))
            .map_err(|e| {
                AppError::Storage(format!("Failed to write {}: {}", self.path.display(), e))
            })
    }
}

/// Read/clear contract over a [`FlagStore`].
///
/// Flags are scoped per user: the stored key is `{user_id}:{flag}`, so one
/// user's screens never consume a flag raised for another.
#[derive(Clone)]
pub struct RefreshFlags {
    store: Arc<dyn FlagStore>,
    /// Serializes read-then-clear so a set flag is observed exactly once.
    take_lock: Arc<Mutex<()>>,
}

impl RefreshFlags {
    pub fn new(store: Arc<dyn FlagStore>) -> Self {
        Self {
            store,
            take_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Storage key of `flag` for `user_id`.
    pub fn key(user_id: &str, flag: RefreshFlag) -> String {
        format!("{}:{}", user_id, flag.as_str())
    }

    pub fn set(&self, user_id: &str, flag: RefreshFlag) -> Result<(), AppError> {
        let _guard = self.guard()?;
        self.store.set(&Self::key(user_id, flag), "true")?;
        tracing::debug!(user_id, flag = flag.as_str(), "Refresh flag set");
        Ok(())
    }

    /// Set several flags; stops at the first storage error.
    pub fn set_all(&self, user_id: &str, flags: &[RefreshFlag]) -> Result<(), AppError> {
        flags.iter().try_for_each(|flag| self.set(user_id, *flag))
    }

    /// Current value without clearing. Absent or unrecognized values read as false.
    pub fn is_set(&self, user_id: &str, flag: RefreshFlag) -> Result<bool, AppError> {
        Ok(self.store.get(&Self::key(user_id, flag))?.as_deref() == Some("true"))
    }

    /// If the flag is set, clear it and return true; otherwise return false.
    pub fn refresh_if_flagged(&self, user_id: &str, flag: RefreshFlag) -> Result<bool, AppError> {
        let _guard = self.guard()?;
        if !self.is_set(user_id, flag)? {
            return Ok(false);
        }
        self.store.set(&Self::key(user_id, flag), "false")?;
        tracing::debug!(user_id, flag = flag.as_str(), "Refresh flag consumed");
        Ok(true)
    }

    fn guard(&self) -> Result<std::sync::MutexGuard<'_, ()>, AppError> {
        self.take_lock
            .lock()
            .map_err(|_| AppError::Storage("Refresh flag lock poisoned".to_string()))
    }
}
