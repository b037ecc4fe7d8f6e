// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-month activity cache shared by every view.
//!
//! Entries are keyed by `(user_id, period)` and hold the normalized
//! activities as last fetched. There is no TTL: an entry is only replaced by
//! a forced fetch or dropped by [`PeriodCache::invalidate`].
//!
//! At most one fetch per key is in flight. Concurrent callers wait on a
//! per-key lock and then reuse whatever the winner stored.

use crate::error::AppError;
use crate::models::{Activity, Period, RawActivity};
use crate::services::normalizer::normalize_with_date;
use crate::services::task_store::TaskStore;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache key: one user's view of one month.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub user_id: String,
    pub period: Period,
}

impl CacheKey {
    pub fn new(user_id: &str, period: Period) -> Self {
        Self {
            user_id: user_id.to_string(),
            period,
        }
    }
}

/// Observable state of one key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    Empty,
    Loading,
    Populated,
}

/// Cached activities for one key.
pub type PeriodEntry = Arc<Vec<Activity>>;

#[derive(Default)]
struct Slot {
    /// Held for the duration of a fetch.
    lock: Mutex<()>,
    /// Completed successful fetches.
    completed: AtomicU64,
    /// Bumped by invalidation; a fetch that straddles a bump is not stored.
    generation: AtomicU64,
}

/// Shared period cache.
#[derive(Clone, Default)]
pub struct PeriodCache {
    entries: Arc<DashMap<CacheKey, PeriodEntry>>,
    slots: Arc<DashMap<CacheKey, Arc<Slot>>>,
}

impl PeriodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached activities, fetching and populating on a miss.
    ///
    /// With `force`, the entry is refetched even when populated, unless
    /// another fetch for the same key completed while this call waited.
    /// On failure the entry is dropped and the error returned; nothing
    /// partial is ever stored.
    pub async fn get<S: TaskStore>(
        &self,
        store: &S,
        user_id: &str,
        period: Period,
        force: bool,
    ) -> Result<PeriodEntry, AppError> {
        let key = CacheKey::new(user_id, period);

        if !force {
            if let Some(hit) = self.peek_key(&key) {
                tracing::debug!(user_id, period = %period, "Period cache hit");
                return Ok(hit);
            }
        }

        let slot = self.slot(&key);
        let completed_before = slot.completed.load(Ordering::Acquire);
        let guard = slot.lock.lock().await;

        // Someone else may have finished a fetch while we waited.
        if let Some(hit) = self.peek_key(&key) {
            if !force || slot.completed.load(Ordering::Acquire) != completed_before {
                tracing::debug!(user_id, period = %period, "Reusing concurrent fetch");
                return Ok(hit);
            }
        }

        tracing::debug!(user_id, period = %period, force, "Fetching period");
        let generation = slot.generation.load(Ordering::Acquire);

        match store.fetch_month(user_id, period).await {
            Ok(raw) => {
                let entry: PeriodEntry = Arc::new(normalize_records(raw, period));
                if slot.generation.load(Ordering::Acquire) == generation {
                    self.entries.insert(key, entry.clone());
                    slot.completed.fetch_add(1, Ordering::AcqRel);
                } else {
                    tracing::debug!(
                        user_id,
                        period = %period,
                        "Invalidated during fetch, result not cached"
                    );
                    drop(guard);
                    self.prune_slot(&key);
                }
                tracing::info!(user_id, period = %period, count = entry.len(), "Period loaded");
                Ok(entry)
            }
            Err(e) => {
                self.entries.remove(&key);
                drop(guard);
                self.prune_slot(&key);
                if e.is_retryable_fetch() {
                    tracing::warn!(user_id, period = %period, error = %e, "Period fetch failed");
                } else {
                    tracing::error!(user_id, period = %period, error = %e, "Period fetch failed");
                }
                Err(e)
            }
        }
    }

    /// Cached activities without fetching.
    pub fn peek(&self, user_id: &str, period: Period) -> Option<PeriodEntry> {
        self.peek_key(&CacheKey::new(user_id, period))
    }

    pub fn state(&self, user_id: &str, period: Period) -> PeriodState {
        let key = CacheKey::new(user_id, period);
        let loading = self
            .slots
            .get(&key)
            .is_some_and(|slot| slot.lock.try_lock().is_err());

        if loading {
            PeriodState::Loading
        } else if self.entries.contains_key(&key) {
            PeriodState::Populated
        } else {
            PeriodState::Empty
        }
    }

    /// Force the next `get` of this period to refetch, for every user.
    pub fn invalidate(&self, period: Period) {
        self.drop_matching(|key| key.period == period);
        tracing::debug!(period = %period, "Period invalidated");
    }

    /// Force the next `get` of this period to refetch, for one user.
    pub fn invalidate_user(&self, user_id: &str, period: Period) {
        self.drop_matching(|key| key.user_id == user_id && key.period == period);
        tracing::debug!(user_id, period = %period, "Period invalidated for user");
    }

    /// Force the next `get` of every period of one user to refetch.
    pub fn invalidate_user_periods(&self, user_id: &str) {
        self.drop_matching(|key| key.user_id == user_id);
        tracing::debug!(user_id, "All periods invalidated for user");
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.drop_matching(|_| true);
    }

    /// Keys with fetch bookkeeping: populated keys plus keys being fetched.
    pub fn tracked_keys(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn peek_key(&self, key: &CacheKey) -> Option<PeriodEntry> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Drop matching entries. In-flight fetches for them are told not to
    /// store their result; idle slots are removed.
    fn drop_matching(&self, matches: impl Fn(&CacheKey) -> bool) {
        self.entries.retain(|key, _| !matches(key));
        self.slots.retain(|key, slot| {
            if !matches(key) {
                return true;
            }
            slot.generation.fetch_add(1, Ordering::AcqRel);
            // Only the map holds it: nobody is fetching or waiting.
            Arc::strong_count(slot) > 1
        });
    }

    /// Remove the slot of `key` if it has no entry and no other holder
    /// besides the caller.
    fn prune_slot(&self, key: &CacheKey) {
        if self.entries.contains_key(key) {
            return;
        }
        self.slots
            .remove_if(key, |_, slot| Arc::strong_count(slot) <= 2);
    }

    fn slot(&self, key: &CacheKey) -> Arc<Slot> {
        self.slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Slot::default()))
            .clone()
    }
}

/// Normalize a listing for `period`.
///
/// Unusable records are skipped and logged. Records dated outside the period
/// are dropped so a period never holds another month's activities, and a
/// repeated id keeps only its first occurrence.
pub fn normalize_records(records: Vec<RawActivity>, period: Period) -> Vec<Activity> {
    let mut seen = HashSet::new();
    let mut activities = Vec::with_capacity(records.len());

    for raw in records {
        let fallback_date = raw.day.and_then(|day| period.day(day));
        let activity = match normalize_with_date(&raw.record, fallback_date) {
            Ok(activity) => activity,
            Err(e) => {
                tracing::warn!(period = %period, reason = %e, "Skipping unusable task record");
                continue;
            }
        };

        if !period.contains(activity.date) {
            tracing::warn!(
                period = %period,
                activity_id = %activity.id,
                date = %activity.date,
                "Skipping record dated outside requested period"
            );
            continue;
        }

        if !seen.insert(activity.id.clone()) {
            tracing::debug!(activity_id = %activity.id, "Skipping duplicate record");
            continue;
        }

        activities.push(activity);
    }

    activities
}
