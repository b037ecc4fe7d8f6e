// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity service: the one fetch/normalize/cache layer every view uses.
//!
//! Handles:
//! 1. Cached month reads (single in-flight fetch per user and month)
//! 2. Flag-driven resynchronization when a view regains focus
//! 3. Uncached day reads for the to-do list
//! 4. Mutations (create, edit, mark complete, review), which write to the
//!    remote store and then raise the refresh flags of the affected views
//!
//! Mutations never touch cached entries. A view keeps showing its cached
//! copy until it observes its flag.

use crate::error::{AppError, Result};
use crate::models::{Activity, NewActivity, Period, ReviewInput, Session};
use crate::services::flags::{RefreshFlag, RefreshFlags};
use crate::services::normalizer::normalize;
use crate::services::period_cache::{normalize_records, PeriodCache, PeriodEntry};
use crate::services::task_store::{TaskStore, TaskStoreClient};
use crate::services::views::View;
use chrono::NaiveDate;
use serde_json::Value;
use validator::Validate;

/// Views that show newly created activities.
const CREATE_FLAGS: &[RefreshFlag] = &[RefreshFlag::HomeData, RefreshFlag::Notifications];
/// An edit can change anything any view shows.
const UPDATE_FLAGS: &[RefreshFlag] = &RefreshFlag::ALL;
const COMPLETE_FLAGS: &[RefreshFlag] = &[RefreshFlag::HomeData, RefreshFlag::MoodsData];
const REVIEW_FLAGS: &[RefreshFlag] = &[RefreshFlag::HomeData, RefreshFlag::MoodsData];

/// Lowercase or derived keys that must not shadow the canonical ones on update.
const SHADOW_KEYS: &[&str] = &[
    "tag",
    "complete",
    "completed",
    "notification",
    "mood",
    "emoji",
    "type",
    "partnerId",
    "originalData",
];

/// Shared activity layer.
#[derive(Clone)]
pub struct ActivityService<S = TaskStoreClient> {
    store: S,
    cache: PeriodCache,
    flags: RefreshFlags,
}

impl<S: TaskStore> ActivityService<S> {
    pub fn new(store: S, cache: PeriodCache, flags: RefreshFlags) -> Self {
        Self {
            store,
            cache,
            flags,
        }
    }

    pub fn cache(&self) -> &PeriodCache {
        &self.cache
    }

    pub fn flags(&self) -> &RefreshFlags {
        &self.flags
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ─── Reads ───────────────────────────────────────────────────

    /// Activities for a month, from cache when populated.
    pub async fn get(&self, user_id: &str, period: Period) -> Result<PeriodEntry> {
        self.cache.get(&self.store, user_id, period, false).await
    }

    /// Refetch a month and overwrite its entry.
    pub async fn refresh(&self, user_id: &str, period: Period) -> Result<PeriodEntry> {
        self.cache.get(&self.store, user_id, period, true).await
    }

    /// Force the next `get` of this month to refetch.
    pub fn invalidate(&self, period: Period) {
        self.cache.invalidate(period);
    }

    /// Clear the user's `flag` if set; true means the caller should refetch.
    ///
    /// A flag does not say which month changed, so observing one also drops
    /// every cached month of the user.
    pub fn refresh_if_flagged(&self, user_id: &str, flag: RefreshFlag) -> Result<bool> {
        if !self.flags.refresh_if_flagged(user_id, flag)? {
            return Ok(false);
        }
        self.cache.invalidate_user_periods(user_id);
        Ok(true)
    }

    /// What a view shows on regaining focus: if its flag was raised the
    /// month is refetched (and the flag cleared), otherwise the cache answers.
    pub async fn focus(&self, user_id: &str, period: Period, view: View) -> Result<PeriodEntry> {
        if self.refresh_if_flagged(user_id, view.flag())? {
            tracing::info!(
                user_id,
                period = %period,
                flag = view.flag().as_str(),
                "Refresh flag observed, refetching"
            );
            return self.refresh(user_id, period).await;
        }
        self.get(user_id, period).await
    }

    /// Activities for one day, straight from the store.
    pub async fn get_day(&self, user_id: &str, period: Period, day: u32) -> Result<Vec<Activity>> {
        let date = period.day(day).ok_or_else(|| {
            AppError::BadRequest(format!("Day {} does not exist in {}", day, period))
        })?;

        let records = self.store.fetch_day(user_id, period, day).await?;
        Ok(normalize_records(records, period)
            .into_iter()
            .filter(|a| a.date == date)
            .collect())
    }

    /// Warm several months concurrently.
    pub async fn prefetch(&self, user_id: &str, periods: &[Period]) -> Result<()> {
        futures_util::future::try_join_all(periods.iter().map(|p| self.get(user_id, *p)))
            .await?;
        Ok(())
    }

    /// Look up one activity of a month as the store has it now.
    ///
    /// Mutations are built from the result, so this bypasses the cache: a
    /// cached copy may predate an earlier edit or completion. The cache is
    /// left untouched.
    pub async fn find(&self, user_id: &str, period: Period, activity_id: &str) -> Result<Activity> {
        let records = self.store.fetch_month(user_id, period).await?;
        normalize_records(records, period)
            .into_iter()
            .find(|a| a.id == activity_id)
            .ok_or_else(|| AppError::NotFound(format!("Activity {} in {}", activity_id, period)))
    }

    // ─── Mutations ───────────────────────────────────────────────

    /// Create an activity for the session's user.
    pub async fn create_activity(&self, session: &Session, input: NewActivity) -> Result<Activity> {
        input
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if input.with_partner && !session.is_paired() {
            return Err(AppError::BadRequest(
                "Cannot share an activity without a linked partner".to_string(),
            ));
        }

        let payload = input.to_payload(session.partner_id.as_deref());
        let stored = self.store.create(&session.user_id, &payload).await?;

        let activity = normalize(&merge_records(payload, stored)).map_err(|e| {
            AppError::WriteFailed(format!("Task store returned unusable record: {}", e))
        })?;

        tracing::info!(
            user_id = %session.user_id,
            activity_id = %activity.id,
            date = %activity.date,
            "Activity created"
        );
        self.raise(&session.user_id, activity.partner_id.as_deref(), CREATE_FLAGS);
        Ok(activity)
    }

    /// Replace an edited activity.
    pub async fn update_activity(&self, user_id: &str, activity: &Activity) -> Result<Activity> {
        self.write(user_id, activity, UPDATE_FLAGS).await
    }

    /// Mark an activity complete.
    pub async fn mark_complete(&self, user_id: &str, activity: &Activity) -> Result<Activity> {
        let mut done = activity.clone();
        done.complete = true;
        self.write(user_id, &done, COMPLETE_FLAGS).await
    }

    /// Rate a completed activity.
    pub async fn add_review(
        &self,
        user_id: &str,
        activity: &Activity,
        review: ReviewInput,
    ) -> Result<Activity> {
        review
            .validate()
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if !activity.complete {
            return Err(AppError::BadRequest(
                "Only completed activities can be reviewed".to_string(),
            ));
        }

        let mut reviewed = activity.clone();
        reviewed.mood = Some(review.into());
        self.write(user_id, &reviewed, REVIEW_FLAGS).await
    }

    async fn write(
        &self,
        user_id: &str,
        activity: &Activity,
        flags: &[RefreshFlag],
    ) -> Result<Activity> {
        if activity.id.is_empty() {
            return Err(AppError::BadRequest("Activity has no id".to_string()));
        }

        let old_date = normalize(&activity.original_data)
            .map(|previous| previous.date)
            .unwrap_or(activity.date);
        let payload = update_payload(activity, old_date);
        let stored = self.store.update(user_id, &activity.id, &payload).await?;

        let mut merged = merge_records(payload, stored);
        if let Value::Object(obj) = &mut merged {
            obj.entry("id")
                .or_insert_with(|| Value::String(activity.id.clone()));
        }
        let updated = normalize(&merged).map_err(|e| {
            AppError::WriteFailed(format!("Task store returned unusable record: {}", e))
        })?;

        tracing::info!(
            user_id,
            activity_id = %updated.id,
            complete = updated.complete,
            "Activity updated"
        );
        self.raise(user_id, updated.partner_id.as_deref(), flags);
        Ok(updated)
    }

    /// Raise `flags` for the user and, for a shared activity, the partner.
    ///
    /// The remote write already succeeded, so a flag failure is logged
    /// rather than reported; resubmitting would duplicate the write.
    fn raise(&self, user_id: &str, partner_id: Option<&str>, flags: &[RefreshFlag]) {
        for user in std::iter::once(user_id).chain(partner_id.filter(|p| *p != user_id)) {
            if let Err(e) = self.flags.set_all(user, flags) {
                tracing::error!(user_id = user, error = %e, "Failed to raise refresh flags");
            }
        }
    }
}

/// Full-record update body.
///
/// Starts from the raw record so fields this layer does not model survive,
/// then writes the canonical fields in the store's casing.
pub fn update_payload(activity: &Activity, old_date: NaiveDate) -> Value {
    let mut obj = activity
        .original_data
        .as_object()
        .cloned()
        .unwrap_or_default();
    for key in SHADOW_KEYS {
        obj.remove(*key);
    }

    let with_partner = if activity.is_couple() {
        match (&activity.partner_id, obj.get("withPartner")) {
            (Some(partner), _) => Value::String(partner.clone()),
            (None, Some(existing)) if !matches!(existing, Value::Null | Value::Bool(false)) => {
                existing.clone()
            }
            _ => Value::Bool(true),
        }
    } else {
        Value::Bool(false)
    };

    let text = |value: &Option<String>| Value::String(value.clone().unwrap_or_default());

    obj.insert("title".into(), Value::String(activity.title.clone()));
    obj.insert("date".into(), Value::String(activity.date.to_string()));
    obj.insert("olddate".into(), Value::String(old_date.to_string()));
    obj.insert("startTime".into(), Value::String(activity.start_time.clone()));
    obj.insert("endTime".into(), Value::String(activity.end_time.clone()));
    obj.insert("description".into(), text(&activity.description));
    obj.insert("location".into(), text(&activity.location));
    obj.insert("withPartner".into(), with_partner);
    obj.insert("Tag".into(), Value::String(activity.tag.clone()));
    obj.insert("Notification".into(), text(&activity.notification));
    obj.insert("Complete".into(), Value::Bool(activity.complete));
    obj.insert(
        "Mood".into(),
        activity
            .mood
            .as_ref()
            .and_then(|mood| serde_json::to_value(mood).ok())
            .unwrap_or(Value::Null),
    );

    Value::Object(obj)
}

/// Overlay the store's response on the request body. Stores differ in how
/// much of the record they echo back; anything missing is taken from the request.
fn merge_records(request: Value, response: Value) -> Value {
    match (request, response) {
        (Value::Object(mut base), Value::Object(stored)) => {
            base.extend(stored.into_iter().filter(|(_, v)| !v.is_null()));
            Value::Object(base)
        }
        (Value::Object(mut base), Value::String(id)) if !id.is_empty() => {
            base.insert("id".into(), Value::String(id));
            Value::Object(base)
        }
        (request, _) => request,
    }
}
