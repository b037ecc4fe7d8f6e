// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-view projections of cached activities.

use crate::models::Activity;
use crate::services::flags::RefreshFlag;
use crate::services::notification::reminder_at;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// A screen that consumes a refresh flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum View {
    #[default]
    Home,
    Moods,
    Notifications,
}

impl View {
    /// The flag this view clears when it regains focus.
    pub fn flag(&self) -> RefreshFlag {
        match self {
            View::Home => RefreshFlag::HomeData,
            View::Moods => RefreshFlag::MoodsData,
            View::Notifications => RefreshFlag::Notifications,
        }
    }
}

/// Calendar: activities grouped by date, fetch order kept within a day.
pub fn by_date(activities: &[Activity]) -> BTreeMap<NaiveDate, Vec<Activity>> {
    let mut days: BTreeMap<NaiveDate, Vec<Activity>> = BTreeMap::new();
    for activity in activities {
        days.entry(activity.date).or_default().push(activity.clone());
    }
    days
}

/// To-do list: incomplete first, then by start time.
pub fn todo_order(mut activities: Vec<Activity>) -> Vec<Activity> {
    activities.sort_by(|a, b| {
        a.complete
            .cmp(&b.complete)
            .then_with(|| a.start_time.cmp(&b.start_time))
    });
    activities
}

/// Moods: completed activities that have been rated.
pub fn rated(activities: &[Activity]) -> Vec<Activity> {
    activities
        .iter()
        .filter(|a| a.complete && a.mood.is_some())
        .cloned()
        .collect()
}

/// Notification list entry.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub struct Reminder {
    pub activity: Activity,
    #[cfg_attr(feature = "binding-generation", ts(type = "string | null"))]
    pub remind_at: Option<NaiveDateTime>,
}

/// Notifications: activities carrying a label, soonest reminder first.
/// Labels without a parseable lead time sort last.
pub fn reminders(activities: &[Activity]) -> Vec<Reminder> {
    let mut out: Vec<Reminder> = activities
        .iter()
        .filter(|a| a.notification.is_some())
        .map(|a| Reminder {
            remind_at: reminder_at(a),
            activity: a.clone(),
        })
        .collect();
    out.sort_by_key(|r| (r.remind_at.is_none(), r.remind_at));
    out
}
