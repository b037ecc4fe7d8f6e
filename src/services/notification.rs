// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Reminder labels ("15 minutes before") and the times they imply.
//!
//! Display only: delivering the reminder belongs to the push service.

use crate::models::Activity;
use chrono::{Duration, NaiveDateTime};

/// Lead time described by a notification label.
///
/// `None` for labels that do not describe one ("None", free text, ...).
pub fn lead_time(label: &str) -> Option<Duration> {
    let label = label.trim().to_ascii_lowercase();
    if label == "at time of event" || label == "at start" {
        return Some(Duration::zero());
    }

    let rest = label.strip_suffix("before")?.trim();
    let (amount, unit) = rest.split_once(char::is_whitespace)?;
    let amount: i64 = amount.trim().parse().ok()?;
    if amount < 0 {
        return None;
    }

    match unit.trim().trim_end_matches('s') {
        "minute" | "min" => Some(Duration::minutes(amount)),
        "hour" | "hr" => Some(Duration::hours(amount)),
        "day" => Some(Duration::days(amount)),
        "week" => Some(Duration::weeks(amount)),
        _ => None,
    }
}

/// When the reminder for an activity should fire, if it has one.
pub fn reminder_at(activity: &Activity) -> Option<NaiveDateTime> {
    let lead = lead_time(activity.notification.as_deref()?)?;
    let start = activity.date.and_time(activity.start()?);
    start.checked_sub_signed(lead)
}
