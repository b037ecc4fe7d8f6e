// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Activity model shared by every view, plus mutation inputs.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::{Validate, ValidationError};

/// Whether an activity is the user's own or shared with their partner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub enum ActivityType {
    #[default]
    Personal,
    Couple,
}

/// Rating left on a completed activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub struct Mood {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub score: Option<u8>,
    #[serde(default)]
    pub review: String,
}

/// Canonical activity record, as produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub struct Activity {
    /// Identifier assigned by the task store
    pub id: String,
    pub title: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub date: NaiveDate,
    /// `HH:MM`, 24-hour
    pub start_time: String,
    /// `HH:MM`, 24-hour
    pub end_time: String,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_id: Option<String>,
    #[serde(default)]
    pub tag: String,
    /// Display emoji derived from `tag`
    #[serde(default)]
    pub emoji: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Lead-time label, e.g. "15 minutes before"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<String>,
    #[serde(default)]
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<Mood>,
    /// Raw server record, echoed back on update so unknown fields survive
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "unknown"))]
    pub original_data: Value,
}

impl Activity {
    pub fn is_couple(&self) -> bool {
        self.activity_type == ActivityType::Couple
    }

    /// Start as a time of day, if `start_time` is well formed.
    pub fn start(&self) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(&self.start_time, "%H:%M").ok()
    }
}

/// Body of a "add activity" request.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_time_range"))]
pub struct NewActivity {
    #[validate(length(min = 1, max = 100))]
    pub title: String,
    #[validate(custom(function = "validate_date"))]
    pub date: String,
    #[serde(default = "default_start")]
    #[validate(custom(function = "validate_time"))]
    pub start_time: String,
    #[serde(default = "default_end")]
    #[validate(custom(function = "validate_time"))]
    pub end_time: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub tag: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub location: String,
    #[serde(default)]
    pub notification: String,
    /// Share this activity with the linked partner
    #[serde(default)]
    pub with_partner: bool,
}

pub const DEFAULT_START_TIME: &str = "00:00";
pub const DEFAULT_END_TIME: &str = "23:59";

fn default_start() -> String {
    DEFAULT_START_TIME.to_string()
}

fn default_end() -> String {
    DEFAULT_END_TIME.to_string()
}

fn validate_date(date: &str) -> Result<(), ValidationError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|_| ())
        .map_err(|_| ValidationError::new("date_format"))
}

fn validate_time(time: &str) -> Result<(), ValidationError> {
    if time.len() == 5 && NaiveTime::parse_from_str(time, "%H:%M").is_ok() {
        Ok(())
    } else {
        Err(ValidationError::new("time_format"))
    }
}

fn validate_time_range(activity: &NewActivity) -> Result<(), ValidationError> {
    let start = NaiveTime::parse_from_str(&activity.start_time, "%H:%M");
    let end = NaiveTime::parse_from_str(&activity.end_time, "%H:%M");
    match (start, end) {
        (Ok(start), Ok(end)) if end < start => Err(ValidationError::new("end_before_start")),
        _ => Ok(()),
    }
}

impl NewActivity {
    /// Parsed date. Only meaningful after `validate()` succeeded.
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").ok()
    }

    /// Create body in the task store's casing.
    ///
    /// `withPartner` carries the partner's user id for couple activities so
    /// the linkage reaches the store, `false` otherwise.
    pub fn to_payload(&self, partner_id: Option<&str>) -> Value {
        let with_partner = match partner_id {
            Some(partner) if self.with_partner => Value::String(partner.to_string()),
            _ => Value::Bool(false),
        };

        json!({
            "date": self.date,
            "title": self.title.trim(),
            "description": self.description,
            "withPartner": with_partner,
            "startTime": self.start_time,
            "endTime": self.end_time,
            "location": self.location,
            "Mood": Value::Null,
            "Tag": self.tag,
            "Notification": self.notification,
            "Complete": false,
        })
    }
}

/// Body of an "add review" request.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReviewInput {
    #[serde(default)]
    #[validate(length(max = 100))]
    pub description: String,
    #[validate(range(min = 1, max = 5))]
    pub score: u8,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub review: String,
}

impl From<ReviewInput> for Mood {
    fn from(input: ReviewInput) -> Self {
        Self {
            description: input.description,
            score: Some(input.score),
            review: input.review,
        }
    }
}
