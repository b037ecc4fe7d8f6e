// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Raw task store record -> canonical [`Activity`].
//!
//! The store is inconsistent about key casing (`Tag`/`tag`,
//! `Complete`/`complete`/`completed`, ...). For each dual-cased field the
//! capitalized key wins when present and non-empty, then the lowercase key,
//! then a fixed default.
//!
//! Normalization is idempotent: a serialized `Activity` fed back in yields
//! the same `Activity`, which matters because `originalData` round-trips
//! through update payloads.

use crate::models::activity::{DEFAULT_END_TIME, DEFAULT_START_TIME};
use crate::models::{Activity, ActivityType, Mood};
use chrono::{NaiveDate, NaiveTime};
use serde_json::{Map, Value};

/// Emoji shown for tags outside the table.
pub const DEFAULT_EMOJI: &str = "📝";

const TAG_EMOJIS: &[(&str, &str)] = &[
    ("Date", "❤️"),
    ("Work", "💼"),
    ("Exercise", "🏃"),
    ("Entertainment", "🎬"),
    ("Travel", "✈️"),
    ("Food", "🍽️"),
    ("Shopping", "🛍️"),
    ("Study", "📚"),
];

/// Why a raw record was dropped instead of displayed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("record is not a JSON object")]
    NotAnObject,

    #[error("record has no '{0}'")]
    MissingField(&'static str),

    #[error("record has unparseable date '{0}'")]
    InvalidDate(String),
}

/// Display emoji for a tag. Total: unknown tags get [`DEFAULT_EMOJI`].
pub fn tag_emoji(tag: &str) -> &'static str {
    let tag = tag.trim();
    TAG_EMOJIS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tag))
        .map(|(_, emoji)| *emoji)
        .unwrap_or(DEFAULT_EMOJI)
}

/// Normalize a record that must carry its own `date`.
pub fn normalize(raw: &Value) -> Result<Activity, NormalizeError> {
    normalize_with_date(raw, None)
}

/// Normalize a record, using `fallback_date` when it carries no `date`
/// (records filed under a day key often omit it).
pub fn normalize_with_date(
    raw: &Value,
    fallback_date: Option<NaiveDate>,
) -> Result<Activity, NormalizeError> {
    let obj = raw.as_object().ok_or(NormalizeError::NotAnObject)?;

    let id = pick(obj, &["id", "_id", "Id"])
        .and_then(as_text)
        .ok_or(NormalizeError::MissingField("id"))?;

    let (date, dated_by_key) = match pick(obj, &["date"]).and_then(as_text) {
        Some(text) => (parse_date(&text).ok_or(NormalizeError::InvalidDate(text))?, false),
        None => (fallback_date.ok_or(NormalizeError::MissingField("date"))?, true),
    };

    let mut original_data = match obj.get("originalData") {
        Some(original @ Value::Object(_)) => original.clone(),
        _ => raw.clone(),
    };
    // Keep the resolved date so an edit can still report where the record was.
    if dated_by_key {
        if let Value::Object(original) = &mut original_data {
            original
                .entry("date")
                .or_insert_with(|| Value::String(date.to_string()));
        }
    }

    let partner_id = match obj.get("withPartner") {
        Some(Value::String(s)) if is_partner_id(s) => Some(s.trim().to_string()),
        _ => pick(obj, &["partnerId"]).and_then(as_text),
    };
    let is_couple = obj.get("withPartner").is_some_and(is_truthy)
        || partner_id.is_some()
        || obj.get("type").and_then(Value::as_str) == Some("couple");

    let tag = pick(obj, &["Tag", "tag"])
        .and_then(as_text)
        .unwrap_or_default();

    Ok(Activity {
        id,
        title: pick(obj, &["title"]).and_then(as_text).unwrap_or_default(),
        date,
        start_time: pick(obj, &["startTime"])
            .and_then(as_time)
            .unwrap_or_else(|| DEFAULT_START_TIME.to_string()),
        end_time: pick(obj, &["endTime"])
            .and_then(as_time)
            .unwrap_or_else(|| DEFAULT_END_TIME.to_string()),
        activity_type: if is_couple {
            ActivityType::Couple
        } else {
            ActivityType::Personal
        },
        partner_id,
        emoji: tag_emoji(&tag).to_string(),
        tag,
        description: pick(obj, &["description"]).and_then(as_text),
        location: pick(obj, &["location"]).and_then(as_text),
        notification: pick(obj, &["Notification", "notification"]).and_then(as_text),
        complete: pick(obj, &["Complete", "complete", "completed"])
            .and_then(as_bool)
            .unwrap_or(false),
        mood: pick(obj, &["Mood", "mood"]).and_then(as_mood),
        original_data,
    })
}

/// First key whose value is present and non-empty.
fn pick<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| obj.get(*key))
        .find(|value| !is_empty(value))
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => {
            let s = s.trim();
            !s.is_empty() && s != "false" && s != "0"
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// A string `withPartner` that names a user rather than encoding a boolean.
fn is_partner_id(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && !matches!(s, "true" | "false" | "0" | "1")
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|n| n != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Accepts `H:MM`, `HH:MM` and `HH:MM:SS`, renders `HH:MM`.
fn as_time(value: &Value) -> Option<String> {
    let text = as_text(value)?;
    NaiveTime::parse_from_str(&text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&text, "%H:%M:%S"))
        .ok()
        .map(|t| t.format("%H:%M").to_string())
}

/// Accepts `YYYY-MM-DD` or a full ISO timestamp starting with one.
fn parse_date(text: &str) -> Option<NaiveDate> {
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn as_mood(value: &Value) -> Option<Mood> {
    let obj = value.as_object()?;
    let score = obj.get("score").and_then(|score| match score {
        Value::Number(n) => n.as_u64().and_then(|n| u8::try_from(n).ok()),
        Value::String(s) => s.trim().parse::<u8>().ok(),
        _ => None,
    });
    let mood = Mood {
        description: obj.get("description").and_then(as_text).unwrap_or_default(),
        score,
        review: obj.get("review").and_then(as_text).unwrap_or_default(),
    };

    if mood == Mood::default() {
        None
    } else {
        Some(mood)
    }
}
