// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Wire shapes returned by the remote task store.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Body of a month/day listing.
///
/// The task store answers either with a plain array of records or with an
/// object keyed by day-of-month. Either shape is accepted.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TaskStoreResponse {
    List(Vec<Value>),
    ByDay(BTreeMap<String, Value>),
}

/// One record as received, plus the day key it was filed under (if any).
#[derive(Debug, Clone, PartialEq)]
pub struct RawActivity {
    pub day: Option<u32>,
    pub record: Value,
}

impl RawActivity {
    pub fn new(record: Value) -> Self {
        Self { day: None, record }
    }
}

impl TaskStoreResponse {
    /// Flatten into records, day-keyed entries ordered by day number.
    pub fn into_records(self) -> Vec<RawActivity> {
        match self {
            TaskStoreResponse::List(records) => records.into_iter().map(RawActivity::new).collect(),
            TaskStoreResponse::ByDay(days) => {
                let mut days: Vec<(Option<u32>, Value)> = days
                    .into_iter()
                    .map(|(key, value)| (key.trim().parse::<u32>().ok(), value))
                    .collect();
                // Numeric order: "2" before "10", unparseable keys last.
                days.sort_by_key(|(day, _)| day.unwrap_or(u32::MAX));

                let mut out = Vec::new();
                for (day, value) in days {
                    match value {
                        Value::Array(records) => out.extend(
                            records
                                .into_iter()
                                .map(|record| RawActivity { day, record }),
                        ),
                        Value::Null => {}
                        record => out.push(RawActivity { day, record }),
                    }
                }
                out
            }
        }
    }
}
