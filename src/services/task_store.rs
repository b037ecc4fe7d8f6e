// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Remote task store client.
//!
//! Handles:
//! - Month and day listings (array or map-by-day bodies)
//! - Record creation and full-record updates
//! - Mapping of network failures, timeouts and non-2xx statuses to
//!   `FetchFailed` / `WriteFailed`; 404 on a listing means "no activities"

use crate::error::{AppError, FetchFailure};
use crate::models::{Period, RawActivity, TaskStoreResponse};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Operations the activity layer needs from the remote store.
///
/// Implemented over HTTP by [`TaskStoreClient`]; tests substitute in-memory
/// stores.
pub trait TaskStore: Send + Sync {
    /// All records for one user and month.
    fn fetch_month(
        &self,
        user_id: &str,
        period: Period,
    ) -> impl Future<Output = Result<Vec<RawActivity>, AppError>> + Send;

    /// All records for one user and day.
    fn fetch_day(
        &self,
        user_id: &str,
        period: Period,
        day: u32,
    ) -> impl Future<Output = Result<Vec<RawActivity>, AppError>> + Send;

    /// Create a record, returning it as stored.
    fn create(
        &self,
        user_id: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send;

    /// Replace a record, returning it as stored.
    fn update(
        &self,
        user_id: &str,
        activity_id: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send;
}

impl<T: TaskStore> TaskStore for Arc<T> {
    fn fetch_month(
        &self,
        user_id: &str,
        period: Period,
    ) -> impl Future<Output = Result<Vec<RawActivity>, AppError>> + Send {
        (**self).fetch_month(user_id, period)
    }

    fn fetch_day(
        &self,
        user_id: &str,
        period: Period,
        day: u32,
    ) -> impl Future<Output = Result<Vec<RawActivity>, AppError>> + Send {
        (**self).fetch_day(user_id, period, day)
    }

    fn create(
        &self,
        user_id: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send {
        (**self).create(user_id, payload)
    }

    fn update(
        &self,
        user_id: &str,
        activity_id: &str,
        payload: &Value,
    ) -> impl Future<Output = Result<Value, AppError>> + Send {
        (**self).update(user_id, activity_id, payload)
    }
}

/// HTTP client for `{base}/tasks/...`.
#[derive(Clone)]
pub struct TaskStoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl TaskStoreClient {
    /// Create a client whose every request is bounded by `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn user_url(&self, user_id: &str) -> String {
        format!("{}/tasks/{}", self.base_url, urlencoding::encode(user_id))
    }

    fn month_url(&self, user_id: &str, period: Period) -> String {
        format!(
            "{}/{}/{}",
            self.user_url(user_id),
            period.year(),
            period.month_segment()
        )
    }

    /// GET a listing. 404 and empty bodies mean no records.
    async fn get_listing(&self, url: &str) -> Result<Vec<RawActivity>, AppError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(fetch_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(url, "Task store has no records for period");
            return Ok(Vec::new());
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(url, status = %status, "Task store listing failed");
            return Err(AppError::FetchFailed(
                FetchFailure::Status(status.as_u16()),
                format!("HTTP {}: {}", status, body),
            ));
        }

        let body = response.text().await.map_err(fetch_error)?;
        if body.trim().is_empty() {
            return Ok(Vec::new());
        }

        let parsed: Option<TaskStoreResponse> = serde_json::from_str(&body)
            .map_err(|e| {
                AppError::FetchFailed(FetchFailure::Decode, format!("JSON parse error: {}", e))
            })?;
        Ok(parsed.map(TaskStoreResponse::into_records).unwrap_or_default())
    }

    /// Check a write response and parse the returned record.
    async fn check_write(&self, response: reqwest::Response) -> Result<Value, AppError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, "Task store write failed");
            return Err(AppError::WriteFailed(format!("HTTP {}: {}", status, body)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| AppError::WriteFailed(classify(&e).1))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| AppError::WriteFailed(format!("JSON parse error: {}", e)))
    }
}

impl TaskStore for TaskStoreClient {
    async fn fetch_month(&self, user_id: &str, period: Period) -> Result<Vec<RawActivity>, AppError> {
        let url = self.month_url(user_id, period);
        self.get_listing(&url).await
    }

    async fn fetch_day(
        &self,
        user_id: &str,
        period: Period,
        day: u32,
    ) -> Result<Vec<RawActivity>, AppError> {
        let url = format!("{}/{}", self.month_url(user_id, period), day);
        let records = self.get_listing(&url).await?;
        // A day listing is keyed by this day even when the body says otherwise.
        Ok(records
            .into_iter()
            .map(|raw| RawActivity {
                day: Some(day),
                record: raw.record,
            })
            .collect())
    }

    async fn create(&self, user_id: &str, payload: &Value) -> Result<Value, AppError> {
        let response = self
            .http
            .post(self.user_url(user_id))
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::WriteFailed(classify(&e).1))?;

        self.check_write(response).await
    }

    async fn update(
        &self,
        user_id: &str,
        activity_id: &str,
        payload: &Value,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{}/{}",
            self.user_url(user_id),
            urlencoding::encode(activity_id)
        );
        let response = self
            .http
            .put(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::WriteFailed(classify(&e).1))?;

        self.check_write(response).await
    }
}

fn classify(err: &reqwest::Error) -> (FetchFailure, String) {
    if err.is_timeout() {
        (FetchFailure::Timeout, format!("request timed out: {}", err))
    } else if err.is_connect() {
        (FetchFailure::Connect, format!("connect error: {}", err))
    } else {
        (FetchFailure::Other, err.to_string())
    }
}

fn fetch_error(err: reqwest::Error) -> AppError {
    let (kind, message) = classify(&err);
    AppError::FetchFailed(kind, message)
}
