// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! API routes for authenticated users.

use crate::error::{AppError, Result};
use crate::models::{Activity, NewActivity, Period, ReviewInput, Session};
use crate::services::views::{self, Reminder, View};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// API routes (require authentication via JWT).
/// The auth middleware is applied in routes/mod.rs for these routes.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/me", get(get_me))
        .route("/api/activities", post(create_activity))
        .route("/api/activities/{year}/{month}", get(get_month))
        .route("/api/activities/{year}/{month}/days/{day}", get(get_day))
        .route("/api/activities/{year}/{month}/{id}", put(update_activity))
        .route(
            "/api/activities/{year}/{month}/{id}/complete",
            post(mark_complete),
        )
        .route("/api/activities/{year}/{month}/{id}/review", post(add_review))
        .route("/api/moods/{year}/{month}", get(get_moods))
        .route("/api/notifications/{year}/{month}", get(get_notifications))
}

// ─── Session ─────────────────────────────────────────────────

/// Get the current session.
async fn get_me(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

// ─── Reads ───────────────────────────────────────────────────

#[derive(Deserialize)]
struct MonthQuery {
    /// Which view is regaining focus (selects the refresh flag)
    #[serde(default)]
    view: View,
    /// Pull-to-refresh: refetch regardless of flags
    #[serde(default)]
    refresh: bool,
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "app/src/lib/generated/")
)]
pub struct MonthResponse {
    /// `YYYY-MM`
    pub period: String,
    pub activities: Vec<Activity>,
    /// Activities grouped by `YYYY-MM-DD`
    pub days: BTreeMap<String, Vec<Activity>>,
}

/// Month listing for a view regaining focus.
async fn get_month(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month)): Path<(String, String)>,
    Query(params): Query<MonthQuery>,
) -> Result<Json<MonthResponse>> {
    let period = Period::from_segments(&year, &month)?;
    tracing::debug!(
        user_id = %session.user_id,
        period = %period,
        view = ?params.view,
        refresh = params.refresh,
        "Fetching month"
    );

    let activities = if params.refresh {
        // Consume the flag too, the view is about to be current.
        state
            .activities
            .refresh_if_flagged(&session.user_id, params.view.flag())?;
        state.activities.refresh(&session.user_id, period).await?
    } else {
        state
            .activities
            .focus(&session.user_id, period, params.view)
            .await?
    };

    let days = views::by_date(&activities)
        .into_iter()
        .map(|(date, list)| (date.to_string(), list))
        .collect();

    Ok(Json(MonthResponse {
        period: period.key(),
        activities: activities.to_vec(),
        days,
    }))
}

/// To-do list for one day.
async fn get_day(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month, day)): Path<(String, String, String)>,
) -> Result<Json<Vec<Activity>>> {
    let period = Period::from_segments(&year, &month)?;
    let day: u32 = day
        .parse()
        .map_err(|_| AppError::BadRequest(format!("Invalid day '{}'", day)))?;

    let activities = state
        .activities
        .get_day(&session.user_id, period, day)
        .await?;
    Ok(Json(views::todo_order(activities)))
}

/// Completed, rated activities of a month.
async fn get_moods(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month)): Path<(String, String)>,
) -> Result<Json<Vec<Activity>>> {
    let period = Period::from_segments(&year, &month)?;
    let activities = state
        .activities
        .focus(&session.user_id, period, View::Moods)
        .await?;
    Ok(Json(views::rated(&activities)))
}

/// Activities of a month that carry a reminder label.
async fn get_notifications(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month)): Path<(String, String)>,
) -> Result<Json<Vec<Reminder>>> {
    let period = Period::from_segments(&year, &month)?;
    let activities = state
        .activities
        .focus(&session.user_id, period, View::Notifications)
        .await?;
    Ok(Json(views::reminders(&activities)))
}

// ─── Mutations ───────────────────────────────────────────────

/// Add an activity.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Json(input): Json<NewActivity>,
) -> Result<(StatusCode, Json<Activity>)> {
    let activity = state.activities.create_activity(&session, input).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Save an edited activity (full record, including `originalData`).
async fn update_activity(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month, id)): Path<(String, String, String)>,
    Json(activity): Json<Activity>,
) -> Result<Json<Activity>> {
    // The path names the month the activity was listed under before editing.
    Period::from_segments(&year, &month)?;
    if activity.id != id {
        return Err(AppError::BadRequest(
            "Activity id does not match path".to_string(),
        ));
    }
    let updated = state
        .activities
        .update_activity(&session.user_id, &activity)
        .await?;
    Ok(Json(updated))
}

/// Mark an activity complete.
async fn mark_complete(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month, id)): Path<(String, String, String)>,
) -> Result<Json<Activity>> {
    let period = Period::from_segments(&year, &month)?;
    let activity = state.activities.find(&session.user_id, period, &id).await?;
    let updated = state
        .activities
        .mark_complete(&session.user_id, &activity)
        .await?;
    Ok(Json(updated))
}

/// Rate a completed activity.
async fn add_review(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<Session>,
    Path((year, month, id)): Path<(String, String, String)>,
    Json(review): Json<ReviewInput>,
) -> Result<Json<Activity>> {
    let period = Period::from_segments(&year, &month)?;
    let activity = state.activities.find(&session.user_id, period, &id).await?;
    let updated = state
        .activities
        .add_review(&session.user_id, &activity, review)
        .await?;
    Ok(Json(updated))
}
