// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use amoro_planner::config::Config;
use amoro_planner::error::{AppError, FetchFailure};
use amoro_planner::middleware::auth::create_jwt;
use amoro_planner::models::{Period, RawActivity};
use amoro_planner::routes::create_router;
use amoro_planner::services::{
    ActivityService, MemoryFlagStore, PeriodCache, RefreshFlags, TaskStore, TaskStoreClient,
};
use amoro_planner::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ─── In-process store ────────────────────────────────────────

/// In-memory [`TaskStore`] with canned month listings and call counters.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeStore {
    months: Mutex<HashMap<(String, Period), Vec<Value>>>,
    pub month_fetches: AtomicUsize,
    pub day_fetches: AtomicUsize,
    pub writes: AtomicUsize,
    /// Delay applied to each month fetch (milliseconds).
    pub delay_ms: AtomicU64,
    /// When set, month fetches fail with this cause.
    pub fail_with: Mutex<Option<FetchFailure>>,
    pub last_update: Mutex<Option<Value>>,
}

#[allow(dead_code)]
impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what a month listing returns, regardless of the records' dates.
    pub fn seed(&self, user_id: &str, period: Period, records: Vec<Value>) {
        self.months
            .lock()
            .unwrap()
            .insert((user_id.to_string(), period), records);
    }

    pub fn fetches(&self) -> usize {
        self.month_fetches.load(Ordering::SeqCst)
    }

    pub fn fail(&self, kind: Option<FetchFailure>) {
        *self.fail_with.lock().unwrap() = kind;
    }
}

impl TaskStore for FakeStore {
    async fn fetch_month(&self, user_id: &str, period: Period) -> Result<Vec<RawActivity>, AppError> {
        self.month_fetches.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        let failure = *self.fail_with.lock().unwrap();
        if let Some(kind) = failure {
            return Err(AppError::FetchFailed(kind, "forced failure".to_string()));
        }

        let records = self
            .months
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), period))
            .cloned()
            .unwrap_or_default();
        Ok(records.into_iter().map(RawActivity::new).collect())
    }

    async fn fetch_day(
        &self,
        user_id: &str,
        period: Period,
        day: u32,
    ) -> Result<Vec<RawActivity>, AppError> {
        self.day_fetches.fetch_add(1, Ordering::SeqCst);
        let records = self
            .months
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), period))
            .cloned()
            .unwrap_or_default();
        Ok(records
            .into_iter()
            .map(|record| RawActivity {
                day: Some(day),
                record,
            })
            .collect())
    }

    async fn create(&self, _user_id: &str, payload: &Value) -> Result<Value, AppError> {
        let n = self.writes.fetch_add(1, Ordering::SeqCst);
        let mut record = payload.clone();
        record["id"] = json!(format!("created-{}", n));
        Ok(record)
    }

    async fn update(
        &self,
        _user_id: &str,
        _activity_id: &str,
        payload: &Value,
    ) -> Result<Value, AppError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        *self.last_update.lock().unwrap() = Some(payload.clone());
        Ok(payload.clone())
    }
}

/// Service over a [`FakeStore`] with in-memory flags.
#[allow(dead_code)]
pub fn fake_service() -> (ActivityService<Arc<FakeStore>>, Arc<FakeStore>) {
    let store = Arc::new(FakeStore::new());
    let flags = RefreshFlags::new(Arc::new(MemoryFlagStore::new()));
    (
        ActivityService::new(store.clone(), PeriodCache::new(), flags),
        store,
    )
}

// ─── Fake HTTP task store ────────────────────────────────────

/// How the fake server shapes month listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(dead_code)]
pub enum Shape {
    #[default]
    List,
    ByDay,
}

/// State behind the fake HTTP task store.
#[derive(Default)]
#[allow(dead_code)]
pub struct FakeServer {
    /// Records per user id
    pub records: Mutex<HashMap<String, Vec<Value>>>,
    pub shape: Mutex<Shape>,
    /// When set, every request answers with this status.
    pub fail_status: Mutex<Option<u16>>,
    /// Delay before answering listings (milliseconds).
    pub delay_ms: AtomicU64,
    pub list_hits: AtomicUsize,
    pub last_body: Mutex<Option<Value>>,
    next_id: AtomicUsize,
}

#[allow(dead_code)]
impl FakeServer {
    pub fn hits(&self) -> usize {
        self.list_hits.load(Ordering::SeqCst)
    }

    pub fn insert(&self, user_id: &str, record: Value) {
        self.records
            .lock()
            .unwrap()
            .entry(user_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn set_shape(&self, shape: Shape) {
        *self.shape.lock().unwrap() = shape;
    }

    pub fn set_fail_status(&self, status: Option<u16>) {
        *self.fail_status.lock().unwrap() = status;
    }

    fn failure(&self) -> Option<Response> {
        let status = (*self.fail_status.lock().unwrap())?;
        let status = StatusCode::from_u16(status).ok()?;
        Some((status, "forced failure").into_response())
    }

    fn listing(&self, user_id: &str, prefix: &str, shape: Shape) -> Response {
        let records: Vec<Value> = self
            .records
            .lock()
            .unwrap()
            .get(user_id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .filter(|r| {
                r["date"]
                    .as_str()
                    .is_some_and(|date| date.starts_with(prefix))
            })
            .collect();

        if records.is_empty() {
            return StatusCode::NOT_FOUND.into_response();
        }

        match shape {
            Shape::List => Json(Value::Array(records)).into_response(),
            Shape::ByDay => {
                let mut days: BTreeMap<String, Vec<Value>> = BTreeMap::new();
                for mut record in records {
                    let date = record["date"].as_str().unwrap_or_default().to_string();
                    let day = date[8..10].trim_start_matches('0').to_string();
                    // Day-keyed bodies omit the date.
                    if let Some(obj) = record.as_object_mut() {
                        obj.remove("date");
                    }
                    days.entry(day).or_default().push(record);
                }
                Json(json!(days)).into_response()
            }
        }
    }
}

async fn fake_month(
    State(server): State<Arc<FakeServer>>,
    Path((user, year, month)): Path<(String, String, String)>,
) -> Response {
    server.list_hits.fetch_add(1, Ordering::SeqCst);
    let delay = server.delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if let Some(failure) = server.failure() {
        return failure;
    }
    let shape = *server.shape.lock().unwrap();
    server.listing(&user, &format!("{}-{}-", year, month), shape)
}

async fn fake_day(
    State(server): State<Arc<FakeServer>>,
    Path((user, year, month, day)): Path<(String, String, String, String)>,
) -> Response {
    server.list_hits.fetch_add(1, Ordering::SeqCst);
    if let Some(failure) = server.failure() {
        return failure;
    }
    let day: u32 = day.parse().unwrap_or(0);
    server.listing(
        &user,
        &format!("{}-{}-{:02}", year, month, day),
        Shape::List,
    )
}

async fn fake_create(
    State(server): State<Arc<FakeServer>>,
    Path(user): Path<String>,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(failure) = server.failure() {
        return failure;
    }
    *server.last_body.lock().unwrap() = Some(body.clone());
    let n = server.next_id.fetch_add(1, Ordering::SeqCst);
    body["id"] = json!(format!("task-{}", n));
    server.insert(&user, body.clone());
    (StatusCode::CREATED, Json(body)).into_response()
}

async fn fake_update(
    State(server): State<Arc<FakeServer>>,
    Path((user, id)): Path<(String, String)>,
    Json(mut body): Json<Value>,
) -> Response {
    if let Some(failure) = server.failure() {
        return failure;
    }
    *server.last_body.lock().unwrap() = Some(body.clone());
    body["id"] = json!(id);

    let mut records = server.records.lock().unwrap();
    let list = records.entry(user).or_default();
    match list.iter_mut().find(|r| r["id"] == json!(id)) {
        Some(existing) => {
            *existing = body.clone();
            Json(body).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a fake task store on an ephemeral local port.
/// Returns its base URL and shared state.
#[allow(dead_code)]
pub async fn spawn_fake_server() -> (String, Arc<FakeServer>) {
    let server = Arc::new(FakeServer::default());

    // Same parameter name at each depth, as the router requires.
    let app = Router::new()
        .route("/tasks/{user}", axum::routing::post(fake_create))
        .route("/tasks/{user}/{key}", put(fake_update))
        .route("/tasks/{user}/{key}/{month}", get(fake_month))
        .route("/tasks/{user}/{key}/{month}/{day}", get(fake_day))
        .with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind fake task store");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{}", addr), server)
}

// ─── App ─────────────────────────────────────────────────────

/// Create a test app talking to the task store at `base_url`, with
/// in-memory flags. Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(base_url: &str) -> (Router, Arc<AppState>) {
    let mut config = Config::test_default();
    config.task_store_url = base_url.to_string();

    let store = TaskStoreClient::new(&config.task_store_url, config.request_timeout)
        .expect("Failed to build client");
    let flags = RefreshFlags::new(Arc::new(MemoryFlagStore::new()));
    let activities = ActivityService::new(store, PeriodCache::new(), flags);

    let state = Arc::new(AppState { config, activities });
    (create_router(state.clone()), state)
}

/// Session token for `user_id`, signed with the test key.
#[allow(dead_code)]
pub fn create_test_jwt(user_id: &str, partner_id: Option<&str>, signing_key: &[u8]) -> String {
    create_jwt(user_id, partner_id, signing_key).expect("Failed to create JWT")
}
