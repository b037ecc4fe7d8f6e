// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity service: cross-view staleness, flag-driven refresh and mutation
//! rules.

use amoro_planner::error::AppError;
use amoro_planner::models::{NewActivity, Period, ReviewInput, Session};
use amoro_planner::services::{
    ActivityService, FlagStore, MemoryFlagStore, PeriodCache, RefreshFlag, RefreshFlags,
    TaskStoreClient, View,
};
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::Shape;

fn feb() -> Period {
    Period::new(2025, 2).unwrap()
}

fn new_activity(value: Value) -> NewActivity {
    serde_json::from_value(value).expect("valid NewActivity JSON")
}

fn gym() -> NewActivity {
    new_activity(json!({
        "title": "Gym",
        "date": "2025-02-06",
        "startTime": "09:00",
        "endTime": "10:00",
        "tag": "Exercise"
    }))
}

async fn http_service() -> (ActivityService, Arc<common::FakeServer>) {
    let (base_url, server) = common::spawn_fake_server().await;
    let store = TaskStoreClient::new(&base_url, Duration::from_secs(2)).unwrap();
    let flags = RefreshFlags::new(Arc::new(MemoryFlagStore::new()));
    (
        ActivityService::new(store, PeriodCache::new(), flags),
        server,
    )
}

// ─── Cross-view staleness ────────────────────────────────────

#[tokio::test]
async fn test_create_is_seen_after_home_observes_flag() {
    let (service, _server) = http_service().await;
    let session = Session::new("U1", None);

    // Home has already loaded February (empty).
    assert!(service.get("U1", feb()).await.unwrap().is_empty());

    let created = service.create_activity(&session, gym()).await.unwrap();
    assert_eq!(created.emoji, "🏃");
    assert!(!created.complete);

    assert!(service.flags().is_set("U1", RefreshFlag::HomeData).unwrap());
    assert!(service.flags().is_set("U1", RefreshFlag::Notifications).unwrap());
    assert!(!service.flags().is_set("U1", RefreshFlag::MoodsData).unwrap());

    // Until the flag is observed the cached copy is served.
    assert!(service.get("U1", feb()).await.unwrap().is_empty());

    let home = service.focus("U1", feb(), View::Home).await.unwrap();
    assert_eq!(home.len(), 1);
    assert_eq!(home[0].title, "Gym");
    assert_eq!(home[0].emoji, "🏃");
    assert_eq!(home[0].start_time, "09:00");
    assert_eq!(home[0].end_time, "10:00");
    assert!(!home[0].complete);

    // Observing cleared the flag.
    assert!(!service.flags().is_set("U1", RefreshFlag::HomeData).unwrap());
}

#[tokio::test]
async fn test_mark_complete_stale_until_flag_observed() {
    let (service, server) = http_service().await;
    let session = Session::new("U1", None);

    let created = service.create_activity(&session, gym()).await.unwrap();
    let home = service.focus("U1", feb(), View::Home).await.unwrap();
    assert!(!home[0].complete);

    let activity = service.find("U1", feb(), &created.id).await.unwrap();
    let done = service.mark_complete("U1", &activity).await.unwrap();
    assert!(done.complete);
    assert!(service.flags().is_set("U1", RefreshFlag::HomeData).unwrap());
    assert!(service.flags().is_set("U1", RefreshFlag::MoodsData).unwrap());

    // The store has the change; the cache does not yet.
    let stored = server.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(stored["Complete"], true);
    assert_eq!(stored["olddate"], "2025-02-06");
    assert!(!service.get("U1", feb()).await.unwrap()[0].complete);

    let home = service.focus("U1", feb(), View::Home).await.unwrap();
    assert!(home[0].complete);
}

#[tokio::test]
async fn test_review_shows_up_in_moods() {
    let (service, _server) = http_service().await;
    let session = Session::new("U1", None);

    let created = service.create_activity(&session, gym()).await.unwrap();
    let done = service.mark_complete("U1", &created).await.unwrap();

    let review = ReviewInput {
        description: "Energized".to_string(),
        score: 4,
        review: "Good session".to_string(),
    };
    let reviewed = service.add_review("U1", &done, review).await.unwrap();
    let mood = reviewed.mood.clone().unwrap();
    assert_eq!(mood.score, Some(4));

    let moods = service.focus("U1", feb(), View::Moods).await.unwrap();
    assert_eq!(moods.len(), 1);
    assert_eq!(moods[0].mood, Some(mood));
}

#[tokio::test]
async fn test_moving_activity_to_another_month() {
    let (service, _server) = http_service().await;
    let session = Session::new("U1", None);
    let march = feb().next();

    let created = service.create_activity(&session, gym()).await.unwrap();
    service.focus("U1", feb(), View::Home).await.unwrap();
    assert!(service.get("U1", march).await.unwrap().is_empty());

    let mut moved = created.clone();
    moved.date = chrono::NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
    service.update_activity("U1", &moved).await.unwrap();

    // Edits raise every flag, so both months are refetched on focus.
    assert!(service.focus("U1", feb(), View::Home).await.unwrap().is_empty());
    let march_home = service.refresh("U1", march).await.unwrap();
    assert_eq!(march_home.len(), 1);
    assert_eq!(march_home[0].id, created.id);
}

#[tokio::test]
async fn test_focus_without_flag_uses_cache() {
    let (service, server) = http_service().await;

    service.get("U1", feb()).await.unwrap();
    service.focus("U1", feb(), View::Home).await.unwrap();
    service.focus("U1", feb(), View::Moods).await.unwrap();

    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_edit_then_complete_keeps_edit() {
    let (service, server) = http_service().await;
    let session = Session::new("U1", None);

    let created = service.create_activity(&session, gym()).await.unwrap();
    service.focus("U1", feb(), View::Home).await.unwrap();

    let mut edited = created.clone();
    edited.title = "Gym with coach".to_string();
    service.update_activity("U1", &edited).await.unwrap();

    // Home has not refocused, so its cached copy still says "Gym".
    assert_eq!(service.get("U1", feb()).await.unwrap()[0].title, "Gym");

    let activity = service.find("U1", feb(), &created.id).await.unwrap();
    service.mark_complete("U1", &activity).await.unwrap();

    let sent = server.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(sent["title"], "Gym with coach");
    assert_eq!(sent["Complete"], true);
}

#[tokio::test]
async fn test_flags_belong_to_their_user() {
    let (service, _server) = http_service().await;

    service.get("U1", feb()).await.unwrap();
    service.get("U2", feb()).await.unwrap();

    service
        .create_activity(&Session::new("U1", None), gym())
        .await
        .unwrap();

    // U2 regaining focus must not consume U1's flag.
    assert!(service.focus("U2", feb(), View::Home).await.unwrap().is_empty());
    assert!(service.flags().is_set("U1", RefreshFlag::HomeData).unwrap());

    let home = service.focus("U1", feb(), View::Home).await.unwrap();
    assert_eq!(home.len(), 1);
}

#[tokio::test]
async fn test_shared_activity_raises_partner_flags() {
    let (service, _store) = common::fake_service();
    let mut input = gym();
    input.with_partner = true;

    service
        .create_activity(&Session::new("U1", Some("U2".to_string())), input)
        .await
        .unwrap();

    assert!(service.flags().is_set("U1", RefreshFlag::HomeData).unwrap());
    assert!(service.flags().is_set("U2", RefreshFlag::HomeData).unwrap());
}

#[tokio::test]
async fn test_flag_observed_on_other_month_resyncs_all_months() {
    let (service, _server) = http_service().await;
    let march = feb().next();

    assert!(service.get("U1", feb()).await.unwrap().is_empty());
    service
        .create_activity(&Session::new("U1", None), gym())
        .await
        .unwrap();

    // Home observes the flag while showing March.
    assert!(service.focus("U1", march, View::Home).await.unwrap().is_empty());

    // Swiping back to February refetches it.
    let home = service.focus("U1", feb(), View::Home).await.unwrap();
    assert_eq!(home.len(), 1);
}

#[tokio::test]
async fn test_olddate_of_day_keyed_record() {
    let (service, server) = http_service().await;
    server.set_shape(Shape::ByDay);
    server.insert(
        "U1",
        json!({"id": "a1", "title": "Gym", "date": "2025-02-06", "Tag": "Exercise"}),
    );

    let activity = service.find("U1", feb(), "a1").await.unwrap();
    assert_eq!(activity.date.to_string(), "2025-02-06");

    let mut moved = activity.clone();
    moved.date = chrono::NaiveDate::from_ymd_opt(2025, 2, 10).unwrap();
    service.update_activity("U1", &moved).await.unwrap();

    let sent = server.last_body.lock().unwrap().clone().unwrap();
    assert_eq!(sent["date"], "2025-02-10");
    assert_eq!(sent["olddate"], "2025-02-06");
}

// ─── Mutation rules ──────────────────────────────────────────

#[tokio::test]
async fn test_create_rejects_invalid_input() {
    let (service, store) = common::fake_service();
    let session = Session::new("U1", None);

    let cases = [
        json!({"title": "", "date": "2025-02-06"}),
        json!({"title": "Gym", "date": "06/02/2025"}),
        json!({"title": "Gym", "date": "2025-02-30"}),
        json!({"title": "Gym", "date": "2025-02-06", "startTime": "9am"}),
        json!({"title": "Gym", "date": "2025-02-06", "startTime": "10:00", "endTime": "09:00"}),
    ];
    for case in cases {
        let result = service.create_activity(&session, new_activity(case.clone())).await;
        assert!(
            matches!(result, Err(AppError::BadRequest(_))),
            "accepted {}",
            case
        );
    }
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_shared_activity_requires_partner() {
    let (service, store) = common::fake_service();
    let mut input = gym();
    input.with_partner = true;

    let result = service
        .create_activity(&Session::new("U1", None), input.clone())
        .await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);

    let created = service
        .create_activity(&Session::new("U1", Some("U2".to_string())), input)
        .await
        .unwrap();
    assert!(created.is_couple());
    assert_eq!(created.partner_id.as_deref(), Some("U2"));
}

#[tokio::test]
async fn test_defaults_fill_missing_times() {
    let (service, _store) = common::fake_service();
    let input = new_activity(json!({"title": "All day", "date": "2025-02-10"}));

    let created = service
        .create_activity(&Session::new("U1", None), input)
        .await
        .unwrap();
    assert_eq!(created.start_time, "00:00");
    assert_eq!(created.end_time, "23:59");
    assert_eq!(created.emoji, "📝");
}

#[tokio::test]
async fn test_review_requires_complete() {
    let (service, store) = common::fake_service();
    let created = service
        .create_activity(&Session::new("U1", None), gym())
        .await
        .unwrap();

    let review = ReviewInput {
        description: String::new(),
        score: 3,
        review: String::new(),
    };
    let result = service.add_review("U1", &created, review).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    let bad_score = ReviewInput {
        description: String::new(),
        score: 9,
        review: String::new(),
    };
    let done = service.mark_complete("U1", &created).await.unwrap();
    let result = service.add_review("U1", &done, bad_score).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));

    // Only create and mark_complete reached the store.
    assert_eq!(store.writes.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_update_keeps_unknown_fields() {
    let (service, store) = common::fake_service();
    store.seed(
        "U1",
        feb(),
        vec![json!({
            "id": "a1",
            "title": "Gym",
            "date": "2025-02-06",
            "Tag": "Exercise",
            "color": "#00ff00"
        })],
    );

    let activity = service.find("U1", feb(), "a1").await.unwrap();
    service.mark_complete("U1", &activity).await.unwrap();

    let sent = store.last_update.lock().unwrap().clone().unwrap();
    assert_eq!(sent["color"], "#00ff00");
    assert_eq!(sent["Complete"], true);
    assert_eq!(sent["Tag"], "Exercise");
}

#[tokio::test]
async fn test_find_reads_store_not_cache() {
    let (service, store) = common::fake_service();
    store.seed(
        "U1",
        feb(),
        vec![json!({"id": "a1", "title": "Gym", "date": "2025-02-06"})],
    );
    service.get("U1", feb()).await.unwrap();

    store.seed(
        "U1",
        feb(),
        vec![json!({"id": "a1", "title": "Gym", "date": "2025-02-06", "Complete": true})],
    );
    let found = service.find("U1", feb(), "a1").await.unwrap();
    assert!(found.complete);
    assert_eq!(store.fetches(), 2);

    // The cached copy is left as it was.
    assert!(!service.cache().peek("U1", feb()).unwrap()[0].complete);

    let err = service.find("U1", feb(), "missing").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_get_day_filters_and_rejects_bad_days() {
    let (service, store) = common::fake_service();
    store.seed(
        "U1",
        feb(),
        vec![
            json!({"id": "a1", "title": "Gym", "date": "2025-02-06"}),
            json!({"id": "a2", "title": "Tea", "date": "2025-02-07"}),
        ],
    );

    let day = service.get_day("U1", feb(), 6).await.unwrap();
    assert_eq!(day.len(), 1);
    assert_eq!(day[0].id, "a1");
    // Day reads bypass the cache.
    assert!(service.cache().is_empty());

    let err = service.get_day("U1", feb(), 30).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.day_fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_prefetch_warms_periods() {
    let (service, store) = common::fake_service();
    let periods = [feb().prev(), feb(), feb().next()];

    service.prefetch("U1", &periods).await.unwrap();
    assert_eq!(store.fetches(), 3);

    for period in periods {
        service.get("U1", period).await.unwrap();
    }
    assert_eq!(store.fetches(), 3);
}

#[tokio::test]
async fn test_invalidate_forces_refetch() {
    let (service, store) = common::fake_service();
    service.get("U1", feb()).await.unwrap();
    service.invalidate(feb());
    service.get("U1", feb()).await.unwrap();
    assert_eq!(store.fetches(), 2);
}

/// Flag storage that always fails.
struct BrokenFlags;

impl FlagStore for BrokenFlags {
    fn get(&self, _key: &str) -> Result<Option<String>, AppError> {
        Err(AppError::Storage("disk gone".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), AppError> {
        Err(AppError::Storage("disk gone".to_string()))
    }
}

#[tokio::test]
async fn test_flag_failure_does_not_fail_write() {
    let store = Arc::new(common::FakeStore::new());
    let service = ActivityService::new(
        store.clone(),
        PeriodCache::new(),
        RefreshFlags::new(Arc::new(BrokenFlags)),
    );

    let created = service
        .create_activity(&Session::new("U1", None), gym())
        .await
        .unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);

    // Reading the flag does surface the failure.
    let err = service.focus("U1", feb(), View::Home).await.unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
}
