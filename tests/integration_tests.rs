use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use chairbook::config::AppConfig;
use chairbook::db;
use chairbook::db::queries;
use chairbook::handlers;
use chairbook::models::{Service, WorkingHours};
use chairbook::services::notify::{BookingEvent, Notifier};
use chairbook::state::AppState;

// 2030-06-17 is a Monday, far enough ahead that the real clock never
// makes its slots "Past time".
const MONDAY: &str = "2030-06-17";
const TUESDAY: &str = "2030-06-18";

// ── Mock Notifier ──

struct RecordingNotifier {
    events: Arc<Mutex<Vec<BookingEvent>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify(&self, _event: &BookingEvent) -> anyhow::Result<()> {
        anyhow::bail!("webhook down")
    }
}

// ── Helpers ──

fn test_config() -> AppConfig {
    AppConfig {
        port: 3000,
        database_url: ":memory:".to_string(),
        admin_token: "test-token".to_string(),
        business_name: "Bob's Barbershop".to_string(),
        notify_webhook_url: None,
        utc_offset_minutes: 0,
    }
}

fn seed(conn: &rusqlite::Connection) {
    queries::create_service(
        conn,
        &Service {
            id: "cut".to_string(),
            name: "Haircut".to_string(),
            duration_minutes: 30,
            price_cents: 3500,
            is_active: true,
        },
    )
    .unwrap();
    queries::create_service(
        conn,
        &Service {
            id: "color".to_string(),
            name: "Color".to_string(),
            duration_minutes: 60,
            price_cents: 8000,
            is_active: true,
        },
    )
    .unwrap();
    queries::create_service(
        conn,
        &Service {
            id: "retired".to_string(),
            name: "Hot towel".to_string(),
            duration_minutes: 15,
            price_cents: 1000,
            is_active: false,
        },
    )
    .unwrap();
    queries::upsert_working_hours(
        conn,
        &WorkingHours {
            day_of_week: chairbook::models::DayOfWeek::Monday,
            start_time: "09:00".to_string(),
            end_time: "12:00".to_string(),
            is_available: true,
        },
    )
    .unwrap();
}

fn state_with_notifier(notifier: Box<dyn Notifier>) -> Arc<AppState> {
    let conn = db::init_db(":memory:").unwrap();
    seed(&conn);
    Arc::new(AppState {
        db: Arc::new(Mutex::new(conn)),
        config: test_config(),
        notifier,
    })
}

fn test_state() -> Arc<AppState> {
    state_with_notifier(Box::new(FailingNotifier))
}

fn test_state_with_events() -> (Arc<AppState>, Arc<Mutex<Vec<BookingEvent>>>) {
    let events = Arc::new(Mutex::new(vec![]));
    let state = state_with_notifier(Box::new(RecordingNotifier {
        events: Arc::clone(&events),
    }));
    (state, events)
}

fn test_app(state: Arc<AppState>) -> Router {
    handlers::router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin(method: &str, uri: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Authorization", "Bearer test-token");
    match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn reserve_request(service_id: &str, date: &str, start_time: &str) -> Request<Body> {
    let body = serde_json::json!({
        "service_id": service_id,
        "customer_id": "cust-42",
        "date": date,
        "start_time": start_time,
        "notes": "Short on the sides",
    });
    Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("Content-Type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(state: &Arc<AppState>, req: Request<Body>) -> (StatusCode, serde_json::Value) {
    let res = test_app(state.clone()).oneshot(req).await.unwrap();
    let status = res.status();
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn slot<'a>(slots: &'a serde_json::Value, time: &str) -> &'a serde_json::Value {
    slots
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["time"] == time)
        .unwrap_or_else(|| panic!("no slot at {time} in {slots}"))
}

// ── Health & Catalog ──

#[tokio::test]
async fn test_health() {
    let state = test_state();
    let (status, json) = send(&state, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_services_lists_only_active() {
    let state = test_state();
    let (status, json) = send(&state, get("/api/services")).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Color", "Haircut"]);
}

// ── Availability ──

#[tokio::test]
async fn test_availability_hourly_service() {
    let state = test_state();
    let (status, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=color")),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let times: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["09:00", "10:00", "11:00"]);
    assert!(json.as_array().unwrap().iter().all(|s| s["available"] == true));
}

#[tokio::test]
async fn test_availability_marks_booked_slot_only() {
    let state = test_state();
    let (status, _) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=cut")),
    )
    .await;

    assert_eq!(slot(&json, "10:00")["available"], false);
    assert_eq!(slot(&json, "10:00")["reason"], "Already booked");
    assert_eq!(slot(&json, "09:30")["available"], true);
    assert_eq!(slot(&json, "10:30")["available"], true);
    assert!(slot(&json, "10:30").get("reason").is_none());
}

#[tokio::test]
async fn test_availability_closed_day_is_empty() {
    let state = test_state();
    let (status, json) = send(
        &state,
        get(&format!("/api/availability?date={TUESDAY}&service_id=cut")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_all_day_block_empties_availability() {
    let state = test_state();
    let (status, _) = send(
        &state,
        admin(
            "POST",
            "/api/admin/blocked-times",
            Some(serde_json::json!({"date": MONDAY, "is_all_day": true, "reason": "Vacation"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=cut")),
    )
    .await;
    assert!(json
        .as_array()
        .unwrap()
        .iter()
        .all(|s| s["available"] == false));

    let (status, json) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "slot_taken");
}

#[tokio::test]
async fn test_partial_block_reported() {
    let state = test_state();
    send(
        &state,
        admin(
            "POST",
            "/api/admin/blocked-times",
            Some(serde_json::json!({"date": MONDAY, "start_time": "10:00", "end_time": "11:00"})),
        ),
    )
    .await;

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=cut")),
    )
    .await;
    assert_eq!(slot(&json, "09:30")["available"], true);
    assert_eq!(slot(&json, "10:00")["reason"], "Time blocked");
    assert_eq!(slot(&json, "10:30")["reason"], "Time blocked");
    assert_eq!(slot(&json, "11:00")["available"], true);
}

#[tokio::test]
async fn test_availability_rejects_bad_input() {
    let state = test_state();

    let (status, json) = send(&state, get("/api/availability?date=17-06-2030&service_id=cut")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_format");

    let (status, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=nope")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "service_not_found");

    let (status, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=retired")),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "service_unavailable");
}

// ── Reservation ──

#[tokio::test]
async fn test_reserve_then_duplicate_is_slot_taken() {
    let state = test_state();

    let (status, json) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["end_time"], "10:30");
    assert!(json["booking_id"].as_str().is_some());

    let (status, json) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "slot_taken");
    assert_eq!(json["error"], "Selected time slot is no longer available");

    let (_, bookings) = send(&state, admin("GET", "/api/admin/bookings", None)).await;
    assert_eq!(bookings.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_overlapping_longer_service_rejected() {
    let state = test_state();
    send(&state, reserve_request("cut", MONDAY, "10:30")).await;

    // 10:00-11:00 runs over the 10:30 haircut
    let (status, json) = send(&state, reserve_request("color", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "slot_taken");
}

#[tokio::test]
async fn test_concurrent_reservations_single_winner() {
    let state = test_state();

    let (a, b) = tokio::join!(
        send(&state, reserve_request("cut", MONDAY, "11:00")),
        send(&state, reserve_request("cut", MONDAY, "11:00")),
    );

    let mut statuses = vec![a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);
}

#[tokio::test]
async fn test_reserve_outside_working_hours() {
    let state = test_state();

    let (status, json) = send(&state, reserve_request("cut", MONDAY, "12:00")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json["code"], "outside_working_hours");

    let (status, _) = send(&state, reserve_request("cut", TUESDAY, "10:00")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_reserve_in_the_past() {
    let state = test_state();
    // 2020-06-15 was a Monday
    let (status, json) = send(&state, reserve_request("cut", "2020-06-15", "10:00")).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "slot_taken");
}

#[tokio::test]
async fn test_reserve_malformed_time() {
    let state = test_state();
    let (status, json) = send(&state, reserve_request("cut", MONDAY, "10.00")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "invalid_format");
}

#[tokio::test]
async fn test_reservation_notifies_and_records_customer() {
    let (state, events) = test_state_with_events();

    let (status, json) = send(&state, reserve_request("cut", MONDAY, "09:00")).await;
    assert_eq!(status, StatusCode::CREATED);

    // Side effects run detached; give them a moment.
    for _ in 0..50 {
        if !events.lock().unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, "booking.created");
    assert_eq!(events[0].booking_id, json["booking_id"].as_str().unwrap());
    assert_eq!(events[0].service_name, "Haircut");

    let count = {
        let db = state.db.lock().unwrap();
        queries::get_customer_booking_count(&db, "cust-42").unwrap()
    };
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_failed_notification_does_not_fail_reservation() {
    // test_state wires a notifier that always errors
    let state = test_state();
    let (status, _) = send(&state, reserve_request("cut", MONDAY, "09:30")).await;
    assert_eq!(status, StatusCode::CREATED);
}

// ── Admin API ──

#[tokio::test]
async fn test_admin_requires_auth() {
    let state = test_state();

    let (status, _) = send(&state, get("/api/admin/bookings")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let req = Request::builder()
        .uri("/api/admin/working-hours")
        .header("Authorization", "Bearer wrong-token")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&state, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_booking_lifecycle() {
    let state = test_state();
    let (_, created) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    let id = created["booking_id"].as_str().unwrap().to_string();

    // pending -> completed is not allowed
    let (status, _) = send(
        &state,
        admin(
            "POST",
            &format!("/api/admin/bookings/{id}/status"),
            Some(serde_json::json!({"status": "completed"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    for next in ["confirmed", "completed"] {
        let (status, json) = send(
            &state,
            admin(
                "POST",
                &format!("/api/admin/bookings/{id}/status"),
                Some(serde_json::json!({"status": next})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], next);
    }

    let (_, listed) = send(
        &state,
        admin("GET", &format!("/api/admin/bookings?date={MONDAY}&status=completed"), None),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["customer_id"], "cust-42");

    // completed bookings are kept
    let (status, _) = send(&state, admin("DELETE", &format!("/api/admin/bookings/{id}"), None)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_frees_slot_and_delete() {
    let state = test_state();
    let (_, created) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    let id = created["booking_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &state,
        admin(
            "POST",
            &format!("/api/admin/bookings/{id}/status"),
            Some(serde_json::json!({"status": "cancelled"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&state, reserve_request("cut", MONDAY, "10:00")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&state, admin("DELETE", &format!("/api/admin/bookings/{id}"), None)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&state, admin("DELETE", &format!("/api/admin/bookings/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_unknown_status_rejected() {
    let state = test_state();
    let (status, _) = send(
        &state,
        admin("GET", "/api/admin/bookings?status=archived", None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_working_hours_update_changes_slots() {
    let state = test_state();

    let (status, _) = send(
        &state,
        admin(
            "PUT",
            "/api/admin/working-hours",
            Some(serde_json::json!({
                "day_of_week": "tuesday",
                "start_time": "13:00",
                "end_time": "15:00",
                "is_available": true
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={TUESDAY}&service_id=color")),
    )
    .await;
    let times: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["13:00", "14:00"]);

    let (_, hours) = send(&state, admin("GET", "/api/admin/working-hours", None)).await;
    let days: Vec<&str> = hours
        .as_array()
        .unwrap()
        .iter()
        .map(|h| h["day_of_week"].as_str().unwrap())
        .collect();
    assert_eq!(days, vec!["monday", "tuesday"]);
}

#[tokio::test]
async fn test_invalid_working_hours_rejected() {
    let state = test_state();
    let (status, _) = send(
        &state,
        admin(
            "PUT",
            "/api/admin/working-hours",
            Some(serde_json::json!({
                "day_of_week": "monday",
                "start_time": "17:00",
                "end_time": "09:00",
                "is_available": true
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_blocked_time_crud() {
    let state = test_state();

    let (status, _) = send(
        &state,
        admin(
            "POST",
            "/api/admin/blocked-times",
            Some(serde_json::json!({"date": MONDAY, "start_time": "11:00"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, block) = send(
        &state,
        admin(
            "POST",
            "/api/admin/blocked-times",
            Some(serde_json::json!({"date": MONDAY, "start_time": "11:00", "end_time": "11:30", "reason": "Break"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = block["id"].as_str().unwrap().to_string();

    let (_, listed) = send(
        &state,
        admin("GET", &format!("/api/admin/blocked-times?date={MONDAY}"), None),
    )
    .await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["reason"], "Break");

    let (status, _) = send(
        &state,
        admin("DELETE", &format!("/api/admin/blocked-times/{id}"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id=cut")),
    )
    .await;
    assert_eq!(slot(&json, "11:00")["available"], true);
}

#[tokio::test]
async fn test_create_service() {
    let state = test_state();

    let (status, _) = send(
        &state,
        admin(
            "POST",
            "/api/admin/services",
            Some(serde_json::json!({"name": "Shave", "duration_minutes": 20})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, service) = send(
        &state,
        admin(
            "POST",
            "/api/admin/services",
            Some(serde_json::json!({"name": "Shave", "duration_minutes": 45, "price_cents": 2500})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = service["id"].as_str().unwrap();

    let (_, json) = send(
        &state,
        get(&format!("/api/availability?date={MONDAY}&service_id={id}")),
    )
    .await;
    let times: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["time"].as_str().unwrap())
        .collect();
    assert_eq!(times, vec!["09:00", "09:45", "10:30", "11:15"]);
}

// ── Calendar ──

#[tokio::test]
async fn test_calendar_download() {
    let state = test_state();
    let (_, created) = send(&state, reserve_request("color", MONDAY, "09:00")).await;
    let id = created["booking_id"].as_str().unwrap();

    let res = test_app(state.clone())
        .oneshot(get(&format!("/calendar/{id}.ics")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()["content-type"],
        "text/calendar; charset=utf-8"
    );
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let ics = String::from_utf8(body.to_vec()).unwrap();
    assert!(ics.contains("DTSTART:20300617T090000"));
    assert!(ics.contains("DTEND:20300617T100000"));
    assert!(ics.contains("SUMMARY:Color at Bob's Barbershop"));

    let (status, _) = send(&state, get("/calendar/missing.ics")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
