use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{BlockedTime, BookingStatus, Service, WorkingHours};
use crate::services::time::parse_date;
use crate::state::AppState;

const DEFAULT_BOOKINGS_LIMIT: i64 = 50;
const MAX_BOOKINGS_LIMIT: i64 = 500;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn bad_request(e: impl std::fmt::Display) -> AppError {
    AppError::BadRequest(e.to_string())
}

// GET /api/admin/bookings
#[derive(Deserialize)]
pub struct BookingsQuery {
    pub date: Option<String>,
    pub status: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Serialize)]
pub struct BookingResponse {
    id: String,
    service_id: String,
    customer_id: String,
    date: String,
    start_time: String,
    end_time: String,
    status: &'static str,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BookingsQuery>,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let date = query.date.as_deref().map(parse_date).transpose().map_err(bad_request)?;
    let status = match query.status.as_deref() {
        Some(s) => Some(
            BookingStatus::parse(s).ok_or_else(|| bad_request(format!("unknown status: {s}")))?,
        ),
        None => None,
    };
    let limit = query
        .limit
        .unwrap_or(DEFAULT_BOOKINGS_LIMIT)
        .clamp(1, MAX_BOOKINGS_LIMIT);

    let bookings = {
        let db = state.conn()?;
        queries::list_bookings(&db, date, status, limit)?
    };

    let response = bookings
        .into_iter()
        .map(|b| BookingResponse {
            id: b.id,
            service_id: b.service_id,
            customer_id: b.customer_id,
            date: b.appointment_date.format("%Y-%m-%d").to_string(),
            start_time: b.start_time,
            end_time: b.end_time,
            status: b.status.as_str(),
            notes: b.notes,
            created_at: b.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            updated_at: b.updated_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        })
        .collect();

    Ok(Json(response))
}

// POST /api/admin/bookings/:id/status
#[derive(Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let next = BookingStatus::parse(&body.status)
        .ok_or_else(|| bad_request(format!("unknown status: {}", body.status)))?;
    let now = state.now();

    let db = state.conn()?;
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if !booking.status.can_transition_to(next) {
        return Err(AppError::Conflict(format!(
            "cannot move booking from {} to {}",
            booking.status.as_str(),
            next.as_str()
        )));
    }

    queries::update_booking_status(&db, &id, next, now)?;
    tracing::info!(booking_id = %id, from = booking.status.as_str(), to = next.as_str(), "booking status changed");

    Ok(Json(serde_json::json!({"ok": true, "status": next.as_str()})))
}

// DELETE /api/admin/bookings/:id
pub async fn delete_booking(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let db = state.conn()?;
    let booking = queries::get_booking_by_id(&db, &id)?
        .ok_or_else(|| AppError::NotFound(format!("booking {id}")))?;

    if booking.status == BookingStatus::Completed {
        return Err(AppError::Conflict(
            "completed bookings cannot be deleted".to_string(),
        ));
    }

    queries::delete_booking(&db, &id)?;
    tracing::info!(booking_id = %id, status = booking.status.as_str(), "booking deleted");

    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/admin/working-hours
pub async fn get_working_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<WorkingHours>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let hours = {
        let db = state.conn()?;
        queries::list_working_hours(&db)?
    };
    Ok(Json(hours))
}

// PUT /api/admin/working-hours
pub async fn put_working_hours(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<WorkingHours>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    body.validate().map_err(bad_request)?;

    {
        let db = state.conn()?;
        queries::upsert_working_hours(&db, &body)?;
    }
    tracing::info!(
        day = body.day_of_week.as_str(),
        start = %body.start_time,
        end = %body.end_time,
        available = body.is_available,
        "working hours updated"
    );

    Ok(Json(serde_json::json!({"ok": true})))
}

// GET /api/admin/blocked-times?date=YYYY-MM-DD
#[derive(Deserialize)]
pub struct BlockedTimesQuery {
    pub date: String,
}

pub async fn list_blocked_times(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<BlockedTimesQuery>,
) -> Result<Json<Vec<BlockedTime>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;
    let date = parse_date(&query.date).map_err(bad_request)?;

    let blocks = {
        let db = state.conn()?;
        queries::get_blocked_times_for_date(&db, date)?
    };
    Ok(Json(blocks))
}

// POST /api/admin/blocked-times
#[derive(Deserialize)]
pub struct BlockRequest {
    pub date: String,
    #[serde(default)]
    pub is_all_day: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
}

pub async fn create_blocked_time(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<BlockRequest>,
) -> Result<(StatusCode, Json<BlockedTime>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let (start_time, end_time) = if body.is_all_day {
        (None, None)
    } else {
        (body.start_time, body.end_time)
    };
    let block = BlockedTime {
        id: uuid::Uuid::new_v4().to_string(),
        date: parse_date(&body.date).map_err(bad_request)?,
        is_all_day: body.is_all_day,
        start_time,
        end_time,
        reason: body.reason,
    };
    block.validate().map_err(bad_request)?;

    {
        let db = state.conn()?;
        queries::create_blocked_time(&db, &block)?;
    }
    tracing::info!(block_id = %block.id, date = %block.date, all_day = block.is_all_day, "time blocked");

    Ok((StatusCode::CREATED, Json(block)))
}

// DELETE /api/admin/blocked-times/:id
pub async fn delete_blocked_time(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let removed = {
        let db = state.conn()?;
        queries::delete_blocked_time(&db, &id)?
    };

    if removed {
        Ok(Json(serde_json::json!({"ok": true})))
    } else {
        Err(AppError::NotFound(format!("blocked time {id}")))
    }
}

// POST /api/admin/services
#[derive(Deserialize)]
pub struct ServiceRequest {
    pub name: String,
    pub duration_minutes: u32,
    #[serde(default)]
    pub price_cents: i64,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

pub async fn create_service(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<ServiceRequest>,
) -> Result<(StatusCode, Json<Service>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let service = Service {
        id: uuid::Uuid::new_v4().to_string(),
        name: body.name.trim().to_string(),
        duration_minutes: body.duration_minutes,
        price_cents: body.price_cents,
        is_active: body.is_active,
    };
    service.validate().map_err(bad_request)?;

    {
        let db = state.conn()?;
        queries::create_service(&db, &service)?;
    }

    Ok((StatusCode::CREATED, Json(service)))
}
