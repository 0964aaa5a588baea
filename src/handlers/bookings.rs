use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Service, TimeSlot};
use crate::services::availability::day_availability;
use crate::services::reservation::{self, ReservationRequest};
use crate::services::scheduling::SchedulingError;
use crate::services::time::parse_date;
use crate::state::AppState;

// GET /api/services
pub async fn list_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Service>>, AppError> {
    let services = {
        let db = state.conn()?;
        queries::list_active_services(&db)?
    };
    Ok(Json(services))
}

// GET /api/availability?date=YYYY-MM-DD&service_id=...
#[derive(Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub service_id: String,
}

pub async fn get_availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<TimeSlot>>, SchedulingError> {
    let date = parse_date(&query.date)?;

    let slots = day_availability(&state.store(), date, &query.service_id, state.now())
        .inspect_err(|e| {
            if e.is_retryable() {
                tracing::error!(error = %e, "availability lookup failed");
            }
        })?;

    Ok(Json(slots))
}

// POST /api/bookings
#[derive(Serialize)]
pub struct BookingCreated {
    booking_id: String,
    status: &'static str,
    service_id: String,
    date: String,
    start_time: String,
    end_time: String,
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ReservationRequest>,
) -> Result<(StatusCode, Json<BookingCreated>), SchedulingError> {
    let reservation = reservation::reserve(&state.store(), &body, state.now())?;

    reservation::spawn_side_effects(&state, &reservation);

    let booking = reservation.booking;
    Ok((
        StatusCode::CREATED,
        Json(BookingCreated {
            booking_id: booking.id,
            status: booking.status.as_str(),
            service_id: booking.service_id,
            date: booking.appointment_date.format("%Y-%m-%d").to_string(),
            start_time: booking.start_time,
            end_time: booking.end_time,
        }),
    ))
}
