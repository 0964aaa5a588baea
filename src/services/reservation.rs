use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::db::queries;
use crate::models::{Booking, BookingStatus, DayOfWeek, Service};
use crate::services::availability::{annotate, load_service};
use crate::services::notify::BookingEvent;
use crate::services::scheduling::SchedulingError;
use crate::services::slots::generate_slots;
use crate::services::store::{ScheduleStore, StoreError};
use crate::services::time::{add_minutes, parse_date, parse_time};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub service_id: String,
    pub customer_id: String,
    pub date: String,
    pub start_time: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Reservation {
    pub booking: Booking,
    pub service: Service,
}

/// Re-validates the requested slot against freshly read schedule data and
/// inserts a pending booking. The store's atomic insert is what actually
/// prevents double-booking; a lost race there surfaces as `SlotTaken`.
pub fn reserve(
    store: &dyn ScheduleStore,
    request: &ReservationRequest,
    now: NaiveDateTime,
) -> Result<Reservation, SchedulingError> {
    let date = parse_date(&request.date)?;
    parse_time(&request.start_time)?;
    if request.customer_id.trim().is_empty() {
        return Err(SchedulingError::InvalidFormat(
            "customer_id must not be empty".to_string(),
        ));
    }

    let service = load_service(store, &request.service_id)?;

    let end_time = add_minutes(&request.start_time, service.duration_minutes).map_err(|_| {
        SchedulingError::OutsideWorkingHours {
            date: request.date.clone(),
            time: request.start_time.clone(),
        }
    })?;

    check_slot(store, date, &request.start_time, &service, now)?;

    let booking = Booking {
        id: uuid::Uuid::new_v4().to_string(),
        service_id: service.id.clone(),
        customer_id: request.customer_id.clone(),
        appointment_date: date,
        start_time: request.start_time.clone(),
        end_time,
        status: BookingStatus::Pending,
        notes: request.notes.clone().filter(|n| !n.trim().is_empty()),
        created_at: now,
        updated_at: now,
    };

    match store.insert_booking(&booking) {
        Ok(()) => {}
        Err(StoreError::Conflict) => {
            tracing::info!(
                service_id = %booking.service_id,
                date = %booking.appointment_date,
                start_time = %booking.start_time,
                "lost reservation race at insert"
            );
            return Err(StoreError::Conflict.into());
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to insert booking");
            return Err(e.into());
        }
    }

    tracing::info!(
        booking_id = %booking.id,
        service_id = %booking.service_id,
        date = %booking.appointment_date,
        start_time = %booking.start_time,
        "booking reserved"
    );

    Ok(Reservation { booking, service })
}

/// Runs the availability rules for the single requested slot.
fn check_slot(
    store: &dyn ScheduleStore,
    date: NaiveDate,
    start_time: &str,
    service: &Service,
    now: NaiveDateTime,
) -> Result<(), SchedulingError> {
    let working_hours = store.find_working_hours(DayOfWeek::of(date))?;
    let offered = generate_slots(working_hours.as_ref(), service.duration_minutes);
    if !offered.iter().any(|slot| slot == start_time) {
        return Err(SchedulingError::OutsideWorkingHours {
            date: date.to_string(),
            time: start_time.to_string(),
        });
    }

    let blocked_times = store.find_blocked_times(date)?;
    let bookings = store.find_bookings(date)?;
    let requested = [start_time.to_string()];
    let annotated = annotate(
        &requested,
        date,
        service.duration_minutes,
        &blocked_times,
        &bookings,
        now,
    )?;

    match annotated.first().and_then(|slot| slot.reason) {
        None => Ok(()),
        Some(reason) => {
            tracing::info!(%date, start_time, %reason, "requested slot failed re-validation");
            Err(SchedulingError::SlotTaken { reason })
        }
    }
}

/// Best-effort follow-up to a successful reservation. Runs detached; failures
/// are logged and never reach the caller.
pub fn spawn_side_effects(state: &Arc<AppState>, reservation: &Reservation) {
    let state = Arc::clone(state);
    let event = BookingEvent::created(&reservation.booking, &reservation.service);
    let customer_id = reservation.booking.customer_id.clone();
    let booked_at = reservation.booking.created_at;

    tokio::spawn(async move {
        let upserted = match state.db.lock() {
            Ok(db) => queries::upsert_customer_visit(&db, &customer_id, booked_at),
            Err(_) => Err(anyhow::anyhow!("database lock poisoned")),
        };
        if let Err(e) = upserted {
            tracing::warn!(error = %e, customer_id = %customer_id, "failed to record customer visit");
        }

        if let Err(e) = state.notifier.notify(&event).await {
            tracing::warn!(error = %e, booking_id = %event.booking_id, "failed to send booking notification");
        }
    });
}
