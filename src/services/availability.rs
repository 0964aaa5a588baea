use chrono::{NaiveDate, NaiveDateTime, Timelike};

use crate::models::{BlockedTime, Booking, DayOfWeek, Service, TimeSlot, UnavailableReason};
use crate::services::scheduling::SchedulingError;
use crate::services::slots::generate_slots;
use crate::services::store::ScheduleStore;
use crate::services::time::{intervals_overlap, parse_time, TimeError};

/// Marks each candidate slot on `date` as available or not. The first matching
/// rule wins: past time, then blocked time (all-day or partial), then an
/// overlapping live booking. Output order follows `slots`.
pub fn annotate(
    slots: &[String],
    date: NaiveDate,
    duration_minutes: u32,
    blocked_times: &[BlockedTime],
    bookings: &[Booking],
    now: NaiveDateTime,
) -> Result<Vec<TimeSlot>, TimeError> {
    let day_blocked = blocked_times
        .iter()
        .any(|b| b.date == date && b.is_all_day);

    let blocked_windows: Vec<(u32, u32)> = blocked_times
        .iter()
        .filter(|b| b.date == date)
        .filter_map(BlockedTime::window)
        .collect();

    let booked_windows: Vec<(u32, u32)> = bookings
        .iter()
        .filter(|b| b.appointment_date == date && b.status.blocks_slot())
        .filter_map(|b| match (parse_time(&b.start_time), parse_time(&b.end_time)) {
            (Ok(start), Ok(end)) => Some((start, end)),
            _ => {
                tracing::warn!(booking_id = %b.id, "skipping booking with malformed times");
                None
            }
        })
        .collect();

    let now_seconds = now.time().num_seconds_from_midnight();

    slots
        .iter()
        .map(|slot| {
            let start = parse_time(slot)?;
            let end = start + duration_minutes;

            let is_past = match date.cmp(&now.date()) {
                std::cmp::Ordering::Less => true,
                std::cmp::Ordering::Equal => start * 60 <= now_seconds,
                std::cmp::Ordering::Greater => false,
            };

            let reason = if is_past {
                Some(UnavailableReason::PastTime)
            } else if day_blocked
                || blocked_windows
                    .iter()
                    .any(|&(b_start, b_end)| intervals_overlap(start, end, b_start, b_end))
            {
                Some(UnavailableReason::Blocked)
            } else if booked_windows
                .iter()
                .any(|&(b_start, b_end)| intervals_overlap(start, end, b_start, b_end))
            {
                Some(UnavailableReason::Booked)
            } else {
                None
            };

            Ok(match reason {
                Some(reason) => TimeSlot::closed(slot.clone(), reason),
                None => TimeSlot::open(slot.clone()),
            })
        })
        .collect()
}

/// Loads `service_id`, refusing services that are no longer offered.
pub fn load_service(store: &dyn ScheduleStore, service_id: &str) -> Result<Service, SchedulingError> {
    let service = store
        .find_service(service_id)?
        .ok_or_else(|| SchedulingError::ServiceNotFound(service_id.to_string()))?;
    if !service.is_active {
        return Err(SchedulingError::ServiceUnavailable(service_id.to_string()));
    }
    Ok(service)
}

/// Full read path for a customer's availability query. A day with an
/// all-day block returns no slots at all.
pub fn day_availability(
    store: &dyn ScheduleStore,
    date: NaiveDate,
    service_id: &str,
    now: NaiveDateTime,
) -> Result<Vec<TimeSlot>, SchedulingError> {
    let service = load_service(store, service_id)?;

    let blocked_times = store.find_blocked_times(date)?;
    if blocked_times.iter().any(|b| b.is_all_day) {
        tracing::debug!(%date, "day is blocked, no slots offered");
        return Ok(Vec::new());
    }

    let working_hours = store.find_working_hours(DayOfWeek::of(date))?;
    let slots = generate_slots(working_hours.as_ref(), service.duration_minutes);
    if slots.is_empty() {
        return Ok(Vec::new());
    }

    let bookings = store.find_bookings(date)?;
    Ok(annotate(
        &slots,
        date,
        service.duration_minutes,
        &blocked_times,
        &bookings,
        now,
    )?)
}
