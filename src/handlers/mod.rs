pub mod admin;
pub mod bookings;
pub mod calendar;
pub mod health;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/services", get(bookings::list_services))
        .route("/api/availability", get(bookings::get_availability))
        .route("/api/bookings", post(bookings::create_booking))
        .route("/api/admin/services", post(admin::create_service))
        .route("/api/admin/bookings", get(admin::list_bookings))
        .route(
            "/api/admin/bookings/:id/status",
            post(admin::update_booking_status),
        )
        .route("/api/admin/bookings/:id", delete(admin::delete_booking))
        .route(
            "/api/admin/working-hours",
            get(admin::get_working_hours).put(admin::put_working_hours),
        )
        .route(
            "/api/admin/blocked-times",
            get(admin::list_blocked_times).post(admin::create_blocked_time),
        )
        .route(
            "/api/admin/blocked-times/:id",
            delete(admin::delete_blocked_time),
        )
        .route("/calendar/:booking_id", get(calendar::download_ics))
        .with_state(state)
}
