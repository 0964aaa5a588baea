use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::models::UnavailableReason;
use crate::services::store::StoreError;
use crate::services::time::TimeError;

#[derive(Debug, thiserror::Error)]
pub enum SchedulingError {
    #[error("{0}")]
    InvalidFormat(String),

    #[error("service not found: {0}")]
    ServiceNotFound(String),

    #[error("service is not currently offered: {0}")]
    ServiceUnavailable(String),

    #[error("{time} on {date} is not a bookable time for this service")]
    OutsideWorkingHours { date: String, time: String },

    #[error("Selected time slot is no longer available")]
    SlotTaken { reason: UnavailableReason },

    #[error("booking store unavailable: {0}")]
    StoreUnavailable(String),
}

impl SchedulingError {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulingError::InvalidFormat(_) => "invalid_format",
            SchedulingError::ServiceNotFound(_) => "service_not_found",
            SchedulingError::ServiceUnavailable(_) => "service_unavailable",
            SchedulingError::OutsideWorkingHours { .. } => "outside_working_hours",
            SchedulingError::SlotTaken { .. } => "slot_taken",
            SchedulingError::StoreUnavailable(_) => "store_unavailable",
        }
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::StoreUnavailable(_))
    }

    fn status(&self) -> StatusCode {
        match self {
            SchedulingError::InvalidFormat(_) => StatusCode::BAD_REQUEST,
            SchedulingError::ServiceNotFound(_) => StatusCode::NOT_FOUND,
            SchedulingError::ServiceUnavailable(_) => StatusCode::CONFLICT,
            SchedulingError::OutsideWorkingHours { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SchedulingError::SlotTaken { .. } => StatusCode::CONFLICT,
            SchedulingError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl From<TimeError> for SchedulingError {
    fn from(e: TimeError) -> Self {
        SchedulingError::InvalidFormat(e.to_string())
    }
}

impl From<StoreError> for SchedulingError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => SchedulingError::SlotTaken {
                reason: UnavailableReason::Booked,
            },
            other => SchedulingError::StoreUnavailable(other.to_string()),
        }
    }
}

impl IntoResponse for SchedulingError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        });
        (self.status(), axum::Json(body)).into_response()
    }
}
