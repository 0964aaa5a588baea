pub mod webhook;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::{Booking, Service};

#[derive(Debug, Clone, Serialize)]
pub struct BookingEvent {
    pub kind: &'static str,
    pub booking_id: String,
    pub service_id: String,
    pub service_name: String,
    pub customer_id: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub status: &'static str,
    pub notes: Option<String>,
}

impl BookingEvent {
    pub fn created(booking: &Booking, service: &Service) -> Self {
        Self {
            kind: "booking.created",
            booking_id: booking.id.clone(),
            service_id: service.id.clone(),
            service_name: service.name.clone(),
            customer_id: booking.customer_id.clone(),
            date: booking.appointment_date.format("%Y-%m-%d").to_string(),
            start_time: booking.start_time.clone(),
            end_time: booking.end_time.clone(),
            status: booking.status.as_str(),
            notes: booking.notes.clone(),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()>;
}

/// Used when no webhook is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, event: &BookingEvent) -> anyhow::Result<()> {
        tracing::info!(
            kind = event.kind,
            booking_id = %event.booking_id,
            date = %event.date,
            start_time = %event.start_time,
            "booking notification"
        );
        Ok(())
    }
}
