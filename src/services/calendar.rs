use crate::models::{Booking, BookingStatus, Service};

/// Renders a single-event iCalendar file for `booking`, in floating local time.
pub fn generate_ics(booking: &Booking, service: &Service, business_name: &str) -> String {
    let day = booking.appointment_date.format("%Y%m%d");
    let dtstart = format!("{day}T{}00", booking.start_time.replace(':', ""));
    let dtend = format!("{day}T{}00", booking.end_time.replace(':', ""));
    let dtstamp = booking.created_at.format("%Y%m%dT%H%M%S").to_string();
    let uid = format!("{}@chairbook", booking.id);

    let summary = format!("{} at {}", service.name, business_name);
    let description = booking.notes.as_deref().unwrap_or("No additional notes");
    let status = match booking.status {
        BookingStatus::Cancelled => "CANCELLED",
        BookingStatus::Pending => "TENTATIVE",
        _ => "CONFIRMED",
    };

    format!(
        "BEGIN:VCALENDAR\r\n\
         VERSION:2.0\r\n\
         PRODID:-//Chairbook//Booking//EN\r\n\
         BEGIN:VEVENT\r\n\
         UID:{uid}\r\n\
         DTSTAMP:{dtstamp}\r\n\
         DTSTART:{dtstart}\r\n\
         DTEND:{dtend}\r\n\
         SUMMARY:{summary}\r\n\
         DESCRIPTION:{description}\r\n\
         STATUS:{status}\r\n\
         END:VEVENT\r\n\
         END:VCALENDAR\r\n"
    )
}
