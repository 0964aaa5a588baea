pub mod availability;
pub mod booking;
pub mod service;

pub use availability::{BlockedTime, DayOfWeek, TimeSlot, UnavailableReason, WorkingHours};
pub use booking::{Booking, BookingStatus};
pub use service::Service;
