pub mod availability;
pub mod calendar;
pub mod notify;
pub mod reservation;
pub mod scheduling;
pub mod slots;
pub mod store;
pub mod time;
