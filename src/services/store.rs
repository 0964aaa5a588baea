use std::sync::{Arc, Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::db::queries::{self, InsertOutcome};
use crate::models::{BlockedTime, Booking, DayOfWeek, Service, WorkingHours};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The insert collided with a live booking for the same slot.
    #[error("booking conflicts with an existing reservation")]
    Conflict,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] anyhow::Error),
}

/// Read/insert boundary over the persisted schedule. Every call reads current
/// state; nothing is cached between requests.
pub trait ScheduleStore: Send + Sync {
    fn find_working_hours(&self, day: DayOfWeek) -> Result<Option<WorkingHours>, StoreError>;

    fn find_blocked_times(&self, date: NaiveDate) -> Result<Vec<BlockedTime>, StoreError>;

    /// Bookings on `date`, excluding cancelled ones.
    fn find_bookings(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError>;

    fn find_service(&self, id: &str) -> Result<Option<Service>, StoreError>;

    /// Atomically inserts `booking`, returning [`StoreError::Conflict`] when a
    /// live booking already holds an overlapping slot that day.
    fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct SqliteStore {
    db: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.db
            .lock()
            .map_err(|_| StoreError::Unavailable("database lock poisoned".to_string()))
    }
}

impl ScheduleStore for SqliteStore {
    fn find_working_hours(&self, day: DayOfWeek) -> Result<Option<WorkingHours>, StoreError> {
        Ok(queries::get_working_hours(&*self.conn()?, day)?)
    }

    fn find_blocked_times(&self, date: NaiveDate) -> Result<Vec<BlockedTime>, StoreError> {
        Ok(queries::get_blocked_times_for_date(&*self.conn()?, date)?)
    }

    fn find_bookings(&self, date: NaiveDate) -> Result<Vec<Booking>, StoreError> {
        Ok(queries::get_bookings_for_date(&*self.conn()?, date)?)
    }

    fn find_service(&self, id: &str) -> Result<Option<Service>, StoreError> {
        Ok(queries::get_service(&*self.conn()?, id)?)
    }

    fn insert_booking(&self, booking: &Booking) -> Result<(), StoreError> {
        match queries::insert_booking(&*self.conn()?, booking)? {
            InsertOutcome::Inserted => Ok(()),
            InsertOutcome::Conflict => Err(StoreError::Conflict),
        }
    }
}
