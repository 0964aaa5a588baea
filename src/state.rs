use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{FixedOffset, NaiveDateTime, Utc};
use rusqlite::Connection;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::services::notify::Notifier;
use crate::services::store::SqliteStore;

pub struct AppState {
    pub db: Arc<Mutex<Connection>>,
    pub config: AppConfig,
    pub notifier: Box<dyn Notifier>,
}

impl AppState {
    pub fn conn(&self) -> Result<MutexGuard<'_, Connection>, AppError> {
        self.db.lock().map_err(|_| {
            tracing::error!("database lock poisoned");
            AppError::Unavailable
        })
    }

    pub fn store(&self) -> SqliteStore {
        SqliteStore::new(Arc::clone(&self.db))
    }

    /// Current wall-clock time at the business.
    pub fn now(&self) -> NaiveDateTime {
        match FixedOffset::east_opt(self.config.utc_offset_minutes * 60) {
            Some(offset) => Utc::now().with_timezone(&offset).naive_local(),
            None => {
                tracing::warn!(
                    offset = self.config.utc_offset_minutes,
                    "UTC offset out of range, using UTC"
                );
                Utc::now().naive_utc()
            }
        }
    }
}
