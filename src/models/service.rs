use serde::{Deserialize, Serialize};

pub const MIN_DURATION_MINUTES: u32 = 15;
pub const MAX_DURATION_MINUTES: u32 = 300;
pub const DURATION_STEP_MINUTES: u32 = 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub duration_minutes: u32,
    pub price_cents: i64,
    pub is_active: bool,
}

impl Service {
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.name.trim().is_empty(), "service name must not be empty");
        anyhow::ensure!(
            (MIN_DURATION_MINUTES..=MAX_DURATION_MINUTES).contains(&self.duration_minutes)
                && self.duration_minutes % DURATION_STEP_MINUTES == 0,
            "duration must be {MIN_DURATION_MINUTES}-{MAX_DURATION_MINUTES} minutes in steps of {DURATION_STEP_MINUTES}, got {}",
            self.duration_minutes
        );
        anyhow::ensure!(self.price_cents >= 0, "price must not be negative");
        Ok(())
    }
}
