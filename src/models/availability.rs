use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::services::time::parse_time;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl DayOfWeek {
    pub const ALL: [DayOfWeek; 7] = [
        DayOfWeek::Monday,
        DayOfWeek::Tuesday,
        DayOfWeek::Wednesday,
        DayOfWeek::Thursday,
        DayOfWeek::Friday,
        DayOfWeek::Saturday,
        DayOfWeek::Sunday,
    ];

    pub fn of(date: NaiveDate) -> Self {
        match date.weekday() {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        DayOfWeek::ALL
            .into_iter()
            .find(|d| d.as_str() == s.to_lowercase())
    }
}

/// The recurring window for one weekday. A missing record or
/// `is_available = false` means the day has no capacity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkingHours {
    pub day_of_week: DayOfWeek,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub is_available: bool,
}

impl WorkingHours {
    pub fn validate(&self) -> anyhow::Result<()> {
        let start = parse_time(&self.start_time)?;
        let end = parse_time(&self.end_time)?;
        if self.is_available {
            anyhow::ensure!(
                end > start,
                "end time {} must be after start time {} on {}",
                self.end_time,
                self.start_time,
                self.day_of_week.as_str()
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockedTime {
    pub id: String,
    pub date: NaiveDate,
    pub is_all_day: bool,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub reason: Option<String>,
}

impl BlockedTime {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.is_all_day {
            return Ok(());
        }
        let (Some(start), Some(end)) = (&self.start_time, &self.end_time) else {
            anyhow::bail!("a partial-day block needs both start_time and end_time");
        };
        anyhow::ensure!(
            parse_time(end)? > parse_time(start)?,
            "blocked end time {end} must be after start time {start}"
        );
        Ok(())
    }

    /// The blocked sub-interval in minutes, or `None` for all-day blocks and
    /// rows whose times don't parse.
    pub fn window(&self) -> Option<(u32, u32)> {
        if self.is_all_day {
            return None;
        }
        let start = parse_time(self.start_time.as_deref()?).ok()?;
        let end = parse_time(self.end_time.as_deref()?).ok()?;
        Some((start, end))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnavailableReason {
    #[serde(rename = "Past time")]
    PastTime,
    #[serde(rename = "Time blocked")]
    Blocked,
    #[serde(rename = "Already booked")]
    Booked,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnavailableReason::PastTime => "Past time",
            UnavailableReason::Blocked => "Time blocked",
            UnavailableReason::Booked => "Already booked",
        };
        f.write_str(s)
    }
}

/// A candidate start time annotated for one request. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeSlot {
    pub time: String,
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<UnavailableReason>,
}

impl TimeSlot {
    pub fn open(time: String) -> Self {
        Self {
            time,
            available: true,
            reason: None,
        }
    }

    pub fn closed(time: String, reason: UnavailableReason) -> Self {
        Self {
            time,
            available: false,
            reason: Some(reason),
        }
    }
}
