use chrono::NaiveDate;

pub const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimeError {
    #[error("invalid time format (expected HH:MM): {0}")]
    InvalidFormat(String),

    #[error("invalid date format (expected YYYY-MM-DD): {0}")]
    InvalidDate(String),

    #[error("{start} + {duration} minutes runs past midnight")]
    PastMidnight { start: String, duration: u32 },
}

/// Parses a strict 24-hour `HH:MM` string into minutes since midnight.
pub fn parse_time(s: &str) -> Result<u32, TimeError> {
    let invalid = || TimeError::InvalidFormat(s.to_string());

    let (hh, mm) = s.split_once(':').ok_or_else(invalid)?;
    if hh.len() != 2 || mm.len() != 2 {
        return Err(invalid());
    }
    if !hh.bytes().chain(mm.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    let hour: u32 = hh.parse().map_err(|_| invalid())?;
    let minute: u32 = mm.parse().map_err(|_| invalid())?;
    if hour > 23 || minute > 59 {
        return Err(invalid());
    }
    Ok(hour * 60 + minute)
}

pub fn format_time(minutes: u32) -> String {
    let minutes = minutes % MINUTES_PER_DAY;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Half-open overlap: `[a_start, a_end)` against `[b_start, b_end)`.
pub fn intervals_overlap(a_start: u32, a_end: u32, b_start: u32, b_end: u32) -> bool {
    a_start < b_end && a_end > b_start
}

pub fn add_minutes(time: &str, duration: u32) -> Result<String, TimeError> {
    let end = parse_time(time)? + duration;
    if end >= MINUTES_PER_DAY {
        return Err(TimeError::PastMidnight {
            start: time.to_string(),
            duration,
        });
    }
    Ok(format_time(end))
}

pub fn parse_date(s: &str) -> Result<NaiveDate, TimeError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| TimeError::InvalidDate(s.to_string()))
}
