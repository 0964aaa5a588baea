use crate::models::WorkingHours;
use crate::services::time::{format_time, parse_time};

/// Candidate start times for one day, stepping by the service's own duration
/// so consecutive slots never overlap. A slot is emitted only when it ends at
/// or before the close of the working window.
pub fn generate_slots(working_hours: Option<&WorkingHours>, duration_minutes: u32) -> Vec<String> {
    let Some(hours) = working_hours.filter(|h| h.is_available) else {
        return Vec::new();
    };
    if duration_minutes == 0 {
        return Vec::new();
    }

    let (Ok(day_start), Ok(day_end)) = (parse_time(&hours.start_time), parse_time(&hours.end_time))
    else {
        tracing::warn!(
            day = hours.day_of_week.as_str(),
            start = %hours.start_time,
            end = %hours.end_time,
            "working hours have malformed times, offering no slots"
        );
        return Vec::new();
    };

    (day_start..)
        .step_by(duration_minutes as usize)
        .take_while(|start| start + duration_minutes <= day_end)
        .map(format_time)
        .collect()
}
