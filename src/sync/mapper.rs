//! Task → calendar event mapping.
//!
//! The event id is a pure function of the task id. Re-inserting the same task
//! always targets the same event, which is what makes sync idempotent.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;

use crate::error::TaskError;
use crate::models::{EligibleTask, EventDateTime, EventDescriptor};

pub const EVENT_ID_PREFIX: &str = "momentum";

/// `"momentum"` followed by the ASCII alphanumerics of `task_id`.
pub fn event_id(task_id: &str) -> String {
    let mut id = String::with_capacity(EVENT_ID_PREFIX.len() + task_id.len());
    id.push_str(EVENT_ID_PREFIX);
    id.extend(task_id.chars().filter(char::is_ascii_alphanumeric));
    id
}

pub fn to_event(task: &EligibleTask<'_>, time_zone: Tz) -> Result<EventDescriptor, TaskError> {
    let malformed = |reason: String| TaskError::MalformedTask {
        task_id: task.id().to_string(),
        reason,
    };

    let due_date = task
        .task
        .due_date
        .as_deref()
        .ok_or_else(|| malformed("missing due date".to_string()))?;
    let date = NaiveDate::parse_from_str(due_date, "%Y-%m-%d")
        .map_err(|e| malformed(format!("due date {due_date:?}: {e}")))?;

    let start = local_datetime(date, task.start_time, time_zone).map_err(&malformed)?;
    let end = local_datetime(date, task.end_time, time_zone).map_err(&malformed)?;

    Ok(EventDescriptor {
        id: event_id(task.id()),
        summary: task.task.text.clone(),
        description: task
            .task
            .category
            .as_deref()
            .filter(|c| !c.is_empty())
            .map(|c| format!("Category: {c}")),
        start: EventDateTime {
            date_time: start,
            time_zone: time_zone.name().to_string(),
        },
        end: EventDateTime {
            date_time: end,
            time_zone: time_zone.name().to_string(),
        },
    })
}

fn local_datetime(date: NaiveDate, time: &str, time_zone: Tz) -> Result<NaiveDateTime, String> {
    let time = NaiveTime::parse_from_str(time, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time, "%H:%M:%S"))
        .map_err(|e| format!("time {time:?}: {e}"))?;
    let local = date.and_time(time);

    if time_zone.from_local_datetime(&local).earliest().is_none() {
        return Err(format!("{local} does not exist in {}", time_zone.name()));
    }
    Ok(local)
}
