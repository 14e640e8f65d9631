use chrono::{DateTime, Local, LocalResult, NaiveDate, TimeZone, Utc};

pub const DUE_DATE_FORMAT: &str = "%Y-%m-%d";

pub fn parse_due_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DUE_DATE_FORMAT).ok()
}

#[must_use]
pub fn is_valid_due_date(raw: &str) -> bool {
    parse_due_date(raw).is_some()
}

/// A due date has passed once its local end of day is behind `now`.
/// Unparseable dates are never overdue.
#[must_use]
pub fn is_overdue(due_date: &str, now: DateTime<Utc>) -> bool {
    let Some(date) = parse_due_date(due_date) else {
        return false;
    };
    let Some(end_of_day) = date.and_hms_opt(23, 59, 59) else {
        return false;
    };

    match Local.from_local_datetime(&end_of_day) {
        LocalResult::Single(deadline) => deadline < now.with_timezone(&Local),
        LocalResult::Ambiguous(_, latest) => latest < now.with_timezone(&Local),
        LocalResult::None => false,
    }
}

pub fn format_due_label(due_date: &str) -> String {
    match parse_due_date(due_date) {
        Some(date) => date.format("%b %-d, %Y").to_string(),
        None => due_date.to_string(),
    }
}

/// Sort key for due-date ordering; unparseable dates sort last.
pub fn due_sort_key(due_date: &str) -> NaiveDate {
    parse_due_date(due_date).unwrap_or(NaiveDate::MAX)
}
