use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use uuid::Uuid;

use crate::model::{CalendarEvent, MonthPlace, PeriodicType, Visibility};

const UID_DOMAIN: &str = "smarttask-planner";
/// Eight years covers the gap between two February 29ths.
const FIRST_OCCURRENCE_SEARCH_DAYS: usize = 366 * 8;

/// Build a VCALENDAR wrapping a single VEVENT for `event`.
///
/// Times are floating local times (no TZID, no `Z`). Recurring events get an
/// RRULE when their recurrence is complete enough to express, and DTSTART is
/// moved to the first occurrence on or after the anchor so it is never an
/// extra instance. Returns `None` when the event has no date to anchor
/// DTSTART on.
pub fn build_vevent(event: &CalendarEvent) -> Option<String> {
    let anchor = event.date().or(event.yearly_date())?;
    let rrule = event.is_recurring().then(|| recurrence_rule(event)).flatten();
    let anchor = match rrule {
        Some(_) => first_occurrence(event, anchor).unwrap_or(anchor),
        None => anchor,
    };
    let now = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");

    let uid = if event.id().is_empty() {
        generate_uid()
    } else {
        format!("{}@{UID_DOMAIN}", event.id())
    };

    // An end at or before the start is read as running past midnight.
    let end_date = if event.end_time() <= event.start_time() {
        anchor.succ_opt().unwrap_or(anchor)
    } else {
        anchor
    };

    let mut lines = vec![
        "BEGIN:VCALENDAR".to_string(),
        "VERSION:2.0".to_string(),
        "PRODID:-//SmartTask Planner//EN".to_string(),
        "BEGIN:VEVENT".to_string(),
        format!("UID:{uid}"),
        format!("DTSTAMP:{now}"),
        format!("DTSTART:{}", format_local(anchor, event.start_time())),
        format!("DTEND:{}", format_local(end_date, event.end_time())),
        format!("SUMMARY:{}", escape_text(event.title())),
    ];

    if let Some(desc) = event.description() {
        lines.push(format!("DESCRIPTION:{}", escape_text(desc)));
    }
    if let Some(loc) = event.location() {
        lines.push(format!("LOCATION:{}", escape_text(loc)));
    }
    if let Some(link) = event.meeting_link().filter(|l| !l.is_empty()) {
        lines.push(format!("URL:{}", strip_controls(link)));
    }

    lines.push(format!("CLASS:{}", class_for(event.visibility())));
    lines.push(format!("PRIORITY:{}", ical_priority(event)));

    if let Some(rule) = rrule {
        lines.push(format!("RRULE:{rule}"));
    }

    for email in event.shared_with_emails() {
        lines.push(format!("ATTENDEE;RSVP=TRUE:mailto:{}", strip_controls(email)));
    }

    lines.push("END:VEVENT".to_string());
    lines.push("END:VCALENDAR".to_string());

    let folded: Vec<String> = lines.iter().map(|l| fold_line(l)).collect();
    Some(folded.join("\r\n") + "\r\n")
}

fn first_occurrence(event: &CalendarEvent, from: NaiveDate) -> Option<NaiveDate> {
    from.iter_days()
        .take(FIRST_OCCURRENCE_SEARCH_DAYS)
        .find(|d| event.occurs_on(*d))
}

/// URI and CAL-ADDRESS values are not TEXT-escaped, so control characters are
/// dropped instead.
fn strip_controls(value: &str) -> String {
    value.chars().filter(|c| !c.is_control()).collect()
}

fn format_local(date: NaiveDate, time: NaiveTime) -> String {
    date.and_time(time).format("%Y%m%dT%H%M%S").to_string()
}

fn class_for(visibility: Visibility) -> &'static str {
    match visibility {
        Visibility::Public => "PUBLIC",
        Visibility::Private => "PRIVATE",
        Visibility::Shared => "CONFIDENTIAL",
    }
}

/// RFC 5545 PRIORITY: 1 is highest, 9 lowest.
fn ical_priority(event: &CalendarEvent) -> u8 {
    use crate::model::EventPriority;
    match event.priority() {
        EventPriority::Urgent => 1,
        EventPriority::Important => 3,
        EventPriority::Standard => 5,
        EventPriority::Optional => 9,
    }
}

/// The RRULE value for a recurring event, or `None` when the recurrence is
/// missing the data it needs.
pub fn recurrence_rule(event: &CalendarEvent) -> Option<String> {
    match event.periodic_type() {
        PeriodicType::Daily => Some("FREQ=DAILY".to_string()),
        PeriodicType::Weekly => {
            let days = event.days_in_week();
            if days.is_empty() {
                return None;
            }
            let by_day: Vec<&str> = days.iter().map(day_code).collect();
            Some(format!("FREQ=WEEKLY;BYDAY={}", by_day.join(",")))
        }
        PeriodicType::Monthly => match event.place_in_month()? {
            MonthPlace::StartOfMonth => Some("FREQ=MONTHLY;BYMONTHDAY=1".to_string()),
            MonthPlace::EndOfMonth => Some("FREQ=MONTHLY;BYMONTHDAY=-1".to_string()),
        },
        PeriodicType::Yearly => {
            let anchor = event.yearly_date()?;
            Some(format!(
                "FREQ=YEARLY;BYMONTH={};BYMONTHDAY={}",
                anchor.month(),
                anchor.day()
            ))
        }
        PeriodicType::None => None,
    }
}

fn day_code(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

/// Escape a TEXT value per RFC 5545 section 3.3.11.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Fold a content line at 75 octets, never splitting a UTF-8 sequence.
fn fold_line(line: &str) -> String {
    const LIMIT: usize = 75;
    if line.len() <= LIMIT {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        // Continuation lines start with a space, which counts toward the limit.
        if width + c.len_utf8() > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += c.len_utf8();
    }
    out
}

/// Generate a new unique event UID.
pub fn generate_uid() -> String {
    format!("{}@{UID_DOMAIN}", Uuid::new_v4())
}
