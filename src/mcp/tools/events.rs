use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::{
    ToolDef, optional_date, optional_enum, optional_str, optional_time, parse_link, required_str,
};
use crate::agenda::Viewer;
use crate::db::events as event_db;
use crate::error::{AppError, AppResult};
use crate::model::{
    CalendarEvent, EventPlannerAdapter, EventPriority, EventType, MonthPlace, PeriodicType,
    Visibility, WeekdaySet,
};

const DEFAULT_LIST_LIMIT: usize = 100;

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_event",
            description: "Create a calendar event owned by the authenticated user",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Event title"},
                    "date": {"type": "string", "description": "Event date (YYYY-MM-DD)"},
                    "start_time": {"type": "string", "description": "Start time (HH:MM, default 09:00)"},
                    "end_time": {"type": "string", "description": "End time (HH:MM, default 10:00)"},
                    "description": {"type": "string", "description": "Event description"},
                    "location": {"type": "string", "description": "Event location"},
                    "priority": {"type": "string", "enum": ["OPTIONAL", "STANDARD", "IMPORTANT", "URGENT"]},
                    "visibility": {"type": "string", "enum": ["PUBLIC", "PRIVATE", "SHARED"]},
                    "meeting_link": {"type": "string", "description": "Video meeting URL"},
                    "meeting_platform": {"type": "string", "description": "Meeting platform name"},
                    "periodic_type": {"type": "string", "enum": ["NONE", "PER_DAY", "PER_WEEK", "PER_MONTH", "PER_YEAR"], "description": "Repetition period; anything but NONE makes the event recurring"},
                    "days_in_week": {"type": "array", "items": {"type": "integer", "minimum": 1, "maximum": 7}, "description": "Weekdays for PER_WEEK, 1 = Monday"},
                    "place_in_month": {"type": "string", "enum": ["START_OF_MONTH", "END_OF_MONTH"]},
                    "yearly_date": {"type": "string", "description": "Anniversary date for PER_YEAR (YYYY-MM-DD)"}
                },
                "required": ["title"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "get_event",
            description: "Get an event by ID",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "update_event",
            description: "Update fields of an event you created. Omitted fields are left unchanged.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"},
                    "title": {"type": "string"},
                    "date": {"type": "string", "description": "YYYY-MM-DD"},
                    "start_time": {"type": "string", "description": "HH:MM"},
                    "end_time": {"type": "string", "description": "HH:MM"},
                    "description": {"type": "string", "description": "Empty string clears it"},
                    "location": {"type": "string", "description": "Empty string clears it"},
                    "priority": {"type": "string", "enum": ["OPTIONAL", "STANDARD", "IMPORTANT", "URGENT"]},
                    "completed": {"type": "boolean"},
                    "meeting_link": {"type": "string", "description": "Empty string removes the link"},
                    "meeting_platform": {"type": "string"},
                    "periodic_type": {"type": "string", "enum": ["NONE", "PER_DAY", "PER_WEEK", "PER_MONTH", "PER_YEAR"]},
                    "days_in_week": {"type": "array", "items": {"type": "integer", "minimum": 1, "maximum": 7}},
                    "place_in_month": {"type": "string", "enum": ["START_OF_MONTH", "END_OF_MONTH"]},
                    "yearly_date": {"type": "string", "description": "YYYY-MM-DD"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "delete_event",
            description: "Delete an event you created",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "list_events",
            description: "List events visible to you, optionally only those occurring on a date or matching a title",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "scope": {"type": "string", "enum": ["visible", "created", "shared", "recurring"], "description": "visible (default): everything you can see; created: your own events; shared: events shared with you; recurring: recurring events only"},
                    "date": {"type": "string", "description": "Only events occurring on this date (YYYY-MM-DD); recurring events are expanded"},
                    "start": {"type": "string", "description": "Only events whose own date is on or after this (YYYY-MM-DD); requires end"},
                    "end": {"type": "string", "description": "Only events whose own date is on or before this (YYYY-MM-DD); requires start"},
                    "query": {"type": "string", "description": "Case-insensitive title search"},
                    "limit": {"type": "integer", "description": "Max events to return (default 100)", "minimum": 1, "maximum": 500}
                },
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "reschedule_event",
            description: "Move one of your events to another day or time",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"},
                    "date": {"type": "string", "description": "New date (YYYY-MM-DD)"},
                    "start_time": {"type": "string", "description": "New start time (HH:MM)"},
                    "end_time": {"type": "string", "description": "New end time (HH:MM)"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "duplicate_event",
            description: "Copy the schedule of one of your events into a new event. Sharing and meeting details are not copied.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event to copy"},
                    "date": {"type": "string", "description": "Date for the copy (YYYY-MM-DD, default the original's date)"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "clear_completed_events",
            description: "Delete every completed event you created",
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
    ]
}

/// Which events `list_events` starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventScope {
    Visible,
    Created,
    Shared,
    Recurring,
}

impl EventScope {
    fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "visible" => Some(EventScope::Visible),
            "created" => Some(EventScope::Created),
            "shared" => Some(EventScope::Shared),
            "recurring" => Some(EventScope::Recurring),
            _ => None,
        }
    }

    fn admits(self, viewer: &Viewer, event: &CalendarEvent) -> bool {
        match self {
            EventScope::Visible => true,
            EventScope::Created => viewer.owns(event),
            EventScope::Shared => {
                viewer.can_view(event) && event.shared_with_user_ids().contains(&viewer.user_id)
            }
            EventScope::Recurring => event.is_recurring(),
        }
    }
}

/// JSON shape returned by every event tool. The meeting password is left out.
pub(super) fn event_json(event: &CalendarEvent) -> Value {
    json!({
        "id": event.id(),
        "title": event.title(),
        "description": event.description(),
        "date": event.date(),
        "start_time": event.start_time().format("%H:%M").to_string(),
        "end_time": event.end_time().format("%H:%M").to_string(),
        "priority": event.priority(),
        "priority_label": event.priority().display_name(),
        "color": event.color(),
        "completed": event.is_completed(),
        "event_type": event.event_type(),
        "periodic_type": event.periodic_type(),
        "days_in_week": event.days_in_week(),
        "place_in_month": event.place_in_month(),
        "yearly_date": event.yearly_date(),
        "visibility": event.visibility(),
        "visibility_label": event.visibility().display_name(),
        "shared_with_user_ids": event.shared_with_user_ids(),
        "shared_with_emails": event.shared_with_emails(),
        "creator_user_id": event.creator_user_id(),
        "has_meeting_link": event.has_meeting_link(),
        "meeting_link": event.meeting_link(),
        "meeting_platform": event.meeting_platform(),
        "location": event.location(),
        "last_modified": event.last_modified(),
    })
}

/// Load an event the viewer may see. Events they may not see are reported as
/// missing.
pub(super) async fn load_visible_event(
    pool: &SqlitePool,
    viewer: &Viewer,
    event_id: &str,
) -> AppResult<CalendarEvent> {
    event_db::get_event(pool, event_id)
        .await?
        .filter(|e| viewer.can_view(e))
        .ok_or_else(|| AppError::NotFound(format!("event {event_id}")))
}

/// Load an event the viewer created.
pub(super) async fn load_owned_event(
    pool: &SqlitePool,
    viewer: &Viewer,
    event_id: &str,
) -> AppResult<CalendarEvent> {
    let event = load_visible_event(pool, viewer, event_id).await?;
    if !viewer.owns(&event) {
        return Err(AppError::Forbidden(
            "only the event's creator can change it".to_string(),
        ));
    }
    Ok(event)
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Weekdays as a JSON array of ISO numbers, or as the stored `"1,3,5"` form.
fn weekdays_arg(value: &Value) -> AppResult<Option<WeekdaySet>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(WeekdaySet::parse(s))),
        Value::Array(items) => {
            let joined = items
                .iter()
                .map(|v| {
                    v.as_u64().map(|n| n.to_string()).ok_or_else(|| {
                        AppError::BadRequest("days_in_week must be day numbers 1-7".to_string())
                    })
                })
                .collect::<AppResult<Vec<_>>>()?
                .join(",");
            Ok(Some(WeekdaySet::parse(&joined)))
        }
        _ => Err(AppError::BadRequest(
            "days_in_week must be an array of day numbers".to_string(),
        )),
    }
}

/// Copy every field present in `args` onto `event`.
fn apply_event_fields(event: &mut CalendarEvent, args: &Value) -> AppResult<()> {
    if let Some(title) = optional_str(args, "title") {
        let title = non_empty(title)
            .ok_or_else(|| AppError::BadRequest("title cannot be empty".to_string()))?;
        event.set_title(title);
    }
    if let Some(description) = optional_str(args, "description") {
        event.set_description(non_empty(description));
    }
    if let Some(location) = optional_str(args, "location") {
        event.set_location(non_empty(location));
    }
    if let Some(date) = optional_date(args, "date")? {
        event.set_date(Some(date));
    }
    if let Some(start) = optional_time(args, "start_time")? {
        event.set_start_time(start);
    }
    if let Some(end) = optional_time(args, "end_time")? {
        event.set_end_time(end);
    }
    if let Some(priority) = optional_enum(args, "priority", EventPriority::from_str_value)? {
        event.set_priority(priority);
    }
    if let Some(completed) = args["completed"].as_bool() {
        event.set_completed(completed);
    }
    if let Some(link) = optional_str(args, "meeting_link") {
        event.set_meeting_link(parse_link("meeting_link", link)?);
    }
    if let Some(platform) = optional_str(args, "meeting_platform") {
        event.set_meeting_platform(non_empty(platform));
    }
    if let Some(periodic) = optional_enum(args, "periodic_type", PeriodicType::from_str_value)? {
        event.set_periodic_type(periodic);
        event.set_event_type(if periodic == PeriodicType::None {
            EventType::OneTime
        } else {
            EventType::Recurring
        });
    }
    if let Some(days) = weekdays_arg(&args["days_in_week"])? {
        event.set_days_in_week(days);
    }
    if let Some(place) = optional_enum(args, "place_in_month", MonthPlace::from_str_value)? {
        event.set_place_in_month(Some(place));
    }
    if let Some(yearly) = optional_date(args, "yearly_date")? {
        event.set_yearly_date(Some(yearly));
    }
    Ok(())
}

pub async fn create_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let title = required_str(args, "title")?;
    let priority = optional_enum(args, "priority", EventPriority::from_str_value)?.unwrap_or_default();

    let mut event = CalendarEvent::new(title, priority);
    apply_event_fields(&mut event, args)?;
    if let Some(visibility) = optional_enum(args, "visibility", Visibility::from_str_value)? {
        event.set_visibility(visibility);
    }
    event.set_creator_user_id(Some(viewer.user_id.clone()));

    let event = event_db::create_event(pool, &event).await?;
    Ok(event_json(&event))
}

pub async fn get_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let event = load_visible_event(pool, viewer, event_id).await?;
    Ok(event_json(&event))
}

pub async fn update_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let mut event = load_owned_event(pool, viewer, event_id).await?;

    apply_event_fields(&mut event, args)?;
    event_db::update_event(pool, &event).await?;

    Ok(event_json(&event))
}

pub async fn delete_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    load_owned_event(pool, viewer, event_id).await?;

    event_db::delete_event(pool, event_id).await?;

    Ok(json!({"deleted": true, "event_id": event_id}))
}

pub async fn list_events(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let scope = optional_enum(args, "scope", EventScope::from_str_value)?.unwrap_or(EventScope::Visible);
    let date = optional_date(args, "date")?;
    let range = match (optional_date(args, "start")?, optional_date(args, "end")?) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(AppError::BadRequest(
                "start and end must be given together".to_string(),
            ));
        }
    };
    let limit = args["limit"]
        .as_u64()
        .map_or(DEFAULT_LIST_LIMIT, |n| n.clamp(1, 500) as usize);
    let user_id = viewer.user_id.as_str();

    let mut events = match (optional_str(args, "query").filter(|q| !q.trim().is_empty()), range) {
        (Some(query), _) => event_db::search_events_by_title(pool, user_id, query).await?,
        (None, Some((start, end))) => event_db::list_events_in_range(pool, user_id, start, end).await?,
        (None, None) => match scope {
            EventScope::Visible => event_db::list_events_for_user(pool, user_id).await?,
            EventScope::Created => event_db::list_events_by_creator(pool, user_id).await?,
            EventScope::Shared => event_db::list_events_shared_with(pool, user_id).await?,
            EventScope::Recurring => event_db::list_recurring_events(pool, user_id).await?,
        },
    };
    // The query and range fetches ignore scope, so apply it here as well.
    events.retain(|e| scope.admits(viewer, e));
    if let Some((start, end)) = range {
        events.retain(|e| e.date().is_some_and(|d| d >= start && d <= end));
    }

    let events: Vec<Value> = events
        .iter()
        .filter(|e| date.is_none_or(|d| e.occurs_on(d)))
        .take(limit)
        .map(event_json)
        .collect();

    Ok(json!({
        "date": date,
        "count": events.len(),
        "events": events,
    }))
}

pub async fn reschedule_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let date = optional_date(args, "date")?;
    let start = optional_time(args, "start_time")?;
    let end = optional_time(args, "end_time")?;
    if date.is_none() && start.is_none() && end.is_none() {
        return Err(AppError::BadRequest(
            "Give at least one of date, start_time or end_time".to_string(),
        ));
    }

    let mut event = load_owned_event(pool, viewer, event_id).await?;
    let mut item = EventPlannerAdapter::new(&mut event);
    if let Some(date) = date {
        item.set_date(date);
    }
    if let Some(start) = start {
        item.set_start_time(start);
    }
    if let Some(end) = end {
        item.set_end_time(end);
    }

    event_db::update_event(pool, &event).await?;
    Ok(event_json(&event))
}

pub async fn duplicate_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let original = load_owned_event(pool, viewer, event_id).await?;

    let mut copy = original.duplicate();
    if let Some(date) = optional_date(args, "date")? {
        copy.set_date(Some(date));
    }
    copy.set_creator_user_id(Some(viewer.user_id.clone()));

    let copy = event_db::create_event(pool, &copy).await?;
    Ok(event_json(&copy))
}

pub async fn clear_completed_events(pool: &SqlitePool, viewer: &Viewer, _args: &Value) -> AppResult<Value> {
    let deleted = event_db::delete_completed_events(pool, &viewer.user_id).await?;
    tracing::info!(user_id = %viewer.user_id, deleted, "cleared completed events");
    Ok(json!({"deleted": deleted}))
}
