use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::events::load_visible_event;
use super::{ToolDef, optional_date, required_str};
use crate::agenda::{Agenda, AgendaEntry, Viewer};
use crate::db::{events as event_db, tasks as task_db};
use crate::error::{AppError, AppResult};
use crate::ical::builder;
use crate::model::today;

const DEFAULT_UPCOMING_DAYS: u64 = 7;
const MAX_UPCOMING_DAYS: u64 = 366;
const MAX_RANGE_DAYS: i64 = 366;

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "agenda_for_date",
            description: "Everything on your planner for one day: events you can see that occur that day and tasks due that day, ordered by start time",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "date": {"type": "string", "description": "Day to show (YYYY-MM-DD, default today)"}
                },
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "agenda_range",
            description: "Planner items for every day in a range, recurring events expanded per day. Days with nothing planned are listed separately.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "start": {"type": "string", "description": "First day (YYYY-MM-DD)"},
                    "end": {"type": "string", "description": "Last day, inclusive (YYYY-MM-DD)"}
                },
                "required": ["start", "end"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "upcoming_items",
            description: "Incomplete events and tasks over the next few days",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "from": {"type": "string", "description": "First day (YYYY-MM-DD, default today)"},
                    "days": {"type": "integer", "description": "How many days after the first to include (default 7)", "minimum": 0, "maximum": 366}
                },
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "export_event_ics",
            description: "Export an event as an iCalendar (.ics) document",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
    ]
}

pub async fn agenda_for_date(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let date = optional_date(args, "date")?.unwrap_or_else(today);

    let events = event_db::list_events_for_user(pool, &viewer.user_id).await?;
    let tasks = task_db::list_tasks_for_user(pool, &viewer.user_id).await?;

    let items: Vec<AgendaEntry> = Agenda::new(viewer, &events, &tasks)
        .items_for_date(date)
        .iter()
        .map(|o| o.entry())
        .collect();

    Ok(json!({
        "date": date,
        "count": items.len(),
        "items": items,
    }))
}

pub async fn agenda_range(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let (Some(start), Some(end)) = (optional_date(args, "start")?, optional_date(args, "end")?) else {
        return Err(AppError::BadRequest("Missing start or end".to_string()));
    };
    if end < start {
        return Err(AppError::BadRequest("end is before start".to_string()));
    }
    if (end - start).num_days() > MAX_RANGE_DAYS {
        return Err(AppError::BadRequest(format!(
            "range is limited to {MAX_RANGE_DAYS} days"
        )));
    }

    let events = event_db::list_events_for_user(pool, &viewer.user_id).await?;
    let tasks = task_db::list_tasks_for_user(pool, &viewer.user_id).await?;
    let agenda = Agenda::new(viewer, &events, &tasks);

    let items: Vec<AgendaEntry> = agenda
        .items_in_range(start, end)
        .iter()
        .map(|o| o.entry())
        .collect();
    let free_days: Vec<_> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !agenda.has_items_on(*d))
        .collect();

    Ok(json!({
        "start": start,
        "end": end,
        "count": items.len(),
        "items": items,
        "free_days": free_days,
    }))
}

pub async fn upcoming_items(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let from = optional_date(args, "from")?.unwrap_or_else(today);
    let days = args["days"]
        .as_u64()
        .unwrap_or(DEFAULT_UPCOMING_DAYS)
        .min(MAX_UPCOMING_DAYS);

    let events = event_db::list_events_for_user(pool, &viewer.user_id).await?;
    let tasks = task_db::list_tasks_for_user(pool, &viewer.user_id).await?;

    let items: Vec<AgendaEntry> = Agenda::new(viewer, &events, &tasks)
        .upcoming(from, days)
        .iter()
        .map(|o| o.entry())
        .collect();

    Ok(json!({
        "from": from,
        "days": days,
        "count": items.len(),
        "items": items,
    }))
}

pub async fn export_event_ics(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let event = load_visible_event(pool, viewer, event_id).await?;

    let ics = builder::build_vevent(&event).ok_or_else(|| {
        AppError::BadRequest(format!("event {event_id} has no date to export"))
    })?;

    Ok(json!({
        "event_id": event_id,
        "filename": format!("{event_id}.ics"),
        "ics": ics,
    }))
}
