pub mod agenda;
pub mod events;
pub mod sharing;
pub mod tasks;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use sqlx::SqlitePool;

use crate::agenda::Viewer;
use crate::error::{AppError, AppResult};

/// A tool definition for the MCP tools/list response.
pub struct ToolDef {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Get all registered MCP tool definitions.
pub fn all_tools() -> Vec<ToolDef> {
    let mut tools = Vec::new();
    tools.extend(events::tool_defs());
    tools.extend(sharing::tool_defs());
    tools.extend(tasks::tool_defs());
    tools.extend(agenda::tool_defs());
    tools
}

/// Dispatch a tools/call request to the appropriate handler.
pub async fn dispatch(
    pool: &SqlitePool,
    viewer: &Viewer,
    tool_name: &str,
    arguments: &Value,
) -> AppResult<Value> {
    match tool_name {
        "create_event" => events::create_event(pool, viewer, arguments).await,
        "get_event" => events::get_event(pool, viewer, arguments).await,
        "update_event" => events::update_event(pool, viewer, arguments).await,
        "delete_event" => events::delete_event(pool, viewer, arguments).await,
        "list_events" => events::list_events(pool, viewer, arguments).await,
        "reschedule_event" => events::reschedule_event(pool, viewer, arguments).await,
        "duplicate_event" => events::duplicate_event(pool, viewer, arguments).await,
        "clear_completed_events" => events::clear_completed_events(pool, viewer, arguments).await,
        "share_event" => sharing::share_event(pool, viewer, arguments).await,
        "unshare_event" => sharing::unshare_event(pool, viewer, arguments).await,
        "set_visibility" => sharing::set_visibility(pool, viewer, arguments).await,
        "create_task" => tasks::create_task(pool, viewer, arguments).await,
        "update_task_status" => tasks::update_task_status(pool, viewer, arguments).await,
        "reschedule_task" => tasks::reschedule_task(pool, viewer, arguments).await,
        "list_tasks" => tasks::list_tasks(pool, viewer, arguments).await,
        "add_dependency" => tasks::add_dependency(pool, viewer, arguments).await,
        "check_dependencies" => tasks::check_dependencies(pool, viewer, arguments).await,
        "remove_dependency" => tasks::remove_dependency(pool, viewer, arguments).await,
        "delete_task" => tasks::delete_task(pool, viewer, arguments).await,
        "task_progress" => tasks::task_progress(pool, viewer, arguments).await,
        "agenda_for_date" => agenda::agenda_for_date(pool, viewer, arguments).await,
        "agenda_range" => agenda::agenda_range(pool, viewer, arguments).await,
        "upcoming_items" => agenda::upcoming_items(pool, viewer, arguments).await,
        "export_event_ics" => agenda::export_event_ics(pool, viewer, arguments).await,
        _ => Err(AppError::BadRequest(format!("Unknown tool: {tool_name}"))),
    }
}

// Argument helpers. Dates are `YYYY-MM-DD`, times `HH:MM[:SS]`, timestamps
// `YYYY-MM-DDTHH:MM[:SS]`, all local and without an offset.

fn required_str<'a>(args: &'a Value, key: &str) -> AppResult<&'a str> {
    args[key]
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("Missing {key}")))
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args[key].as_str()
}

fn parse_date(key: &str, s: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid {key}: expected YYYY-MM-DD, got '{s}'")))
}

fn parse_time(key: &str, s: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .map_err(|_| AppError::BadRequest(format!("Invalid {key}: expected HH:MM, got '{s}'")))
}

fn parse_datetime(key: &str, s: &str) -> AppResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M"))
        .map_err(|_| {
            AppError::BadRequest(format!("Invalid {key}: expected YYYY-MM-DDTHH:MM, got '{s}'"))
        })
}

fn optional_date(args: &Value, key: &str) -> AppResult<Option<NaiveDate>> {
    optional_str(args, key).map(|s| parse_date(key, s)).transpose()
}

fn optional_time(args: &Value, key: &str) -> AppResult<Option<NaiveTime>> {
    optional_str(args, key).map(|s| parse_time(key, s)).transpose()
}

fn optional_datetime(args: &Value, key: &str) -> AppResult<Option<NaiveDateTime>> {
    optional_str(args, key).map(|s| parse_datetime(key, s)).transpose()
}

/// A share address. Commas would split the stored share list on reload, and
/// whitespace or control characters would break the iCalendar export.
fn parse_email(key: &str, s: &str) -> AppResult<String> {
    let email = s.trim();
    let well_formed = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'));
    let clean = !email.chars().any(|c| c == ',' || c.is_whitespace() || c.is_control());
    if well_formed && clean {
        Ok(email.to_string())
    } else {
        Err(AppError::BadRequest(format!("Invalid {key}: '{email}' is not an email address")))
    }
}

/// A meeting link. Empty clears it; anything with whitespace or control
/// characters is rejected.
fn parse_link(key: &str, s: &str) -> AppResult<Option<String>> {
    let link = s.trim();
    if link.is_empty() {
        return Ok(None);
    }
    if link.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(AppError::BadRequest(format!("Invalid {key}: links may not contain spaces or control characters")));
    }
    Ok(Some(link.to_string()))
}

/// Parse an enum argument by its stored name, e.g. `"URGENT"`.
fn optional_enum<T>(args: &Value, key: &str, parse: fn(&str) -> Option<T>) -> AppResult<Option<T>> {
    match optional_str(args, key) {
        None => Ok(None),
        Some(s) => parse(s)
            .map(Some)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid {key} value '{s}'"))),
    }
}
