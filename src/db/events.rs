use chrono::NaiveDate;
use sqlx::SqlitePool;

use super::models::EventRow;
use crate::error::{AppError, AppResult};
use crate::model::CalendarEvent;

/// Rows that might be visible to `user_id`: public events, the user's own, and
/// shared events whose list mentions the id. The LIKE match is only a
/// prefilter; results must be rechecked with `can_user_view`.
const VISIBLE_TO_USER: &str = "(visibility = 'PUBLIC' OR creator_user_id = ? \
     OR (visibility = 'SHARED' AND shared_with_user_ids LIKE ? ESCAPE '\\'))";

/// `%needle%` with LIKE wildcards in `needle` escaped for `ESCAPE '\'`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn visible_to(rows: Vec<EventRow>, user_id: &str) -> Vec<CalendarEvent> {
    rows.into_iter()
        .map(CalendarEvent::from)
        .filter(|e| e.can_user_view(user_id))
        .collect()
}

/// Insert a new event. Returns the stored event.
pub async fn create_event(pool: &SqlitePool, event: &CalendarEvent) -> AppResult<CalendarEvent> {
    let row = EventRow::from(event);

    sqlx::query(
        "INSERT INTO calendar_events (id, title, description, event_date, start_time, end_time, \
         priority, completed, event_type, periodic_type, days_in_week, place_in_month, yearly_date, \
         created_at, last_modified, visibility, shared_with_user_ids, shared_with_emails, \
         creator_user_id, has_meeting_link, meeting_link, meeting_platform, meeting_password, location) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.event_date)
    .bind(row.start_time)
    .bind(row.end_time)
    .bind(&row.priority)
    .bind(row.completed)
    .bind(&row.event_type)
    .bind(&row.periodic_type)
    .bind(&row.days_in_week)
    .bind(&row.place_in_month)
    .bind(row.yearly_date)
    .bind(row.created_at)
    .bind(row.last_modified)
    .bind(&row.visibility)
    .bind(&row.shared_with_user_ids)
    .bind(&row.shared_with_emails)
    .bind(&row.creator_user_id)
    .bind(row.has_meeting_link)
    .bind(&row.meeting_link)
    .bind(&row.meeting_platform)
    .bind(&row.meeting_password)
    .bind(&row.location)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
            AppError::Conflict(format!("Event '{}' already exists", row.id))
        }
        _ => AppError::Database(e),
    })?;

    tracing::debug!(event_id = %row.id, "event created");

    get_event(pool, &row.id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Event created but not found")))
}

/// Overwrite every stored field of an existing event.
pub async fn update_event(pool: &SqlitePool, event: &CalendarEvent) -> AppResult<()> {
    let row = EventRow::from(event);

    let result = sqlx::query(
        "UPDATE calendar_events SET title = ?, description = ?, event_date = ?, start_time = ?, \
         end_time = ?, priority = ?, completed = ?, event_type = ?, periodic_type = ?, \
         days_in_week = ?, place_in_month = ?, yearly_date = ?, last_modified = ?, visibility = ?, \
         shared_with_user_ids = ?, shared_with_emails = ?, creator_user_id = ?, \
         has_meeting_link = ?, meeting_link = ?, meeting_platform = ?, meeting_password = ?, \
         location = ? WHERE id = ?",
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(row.event_date)
    .bind(row.start_time)
    .bind(row.end_time)
    .bind(&row.priority)
    .bind(row.completed)
    .bind(&row.event_type)
    .bind(&row.periodic_type)
    .bind(&row.days_in_week)
    .bind(&row.place_in_month)
    .bind(row.yearly_date)
    .bind(row.last_modified)
    .bind(&row.visibility)
    .bind(&row.shared_with_user_ids)
    .bind(&row.shared_with_emails)
    .bind(&row.creator_user_id)
    .bind(row.has_meeting_link)
    .bind(&row.meeting_link)
    .bind(&row.meeting_platform)
    .bind(&row.meeting_password)
    .bind(&row.location)
    .bind(&row.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Event '{}' not found", row.id)));
    }
    Ok(())
}

/// Look up an event by ID.
pub async fn get_event(pool: &SqlitePool, id: &str) -> AppResult<Option<CalendarEvent>> {
    let row = sqlx::query_as::<_, EventRow>("SELECT * FROM calendar_events WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(CalendarEvent::from))
}

/// Delete an event by ID.
pub async fn delete_event(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM calendar_events WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Event '{id}' not found")));
    }
    Ok(())
}

/// Every event `user_id` may see, ordered by anchor date then start time.
pub async fn list_events_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT * FROM calendar_events WHERE {VISIBLE_TO_USER} ORDER BY event_date, start_time"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(user_id)
        .bind(like_pattern(user_id))
        .fetch_all(pool)
        .await?;
    Ok(visible_to(rows, user_id))
}

/// Events created by `creator_id`, whatever their visibility.
pub async fn list_events_by_creator(pool: &SqlitePool, creator_id: &str) -> AppResult<Vec<CalendarEvent>> {
    let rows = sqlx::query_as::<_, EventRow>(
        "SELECT * FROM calendar_events WHERE creator_user_id = ? ORDER BY event_date, start_time",
    )
    .bind(creator_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(CalendarEvent::from).collect())
}

/// Events whose share list names `user_id` and that `user_id` may still see.
/// A stale share list on a private event does not count.
pub async fn list_events_shared_with(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<CalendarEvent>> {
    let rows = sqlx::query_as::<_, EventRow>(
        "SELECT * FROM calendar_events WHERE shared_with_user_ids LIKE ? ESCAPE '\\' \
         ORDER BY event_date, start_time",
    )
    .bind(like_pattern(user_id))
    .fetch_all(pool)
    .await?;
    Ok(visible_to(rows, user_id)
        .into_iter()
        .filter(|e| e.shared_with_user_ids().iter().any(|id| id == user_id))
        .collect())
}

/// Visible events whose anchor date lies in `[start, end]`. Recurring
/// instances outside that window are not expanded here; use the agenda for
/// that.
pub async fn list_events_in_range(
    pool: &SqlitePool,
    user_id: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> AppResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT * FROM calendar_events WHERE event_date BETWEEN ? AND ? AND {VISIBLE_TO_USER} \
         ORDER BY event_date, start_time"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(start)
        .bind(end)
        .bind(user_id)
        .bind(like_pattern(user_id))
        .fetch_all(pool)
        .await?;
    Ok(visible_to(rows, user_id))
}

/// Visible events whose title contains `query`, case-insensitively.
pub async fn search_events_by_title(
    pool: &SqlitePool,
    user_id: &str,
    query: &str,
) -> AppResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT * FROM calendar_events WHERE title LIKE ? ESCAPE '\\' AND {VISIBLE_TO_USER} \
         ORDER BY event_date, start_time"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(like_pattern(query))
        .bind(user_id)
        .bind(like_pattern(user_id))
        .fetch_all(pool)
        .await?;
    Ok(visible_to(rows, user_id))
}

/// Visible recurring events, ordered by title.
pub async fn list_recurring_events(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<CalendarEvent>> {
    let sql = format!(
        "SELECT * FROM calendar_events WHERE event_type = 'RECURRING_EVENT' AND {VISIBLE_TO_USER} \
         ORDER BY title"
    );
    let rows = sqlx::query_as::<_, EventRow>(&sql)
        .bind(user_id)
        .bind(like_pattern(user_id))
        .fetch_all(pool)
        .await?;
    Ok(visible_to(rows, user_id))
}

/// Delete the completed events `creator_id` owns. Returns how many went.
pub async fn delete_completed_events(pool: &SqlitePool, creator_id: &str) -> AppResult<u64> {
    let result = sqlx::query("DELETE FROM calendar_events WHERE creator_user_id = ? AND completed = 1")
        .bind(creator_id)
        .execute(pool)
        .await?;
    tracing::info!(creator_id, deleted = result.rows_affected(), "completed events purged");
    Ok(result.rows_affected())
}
