//! Row types and their conversions to and from the domain model.
//!
//! Enums and lists only become strings here. Unknown stored values decode to a
//! safe default and are logged.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::model::{
    CalendarEvent, DependencyType, EventPriority, EventType, MonthPlace, PeriodicType, Task,
    TaskDependency, TaskPriority, TaskRecurrence, TaskStatus, Visibility, WeekdaySet,
};

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: Option<String>,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

/// An API bearer token. Only the hash is stored.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApiToken {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub name: String,
    pub created_at: NaiveDateTime,
    pub expires_at: Option<NaiveDateTime>,
}

impl ApiToken {
    pub fn is_expired(&self, now: NaiveDateTime) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Stored form of a [`CalendarEvent`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub priority: String,
    pub completed: bool,
    pub event_type: String,
    pub periodic_type: String,
    pub days_in_week: String,
    pub place_in_month: Option<String>,
    pub yearly_date: Option<NaiveDate>,
    pub created_at: NaiveDate,
    pub last_modified: NaiveDate,
    pub visibility: String,
    pub shared_with_user_ids: String,
    pub shared_with_emails: String,
    pub creator_user_id: Option<String>,
    pub has_meeting_link: bool,
    pub meeting_link: Option<String>,
    pub meeting_platform: Option<String>,
    pub meeting_password: Option<String>,
    pub location: Option<String>,
}

fn join_list(items: &[String]) -> String {
    items.join(",")
}

fn split_list(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn decode_or<T: Copy>(value: Option<T>, column: &'static str, raw: &str, fallback: T) -> T {
    value.unwrap_or_else(|| {
        tracing::warn!(column, value = raw, "unknown stored value, using default");
        fallback
    })
}

impl From<&CalendarEvent> for EventRow {
    fn from(e: &CalendarEvent) -> Self {
        Self {
            id: e.id().to_string(),
            title: e.title().to_string(),
            description: e.description().map(str::to_string),
            event_date: e.date(),
            start_time: e.start_time(),
            end_time: e.end_time(),
            priority: e.priority().as_str().to_string(),
            completed: e.is_completed(),
            event_type: e.event_type().as_str().to_string(),
            periodic_type: e.periodic_type().as_str().to_string(),
            days_in_week: e.days_in_week().to_string(),
            place_in_month: e.place_in_month().map(|p| p.as_str().to_string()),
            yearly_date: e.yearly_date(),
            created_at: e.created_at(),
            last_modified: e.last_modified(),
            visibility: e.visibility().as_str().to_string(),
            shared_with_user_ids: join_list(e.shared_with_user_ids()),
            shared_with_emails: join_list(e.shared_with_emails()),
            creator_user_id: e.creator_user_id().map(str::to_string),
            has_meeting_link: e.has_meeting_link(),
            meeting_link: e.meeting_link().map(str::to_string),
            meeting_platform: e.meeting_platform().map(str::to_string),
            meeting_password: e.meeting_password().map(str::to_string),
            location: e.location().map(str::to_string),
        }
    }
}

impl From<EventRow> for CalendarEvent {
    fn from(row: EventRow) -> Self {
        let priority = decode_or(
            EventPriority::from_str_value(&row.priority),
            "priority",
            &row.priority,
            EventPriority::Standard,
        );
        let mut e = CalendarEvent::new(row.title, priority);
        e.set_id(row.id);
        e.set_description(row.description);
        e.set_date(row.event_date);
        e.set_start_time(row.start_time);
        e.set_end_time(row.end_time);
        e.set_completed(row.completed);
        e.set_event_type(decode_or(
            EventType::from_str_value(&row.event_type),
            "event_type",
            &row.event_type,
            EventType::OneTime,
        ));
        e.set_periodic_type(decode_or(
            PeriodicType::from_str_value(&row.periodic_type),
            "periodic_type",
            &row.periodic_type,
            PeriodicType::None,
        ));
        e.set_days_in_week(WeekdaySet::parse(&row.days_in_week));
        e.set_place_in_month(
            row.place_in_month
                .as_deref()
                .and_then(MonthPlace::from_str_value),
        );
        e.set_yearly_date(row.yearly_date);
        // Unknown visibility must not widen access.
        e.set_visibility(decode_or(
            Visibility::from_str_value(&row.visibility),
            "visibility",
            &row.visibility,
            Visibility::Private,
        ));
        e.set_shared_with_user_ids(split_list(&row.shared_with_user_ids));
        e.set_shared_with_emails(split_list(&row.shared_with_emails));
        e.set_creator_user_id(row.creator_user_id);
        e.set_meeting_link(row.meeting_link);
        e.set_has_meeting_link(row.has_meeting_link);
        e.set_meeting_platform(row.meeting_platform);
        e.set_meeting_password(row.meeting_password);
        e.set_location(row.location);
        e.set_created_at(row.created_at);
        e.set_last_modified(row.last_modified);
        e
    }
}

/// Stored form of a [`Task`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    pub recurrence_type: String,
    pub recurrence_interval: i64,
    pub recurrence_end: Option<NaiveDateTime>,
    pub depends_on: Option<String>,
}

impl From<&Task> for TaskRow {
    fn from(t: &Task) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            priority: t.priority.as_str().to_string(),
            status: t.status.as_str().to_string(),
            due_at: t.due,
            created_at: t.created_at,
            user_id: t.user_id.clone(),
            project_id: t.project_id.clone(),
            parent_id: t.parent_id.clone(),
            recurrence_type: t.recurrence.kind.clone(),
            recurrence_interval: i64::from(t.recurrence.interval),
            recurrence_end: t.recurrence.end,
            depends_on: t.depends_on.clone(),
        }
    }
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            priority: decode_or(
                TaskPriority::from_str_value(&row.priority),
                "priority",
                &row.priority,
                TaskPriority::Medium,
            ),
            status: decode_or(
                TaskStatus::from_str_value(&row.status),
                "status",
                &row.status,
                TaskStatus::Todo,
            ),
            id: row.id,
            title: row.title,
            description: row.description,
            due: row.due_at,
            created_at: row.created_at,
            user_id: row.user_id,
            project_id: row.project_id,
            parent_id: row.parent_id,
            recurrence: TaskRecurrence {
                kind: row.recurrence_type,
                interval: u32::try_from(row.recurrence_interval).unwrap_or(0),
                end: row.recurrence_end,
            },
            depends_on: row.depends_on,
        }
    }
}

/// Stored form of a [`TaskDependency`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DependencyRow {
    pub id: String,
    pub predecessor_id: String,
    pub successor_id: String,
    pub dependency_type: String,
    pub created_at: NaiveDateTime,
}

impl From<DependencyRow> for TaskDependency {
    fn from(row: DependencyRow) -> Self {
        TaskDependency {
            kind: decode_or(
                DependencyType::from_str_value(&row.dependency_type),
                "dependency_type",
                &row.dependency_type,
                DependencyType::FinishToStart,
            ),
            id: row.id,
            predecessor_id: row.predecessor_id,
            successor_id: row.successor_id,
            created_at: row.created_at,
        }
    }
}
