use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::events::load_owned_event;
use super::{ToolDef, optional_enum, optional_str, parse_email, required_str};
use crate::agenda::Viewer;
use crate::db::{events as event_db, users};
use crate::error::{AppError, AppResult};
use crate::model::{CalendarEvent, Visibility};

/// Return the MCP tool definitions for event sharing operations.
pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "share_event",
            description: "Share one of your events with a registered user or an external email address. A private event becomes shared.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID to share"},
                    "username": {"type": "string", "description": "Username of the user to share with"},
                    "email": {"type": "string", "description": "External email address to share with"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "unshare_event",
            description: "Remove a user or email address from an event's share list. The event becomes private once nobody is left on it.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"},
                    "username": {"type": "string", "description": "Username to remove"},
                    "email": {"type": "string", "description": "Email address to remove"}
                },
                "required": ["event_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "set_visibility",
            description: "Set who can see one of your events",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "event_id": {"type": "string", "description": "The event ID"},
                    "visibility": {"type": "string", "enum": ["PUBLIC", "PRIVATE", "SHARED"]}
                },
                "required": ["event_id", "visibility"],
                "additionalProperties": false
            }),
        },
    ]
}

/// Who a share or unshare call is about.
enum Recipient {
    User { id: String, username: String },
    Email(String),
}

async fn resolve_recipient(pool: &SqlitePool, args: &Value) -> AppResult<Recipient> {
    match (optional_str(args, "username"), optional_str(args, "email")) {
        (Some(username), None) => {
            let user = users::get_user_by_username(pool, username)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("user '{username}'")))?;
            Ok(Recipient::User {
                id: user.id,
                username: user.username,
            })
        }
        (None, Some(email)) => Ok(Recipient::Email(parse_email("email", email)?)),
        _ => Err(AppError::BadRequest(
            "Provide exactly one of username or email".to_string(),
        )),
    }
}

fn sharing_json(event: &CalendarEvent) -> Value {
    json!({
        "event_id": event.id(),
        "visibility": event.visibility(),
        "shared_with_user_ids": event.shared_with_user_ids(),
        "shared_with_emails": event.shared_with_emails(),
    })
}

/// Add a user or email address to an event's share list.
pub async fn share_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let mut event = load_owned_event(pool, viewer, event_id).await?;

    match resolve_recipient(pool, args).await? {
        Recipient::User { id, username } => {
            if id == viewer.user_id {
                return Err(AppError::BadRequest(
                    "You cannot share an event with yourself".to_string(),
                ));
            }
            tracing::info!(event_id, shared_with = %username, "sharing event with user");
            event.share_with_user(id);
        }
        Recipient::Email(email) => {
            tracing::info!(event_id, shared_with = %email, "sharing event with email");
            event.share_with_email(email);
        }
    }

    event_db::update_event(pool, &event).await?;
    Ok(sharing_json(&event))
}

/// Remove a user or email address from an event's share list.
pub async fn unshare_event(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let mut event = load_owned_event(pool, viewer, event_id).await?;

    match resolve_recipient(pool, args).await? {
        Recipient::User { id, .. } => event.remove_shared_user(&id),
        Recipient::Email(email) => event.remove_shared_email(&email),
    }

    event_db::update_event(pool, &event).await?;
    Ok(sharing_json(&event))
}

/// Set an event's visibility directly. Share lists are kept as they are.
pub async fn set_visibility(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let event_id = required_str(args, "event_id")?;
    let visibility = optional_enum(args, "visibility", Visibility::from_str_value)?
        .ok_or_else(|| AppError::BadRequest("Missing visibility".to_string()))?;

    let mut event = load_owned_event(pool, viewer, event_id).await?;
    event.set_visibility(visibility);
    event_db::update_event(pool, &event).await?;

    Ok(sharing_json(&event))
}
