use serde_json::{Value, json};
use sqlx::SqlitePool;

use super::{
    ToolDef, optional_date, optional_datetime, optional_enum, optional_str, optional_time,
    required_str,
};
use crate::agenda::Viewer;
use crate::db::{dependencies as dep_db, tasks as task_db};
use crate::error::{AppError, AppResult};
use crate::model::{
    DependencyType, PlannerItem, Task, TaskDependency, TaskPlannerAdapter, TaskPriority, TaskStatus,
};

pub fn tool_defs() -> Vec<ToolDef> {
    vec![
        ToolDef {
            name: "create_task",
            description: "Create a task, optionally as a subtask of another of your tasks",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "Task title"},
                    "description": {"type": "string"},
                    "priority": {"type": "string", "enum": ["LOW", "MEDIUM", "HIGH", "URGENT"]},
                    "due": {"type": "string", "description": "Due timestamp (YYYY-MM-DDTHH:MM)"},
                    "parent_id": {"type": "string", "description": "Parent task ID"},
                    "project_id": {"type": "string"}
                },
                "required": ["title"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "update_task_status",
            description: "Change a task's status. The response lists dependencies that are still unsatisfied.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string"},
                    "status": {"type": "string", "enum": ["TODO", "IN_PROGRESS", "BLOCKED", "COMPLETED"]}
                },
                "required": ["task_id", "status"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "reschedule_task",
            description: "Move a task on the planner. The new date and start time become its due timestamp.",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string"},
                    "date": {"type": "string", "description": "New date (YYYY-MM-DD)"},
                    "start_time": {"type": "string", "description": "New start time (HH:MM); keeps the current time when omitted"},
                    "end_time": {"type": "string", "description": "End of the displayed window (HH:MM); not stored"}
                },
                "required": ["task_id", "date"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "list_tasks",
            description: "List your tasks, soonest due first",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "status": {"type": "string", "enum": ["TODO", "IN_PROGRESS", "BLOCKED", "COMPLETED"]},
                    "parent_id": {"type": "string", "description": "Only subtasks of this task"}
                },
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "add_dependency",
            description: "Make one task depend on another",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "predecessor_id": {"type": "string", "description": "Task that must start or finish first"},
                    "successor_id": {"type": "string", "description": "Task that waits"},
                    "kind": {"type": "string", "enum": ["FINISH_TO_START", "START_TO_START", "FINISH_TO_FINISH", "START_TO_FINISH"], "description": "Default FINISH_TO_START"}
                },
                "required": ["predecessor_id", "successor_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "check_dependencies",
            description: "List a task's dependencies and whether each one is satisfied",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string"}
                },
                "required": ["task_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "remove_dependency",
            description: "Remove one of a task's dependencies",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string", "description": "The waiting (successor) task"},
                    "dependency_id": {"type": "string"}
                },
                "required": ["task_id", "dependency_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "delete_task",
            description: "Delete a task together with its subtasks and dependencies",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string"}
                },
                "required": ["task_id"],
                "additionalProperties": false
            }),
        },
        ToolDef {
            name: "task_progress",
            description: "Completion percentage of a task, computed from its subtasks",
            input_schema: json!({
                "type": "object",
                "properties": {
                    "task_id": {"type": "string"}
                },
                "required": ["task_id"],
                "additionalProperties": false
            }),
        },
    ]
}

/// Load a task owned by the viewer. Other users' tasks are reported as missing.
async fn load_own_task(pool: &SqlitePool, viewer: &Viewer, task_id: &str) -> AppResult<Task> {
    task_db::get_task(pool, task_id)
        .await?
        .filter(|t| t.user_id.as_deref() == Some(viewer.user_id.as_str()))
        .ok_or_else(|| AppError::NotFound(format!("task {task_id}")))
}

fn dependency_json(dep: &TaskDependency, predecessor: &Task, satisfied: bool) -> Value {
    json!({
        "id": dep.id,
        "kind": dep.kind,
        "predecessor_id": dep.predecessor_id,
        "predecessor_title": predecessor.title,
        "predecessor_status": predecessor.status,
        "satisfied": satisfied,
    })
}

pub async fn create_task(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let title = required_str(args, "title")?;

    let mut task = Task::new(title.trim());
    task.description = optional_str(args, "description").map(str::to_string);
    task.priority = optional_enum(args, "priority", TaskPriority::from_str_value)?.unwrap_or_default();
    task.due = optional_datetime(args, "due")?;
    task.project_id = optional_str(args, "project_id").map(str::to_string);
    task.user_id = Some(viewer.user_id.clone());

    if let Some(parent_id) = optional_str(args, "parent_id") {
        load_own_task(pool, viewer, parent_id).await?;
        task.parent_id = Some(parent_id.to_string());
    }

    let task = task_db::create_task(pool, &task).await?;
    Ok(json!(task))
}

pub async fn update_task_status(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    let status = optional_enum(args, "status", TaskStatus::from_str_value)?
        .ok_or_else(|| AppError::BadRequest("Missing status".to_string()))?;

    let mut task = load_own_task(pool, viewer, task_id).await?;
    let previous = task.status;
    task.status = status;
    task_db::update_task(pool, &task).await?;

    tracing::debug!(task_id, from = previous.as_str(), to = status.as_str(), "task status changed");

    let unsatisfied: Vec<Value> = dep_db::unsatisfied_dependencies(pool, task_id)
        .await?
        .iter()
        .map(|(dep, predecessor)| dependency_json(dep, predecessor, false))
        .collect();

    Ok(json!({
        "task": task,
        "unsatisfied_dependencies": unsatisfied,
    }))
}

pub async fn reschedule_task(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    let date = optional_date(args, "date")?
        .ok_or_else(|| AppError::BadRequest("Missing date".to_string()))?;
    let start = optional_time(args, "start_time")?;
    let end = optional_time(args, "end_time")?;

    let mut task = load_own_task(pool, viewer, task_id).await?;

    let mut item = TaskPlannerAdapter::new(&mut task);
    if let Some(start) = start {
        item.set_start_time(start);
    }
    item.set_date(date);
    if let Some(end) = end {
        item.set_end_time(end);
    }
    let window = json!({
        "date": item.date(),
        "start_time": item.start_time().format("%H:%M").to_string(),
        "end_time": item.end_time().format("%H:%M").to_string(),
    });

    task_db::update_task(pool, &task).await?;

    Ok(json!({
        "task": task,
        "window": window,
    }))
}

pub async fn list_tasks(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let status = optional_enum(args, "status", TaskStatus::from_str_value)?;

    let tasks = match (optional_str(args, "parent_id"), status) {
        (Some(parent_id), status) => {
            load_own_task(pool, viewer, parent_id).await?;
            task_db::list_subtasks(pool, parent_id)
                .await?
                .into_iter()
                .filter(|t| status.is_none_or(|s| t.status == s))
                .collect()
        }
        (None, Some(status)) => task_db::list_tasks_by_status(pool, &viewer.user_id, status).await?,
        (None, None) => task_db::list_tasks_for_user(pool, &viewer.user_id).await?,
    };

    Ok(json!({
        "count": tasks.len(),
        "tasks": tasks,
    }))
}

pub async fn add_dependency(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let predecessor_id = required_str(args, "predecessor_id")?;
    let successor_id = required_str(args, "successor_id")?;
    let kind = optional_enum(args, "kind", DependencyType::from_str_value)?.unwrap_or_default();

    let predecessor = load_own_task(pool, viewer, predecessor_id).await?;
    let successor = load_own_task(pool, viewer, successor_id).await?;

    let dep = dep_db::add_dependency(pool, &TaskDependency::new(predecessor_id, successor_id, kind)).await?;
    let satisfied = dep.is_satisfied(&predecessor, &successor);

    Ok(dependency_json(&dep, &predecessor, satisfied))
}

pub async fn check_dependencies(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    let task = load_own_task(pool, viewer, task_id).await?;

    let mut dependencies = Vec::new();
    for dep in dep_db::list_dependencies_for(pool, task_id).await? {
        // The predecessor row cascades away with its dependencies, so it exists.
        let Some(predecessor) = task_db::get_task(pool, &dep.predecessor_id).await? else {
            continue;
        };
        let satisfied = dep.is_satisfied(&predecessor, &task);
        dependencies.push(dependency_json(&dep, &predecessor, satisfied));
    }

    let all_satisfied = dependencies.iter().all(|d| d["satisfied"] == true);

    Ok(json!({
        "task_id": task_id,
        "status": task.status,
        "all_satisfied": all_satisfied,
        "dependencies": dependencies,
    }))
}

pub async fn remove_dependency(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    let dependency_id = required_str(args, "dependency_id")?;
    load_own_task(pool, viewer, task_id).await?;

    let belongs = dep_db::list_dependencies_for(pool, task_id)
        .await?
        .iter()
        .any(|d| d.id == dependency_id);
    if !belongs {
        return Err(AppError::NotFound(format!("dependency {dependency_id}")));
    }

    dep_db::delete_dependency(pool, dependency_id).await?;
    Ok(json!({"deleted": true, "dependency_id": dependency_id}))
}

pub async fn delete_task(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    load_own_task(pool, viewer, task_id).await?;

    task_db::delete_task(pool, task_id).await?;
    Ok(json!({"deleted": true, "task_id": task_id}))
}

pub async fn task_progress(pool: &SqlitePool, viewer: &Viewer, args: &Value) -> AppResult<Value> {
    let task_id = required_str(args, "task_id")?;
    let task = load_own_task(pool, viewer, task_id).await?;
    let subtasks = task_db::list_subtasks(pool, task_id).await?;

    Ok(json!({
        "task_id": task_id,
        "title": task.title,
        "status": task.status,
        "subtasks": subtasks.len(),
        "completed_subtasks": subtasks.iter().filter(|t| t.is_completed()).count(),
        "progress": task.progress(&subtasks),
    }))
}
