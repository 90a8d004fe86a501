use sqlx::SqlitePool;

use super::models::TaskRow;
use crate::error::{AppError, AppResult};
use crate::model::{Task, TaskStatus};

/// Tasks with a due date first, earliest first.
const TASK_ORDER: &str = "ORDER BY due_at IS NULL, due_at, created_at";

/// Insert a new task. Returns the stored task.
pub async fn create_task(pool: &SqlitePool, task: &Task) -> AppResult<Task> {
    let row = TaskRow::from(task);

    sqlx::query(
        "INSERT INTO tasks (id, title, description, priority, status, due_at, created_at, user_id, \
         project_id, parent_id, recurrence_type, recurrence_interval, recurrence_end, depends_on) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.priority)
    .bind(&row.status)
    .bind(row.due_at)
    .bind(row.created_at)
    .bind(&row.user_id)
    .bind(&row.project_id)
    .bind(&row.parent_id)
    .bind(&row.recurrence_type)
    .bind(row.recurrence_interval)
    .bind(row.recurrence_end)
    .bind(&row.depends_on)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("FOREIGN KEY") => {
            AppError::BadRequest("Task refers to an unknown user, parent or predecessor".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::debug!(task_id = %row.id, "task created");

    get_task(pool, &row.id)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Task created but not found")))
}

/// Overwrite every stored field of an existing task.
pub async fn update_task(pool: &SqlitePool, task: &Task) -> AppResult<()> {
    let row = TaskRow::from(task);

    let result = sqlx::query(
        "UPDATE tasks SET title = ?, description = ?, priority = ?, status = ?, due_at = ?, \
         project_id = ?, parent_id = ?, recurrence_type = ?, recurrence_interval = ?, \
         recurrence_end = ?, depends_on = ? WHERE id = ?",
    )
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.priority)
    .bind(&row.status)
    .bind(row.due_at)
    .bind(&row.project_id)
    .bind(&row.parent_id)
    .bind(&row.recurrence_type)
    .bind(row.recurrence_interval)
    .bind(row.recurrence_end)
    .bind(&row.depends_on)
    .bind(&row.id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Task '{}' not found", row.id)));
    }
    Ok(())
}

/// Look up a task by ID.
pub async fn get_task(pool: &SqlitePool, id: &str) -> AppResult<Option<Task>> {
    let row = sqlx::query_as::<_, TaskRow>("SELECT * FROM tasks WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(Task::from))
}

/// Delete a task. Its subtasks and dependency edges go with it.
pub async fn delete_task(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Task '{id}' not found")));
    }
    Ok(())
}

/// All tasks owned by `user_id`.
pub async fn list_tasks_for_user(pool: &SqlitePool, user_id: &str) -> AppResult<Vec<Task>> {
    let sql = format!("SELECT * FROM tasks WHERE user_id = ? {TASK_ORDER}");
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(user_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Task::from).collect())
}

/// Tasks owned by `user_id` with the given status.
pub async fn list_tasks_by_status(
    pool: &SqlitePool,
    user_id: &str,
    status: TaskStatus,
) -> AppResult<Vec<Task>> {
    let sql = format!("SELECT * FROM tasks WHERE user_id = ? AND status = ? {TASK_ORDER}");
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Task::from).collect())
}

/// Direct subtasks of `parent_id`.
pub async fn list_subtasks(pool: &SqlitePool, parent_id: &str) -> AppResult<Vec<Task>> {
    let sql = format!("SELECT * FROM tasks WHERE parent_id = ? {TASK_ORDER}");
    let rows = sqlx::query_as::<_, TaskRow>(&sql)
        .bind(parent_id)
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(Task::from).collect())
}
