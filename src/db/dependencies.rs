use sqlx::SqlitePool;

use super::models::DependencyRow;
use super::tasks::get_task;
use crate::error::{AppError, AppResult};
use crate::model::{Task, TaskDependency};

/// Store a dependency edge. A task cannot depend on itself and an edge between
/// the same two tasks can only exist once.
pub async fn add_dependency(pool: &SqlitePool, dep: &TaskDependency) -> AppResult<TaskDependency> {
    if dep.predecessor_id == dep.successor_id {
        return Err(AppError::BadRequest("A task cannot depend on itself".to_string()));
    }

    sqlx::query(
        "INSERT INTO task_dependencies (id, predecessor_id, successor_id, dependency_type, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&dep.id)
    .bind(&dep.predecessor_id)
    .bind(&dep.successor_id)
    .bind(dep.kind.as_str())
    .bind(dep.created_at)
    .execute(pool)
    .await
    .map_err(|e| match e {
        sqlx::Error::Database(ref db_err) if db_err.message().contains("UNIQUE") => {
            AppError::Conflict("Dependency already exists".to_string())
        }
        sqlx::Error::Database(ref db_err) if db_err.message().contains("FOREIGN KEY") => {
            AppError::NotFound("Predecessor or successor task not found".to_string())
        }
        _ => AppError::Database(e),
    })?;

    tracing::debug!(
        predecessor = %dep.predecessor_id,
        successor = %dep.successor_id,
        kind = dep.kind.as_str(),
        "dependency added"
    );

    let row = sqlx::query_as::<_, DependencyRow>("SELECT * FROM task_dependencies WHERE id = ?")
        .bind(&dep.id)
        .fetch_one(pool)
        .await?;
    Ok(row.into())
}

/// Edges whose successor is `task_id`.
pub async fn list_dependencies_for(pool: &SqlitePool, task_id: &str) -> AppResult<Vec<TaskDependency>> {
    let rows = sqlx::query_as::<_, DependencyRow>(
        "SELECT * FROM task_dependencies WHERE successor_id = ? ORDER BY created_at, id",
    )
    .bind(task_id)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(TaskDependency::from).collect())
}

/// Delete a dependency by ID.
pub async fn delete_dependency(pool: &SqlitePool, id: &str) -> AppResult<()> {
    let result = sqlx::query("DELETE FROM task_dependencies WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Dependency not found".to_string()));
    }
    Ok(())
}

/// The edges into `task_id` that do not currently hold, each paired with its
/// predecessor task.
pub async fn unsatisfied_dependencies(
    pool: &SqlitePool,
    task_id: &str,
) -> AppResult<Vec<(TaskDependency, Task)>> {
    let successor = get_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Task '{task_id}' not found")))?;

    let mut blocking = Vec::new();
    for dep in list_dependencies_for(pool, task_id).await? {
        let Some(predecessor) = get_task(pool, &dep.predecessor_id).await? else {
            continue;
        };
        if !dep.is_satisfied(&predecessor, &successor) {
            blocking.push((dep, predecessor));
        }
    }
    Ok(blocking)
}
