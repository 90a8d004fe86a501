use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl TaskPriority {
    pub const ALL: [TaskPriority; 4] = [
        TaskPriority::Low,
        TaskPriority::Medium,
        TaskPriority::High,
        TaskPriority::Urgent,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskPriority::Low => "Low",
            TaskPriority::Medium => "Medium",
            TaskPriority::High => "High",
            TaskPriority::Urgent => "Urgent",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "LOW",
            TaskPriority::Medium => "MEDIUM",
            TaskPriority::High => "HIGH",
            TaskPriority::Urgent => "URGENT",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Blocked,
    Completed,
}

impl TaskStatus {
    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "To do",
            TaskStatus::InProgress => "In progress",
            TaskStatus::Blocked => "Blocked",
            TaskStatus::Completed => "Completed",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Blocked => "BLOCKED",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(TaskStatus::Todo),
            "IN_PROGRESS" => Some(TaskStatus::InProgress),
            "BLOCKED" => Some(TaskStatus::Blocked),
            "COMPLETED" => Some(TaskStatus::Completed),
            _ => None,
        }
    }
}

/// Loose recurrence descriptor carried by tasks. `kind` is a free-form name
/// such as `"DAILY"` or `"WEEKLY"`; nothing in the planner interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecurrence {
    pub kind: String,
    pub interval: u32,
    pub end: Option<NaiveDateTime>,
}

impl Default for TaskRecurrence {
    fn default() -> Self {
        Self {
            kind: "NONE".to_string(),
            interval: 0,
            end: None,
        }
    }
}

/// A unit of work with a single due timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub user_id: Option<String>,
    pub project_id: Option<String>,
    pub parent_id: Option<String>,
    #[serde(default)]
    pub recurrence: TaskRecurrence,
    /// Predecessor this task waits on.
    pub depends_on: Option<String>,
}

impl Task {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            priority: TaskPriority::default(),
            status: TaskStatus::default(),
            due: None,
            created_at: chrono::Local::now().naive_local(),
            user_id: None,
            project_id: None,
            parent_id: None,
            recurrence: TaskRecurrence::default(),
            depends_on: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }

    /// Completion percentage given this task's subtasks. With no subtasks the
    /// task's own status decides: 100 when completed, 0 otherwise.
    pub fn progress(&self, subtasks: &[Task]) -> f64 {
        if subtasks.is_empty() {
            return if self.is_completed() { 100.0 } else { 0.0 };
        }
        let done = subtasks.iter().filter(|t| t.is_completed()).count();
        done as f64 * 100.0 / subtasks.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_status(status: TaskStatus) -> Task {
        let mut t = Task::new("sub");
        t.status = status;
        t
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("Write report");
        assert_eq!(task.priority, TaskPriority::Medium);
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.recurrence.kind, "NONE");
        assert_eq!(task.recurrence.interval, 0);
        assert!(task.due.is_none());
        assert!(!task.is_completed());
    }

    #[test]
    fn test_progress_without_subtasks() {
        let mut task = Task::new("Solo");
        assert_eq!(task.progress(&[]), 0.0);
        task.status = TaskStatus::Completed;
        assert_eq!(task.progress(&[]), 100.0);
    }

    #[test]
    fn test_progress_counts_completed_subtasks() {
        let parent = Task::new("Parent");
        let subs = vec![
            with_status(TaskStatus::Completed),
            with_status(TaskStatus::InProgress),
            with_status(TaskStatus::Completed),
            with_status(TaskStatus::Blocked),
        ];
        assert_eq!(parent.progress(&subs), 50.0);
    }

    #[test]
    fn test_status_stored_names() {
        for s in [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Blocked,
            TaskStatus::Completed,
        ] {
            assert_eq!(TaskStatus::from_str_value(s.as_str()), Some(s));
        }
        assert_eq!(TaskStatus::from_str_value("DONE"), None);
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TaskPriority::Low < TaskPriority::Medium);
        assert!(TaskPriority::Medium < TaskPriority::High);
        assert!(TaskPriority::High < TaskPriority::Urgent);
        assert_eq!(TaskPriority::from_str_value("HIGH"), Some(TaskPriority::High));
    }
}
