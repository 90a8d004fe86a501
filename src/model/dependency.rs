use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::task::{Task, TaskStatus};

/// How a successor task is constrained by its predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DependencyType {
    #[default]
    FinishToStart,
    StartToStart,
    FinishToFinish,
    StartToFinish,
}

impl DependencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyType::FinishToStart => "FINISH_TO_START",
            DependencyType::StartToStart => "START_TO_START",
            DependencyType::FinishToFinish => "FINISH_TO_FINISH",
            DependencyType::StartToFinish => "START_TO_FINISH",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "FINISH_TO_START" => Some(DependencyType::FinishToStart),
            "START_TO_START" => Some(DependencyType::StartToStart),
            "FINISH_TO_FINISH" => Some(DependencyType::FinishToFinish),
            "START_TO_FINISH" => Some(DependencyType::StartToFinish),
            _ => None,
        }
    }

    /// Whether the constraint holds for the given endpoint statuses.
    pub fn is_satisfied_by(&self, predecessor: TaskStatus, successor: TaskStatus) -> bool {
        match self {
            DependencyType::FinishToStart => predecessor == TaskStatus::Completed,
            DependencyType::StartToStart | DependencyType::StartToFinish => {
                predecessor == TaskStatus::InProgress
            }
            DependencyType::FinishToFinish => {
                predecessor == TaskStatus::Completed && successor == TaskStatus::Completed
            }
        }
    }
}

/// Directed edge `predecessor -> successor` between two tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDependency {
    pub id: String,
    pub predecessor_id: String,
    pub successor_id: String,
    pub kind: DependencyType,
    pub created_at: NaiveDateTime,
}

impl TaskDependency {
    pub fn new(
        predecessor_id: impl Into<String>,
        successor_id: impl Into<String>,
        kind: DependencyType,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            predecessor_id: predecessor_id.into(),
            successor_id: successor_id.into(),
            kind,
            created_at: chrono::Local::now().naive_local(),
        }
    }

    pub fn is_satisfied(&self, predecessor: &Task, successor: &Task) -> bool {
        self.kind.is_satisfied_by(predecessor.status, successor.status)
    }
}
