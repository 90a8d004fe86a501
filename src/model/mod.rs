//! Planner domain: calendar events, tasks, and the adapters that let the two be
//! listed side by side. Nothing in here touches the database or the network.

pub mod dependency;
pub mod event;
pub mod planner;
pub mod recurrence;
pub mod sharing;
pub mod task;

pub use dependency::{DependencyType, TaskDependency};
pub use event::{CalendarEvent, EventPriority, EventType, MonthPlace, PeriodicType, Visibility};
pub use planner::{EventPlannerAdapter, PlannerItem, PlannerItemType, TaskPlannerAdapter};
pub use recurrence::WeekdaySet;
pub use task::{Task, TaskPriority, TaskRecurrence, TaskStatus};

use chrono::NaiveDate;

/// Today's date on the local clock. Used for bookkeeping stamps only.
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
