//! A common view over tasks and calendar events so calendar and board views
//! can sort, colour and place both kinds the same way.
//!
//! The adapters wrap an entity by reference. Wrap a `&mut` to get the setters;
//! writes go straight through to the wrapped entity.

use std::borrow::{Borrow, BorrowMut};

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use super::event::{CalendarEvent, EventPriority};
use super::task::{Task, TaskPriority};
use super::today;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlannerItemType {
    Task,
    Event,
}

impl PlannerItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlannerItemType::Task => "TASK",
            PlannerItemType::Event => "EVENT",
        }
    }
}

/// Anything that can be placed on the planner.
pub trait PlannerItem {
    fn id(&self) -> &str;
    fn title(&self) -> &str;
    fn description(&self) -> Option<&str>;
    /// The item's own date. For recurring events this is the anchor date,
    /// not a particular occurrence.
    fn date(&self) -> Option<NaiveDate>;
    fn start_time(&self) -> NaiveTime;
    fn end_time(&self) -> NaiveTime;
    fn is_completed(&self) -> bool;
    fn color(&self) -> &'static str;
    fn item_type(&self) -> PlannerItemType;
    fn occurs_on(&self, date: NaiveDate) -> bool;
    /// Urgency on a shared 0..=3 scale, 3 being the most urgent.
    fn priority_level(&self) -> u8;
}

/// Presents a [`Task`] as a planner item with a one-hour window starting at
/// its due time.
#[derive(Debug)]
pub struct TaskPlannerAdapter<T> {
    task: T,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
}

impl<T: Borrow<Task>> TaskPlannerAdapter<T> {
    /// Derive the window from the task's due timestamp. A task without one is
    /// placed today, 09:00–10:00.
    pub fn new(task: T) -> Self {
        let (date, start) = match task.borrow().due {
            Some(due) => (due.date(), due.time()),
            None => (today(), NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)),
        };
        let end = start + TimeDelta::hours(1);
        Self::with_window(task, date, start, end)
    }

    pub fn with_window(task: T, date: NaiveDate, start: NaiveTime, end: NaiveTime) -> Self {
        Self {
            task,
            date,
            start,
            end,
        }
    }

    pub fn task(&self) -> &Task {
        self.task.borrow()
    }
}

impl<T: BorrowMut<Task>> TaskPlannerAdapter<T> {
    /// Move the item to another day. Updates the task's due timestamp.
    pub fn set_date(&mut self, date: NaiveDate) {
        self.date = date;
        self.write_back();
    }

    /// Move the start of the window. Updates the task's due timestamp.
    pub fn set_start_time(&mut self, start: NaiveTime) {
        self.start = start;
        self.write_back();
    }

    /// Display-only; the task has no end time to write to.
    pub fn set_end_time(&mut self, end: NaiveTime) {
        self.end = end;
    }

    pub fn task_mut(&mut self) -> &mut Task {
        self.task.borrow_mut()
    }

    fn write_back(&mut self) {
        let due = self.date.and_time(self.start);
        self.task.borrow_mut().due = Some(due);
    }
}

/// Task colours, keyed by priority. Distinct from the event palette.
fn task_color(priority: TaskPriority) -> &'static str {
    match priority {
        TaskPriority::Low => "#9CA3AF",
        TaskPriority::Medium => "#60A5FA",
        TaskPriority::High => "#8B5CF6",
        TaskPriority::Urgent => "#EF4444",
    }
}

impl<T: Borrow<Task>> PlannerItem for TaskPlannerAdapter<T> {
    fn id(&self) -> &str {
        &self.task().id
    }

    fn title(&self) -> &str {
        &self.task().title
    }

    fn description(&self) -> Option<&str> {
        self.task().description.as_deref()
    }

    fn date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }

    fn start_time(&self) -> NaiveTime {
        self.start
    }

    fn end_time(&self) -> NaiveTime {
        self.end
    }

    fn is_completed(&self) -> bool {
        self.task().is_completed()
    }

    fn color(&self) -> &'static str {
        task_color(self.task().priority)
    }

    fn item_type(&self) -> PlannerItemType {
        PlannerItemType::Task
    }

    fn occurs_on(&self, date: NaiveDate) -> bool {
        self.date == date
    }

    fn priority_level(&self) -> u8 {
        match self.task().priority {
            TaskPriority::Low => 0,
            TaskPriority::Medium => 1,
            TaskPriority::High => 2,
            TaskPriority::Urgent => 3,
        }
    }
}

/// Presents a [`CalendarEvent`] as a planner item. Everything is delegated.
#[derive(Debug)]
pub struct EventPlannerAdapter<E> {
    event: E,
}

impl<E: Borrow<CalendarEvent>> EventPlannerAdapter<E> {
    pub fn new(event: E) -> Self {
        Self { event }
    }

    pub fn event(&self) -> &CalendarEvent {
        self.event.borrow()
    }
}

impl<E: BorrowMut<CalendarEvent>> EventPlannerAdapter<E> {
    pub fn set_date(&mut self, date: NaiveDate) {
        self.event.borrow_mut().set_date(Some(date));
    }

    pub fn set_start_time(&mut self, start: NaiveTime) {
        self.event.borrow_mut().set_start_time(start);
    }

    pub fn set_end_time(&mut self, end: NaiveTime) {
        self.event.borrow_mut().set_end_time(end);
    }
}

impl<E: Borrow<CalendarEvent>> PlannerItem for EventPlannerAdapter<E> {
    fn id(&self) -> &str {
        self.event().id()
    }

    fn title(&self) -> &str {
        self.event().title()
    }

    fn description(&self) -> Option<&str> {
        self.event().description()
    }

    fn date(&self) -> Option<NaiveDate> {
        self.event().date()
    }

    fn start_time(&self) -> NaiveTime {
        self.event().start_time()
    }

    fn end_time(&self) -> NaiveTime {
        self.event().end_time()
    }

    fn is_completed(&self) -> bool {
        self.event().is_completed()
    }

    fn color(&self) -> &'static str {
        self.event().color()
    }

    fn item_type(&self) -> PlannerItemType {
        PlannerItemType::Event
    }

    fn occurs_on(&self, date: NaiveDate) -> bool {
        self.event().occurs_on(date)
    }

    fn priority_level(&self) -> u8 {
        match self.event().priority() {
            EventPriority::Optional => 0,
            EventPriority::Standard => 1,
            EventPriority::Important => 2,
            EventPriority::Urgent => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventType, PeriodicType, TaskStatus, WeekdaySet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_task_adapter_derives_one_hour_window() {
        let mut task = Task::new("Report");
        task.due = Some(date(2024, 6, 1).and_time(time(14, 0)));

        let item = TaskPlannerAdapter::new(&task);

        assert_eq!(item.date(), Some(date(2024, 6, 1)));
        assert_eq!(item.start_time(), time(14, 0));
        assert_eq!(item.end_time(), time(15, 0));
        assert!(item.occurs_on(date(2024, 6, 1)));
        assert!(!item.occurs_on(date(2024, 6, 2)));
        assert_eq!(item.item_type(), PlannerItemType::Task);
    }

    #[test]
    fn test_task_adapter_start_time_writes_back() {
        let mut task = Task::new("Report");
        task.due = Some(date(2024, 6, 1).and_time(time(14, 0)));

        {
            let mut item = TaskPlannerAdapter::new(&mut task);
            item.set_start_time(time(9, 0));
        }

        assert_eq!(task.due, Some(date(2024, 6, 1).and_time(time(9, 0))));
    }

    #[test]
    fn test_task_adapter_date_writes_back_and_end_does_not() {
        let mut task = Task::new("Report");
        task.due = Some(date(2024, 6, 1).and_time(time(14, 0)));

        let mut item = TaskPlannerAdapter::new(&mut task);
        item.set_date(date(2024, 6, 5));
        item.set_end_time(time(18, 0));
        assert_eq!(item.end_time(), time(18, 0));
        drop(item);

        assert_eq!(task.due, Some(date(2024, 6, 5).and_time(time(14, 0))));
    }

    #[test]
    fn test_task_adapter_window_wraps_past_midnight() {
        let mut task = Task::new("Late");
        task.due = Some(date(2024, 6, 1).and_time(time(23, 30)));
        let item = TaskPlannerAdapter::new(&task);
        assert_eq!(item.end_time(), time(0, 30));
    }

    #[test]
    fn test_task_adapter_without_due_defaults_to_today_morning() {
        let task = Task::new("Someday");
        let item = TaskPlannerAdapter::new(&task);
        assert_eq!(item.date(), Some(today()));
        assert_eq!(item.start_time(), time(9, 0));
        assert_eq!(item.end_time(), time(10, 0));
    }

    #[test]
    fn test_task_adapter_completion_follows_status() {
        let mut task = Task::new("x");
        let mut item = TaskPlannerAdapter::new(&mut task);
        assert!(!item.is_completed());
        item.task_mut().status = TaskStatus::Completed;
        assert!(item.is_completed());
    }

    #[test]
    fn test_priority_levels_in_range_and_monotonic() {
        let mut last = None;
        for p in TaskPriority::ALL {
            let mut task = Task::new("x");
            task.priority = p;
            let level = TaskPlannerAdapter::new(&task).priority_level();
            assert!(level <= 3);
            if let Some(prev) = last {
                assert!(level > prev, "{p:?} should rank above the previous priority");
            }
            last = Some(level);
        }

        let mut last = None;
        for p in EventPriority::ALL {
            let event = CalendarEvent::new("x", p);
            let level = EventPlannerAdapter::new(&event).priority_level();
            assert!(level <= 3);
            if let Some(prev) = last {
                assert!(level > prev, "{p:?} should rank above the previous priority");
            }
            last = Some(level);
        }
    }

    #[test]
    fn test_colour_tables_stay_distinct() {
        let mut task = Task::new("x");
        task.priority = TaskPriority::Medium;
        let event = CalendarEvent::new("y", EventPriority::Standard);

        let task_item = TaskPlannerAdapter::new(&task);
        let event_item = EventPlannerAdapter::new(&event);

        assert_eq!(task_item.priority_level(), event_item.priority_level());
        assert_eq!(task_item.color(), "#60A5FA");
        assert_eq!(event_item.color(), "#2196F3");
    }

    #[test]
    fn test_event_adapter_delegates_recurrence() {
        let mut event = CalendarEvent::new("Gym", EventPriority::Important);
        event.set_event_type(EventType::Recurring);
        event.set_periodic_type(PeriodicType::Weekly);
        event.set_days_in_week(WeekdaySet::parse("1"));

        let item = EventPlannerAdapter::new(&event);
        // 2024-06-03 is a Monday.
        assert!(item.occurs_on(date(2024, 6, 3)));
        assert!(!item.occurs_on(date(2024, 6, 4)));
        assert_eq!(item.item_type(), PlannerItemType::Event);
        assert_eq!(item.color(), "#FF9800");
    }

    #[test]
    fn test_event_adapter_setters_mutate_event() {
        let mut event = CalendarEvent::new("Sync", EventPriority::Standard);
        {
            let mut item = EventPlannerAdapter::new(&mut event);
            item.set_date(date(2024, 7, 4));
            item.set_start_time(time(11, 0));
            item.set_end_time(time(11, 30));
        }
        assert_eq!(event.date(), Some(date(2024, 7, 4)));
        assert_eq!(event.start_time(), time(11, 0));
        assert_eq!(event.end_time(), time(11, 30));
    }

    #[test]
    fn test_adapters_as_trait_objects_sort_by_priority() {
        let mut urgent_task = Task::new("Urgent task");
        urgent_task.priority = TaskPriority::Urgent;
        let optional_event = CalendarEvent::new("Optional event", EventPriority::Optional);
        let important_event = CalendarEvent::new("Important event", EventPriority::Important);

        let mut items: Vec<Box<dyn PlannerItem + '_>> = vec![
            Box::new(EventPlannerAdapter::new(&optional_event)),
            Box::new(TaskPlannerAdapter::new(&urgent_task)),
            Box::new(EventPlannerAdapter::new(&important_event)),
        ];
        items.sort_by_key(|i| std::cmp::Reverse(i.priority_level()));

        let titles: Vec<&str> = items.iter().map(|i| i.title()).collect();
        assert_eq!(titles, ["Urgent task", "Important event", "Optional event"]);
    }
}
