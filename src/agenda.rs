//! Day and range queries across a user's events and tasks.

use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;

use crate::model::{CalendarEvent, EventPlannerAdapter, PlannerItem, PlannerItemType, Task, TaskPlannerAdapter};

/// The user on whose behalf a query runs. Created when a request is
/// authenticated and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub user_id: String,
    pub username: String,
}

impl Viewer {
    pub fn new(user_id: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    pub fn can_view(&self, event: &CalendarEvent) -> bool {
        event.can_user_view(&self.user_id)
    }

    pub fn owns(&self, event: &CalendarEvent) -> bool {
        event.creator_user_id() == Some(self.user_id.as_str())
    }
}

/// One planner item placed on a specific day. For recurring events `on` is
/// the day of this instance, not the event's anchor date.
pub struct Occurrence<'a> {
    pub on: NaiveDate,
    pub item: Box<dyn PlannerItem + 'a>,
}

impl Occurrence<'_> {
    pub fn entry(&self) -> AgendaEntry {
        AgendaEntry {
            date: self.on,
            item_type: self.item.item_type(),
            id: self.item.id().to_string(),
            title: self.item.title().to_string(),
            start_time: self.item.start_time(),
            end_time: self.item.end_time(),
            color: self.item.color(),
            completed: self.item.is_completed(),
            priority_level: self.item.priority_level(),
        }
    }
}

impl std::fmt::Debug for Occurrence<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Occurrence")
            .field("on", &self.on)
            .field("id", &self.item.id())
            .field("title", &self.item.title())
            .finish()
    }
}

/// Owned, serializable form of an [`Occurrence`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgendaEntry {
    pub date: NaiveDate,
    pub item_type: PlannerItemType,
    pub id: String,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub color: &'static str,
    pub completed: bool,
    pub priority_level: u8,
}

/// Read-only view over one viewer's events and tasks.
///
/// Events the viewer may not see are skipped. Tasks are taken as given; the
/// caller decides whose tasks to pass in. Tasks without a due timestamp are
/// never placed on a day.
pub struct Agenda<'a> {
    viewer: &'a Viewer,
    events: &'a [CalendarEvent],
    tasks: &'a [Task],
}

impl<'a> Agenda<'a> {
    pub fn new(viewer: &'a Viewer, events: &'a [CalendarEvent], tasks: &'a [Task]) -> Self {
        Self {
            viewer,
            events,
            tasks,
        }
    }

    /// Items on `date`, ordered by start time.
    pub fn items_for_date(&self, date: NaiveDate) -> Vec<Occurrence<'a>> {
        let events = self
            .events
            .iter()
            .filter(|e| self.viewer.can_view(e) && e.occurs_on(date))
            .map(|e| Occurrence {
                on: date,
                item: Box::new(EventPlannerAdapter::new(e)) as Box<dyn PlannerItem + 'a>,
            });

        let tasks = self
            .tasks
            .iter()
            .filter(|t| t.due.is_some_and(|due| due.date() == date))
            .map(|t| Occurrence {
                on: date,
                item: Box::new(TaskPlannerAdapter::new(t)) as Box<dyn PlannerItem + 'a>,
            });

        let mut items: Vec<_> = events.chain(tasks).collect();
        items.sort_by_key(|o| o.item.start_time());
        items
    }

    /// Items on every day from `start` to `end` inclusive, ordered by day and
    /// then start time. A recurring event appears once per day it occurs.
    pub fn items_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Occurrence<'a>> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .flat_map(|d| self.items_for_date(d))
            .collect()
    }

    /// Incomplete items from `today` through `today + days`.
    pub fn upcoming(&self, today: NaiveDate, days: u64) -> Vec<Occurrence<'a>> {
        let end = today.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX);
        self.items_in_range(today, end)
            .into_iter()
            .filter(|o| !o.item.is_completed())
            .collect()
    }

    pub fn has_items_on(&self, date: NaiveDate) -> bool {
        self.events
            .iter()
            .any(|e| self.viewer.can_view(e) && e.occurs_on(date))
            || self
                .tasks
                .iter()
                .any(|t| t.due.is_some_and(|due| due.date() == date))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EventPriority, EventType, PeriodicType, TaskStatus, Visibility, WeekdaySet};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn event_at(title: &str, on: NaiveDate, start: u32, owner: &str) -> CalendarEvent {
        let mut e = CalendarEvent::scheduled(title, on, time(start, 0), time(start + 1, 0), EventPriority::Standard);
        e.set_creator_user_id(Some(owner.to_string()));
        e
    }

    fn task_due(title: &str, on: NaiveDate, hour: u32) -> Task {
        let mut t = Task::new(title);
        t.due = Some(on.and_time(time(hour, 0)));
        t
    }

    fn titles(items: &[Occurrence<'_>]) -> Vec<String> {
        items.iter().map(|o| o.item.title().to_string()).collect()
    }

    #[test]
    fn test_items_for_date_merges_and_sorts_by_start() {
        let viewer = Viewer::new("alice", "alice");
        let day = date(2024, 6, 3);
        let events = vec![event_at("Lunch", day, 12, "alice"), event_at("Standup", day, 9, "alice")];
        let tasks = vec![task_due("Report", day, 10), task_due("Tomorrow", date(2024, 6, 4), 8)];

        let agenda = Agenda::new(&viewer, &events, &tasks);
        let items = agenda.items_for_date(day);

        assert_eq!(titles(&items), ["Standup", "Report", "Lunch"]);
        assert!(items.iter().all(|o| o.on == day));
        assert_eq!(items[1].item.item_type(), PlannerItemType::Task);
    }

    #[test]
    fn test_items_for_date_hides_events_viewer_cannot_see() {
        let viewer = Viewer::new("bob", "bob");
        let day = date(2024, 6, 3);
        let mut private = event_at("Secret", day, 9, "alice");
        private.set_visibility(Visibility::Private);
        let mut shared = event_at("Shared", day, 10, "alice");
        shared.set_visibility(Visibility::Shared);
        shared.share_with_user("bob");
        let mut shared_elsewhere = event_at("Shared elsewhere", day, 10, "alice");
        shared_elsewhere.set_visibility(Visibility::Shared);
        shared_elsewhere.share_with_user("carol");
        let public = event_at("Public", day, 11, "alice");
        let events = vec![private, shared, shared_elsewhere, public];

        let agenda = Agenda::new(&viewer, &events, &[]);

        assert_eq!(titles(&agenda.items_for_date(day)), ["Shared", "Public"]);
    }

    #[test]
    fn test_tasks_without_due_are_not_placed() {
        let viewer = Viewer::new("alice", "alice");
        let tasks = vec![Task::new("Someday")];
        let agenda = Agenda::new(&viewer, &[], &tasks);
        assert!(agenda.items_for_date(crate::model::today()).is_empty());
        assert!(!agenda.has_items_on(crate::model::today()));
    }

    #[test]
    fn test_range_carries_occurrence_dates_for_recurring_events() {
        let viewer = Viewer::new("alice", "alice");
        let mut gym = event_at("Gym", date(2024, 1, 1), 7, "alice");
        gym.set_event_type(EventType::Recurring);
        gym.set_periodic_type(PeriodicType::Weekly);
        gym.set_days_in_week(WeekdaySet::parse("1,3"));
        let events = vec![gym];

        let agenda = Agenda::new(&viewer, &events, &[]);
        // 2024-06-03 Monday through 2024-06-09 Sunday.
        let items = agenda.items_in_range(date(2024, 6, 3), date(2024, 6, 9));

        let days: Vec<NaiveDate> = items.iter().map(|o| o.on).collect();
        assert_eq!(days, [date(2024, 6, 3), date(2024, 6, 5)]);
        // The anchor date is unchanged.
        assert_eq!(items[0].item.date(), Some(date(2024, 1, 1)));
    }

    #[test]
    fn test_range_orders_by_day_then_time() {
        let viewer = Viewer::new("alice", "alice");
        let events = vec![event_at("Late on day two", date(2024, 6, 2), 15, "alice")];
        let tasks = vec![
            task_due("Early on day two", date(2024, 6, 2), 8),
            task_due("Day one", date(2024, 6, 1), 20),
        ];

        let agenda = Agenda::new(&viewer, &events, &tasks);
        let items = agenda.items_in_range(date(2024, 6, 1), date(2024, 6, 2));

        assert_eq!(titles(&items), ["Day one", "Early on day two", "Late on day two"]);
    }

    #[test]
    fn test_empty_and_inverted_ranges() {
        let viewer = Viewer::new("alice", "alice");
        let events = vec![event_at("x", date(2024, 6, 1), 9, "alice")];
        let agenda = Agenda::new(&viewer, &events, &[]);
        assert!(agenda.items_in_range(date(2024, 6, 5), date(2024, 6, 1)).is_empty());
        assert_eq!(agenda.items_in_range(date(2024, 6, 1), date(2024, 6, 1)).len(), 1);
    }

    #[test]
    fn test_upcoming_skips_completed_items() {
        let viewer = Viewer::new("alice", "alice");
        let today = date(2024, 6, 1);
        let mut done_event = event_at("Done", date(2024, 6, 2), 9, "alice");
        done_event.set_completed(true);
        let events = vec![done_event, event_at("Open", date(2024, 6, 3), 9, "alice")];
        let mut done_task = task_due("Done task", date(2024, 6, 2), 10);
        done_task.status = TaskStatus::Completed;
        let tasks = vec![done_task, task_due("Outside window", date(2024, 6, 20), 10)];

        let agenda = Agenda::new(&viewer, &events, &tasks);
        let items = agenda.upcoming(today, 7);

        assert_eq!(titles(&items), ["Open"]);
    }

    #[test]
    fn test_has_items_on() {
        let viewer = Viewer::new("alice", "alice");
        let mut monthly = event_at("Rent", date(2024, 1, 1), 9, "alice");
        monthly.set_event_type(EventType::Recurring);
        monthly.set_periodic_type(PeriodicType::Monthly);
        monthly.set_place_in_month(Some(crate::model::MonthPlace::StartOfMonth));
        let events = vec![monthly];

        let agenda = Agenda::new(&viewer, &events, &[]);
        assert!(agenda.has_items_on(date(2024, 7, 1)));
        assert!(!agenda.has_items_on(date(2024, 7, 2)));
    }

    #[test]
    fn test_entry_is_serializable() {
        let viewer = Viewer::new("alice", "alice");
        let day = date(2024, 6, 3);
        let tasks = vec![task_due("Report", day, 14)];
        let agenda = Agenda::new(&viewer, &[], &tasks);

        let entry = agenda.items_for_date(day)[0].entry();
        let json = serde_json::to_value(&entry).unwrap();

        assert_eq!(json["date"], "2024-06-03");
        assert_eq!(json["item_type"], "TASK");
        assert_eq!(json["start_time"], "14:00:00");
        assert_eq!(json["end_time"], "15:00:00");
        assert_eq!(json["color"], "#60A5FA");
    }

    #[test]
    fn test_viewer_ownership() {
        let viewer = Viewer::new("alice", "alice");
        let mine = event_at("Mine", date(2024, 6, 1), 9, "alice");
        let theirs = event_at("Theirs", date(2024, 6, 1), 9, "bob");
        assert!(viewer.owns(&mine));
        assert!(!viewer.owns(&theirs));
        assert!(viewer.can_view(&theirs));
    }
}
