use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::recurrence::WeekdaySet;
use super::today;

/// Urgency of a calendar event. Variants are declared from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPriority {
    Optional,
    #[default]
    Standard,
    Important,
    Urgent,
}

impl EventPriority {
    pub const ALL: [EventPriority; 4] = [
        EventPriority::Optional,
        EventPriority::Standard,
        EventPriority::Important,
        EventPriority::Urgent,
    ];

    /// Canonical display colour for events of this priority.
    pub fn color(&self) -> &'static str {
        match self {
            EventPriority::Optional => "#9E9E9E",
            EventPriority::Standard => "#2196F3",
            EventPriority::Important => "#FF9800",
            EventPriority::Urgent => "#F44336",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            EventPriority::Optional => "Optional",
            EventPriority::Standard => "Standard",
            EventPriority::Important => "Important",
            EventPriority::Urgent => "Urgent",
        }
    }

    /// Stored name (`"OPTIONAL"`, `"STANDARD"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            EventPriority::Optional => "OPTIONAL",
            EventPriority::Standard => "STANDARD",
            EventPriority::Important => "IMPORTANT",
            EventPriority::Urgent => "URGENT",
        }
    }

    /// Parse a stored name. Returns `None` for unknown values.
    pub fn from_str_value(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    #[serde(rename = "ONE_TIME_EVENT")]
    OneTime,
    #[serde(rename = "RECURRING_EVENT")]
    Recurring,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::OneTime => "ONE_TIME_EVENT",
            EventType::Recurring => "RECURRING_EVENT",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "ONE_TIME_EVENT" => Some(EventType::OneTime),
            "RECURRING_EVENT" => Some(EventType::Recurring),
            _ => None,
        }
    }
}

/// Repetition period of a recurring event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PeriodicType {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "PER_DAY")]
    Daily,
    #[serde(rename = "PER_WEEK")]
    Weekly,
    #[serde(rename = "PER_MONTH")]
    Monthly,
    #[serde(rename = "PER_YEAR")]
    Yearly,
}

impl PeriodicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodicType::None => "NONE",
            PeriodicType::Daily => "PER_DAY",
            PeriodicType::Weekly => "PER_WEEK",
            PeriodicType::Monthly => "PER_MONTH",
            PeriodicType::Yearly => "PER_YEAR",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "NONE" => Some(PeriodicType::None),
            "PER_DAY" => Some(PeriodicType::Daily),
            "PER_WEEK" => Some(PeriodicType::Weekly),
            "PER_MONTH" => Some(PeriodicType::Monthly),
            "PER_YEAR" => Some(PeriodicType::Yearly),
            _ => None,
        }
    }
}

/// Where in the month a monthly event lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MonthPlace {
    StartOfMonth,
    EndOfMonth,
}

impl MonthPlace {
    pub fn as_str(&self) -> &'static str {
        match self {
            MonthPlace::StartOfMonth => "START_OF_MONTH",
            MonthPlace::EndOfMonth => "END_OF_MONTH",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "START_OF_MONTH" => Some(MonthPlace::StartOfMonth),
            "END_OF_MONTH" => Some(MonthPlace::EndOfMonth),
            _ => None,
        }
    }
}

/// Who may see an event. See [`CalendarEvent::can_user_view`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    #[default]
    Public,
    Private,
    Shared,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "PUBLIC",
            Visibility::Private => "PRIVATE",
            Visibility::Shared => "SHARED",
        }
    }

    pub fn from_str_value(s: &str) -> Option<Self> {
        match s {
            "PUBLIC" => Some(Visibility::Public),
            "PRIVATE" => Some(Visibility::Private),
            "SHARED" => Some(Visibility::Shared),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Visibility::Public => "Public - Everyone can see",
            Visibility::Private => "Private - Only me",
            Visibility::Shared => "Shared - Selected people",
        }
    }
}

/// A schedulable calendar entry, optionally recurring.
///
/// Fields are private so that every edit goes through a setter, and every
/// setter stamps `last_modified`. The recurrence fields only matter when
/// `event_type` is [`EventType::Recurring`]; the share lists only matter when
/// visibility is [`Visibility::Shared`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    id: String,
    title: String,
    description: Option<String>,
    date: Option<NaiveDate>,
    start_time: NaiveTime,
    end_time: NaiveTime,
    priority: EventPriority,
    completed: bool,

    event_type: EventType,
    periodic_type: PeriodicType,
    days_in_week: WeekdaySet,
    place_in_month: Option<MonthPlace>,
    yearly_date: Option<NaiveDate>,

    created_at: NaiveDate,
    last_modified: NaiveDate,

    pub(super) visibility: Visibility,
    pub(super) shared_with_user_ids: Vec<String>,
    pub(super) shared_with_emails: Vec<String>,
    creator_user_id: Option<String>,

    has_meeting_link: bool,
    meeting_link: Option<String>,
    meeting_platform: Option<String>,
    meeting_password: Option<String>,
    location: Option<String>,
}

fn default_start() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn default_end() -> NaiveTime {
    NaiveTime::from_hms_opt(10, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl CalendarEvent {
    /// A one-time, public 09:00–10:00 event with no date set yet.
    pub fn new(title: impl Into<String>, priority: EventPriority) -> Self {
        let now = today();
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            description: None,
            date: None,
            start_time: default_start(),
            end_time: default_end(),
            priority,
            completed: false,
            event_type: EventType::OneTime,
            periodic_type: PeriodicType::None,
            days_in_week: WeekdaySet::empty(),
            place_in_month: None,
            yearly_date: None,
            created_at: now,
            last_modified: now,
            visibility: Visibility::Public,
            shared_with_user_ids: Vec::new(),
            shared_with_emails: Vec::new(),
            creator_user_id: None,
            has_meeting_link: false,
            meeting_link: None,
            meeting_platform: None,
            meeting_password: None,
            location: None,
        }
    }

    /// A one-time event on `date` between `start` and `end`.
    pub fn scheduled(
        title: impl Into<String>,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        priority: EventPriority,
    ) -> Self {
        let mut event = Self::new(title, priority);
        event.date = Some(date);
        event.start_time = start;
        event.end_time = end;
        event
    }

    pub(super) fn touch(&mut self) {
        self.last_modified = today();
    }

    pub fn is_recurring(&self) -> bool {
        self.event_type == EventType::Recurring
    }

    pub fn color(&self) -> &'static str {
        self.priority.color()
    }

    pub fn toggle_completed(&mut self) {
        self.completed = !self.completed;
        self.touch();
    }

    /// Copy the schedule of this event under a fresh id. Sharing, ownership and
    /// meeting details stay with the original.
    pub fn duplicate(&self) -> Self {
        let mut copy = Self::new(self.title.clone(), self.priority);
        copy.description = self.description.clone();
        copy.date = self.date;
        copy.start_time = self.start_time;
        copy.end_time = self.end_time;
        copy.completed = self.completed;
        copy.event_type = self.event_type;
        copy.periodic_type = self.periodic_type;
        copy.days_in_week = self.days_in_week;
        copy.place_in_month = self.place_in_month;
        copy.yearly_date = self.yearly_date;
        copy
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.touch();
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
        self.touch();
    }

    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) {
        self.date = date;
        self.touch();
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn set_start_time(&mut self, start: NaiveTime) {
        self.start_time = start;
        self.touch();
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn set_end_time(&mut self, end: NaiveTime) {
        self.end_time = end;
        self.touch();
    }

    pub fn priority(&self) -> EventPriority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: EventPriority) {
        self.priority = priority;
        self.touch();
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn set_completed(&mut self, completed: bool) {
        self.completed = completed;
        self.touch();
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn set_event_type(&mut self, event_type: EventType) {
        self.event_type = event_type;
        self.touch();
    }

    pub fn periodic_type(&self) -> PeriodicType {
        self.periodic_type
    }

    pub fn set_periodic_type(&mut self, periodic_type: PeriodicType) {
        self.periodic_type = periodic_type;
        self.touch();
    }

    pub fn days_in_week(&self) -> WeekdaySet {
        self.days_in_week
    }

    pub fn set_days_in_week(&mut self, days: WeekdaySet) {
        self.days_in_week = days;
        self.touch();
    }

    pub fn place_in_month(&self) -> Option<MonthPlace> {
        self.place_in_month
    }

    pub fn set_place_in_month(&mut self, place: Option<MonthPlace>) {
        self.place_in_month = place;
        self.touch();
    }

    pub fn yearly_date(&self) -> Option<NaiveDate> {
        self.yearly_date
    }

    pub fn set_yearly_date(&mut self, date: Option<NaiveDate>) {
        self.yearly_date = date;
        self.touch();
    }

    pub fn created_at(&self) -> NaiveDate {
        self.created_at
    }

    pub fn set_created_at(&mut self, created_at: NaiveDate) {
        self.created_at = created_at;
    }

    pub fn last_modified(&self) -> NaiveDate {
        self.last_modified
    }

    /// Overwrite the modification stamp, e.g. when loading a stored event.
    pub fn set_last_modified(&mut self, last_modified: NaiveDate) {
        self.last_modified = last_modified;
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
        self.touch();
    }

    pub fn shared_with_user_ids(&self) -> &[String] {
        &self.shared_with_user_ids
    }

    /// Replace the shared user list wholesale. Unlike
    /// [`share_with_user`](Self::share_with_user) this never changes visibility.
    pub fn set_shared_with_user_ids(&mut self, user_ids: Vec<String>) {
        self.shared_with_user_ids = user_ids;
        self.touch();
    }

    pub fn shared_with_emails(&self) -> &[String] {
        &self.shared_with_emails
    }

    /// Replace the shared email list wholesale. Never changes visibility.
    pub fn set_shared_with_emails(&mut self, emails: Vec<String>) {
        self.shared_with_emails = emails;
        self.touch();
    }

    pub fn creator_user_id(&self) -> Option<&str> {
        self.creator_user_id.as_deref()
    }

    pub fn set_creator_user_id(&mut self, creator: Option<String>) {
        self.creator_user_id = creator;
    }

    pub fn has_meeting_link(&self) -> bool {
        self.has_meeting_link
    }

    pub fn set_has_meeting_link(&mut self, has_link: bool) {
        self.has_meeting_link = has_link;
    }

    pub fn meeting_link(&self) -> Option<&str> {
        self.meeting_link.as_deref()
    }

    /// Set the meeting URL; `has_meeting_link` follows whether it is non-empty.
    pub fn set_meeting_link(&mut self, link: Option<String>) {
        self.has_meeting_link = link.as_deref().is_some_and(|l| !l.is_empty());
        self.meeting_link = link;
        self.touch();
    }

    pub fn meeting_platform(&self) -> Option<&str> {
        self.meeting_platform.as_deref()
    }

    pub fn set_meeting_platform(&mut self, platform: Option<String>) {
        self.meeting_platform = platform;
    }

    pub fn meeting_password(&self) -> Option<&str> {
        self.meeting_password.as_deref()
    }

    pub fn set_meeting_password(&mut self, password: Option<String>) {
        self.meeting_password = password;
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: Option<String>) {
        self.location = location;
        self.touch();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_event_defaults() {
        let event = CalendarEvent::new("Standup", EventPriority::Standard);

        assert_eq!(event.title(), "Standup");
        assert_eq!(event.event_type(), EventType::OneTime);
        assert_eq!(event.periodic_type(), PeriodicType::None);
        assert_eq!(event.visibility(), Visibility::Public);
        assert_eq!(event.start_time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(event.end_time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert!(event.shared_with_user_ids().is_empty());
        assert!(event.shared_with_emails().is_empty());
        assert!(!event.has_meeting_link());
        assert!(!event.is_completed());
        assert_eq!(event.created_at(), today());
    }

    #[test]
    fn test_new_events_get_distinct_ids() {
        let a = CalendarEvent::new("A", EventPriority::Standard);
        let b = CalendarEvent::new("B", EventPriority::Standard);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_setters_bump_last_modified() {
        let mut event = CalendarEvent::new("Review", EventPriority::Important);
        event.set_last_modified(date(2020, 1, 1));

        event.set_title("Quarterly review");
        assert_eq!(event.last_modified(), today());

        event.set_last_modified(date(2020, 1, 1));
        event.set_shared_with_user_ids(vec!["u1".to_string()]);
        assert_eq!(event.last_modified(), today());
    }

    #[test]
    fn test_creator_setter_does_not_bump_last_modified() {
        let mut event = CalendarEvent::new("Review", EventPriority::Important);
        event.set_last_modified(date(2020, 1, 1));

        event.set_creator_user_id(Some("alice".to_string()));
        assert_eq!(event.last_modified(), date(2020, 1, 1));
    }

    #[test]
    fn test_meeting_link_sets_flag() {
        let mut event = CalendarEvent::new("Call", EventPriority::Standard);

        event.set_meeting_link(Some("https://meet.example.com/abc".to_string()));
        assert!(event.has_meeting_link());

        event.set_meeting_link(Some(String::new()));
        assert!(!event.has_meeting_link());

        event.set_meeting_link(None);
        assert!(!event.has_meeting_link());
    }

    #[test]
    fn test_color_follows_priority() {
        let mut event = CalendarEvent::new("x", EventPriority::Optional);
        assert_eq!(event.color(), "#9E9E9E");
        event.set_priority(EventPriority::Urgent);
        assert_eq!(event.color(), "#F44336");
    }

    #[test]
    fn test_toggle_completed() {
        let mut event = CalendarEvent::new("x", EventPriority::Standard);
        event.toggle_completed();
        assert!(event.is_completed());
        event.toggle_completed();
        assert!(!event.is_completed());
    }

    #[test]
    fn test_duplicate_copies_schedule_only() {
        let mut event = CalendarEvent::scheduled(
            "Gym",
            date(2024, 6, 3),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            EventPriority::Important,
        );
        event.set_event_type(EventType::Recurring);
        event.set_periodic_type(PeriodicType::Weekly);
        event.set_creator_user_id(Some("alice".to_string()));
        event.share_with_user("bob");

        let copy = event.duplicate();

        assert_ne!(copy.id(), event.id());
        assert_eq!(copy.title(), "Gym");
        assert_eq!(copy.date(), event.date());
        assert_eq!(copy.periodic_type(), PeriodicType::Weekly);
        assert_eq!(copy.creator_user_id(), None);
        assert!(copy.shared_with_user_ids().is_empty());
        assert_eq!(copy.visibility(), Visibility::Public);
    }

    #[test]
    fn test_stored_names_round_trip() {
        for p in EventPriority::ALL {
            assert_eq!(EventPriority::from_str_value(p.as_str()), Some(p));
        }
        assert_eq!(PeriodicType::from_str_value("PER_WEEK"), Some(PeriodicType::Weekly));
        assert_eq!(PeriodicType::from_str_value("FORTNIGHTLY"), None);
        assert_eq!(Visibility::from_str_value("SHARED"), Some(Visibility::Shared));
        assert_eq!(Visibility::from_str_value("shared"), None);
        assert_eq!(MonthPlace::from_str_value("END_OF_MONTH"), Some(MonthPlace::EndOfMonth));
        assert_eq!(EventType::from_str_value("RECURRING_EVENT"), Some(EventType::Recurring));
    }

    #[test]
    fn test_priority_ordering() {
        assert!(EventPriority::Optional < EventPriority::Standard);
        assert!(EventPriority::Standard < EventPriority::Important);
        assert!(EventPriority::Important < EventPriority::Urgent);
    }

    #[test]
    fn test_json_uses_stored_names() {
        let mut event = CalendarEvent::new("x", EventPriority::Urgent);
        event.set_periodic_type(PeriodicType::Monthly);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["priority"], "URGENT");
        assert_eq!(json["periodic_type"], "PER_MONTH");
        assert_eq!(json["visibility"], "PUBLIC");
        assert_eq!(json["event_type"], "ONE_TIME_EVENT");
    }
}
