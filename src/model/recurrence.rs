use std::fmt;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use super::event::{CalendarEvent, EventType, MonthPlace, PeriodicType};

/// Set of weekdays a weekly event repeats on.
///
/// Stored as `"1,3,5"` (ISO day numbers, Monday = 1); [`WeekdaySet::parse`]
/// and the `Display` impl are the only conversions to and from that form.
/// Serialized to JSON as an array of day numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", from = "Vec<u8>")]
pub struct WeekdaySet(u8);

impl WeekdaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    fn bit(day: Weekday) -> u8 {
        1 << day.num_days_from_monday()
    }

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= Self::bit(day);
    }

    pub fn remove(&mut self, day: Weekday) {
        self.0 &= !Self::bit(day);
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0 & Self::bit(day) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Days in the set, Monday first.
    pub fn iter(&self) -> impl Iterator<Item = Weekday> + '_ {
        (1..=7u8)
            .filter_map(weekday_from_number)
            .filter(|d| self.contains(*d))
    }

    /// Parse the stored comma-separated form. Tokens that are not a day
    /// number in `1..=7` are skipped; a missing or blank value is the empty set.
    pub fn parse(s: &str) -> Self {
        s.split(',')
            .filter_map(|tok| tok.trim().parse::<u8>().ok())
            .filter_map(weekday_from_number)
            .collect()
    }
}

fn weekday_from_number(n: u8) -> Option<Weekday> {
    match n {
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        7 => Some(Weekday::Sun),
        _ => None,
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for day in iter {
            set.insert(day);
        }
        set
    }
}

impl fmt::Display for WeekdaySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let numbers: Vec<String> = self
            .iter()
            .map(|d| d.number_from_monday().to_string())
            .collect();
        f.write_str(&numbers.join(","))
    }
}

impl From<WeekdaySet> for Vec<u8> {
    fn from(set: WeekdaySet) -> Self {
        set.iter().map(|d| d.number_from_monday() as u8).collect()
    }
}

impl From<Vec<u8>> for WeekdaySet {
    fn from(days: Vec<u8>) -> Self {
        days.into_iter().filter_map(weekday_from_number).collect()
    }
}

/// Whether `date` is the last calendar day of its month.
fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().is_none_or(|next| next.month() != date.month())
}

impl CalendarEvent {
    /// Whether an instance of this event falls on `date`.
    ///
    /// One-time events match their anchor date only. Recurring events match
    /// by period; a recurrence missing the data it needs (no weekdays, no
    /// place in month, no yearly anchor) never matches. Time of day plays no
    /// part.
    pub fn occurs_on(&self, date: NaiveDate) -> bool {
        if self.event_type() == EventType::OneTime {
            return self.date() == Some(date);
        }

        match self.periodic_type() {
            PeriodicType::Daily => true,
            PeriodicType::Weekly => self.days_in_week().contains(date.weekday()),
            PeriodicType::Monthly => match self.place_in_month() {
                Some(MonthPlace::StartOfMonth) => date.day() == 1,
                Some(MonthPlace::EndOfMonth) => is_last_day_of_month(date),
                None => false,
            },
            PeriodicType::Yearly => self
                .yearly_date()
                .is_some_and(|anchor| anchor.month() == date.month() && anchor.day() == date.day()),
            PeriodicType::None => false,
        }
    }
}
