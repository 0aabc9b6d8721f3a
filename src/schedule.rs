//! Weekly schedule resolution.
//!
//! A device exposes its schedule as seven day lists of `{start, value}` slots, where
//! `start` is the minute of the day. [`resolve`] projects every slot onto the rolling
//! window that begins at the current instant and returns the slot that is active now
//! together with the next two activations.
//!
//! Boundary rule: a slot whose start equals the current instant counts as elapsed and is
//! pushed one week ahead, which makes it the wrapped "now" activation. The exact start
//! instant therefore belongs to the slot that begins there, not to the one that ends.

use crate::utils::minutes_to_time;
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub const MINUTES_PER_DAY: u32 = 1440;

/// Slots needed to fill now, next and later.
pub const MIN_SCHEDULE_SLOTS: usize = 3;

pub const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("schedule has {slots} slot(s); at least {} are required", MIN_SCHEDULE_SLOTS)]
    InsufficientScheduleData { slots: usize },
    #[error("schedule is missing day {0}")]
    MissingDay(Weekday),
    #[error("slot start {start} on {day} is outside the day")]
    InvalidSlotStart { day: Weekday, start: u32 },
    #[error("malformed schedule: {0}")]
    Malformed(String),
}

/// Lowercase day name used as the key in schedule payloads.
pub fn day_key(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// Minute of the day, `0..1440`.
    pub start: u32,
    #[serde(default)]
    pub value: Map<String, Value>,
}

impl ScheduleSlot {
    pub fn new(start: u32, value: Map<String, Value>) -> Self {
        ScheduleSlot { start, value }
    }

    pub fn target(&self) -> Option<f64> {
        self.value.get("target").and_then(Value::as_f64)
    }

    pub fn status(&self) -> Option<&str> {
        self.value.get("status").and_then(Value::as_str)
    }
}

/// Seven day schedule, indexed Monday first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WeekSchedule {
    days: [Vec<ScheduleSlot>; 7],
}

impl WeekSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_day(mut self, day: Weekday, slots: Vec<ScheduleSlot>) -> Self {
        self.days[day.num_days_from_monday() as usize] = slots;
        self
    }

    pub fn day(&self, day: Weekday) -> &[ScheduleSlot] {
        &self.days[day.num_days_from_monday() as usize]
    }

    pub fn slot_count(&self) -> usize {
        self.days.iter().map(Vec::len).sum()
    }

    /// Parse the `schedule` object embedded in a device state. All seven days must be present.
    pub fn from_value(value: &Value) -> Result<Self, ScheduleError> {
        let obj = value
            .as_object()
            .ok_or_else(|| ScheduleError::Malformed("schedule is not an object".to_string()))?;

        let mut week = WeekSchedule::new();
        for day in WEEK {
            let key = day_key(day);
            let raw = obj.get(key).ok_or(ScheduleError::MissingDay(day))?;
            let slots: Vec<ScheduleSlot> =
                serde_json::from_value(raw.clone()).map_err(|e| ScheduleError::Malformed(format!("{key}: {e}")))?;
            week = week.with_day(day, slots);
        }
        Ok(week)
    }
}

/// A slot anchored to a concrete date and time.
#[derive(Debug, Clone, PartialEq)]
pub struct Activation {
    pub day: Weekday,
    pub slot: ScheduleSlot,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Activation {
    pub fn target(&self) -> Option<f64> {
        self.slot.target()
    }

    pub fn status(&self) -> Option<&str> {
        self.slot.status()
    }

    /// `HH:MM` start label of the underlying slot.
    pub fn start_label(&self) -> String {
        minutes_to_time(self.slot.start)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSchedule {
    pub now: Activation,
    pub next: Activation,
    pub later: Activation,
}

/// Resolve `week` against the wall-clock instant `now`.
pub fn resolve(week: &WeekSchedule, now: NaiveDateTime) -> Result<ResolvedSchedule, ScheduleError> {
    let slots = week.slot_count();
    if slots < MIN_SCHEDULE_SLOTS {
        return Err(ScheduleError::InsufficientScheduleData { slots });
    }

    let today = now.date().and_time(NaiveTime::MIN);
    let today_index = now.weekday().num_days_from_monday() as usize;

    let mut timeline: Vec<(Weekday, &ScheduleSlot, NaiveDateTime)> = Vec::with_capacity(slots);
    for offset in 0..WEEK.len() {
        let day = WEEK[(today_index + offset) % WEEK.len()];
        let mut day_slots: Vec<&ScheduleSlot> = week.day(day).iter().collect();
        // stable: equal starts keep payload order
        day_slots.sort_by_key(|s| s.start);

        let midnight = today + Duration::days(offset as i64);
        for slot in day_slots {
            if slot.start >= MINUTES_PER_DAY {
                return Err(ScheduleError::InvalidSlotStart { day, start: slot.start });
            }
            let mut start = midnight + Duration::minutes(i64::from(slot.start));
            if start <= now {
                start += Duration::days(7);
            }
            timeline.push((day, slot, start));
        }
    }
    timeline.sort_by_key(|(_, _, start)| *start);

    let (now_day, now_slot, wrapped) = timeline[timeline.len() - 1];
    let (next_day, next_slot, next_start) = timeline[0];
    let (later_day, later_slot, later_start) = timeline[1];
    // With exactly three slots this is the wrapped entry itself, one week on.
    let after_later = timeline[2].2;

    Ok(ResolvedSchedule {
        now: Activation {
            day: now_day,
            slot: now_slot.clone(),
            start: wrapped - Duration::days(7),
            end: next_start,
        },
        next: Activation {
            day: next_day,
            slot: next_slot.clone(),
            start: next_start,
            end: later_start,
        },
        later: Activation {
            day: later_day,
            slot: later_slot.clone(),
            start: later_start,
            end: after_later,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn slot(start: u32, target: f64) -> ScheduleSlot {
        let mut value = Map::new();
        value.insert("target".to_string(), json!(target));
        ScheduleSlot::new(start, value)
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .expect("valid timestamp")
    }

    /// Monday 08:00 → 20, Monday 20:00 → 16, every other day 00:00 → 18.
    fn example_week() -> WeekSchedule {
        WEEK.iter().fold(WeekSchedule::new(), |week, day| {
            let slots = if *day == Weekday::Mon {
                vec![slot(480, 20.0), slot(1200, 16.0)]
            } else {
                vec![slot(0, 18.0)]
            };
            week.with_day(*day, slots)
        })
    }

    fn assert_invariant(resolved: &ResolvedSchedule, t: NaiveDateTime) {
        assert!(resolved.now.start <= t, "now.start {} > {}", resolved.now.start, t);
        assert!(t < resolved.now.end, "{} >= now.end {}", t, resolved.now.end);
        assert_eq!(resolved.now.end, resolved.next.start);
        assert!(resolved.next.start <= resolved.next.end);
        assert_eq!(resolved.next.end, resolved.later.start);
        for act in [&resolved.now, &resolved.next, &resolved.later] {
            assert!(act.start >= t - Duration::days(7));
            assert!(act.start <= t + Duration::days(14));
        }
    }

    #[test]
    fn monday_evening_wraps_to_previous_slot() {
        // 2024-01-01 is a Monday
        let t = at(2024, 1, 1, 22, 0, 0);
        let resolved = resolve(&example_week(), t).expect("resolves");

        assert_eq!(resolved.now.day, Weekday::Mon);
        assert_eq!(resolved.now.target(), Some(16.0));
        assert_eq!(resolved.now.start, at(2024, 1, 1, 20, 0, 0));
        assert_eq!(resolved.next.day, Weekday::Tue);
        assert_eq!(resolved.next.target(), Some(18.0));
        assert_eq!(resolved.next.start, at(2024, 1, 2, 0, 0, 0));
        assert_eq!(resolved.later.day, Weekday::Wed);
        assert_invariant(&resolved, t);
    }

    #[test]
    fn tuesday_morning_is_owned_by_tuesday_slot() {
        let t = at(2024, 1, 2, 10, 0, 0);
        let resolved = resolve(&example_week(), t).expect("resolves");

        assert_eq!(resolved.now.day, Weekday::Tue);
        assert_eq!(resolved.now.start, at(2024, 1, 2, 0, 0, 0));
        assert_eq!(resolved.next.day, Weekday::Wed);
        assert_eq!(resolved.next.start, at(2024, 1, 3, 0, 0, 0));
        assert_eq!(resolved.later.start, at(2024, 1, 4, 0, 0, 0));
        assert_eq!(resolved.later.end, at(2024, 1, 5, 0, 0, 0));
        assert_invariant(&resolved, t);
    }

    #[test]
    fn slot_start_instant_belongs_to_new_slot() {
        let start = at(2024, 1, 1, 8, 0, 0);
        let resolved = resolve(&example_week(), start).expect("resolves");
        assert_eq!(resolved.now.start, start);
        assert_eq!(resolved.now.target(), Some(20.0));
        assert_eq!(resolved.next.target(), Some(16.0));

        let before = resolve(&example_week(), start - Duration::seconds(1)).expect("resolves");
        assert_eq!(before.now.day, Weekday::Sun);
        assert_eq!(before.now.target(), Some(18.0));
        assert_eq!(before.next.start, start);
    }

    #[test]
    fn invariant_holds_across_the_week() {
        let week = example_week();
        let base = at(2024, 1, 1, 0, 0, 0);
        // every 17 minutes over nine days hits every slot boundary neighbourhood and both wraps
        for step in 0..(9 * 24 * 60 / 17) {
            let t = base + Duration::minutes(step * 17);
            let resolved = resolve(&week, t).expect("resolves");
            assert_invariant(&resolved, t);
        }
    }

    #[test]
    fn resolution_is_stable_within_a_slot() {
        let week = example_week();
        let t = at(2024, 1, 3, 13, 37, 0);
        let a = resolve(&week, t).expect("resolves");
        let b = resolve(&week, t + Duration::seconds(1)).expect("resolves");
        assert_eq!(a, b);
    }

    #[test]
    fn exactly_three_slots_close_the_cycle() {
        let week = WeekSchedule::new()
            .with_day(Weekday::Mon, vec![slot(360, 21.0)])
            .with_day(Weekday::Wed, vec![slot(360, 19.0)])
            .with_day(Weekday::Fri, vec![slot(360, 17.0)]);
        let t = at(2024, 1, 2, 12, 0, 0);
        let resolved = resolve(&week, t).expect("resolves");

        assert_eq!(resolved.now.target(), Some(21.0));
        assert_eq!(resolved.next.target(), Some(19.0));
        assert_eq!(resolved.later.target(), Some(17.0));
        assert_eq!(resolved.later.end, resolved.now.start + Duration::days(7));
        assert_invariant(&resolved, t);
    }

    #[test]
    fn unsorted_day_slots_are_ordered_by_start() {
        let week = WeekSchedule::new()
            .with_day(Weekday::Mon, vec![slot(1080, 15.0), slot(420, 21.0), slot(720, 18.0)]);
        let resolved = resolve(&week, at(2024, 1, 1, 9, 0, 0)).expect("resolves");
        assert_eq!(resolved.now.target(), Some(21.0));
        assert_eq!(resolved.next.target(), Some(18.0));
        assert_eq!(resolved.later.target(), Some(15.0));
    }

    #[test]
    fn fewer_than_three_slots_is_rejected() {
        let week = WeekSchedule::new()
            .with_day(Weekday::Mon, vec![slot(0, 20.0)])
            .with_day(Weekday::Thu, vec![slot(600, 20.0)]);
        let err = resolve(&week, at(2024, 1, 1, 12, 0, 0)).unwrap_err();
        assert_eq!(err, ScheduleError::InsufficientScheduleData { slots: 2 });
    }

    #[test]
    fn slot_start_past_midnight_is_rejected() {
        let week = example_week().with_day(Weekday::Fri, vec![slot(1440, 20.0)]);
        let err = resolve(&week, at(2024, 1, 1, 12, 0, 0)).unwrap_err();
        assert_eq!(
            err,
            ScheduleError::InvalidSlotStart {
                day: Weekday::Fri,
                start: 1440
            }
        );
    }

    #[test]
    fn parses_payload_and_requires_every_day() {
        let mut payload = json!({
            "monday": [{"start": 480, "value": {"target": 20.0}}, {"start": 1200, "value": {"target": 16.0}}],
            "tuesday": [{"start": 0, "value": {"target": 18.0}}],
            "wednesday": [{"start": 0, "value": {"target": 18.0}}],
            "thursday": [{"start": 0, "value": {"target": 18.0}}],
            "friday": [{"start": 0, "value": {"target": 18.0}}],
            "saturday": [{"start": 0, "value": {"target": 18.0}}],
            "sunday": [{"start": 0, "value": {"target": 18.0}}]
        });
        let week = WeekSchedule::from_value(&payload).expect("parse");
        assert_eq!(week, example_week());

        if let Some(days) = payload.as_object_mut() {
            days.remove("sunday");
        }
        assert_eq!(
            WeekSchedule::from_value(&payload).unwrap_err(),
            ScheduleError::MissingDay(Weekday::Sun)
        );
    }

    #[test]
    fn hot_water_status_is_read_from_slot_payload() {
        let payload = json!({
            "monday": [{"start": 390, "value": {"status": "ON"}}, {"start": 540, "value": {"status": "OFF"}}],
            "tuesday": [{"start": 390, "value": {"status": "ON"}}],
            "wednesday": [], "thursday": [], "friday": [], "saturday": [], "sunday": []
        });
        let week = WeekSchedule::from_value(&payload).expect("parse");
        let resolved = resolve(&week, at(2024, 1, 1, 7, 0, 0)).expect("resolves");
        assert_eq!(resolved.now.status(), Some("ON"));
        assert_eq!(resolved.now.start_label(), "06:30");
        assert_eq!(resolved.next.status(), Some("OFF"));
        assert_eq!(resolved.later.day, Weekday::Tue);
    }
}
