//! Per-category resolvers, each a borrowed view over a [`HiveSession`](crate::session::HiveSession).
//!
//! Every read follows the same contract: take the field from the live record when it is
//! present, store it in the attribute cache, and otherwise serve the cached value or the
//! attribute's default. Writes return `bool`; the `try_*` variants carry the reason.

mod heating;
mod hotwater;
mod light;
mod sensor;
mod switch;
mod weather;

pub use heating::Heating;
pub use hotwater::HotWater;
pub use light::Light;
pub use sensor::Sensor;
pub use switch::Switch;
pub use weather::Weather;

use crate::models::hive::{Boost, DeviceRecord};
use crate::schedule::{self, ResolvedSchedule, ScheduleError, WeekSchedule};
use chrono::NaiveDateTime;
use serde_json::Value;

/// Raw `mode`, with `BOOST` replaced by the remembered previous mode.
pub(crate) fn boost_aware_mode<M>(record: &DeviceRecord, parse: fn(&str) -> Option<M>) -> Option<M> {
    match record.state_str("mode")? {
        "BOOST" => previous_mode(record).and_then(parse),
        raw => parse(raw),
    }
}

pub(crate) fn previous_mode(record: &DeviceRecord) -> Option<&str> {
    record.prop_path(&["previous", "mode"]).and_then(Value::as_str)
}

/// `ON` while `state.boost` holds a value, `OFF` when it is null.
pub(crate) fn boost_flag(record: &DeviceRecord) -> Option<Boost> {
    record
        .state_field("boost")
        .map(|v| if v.is_null() { Boost::Off } else { Boost::On })
}

pub(crate) fn boost_minutes(record: &DeviceRecord) -> Option<i64> {
    record.state_field("boost").and_then(Value::as_i64)
}

/// Resolve the schedule embedded in `state.schedule` at `now`.
pub(crate) fn resolve_embedded(record: &DeviceRecord, now: NaiveDateTime) -> Result<ResolvedSchedule, ScheduleError> {
    let raw = record
        .state_field("schedule")
        .ok_or_else(|| ScheduleError::Malformed("record carries no schedule".to_string()))?;
    let week = WeekSchedule::from_value(raw)?;
    schedule::resolve(&week, now)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{Value, json};

    /// Seven-day schedule: `weekday` gets `slots`, every other day gets `rest`.
    pub fn week(weekday: &str, slots: Value, rest: Value) -> Value {
        let mut days = serde_json::Map::new();
        for day in ["monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday"] {
            let value = if day == weekday { slots.clone() } else { rest.clone() };
            days.insert(day.to_string(), value);
        }
        Value::Object(days)
    }

    /// Monday 08:00 → 20, Monday 20:00 → 16, every other day 00:00 → 18.
    pub fn heating_week() -> Value {
        week(
            "monday",
            json!([{"start": 480, "value": {"target": 20.0}}, {"start": 1200, "value": {"target": 16.0}}]),
            json!([{"start": 0, "value": {"target": 18.0}}]),
        )
    }
}
