use super::{boost_aware_mode, boost_flag, boost_minutes, previous_mode, resolve_embedded};
use crate::cache::Attribute;
use crate::models::hive::{Boost, DeviceRecord, HeatingMode, NodeId, Power};
use crate::schedule::ResolvedSchedule;
use crate::session::{CommandError, HiveSession, reported};
use crate::snapshot::Kind;
use crate::telemetry::MinMaxRecord;
use log::warn;
use serde_json::{Value, json};

const DEFAULT_MIN_TEMPERATURE: f64 = 5.0;
const DEFAULT_MAX_TEMPERATURE: f64 = 32.0;

/// Heating zone resolver.
pub struct Heating<'a> {
    session: &'a HiveSession,
}

impl<'a> Heating<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        Heating { session }
    }

    fn record(&self, id: &NodeId) -> Option<DeviceRecord> {
        self.session.product(Kind::Heating, id)
    }

    pub fn operation_modes(&self) -> [HeatingMode; 3] {
        HeatingMode::OPERATION_MODES
    }

    pub fn min_temperature(&self, id: &NodeId) -> f64 {
        let live = self.record(id).and_then(|r| r.prop_f64("minTemperature"));
        self.session
            .cached(id, Attribute::HeatingMinTemperature, live, DEFAULT_MIN_TEMPERATURE)
    }

    pub fn max_temperature(&self, id: &NodeId) -> f64 {
        let live = self.record(id).and_then(|r| r.prop_f64("maxTemperature"));
        self.session
            .cached(id, Attribute::HeatingMaxTemperature, live, DEFAULT_MAX_TEMPERATURE)
    }

    /// Measured temperature. Every known reading, live or cached, feeds the min/max tracker.
    pub fn current_temperature(&self, id: &NodeId) -> f64 {
        let attribute = Attribute::HeatingCurrentTemperature;
        let reading = match self.record(id).and_then(|r| r.prop_f64("temperature")) {
            Some(live) => Some(self.session.cached(id, attribute, Some(live), 0.0)),
            None => self.session.last_known(id, attribute),
        };
        match reading {
            Some(temperature) => {
                self.session.observe_temperature(id, temperature);
                temperature
            }
            None => 0.0,
        }
    }

    pub fn min_max_temperatures(&self, id: &NodeId) -> Option<MinMaxRecord> {
        self.session.min_max_temperatures(id)
    }

    /// Effective mode. A boost reports the mode it interrupted.
    pub fn mode(&self, id: &NodeId) -> HeatingMode {
        let live = self
            .record(id)
            .and_then(|r| boost_aware_mode(&r, HeatingMode::from_raw));
        self.session
            .cached(id, Attribute::HeatingMode, live, HeatingMode::Unknown)
    }

    pub fn boost(&self, id: &NodeId) -> Boost {
        let live = self.record(id).as_ref().and_then(boost_flag);
        self.session.cached(id, Attribute::HeatingBoost, live, Boost::Unknown)
    }

    /// Minutes of boost left; `None` unless a boost is running.
    pub fn boost_time_remaining(&self, id: &NodeId) -> Option<i64> {
        if self.boost(id) != Boost::On {
            return None;
        }
        self.record(id).as_ref().and_then(boost_minutes)
    }

    pub fn target_temperature(&self, id: &NodeId) -> f64 {
        let live = self.record(id).and_then(|r| self.live_target(id, &r));
        self.session
            .cached(id, Attribute::HeatingTargetTemperature, live, 0.0)
    }

    fn live_target(&self, id: &NodeId, record: &DeviceRecord) -> Option<f64> {
        let stated = record.state_f64("target");
        if self.mode(id) != HeatingMode::Schedule {
            return stated;
        }
        match record.prop("scheduleOverride").and_then(Value::as_bool) {
            Some(false) => match resolve_embedded(record, self.session.now()) {
                Ok(resolved) => resolved.now.target(),
                Err(e) => {
                    warn!("Heating: schedule for {} unusable: {}", id, e);
                    None
                }
            },
            _ => stated,
        }
    }

    /// `ON` when the zone is calling for heat.
    pub fn state(&self, id: &NodeId) -> Power {
        let live = self.record(id).map(|_| {
            let mode = self.mode(id);
            let boost = self.boost(id);
            let current = self.current_temperature(id);
            let target = self.target_temperature(id);
            let active = matches!(mode, HeatingMode::Schedule | HeatingMode::Manual) || boost == Boost::On;
            if active && current < target { Power::On } else { Power::Off }
        });
        self.session.cached(id, Attribute::HeatingState, live, Power::Unknown)
    }

    /// Resolved schedule triple; `None` outside `SCHEDULE` mode.
    pub fn schedule_now_next_later(&self, id: &NodeId) -> Option<ResolvedSchedule> {
        if self.mode(id) != HeatingMode::Schedule {
            return None;
        }
        let record = self.record(id)?;
        resolve_embedded(&record, self.session.now())
            .inspect_err(|e| warn!("Heating: schedule for {} unusable: {}", id, e))
            .ok()
    }

    pub fn set_mode(&self, id: &NodeId, mode: HeatingMode) -> bool {
        reported("set heating mode", id, self.try_set_mode(id, mode))
    }

    pub fn try_set_mode(&self, id: &NodeId, mode: HeatingMode) -> Result<(), CommandError> {
        if mode == HeatingMode::Unknown {
            return Err(CommandError::UnsupportedMode(mode.as_str()));
        }
        self.session
            .send_node_command(Kind::Heating, id, json!({"mode": mode.as_str()}))
    }

    pub fn set_target_temperature(&self, id: &NodeId, target: f64) -> bool {
        reported(
            "set target temperature",
            id,
            self.session
                .send_node_command(Kind::Heating, id, json!({"target": target})),
        )
    }

    pub fn turn_boost_on(&self, id: &NodeId, minutes: i64, target: f64) -> bool {
        reported("boost heating", id, self.try_turn_boost_on(id, minutes, target))
    }

    pub fn try_turn_boost_on(&self, id: &NodeId, minutes: i64, target: f64) -> Result<(), CommandError> {
        if minutes <= 0 {
            return Err(CommandError::InvalidBoostDuration(minutes));
        }
        let (min, max) = (self.min_temperature(id), self.max_temperature(id));
        if !(min..=max).contains(&target) {
            return Err(CommandError::TargetOutOfRange { target, min, max });
        }
        self.session.send_node_command(
            Kind::Heating,
            id,
            json!({"mode": "BOOST", "boost": minutes, "target": target}),
        )
    }

    pub fn turn_boost_off(&self, id: &NodeId) -> bool {
        reported("end heating boost", id, self.try_turn_boost_off(id))
    }

    /// Restore the interrupted mode, and its target when that mode was `MANUAL`.
    pub fn try_turn_boost_off(&self, id: &NodeId) -> Result<(), CommandError> {
        if self.boost(id) != Boost::On {
            return Err(CommandError::BoostNotActive(id.to_string()));
        }
        let record = self
            .record(id)
            .ok_or_else(|| CommandError::UnknownDevice(id.to_string()))?;
        let previous = previous_mode(&record).ok_or_else(|| CommandError::NoPreviousMode(id.to_string()))?;

        let mut payload = json!({"mode": previous});
        if previous == HeatingMode::Manual.as_str() {
            if let Some(target) = record.prop_path(&["previous", "target"]) {
                payload["target"] = target.clone();
            }
        }
        self.session.send_node_command(Kind::Heating, id, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::fixtures::heating_week;
    use crate::session::testing::{Harness, at};

    fn zone(state: Value, props: Value) -> Value {
        json!([{"id": "h1", "type": "heating", "state": state, "props": props}])
    }

    fn id() -> NodeId {
        NodeId::from("h1")
    }

    #[test]
    fn manual_mode_calls_for_heat_below_target() {
        let harness = Harness::new(
            json!([]),
            zone(json!({"mode": "MANUAL", "target": 20.0, "boost": null}), json!({"temperature": 18.0})),
            at("2024-03-04", "10:00"),
        );
        let heating = harness.session.heating();
        assert_eq!(heating.state(&id()), Power::On);

        harness.set_products(zone(
            json!({"mode": "MANUAL", "target": 20.0, "boost": null}),
            json!({"temperature": 21.0}),
        ));
        harness.session.refresh().expect("refresh");
        assert_eq!(heating.state(&id()), Power::Off);
    }

    #[test]
    fn off_mode_never_heats() {
        let harness = Harness::new(
            json!([]),
            zone(json!({"mode": "OFF", "target": 20.0, "boost": null}), json!({"temperature": 10.0})),
            at("2024-03-04", "10:00"),
        );
        assert_eq!(harness.session.heating().state(&id()), Power::Off);
    }

    #[test]
    fn boost_reports_interrupted_mode() {
        let harness = Harness::new(
            json!([]),
            zone(
                json!({"mode": "BOOST", "boost": 30, "target": 22.0}),
                json!({"previous": {"mode": "MANUAL", "target": 19.0}, "temperature": 18.0}),
            ),
            at("2024-03-04", "10:00"),
        );
        let heating = harness.session.heating();
        assert_eq!(heating.mode(&id()), HeatingMode::Manual);
        assert_eq!(heating.boost(&id()), Boost::On);
        assert_eq!(heating.boost_time_remaining(&id()), Some(30));
        assert_eq!(heating.state(&id()), Power::On);
    }

    #[test]
    fn schedule_target_follows_current_slot() {
        let harness = Harness::new(
            json!([]),
            zone(
                json!({"mode": "SCHEDULE", "target": 25.0, "boost": null, "schedule": heating_week()}),
                json!({"scheduleOverride": false}),
            ),
            at("2024-03-04", "09:00"),
        );
        let heating = harness.session.heating();
        assert_eq!(heating.target_temperature(&id()), 20.0);

        let resolved = heating.schedule_now_next_later(&id()).expect("resolved");
        assert_eq!(resolved.now.target(), Some(20.0));
        assert_eq!(resolved.next.target(), Some(16.0));
        assert_eq!(resolved.now.end, at("2024-03-04", "20:00"));
    }

    #[test]
    fn schedule_override_uses_stated_target() {
        let harness = Harness::new(
            json!([]),
            zone(
                json!({"mode": "SCHEDULE", "target": 25.0, "boost": null, "schedule": heating_week()}),
                json!({"scheduleOverride": true}),
            ),
            at("2024-03-04", "09:00"),
        );
        assert_eq!(harness.session.heating().target_temperature(&id()), 25.0);
    }

    #[test]
    fn no_schedule_triple_outside_schedule_mode() {
        let harness = Harness::new(
            json!([]),
            zone(json!({"mode": "MANUAL", "schedule": heating_week()}), json!({})),
            at("2024-03-04", "09:00"),
        );
        assert!(harness.session.heating().schedule_now_next_later(&id()).is_none());
    }

    #[test]
    fn missing_fields_fall_back_to_last_known_values() {
        let harness = Harness::new(
            json!([]),
            zone(json!({"mode": "MANUAL", "target": 21.0}), json!({"temperature": 19.5})),
            at("2024-03-04", "09:00"),
        );
        let heating = harness.session.heating();
        assert_eq!(heating.target_temperature(&id()), 21.0);
        assert_eq!(heating.current_temperature(&id()), 19.5);

        harness.set_products(zone(json!({}), json!({})));
        harness.session.refresh().expect("refresh");
        assert_eq!(heating.mode(&id()), HeatingMode::Manual);
        assert_eq!(heating.target_temperature(&id()), 21.0);
        assert_eq!(heating.current_temperature(&id()), 19.5);
        assert_eq!(heating.min_temperature(&id()), DEFAULT_MIN_TEMPERATURE);
        assert_eq!(heating.boost(&id()), Boost::Unknown);
    }

    #[test]
    fn unknown_temperature_is_zero_and_untracked() {
        let harness = Harness::new(json!([]), zone(json!({}), json!({})), at("2024-03-04", "09:00"));
        let heating = harness.session.heating();
        assert_eq!(heating.current_temperature(&id()), 0.0);
        assert!(heating.min_max_temperatures(&id()).is_none());
    }

    #[test]
    fn temperature_reads_feed_min_max() {
        let harness = Harness::new(json!([]), zone(json!({}), json!({"temperature": 19.0})), at("2024-03-04", "09:00"));
        let heating = harness.session.heating();
        heating.current_temperature(&id());

        harness.set_products(zone(json!({}), json!({"temperature": 17.0})));
        harness.session.refresh().expect("refresh");
        heating.current_temperature(&id());

        let record = heating.min_max_temperatures(&id()).expect("tracked");
        assert_eq!((record.today_min, record.today_max), (17.0, 19.0));
    }

    #[test]
    fn boost_on_validates_before_sending() {
        let harness = Harness::new(
            json!([]),
            zone(json!({"mode": "MANUAL"}), json!({"minTemperature": 5.0, "maxTemperature": 32.0})),
            at("2024-03-04", "09:00"),
        );
        let heating = harness.session.heating();

        assert!(matches!(
            heating.try_turn_boost_on(&id(), 0, 21.0),
            Err(CommandError::InvalidBoostDuration(0))
        ));
        assert!(matches!(
            heating.try_turn_boost_on(&id(), 30, 40.0),
            Err(CommandError::TargetOutOfRange { .. })
        ));
        assert!(harness.commands().is_empty());

        assert!(heating.turn_boost_on(&id(), 30, 22.5));
        assert_eq!(
            harness.commands(),
            vec![(
                "/nodes/heating/h1".to_string(),
                json!({"mode": "BOOST", "boost": 30, "target": 22.5})
            )]
        );
    }

    #[test]
    fn boost_off_restores_manual_target() {
        let harness = Harness::new(
            json!([]),
            zone(
                json!({"mode": "BOOST", "boost": 12}),
                json!({"previous": {"mode": "MANUAL", "target": 19.0}}),
            ),
            at("2024-03-04", "09:00"),
        );
        assert!(harness.session.heating().turn_boost_off(&id()));
        assert_eq!(harness.commands()[0].1, json!({"mode": "MANUAL", "target": 19.0}));
    }

    #[test]
    fn boost_off_to_schedule_sends_mode_only() {
        let harness = Harness::new(
            json!([]),
            zone(
                json!({"mode": "BOOST", "boost": 12}),
                json!({"previous": {"mode": "SCHEDULE", "target": 19.0}}),
            ),
            at("2024-03-04", "09:00"),
        );
        assert!(harness.session.heating().turn_boost_off(&id()));
        assert_eq!(harness.commands(), vec![("/nodes/heating/h1".to_string(), json!({"mode": "SCHEDULE"}))]);
    }

    #[test]
    fn boost_off_without_memory_is_unsuccessful() {
        let harness = Harness::new(json!([]), zone(json!({"mode": "BOOST", "boost": 12}), json!({})), at("2024-03-04", "09:00"));
        let heating = harness.session.heating();
        assert!(matches!(
            heating.try_turn_boost_off(&id()),
            Err(CommandError::NoPreviousMode(_))
        ));
        assert!(!heating.turn_boost_off(&id()));
        assert!(harness.commands().is_empty());
    }

    #[test]
    fn boost_off_requires_active_boost() {
        let harness = Harness::new(json!([]), zone(json!({"mode": "MANUAL", "boost": null}), json!({})), at("2024-03-04", "09:00"));
        assert!(matches!(
            harness.session.heating().try_turn_boost_off(&id()),
            Err(CommandError::BoostNotActive(_))
        ));
        assert!(harness.commands().is_empty());
    }

    #[test]
    fn set_mode_writes_raw_mode() {
        let harness = Harness::new(json!([]), zone(json!({"mode": "OFF"}), json!({})), at("2024-03-04", "09:00"));
        let heating = harness.session.heating();
        assert!(heating.set_mode(&id(), HeatingMode::Schedule));
        assert!(!heating.set_mode(&id(), HeatingMode::Unknown));
        assert!(heating.set_target_temperature(&id(), 18.5));
        let payloads: Vec<Value> = harness.commands().into_iter().map(|(_, p)| p).collect();
        assert_eq!(payloads, vec![json!({"mode": "SCHEDULE"}), json!({"target": 18.5})]);
    }
}
