use crate::cache::Attribute;
use crate::models::hive::{HubStatus, NodeId, SensorKind};
use crate::session::HiveSession;
use crate::snapshot::Kind;
use serde_json::Value;

/// Hub, battery, contact/motion and device-mode readers.
pub struct Sensor<'a> {
    session: &'a HiveSession,
}

impl<'a> Sensor<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        Sensor { session }
    }

    /// Reported as-is; not cached.
    pub fn hub_online_status(&self, id: &NodeId) -> HubStatus {
        let online = self
            .session
            .device(Kind::Hub, id)
            .and_then(|r| r.prop("online").and_then(Value::as_bool))
            .unwrap_or(false);
        if online { HubStatus::Online } else { HubStatus::Offline }
    }

    /// Battery percentage of a thermostat or sensor device.
    pub fn battery_level(&self, id: &NodeId) -> f64 {
        let live = [Kind::Thermostat, Kind::Sensor]
            .into_iter()
            .find_map(|kind| self.session.device(kind, id))
            .and_then(|r| r.prop_f64("battery"));
        self.session.cached(id, Attribute::BatteryLevel, live, 0.0)
    }

    /// `true` when a contact sensor is open or a motion sensor sees motion.
    pub fn state(&self, id: &NodeId, kind: SensorKind) -> bool {
        let live = self.session.product(Kind::Sensor, id).and_then(|r| match kind {
            SensorKind::ContactSensor => r.prop("status").and_then(Value::as_str).map(|s| s == "OPEN"),
            SensorKind::MotionSensor => r.prop_path(&["motion", "status"]).and_then(Value::as_bool),
        });
        self.session.cached(id, Attribute::SensorState, live, false)
    }

    /// Raw `state.mode` of a light or plug.
    pub fn mode(&self, id: &NodeId) -> String {
        let live = [Kind::Light, Kind::Plug]
            .into_iter()
            .find_map(|kind| self.session.product(kind, id))
            .and_then(|r| r.state_str("mode").map(str::to_string));
        self.session
            .cached(id, Attribute::DeviceMode, live, "UNKNOWN".to_string())
    }
}
