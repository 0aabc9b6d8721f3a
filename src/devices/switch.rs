use crate::cache::Attribute;
use crate::models::hive::{DeviceRecord, NodeId};
use crate::session::{HiveSession, reported};
use crate::snapshot::Kind;
use serde_json::json;

/// Smart plug resolver.
pub struct Switch<'a> {
    session: &'a HiveSession,
}

impl<'a> Switch<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        Switch { session }
    }

    fn record(&self, id: &NodeId) -> Option<DeviceRecord> {
        self.session.product(Kind::Plug, id)
    }

    pub fn state(&self, id: &NodeId) -> bool {
        let live = self
            .record(id)
            .and_then(|r| r.state_str("status").map(|s| s == "ON"));
        self.session.cached(id, Attribute::PlugState, live, false)
    }

    /// Instantaneous draw in watts.
    pub fn power_usage(&self, id: &NodeId) -> f64 {
        let live = self.record(id).and_then(|r| r.prop_f64("powerConsumption"));
        self.session.cached(id, Attribute::PlugPowerUsage, live, 0.0)
    }

    pub fn turn_on(&self, id: &NodeId) -> bool {
        reported(
            "turn on plug",
            id,
            self.session.send_node_command(Kind::Plug, id, json!({"status": "ON"})),
        )
    }

    pub fn turn_off(&self, id: &NodeId) -> bool {
        reported(
            "turn off plug",
            id,
            self.session.send_node_command(Kind::Plug, id, json!({"status": "OFF"})),
        )
    }
}
