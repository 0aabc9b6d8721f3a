use super::{boost_aware_mode, boost_flag, boost_minutes, previous_mode, resolve_embedded};
use crate::cache::Attribute;
use crate::models::hive::{Boost, DeviceRecord, HotWaterMode, NodeId, Power};
use crate::schedule::ResolvedSchedule;
use crate::session::{CommandError, HiveSession, reported};
use crate::snapshot::Kind;
use log::warn;
use serde_json::{Value, json};

/// Hot water resolver. The device's `MANUAL` mode is exposed as `ON`.
pub struct HotWater<'a> {
    session: &'a HiveSession,
}

impl<'a> HotWater<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        HotWater { session }
    }

    fn record(&self, id: &NodeId) -> Option<DeviceRecord> {
        self.session.product(Kind::HotWater, id)
    }

    pub fn operation_modes(&self) -> [HotWaterMode; 3] {
        HotWaterMode::OPERATION_MODES
    }

    pub fn mode(&self, id: &NodeId) -> HotWaterMode {
        let live = self
            .record(id)
            .and_then(|r| boost_aware_mode(&r, HotWaterMode::from_raw));
        self.session
            .cached(id, Attribute::HotWaterMode, live, HotWaterMode::Unknown)
    }

    pub fn boost(&self, id: &NodeId) -> Boost {
        let live = self.record(id).as_ref().and_then(boost_flag);
        self.session.cached(id, Attribute::HotWaterBoost, live, Boost::Unknown)
    }

    pub fn boost_time_remaining(&self, id: &NodeId) -> Option<i64> {
        if self.boost(id) != Boost::On {
            return None;
        }
        self.record(id).as_ref().and_then(boost_minutes)
    }

    /// Whether water is being heated. Under `SCHEDULE` without boost the current slot decides.
    pub fn state(&self, id: &NodeId) -> Power {
        let live = self.record(id).and_then(|r| self.live_state(id, &r));
        self.session.cached(id, Attribute::HotWaterState, live, Power::Unknown)
    }

    fn live_state(&self, id: &NodeId, record: &DeviceRecord) -> Option<Power> {
        let status = match record.state_field("status")? {
            Value::Null => return Some(Power::Off),
            Value::String(s) => s.as_str(),
            _ => return None,
        };
        if self.mode(id) != HotWaterMode::Schedule {
            return Power::from_raw(status);
        }
        if self.boost(id) == Boost::On {
            return Some(Power::On);
        }
        match resolve_embedded(record, self.session.now()) {
            Ok(resolved) => resolved.now.status().and_then(Power::from_raw),
            Err(e) => {
                warn!("Hot water: schedule for {} unusable: {}", id, e);
                None
            }
        }
    }

    pub fn schedule_now_next_later(&self, id: &NodeId) -> Option<ResolvedSchedule> {
        if self.mode(id) != HotWaterMode::Schedule {
            return None;
        }
        let record = self.record(id)?;
        resolve_embedded(&record, self.session.now())
            .inspect_err(|e| warn!("Hot water: schedule for {} unusable: {}", id, e))
            .ok()
    }

    pub fn set_mode(&self, id: &NodeId, mode: HotWaterMode) -> bool {
        reported("set hot water mode", id, self.try_set_mode(id, mode))
    }

    pub fn try_set_mode(&self, id: &NodeId, mode: HotWaterMode) -> Result<(), CommandError> {
        let raw = mode.to_raw().ok_or(CommandError::UnsupportedMode(mode.as_str()))?;
        self.session
            .send_node_command(Kind::HotWater, id, json!({"mode": raw}))
    }

    pub fn turn_boost_on(&self, id: &NodeId, minutes: i64) -> bool {
        reported("boost hot water", id, self.try_turn_boost_on(id, minutes))
    }

    pub fn try_turn_boost_on(&self, id: &NodeId, minutes: i64) -> Result<(), CommandError> {
        if minutes <= 0 {
            return Err(CommandError::InvalidBoostDuration(minutes));
        }
        self.session
            .send_node_command(Kind::HotWater, id, json!({"mode": "BOOST", "boost": minutes}))
    }

    pub fn turn_boost_off(&self, id: &NodeId) -> bool {
        reported("end hot water boost", id, self.try_turn_boost_off(id))
    }

    pub fn try_turn_boost_off(&self, id: &NodeId) -> Result<(), CommandError> {
        if self.boost(id) != Boost::On {
            return Err(CommandError::BoostNotActive(id.to_string()));
        }
        let record = self
            .record(id)
            .ok_or_else(|| CommandError::UnknownDevice(id.to_string()))?;
        let previous = previous_mode(&record).ok_or_else(|| CommandError::NoPreviousMode(id.to_string()))?;
        self.session
            .send_node_command(Kind::HotWater, id, json!({"mode": previous}))
    }
}
