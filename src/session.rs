//! Explicit session context shared by every resolver.
//!
//! A session owns the transport, the latest snapshot, the attribute cache and the
//! temperature tracker for one account. Resolvers borrow it through the accessors at the
//! bottom of this file; nothing here is process-global.

use crate::cache::{Attribute, AttributeCache, Cacheable};
use crate::client::{HiveClientError, HiveTransport};
use crate::devices::{Heating, HotWater, Light, Sensor, Switch, Weather};
use crate::models::hive::{DeviceRecord, NodeId, WeatherConditions};
use crate::snapshot::{Entity, Kind, Snapshot};
use crate::telemetry::{MinMaxRecord, TemperatureTracker};
use chrono::{Local, NaiveDateTime, TimeDelta};
use log::{debug, info, warn};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use thiserror::Error;

/// Wall-clock source for schedule resolution and refresh pacing.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Minimum spacing between snapshot refreshes.
    pub update_interval: TimeDelta,
    pub weather_interval: TimeDelta,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            update_interval: TimeDelta::minutes(2),
            weather_interval: TimeDelta::seconds(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown device {0}")]
    UnknownDevice(String),
    #[error("mode {0} cannot be written")]
    UnsupportedMode(&'static str),
    #[error("invalid boost duration {0} minutes")]
    InvalidBoostDuration(i64),
    #[error("target {target} outside [{min}, {max}]")]
    TargetOutOfRange { target: f64, min: f64, max: f64 },
    #[error("device {0} has no previous mode to restore")]
    NoPreviousMode(String),
    #[error("boost is not active on {0}")]
    BoostNotActive(String),
    #[error("command rejected with http status {0}")]
    Rejected(u16),
    #[error(transparent)]
    Client(#[from] HiveClientError),
}

/// Log a failed command and collapse the result into success/failure.
pub(crate) fn reported(action: &str, id: &NodeId, result: Result<(), CommandError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Hive: {} on {} failed: {}", action, id, e);
            false
        }
    }
}

pub struct HiveSession {
    transport: Box<dyn HiveTransport>,
    clock: Box<dyn Clock>,
    options: SessionOptions,
    snapshot: RefCell<Snapshot>,
    cache: RefCell<AttributeCache>,
    tracker: RefCell<TemperatureTracker>,
    weather: RefCell<Option<WeatherConditions>>,
    last_refresh: Cell<Option<NaiveDateTime>>,
    last_weather: Cell<Option<NaiveDateTime>>,
}

impl HiveSession {
    pub fn new(transport: Box<dyn HiveTransport>, clock: Box<dyn Clock>, options: SessionOptions) -> Self {
        HiveSession {
            transport,
            clock,
            options,
            snapshot: RefCell::new(Snapshot::default()),
            cache: RefCell::new(AttributeCache::new()),
            tracker: RefCell::new(TemperatureTracker::new()),
            weather: RefCell::new(None),
            last_refresh: Cell::new(None),
            last_weather: Cell::new(None),
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    /// Fetch both listings and merge them into the snapshot.
    ///
    /// If either fetch fails the previous snapshot is left untouched.
    pub fn refresh(&self) -> Result<(), HiveClientError> {
        let devices = self.transport.fetch_devices().inspect_err(|e| {
            warn!("Hive: fetching devices failed: {}", e);
        })?;
        let products = self.transport.fetch_products().inspect_err(|e| {
            warn!("Hive: fetching products failed: {}", e);
        })?;
        let fresh = Snapshot::from_records(devices, products);
        let fetched = fresh.record_count();

        {
            let mut snapshot = self.snapshot.borrow_mut();
            snapshot.merge(fresh);
            debug!(
                "Hive: snapshot refreshed ({} records fetched, {} held)",
                fetched,
                snapshot.record_count()
            );
        }
        self.last_refresh.set(Some(self.now()));
        Ok(())
    }

    /// Refresh only when the update interval has elapsed. Returns whether a refresh ran.
    pub fn refresh_if_due(&self) -> Result<bool, HiveClientError> {
        if !self.is_due(self.last_refresh.get(), self.options.update_interval) {
            return Ok(false);
        }
        self.refresh()?;
        Ok(true)
    }

    pub fn refresh_weather_if_due(&self) -> Result<bool, HiveClientError> {
        if !self.is_due(self.last_weather.get(), self.options.weather_interval) {
            return Ok(false);
        }
        let report = self.transport.fetch_weather()?;
        match report.weather {
            Some(conditions) => {
                *self.weather.borrow_mut() = Some(conditions);
                self.last_weather.set(Some(self.now()));
                Ok(true)
            }
            None => {
                warn!("Hive: weather response carried no conditions");
                Ok(false)
            }
        }
    }

    fn is_due(&self, last: Option<NaiveDateTime>, interval: TimeDelta) -> bool {
        match last {
            None => true,
            Some(at) => self.now() - at >= interval,
        }
    }

    pub fn entities(&self) -> Vec<Entity> {
        self.snapshot.borrow().entities()
    }

    pub(crate) fn product(&self, kind: Kind, id: &NodeId) -> Option<DeviceRecord> {
        self.snapshot.borrow().product(kind, id).cloned()
    }

    pub(crate) fn device(&self, kind: Kind, id: &NodeId) -> Option<DeviceRecord> {
        self.snapshot.borrow().device(kind, id).cloned()
    }

    /// Route a live read through the attribute cache.
    pub(crate) fn cached<V: Cacheable>(&self, id: &NodeId, attribute: Attribute, live: Option<V>, default: V) -> V {
        self.cache.borrow_mut().resolve(id, attribute, live, default)
    }

    /// Last cached value without a live read.
    pub(crate) fn last_known<V: Cacheable>(&self, id: &NodeId, attribute: Attribute) -> Option<V> {
        self.cache.borrow().get(id, attribute).and_then(V::from_cached)
    }

    pub(crate) fn observe_temperature(&self, id: &NodeId, temperature: f64) {
        self.tracker.borrow_mut().observe(id, temperature, self.now().date());
    }

    pub fn min_max_temperatures(&self, id: &NodeId) -> Option<MinMaxRecord> {
        self.tracker.borrow().min_max(id)
    }

    pub(crate) fn weather_conditions(&self) -> Option<WeatherConditions> {
        self.weather.borrow().clone()
    }

    /// POST `payload` to `/nodes/{type}/{id}`; a 200 triggers an immediate refresh.
    pub(crate) fn send_node_command(&self, kind: Kind, id: &NodeId, payload: Value) -> Result<(), CommandError> {
        let node_type = self
            .product(kind, id)
            .and_then(|record| record.r#type)
            .ok_or_else(|| CommandError::UnknownDevice(id.to_string()))?;
        let path = format!("/nodes/{}/{}", node_type, id);

        let status = self.transport.send_command(&path, &payload)?;
        if status != 200 {
            return Err(CommandError::Rejected(status));
        }
        info!("Hive: {} accepted {}", id, payload);
        if let Err(e) = self.refresh() {
            warn!("Hive: refresh after command to {} failed: {}", id, e);
        }
        Ok(())
    }

    pub fn heating(&self) -> Heating<'_> {
        Heating::new(self)
    }

    pub fn hot_water(&self) -> HotWater<'_> {
        HotWater::new(self)
    }

    pub fn light(&self) -> Light<'_> {
        Light::new(self)
    }

    pub fn switch(&self) -> Switch<'_> {
        Switch::new(self)
    }

    pub fn sensor(&self) -> Sensor<'_> {
        Sensor::new(self)
    }

    pub fn weather(&self) -> Weather<'_> {
        Weather::new(self)
    }
}
