//! Last-known-good attribute values, namespaced per device.
//!
//! Every successful live read overwrites the entry for `(device, attribute)`. When a read
//! cannot find its field the resolver asks the cache instead and, failing that, uses the
//! attribute's default. Entries never expire; the attribute set is closed, so each device
//! holds at most one value per [`Attribute`].

use crate::models::hive::{Boost, HeatingMode, HotWaterMode, NodeId, Power};
use log::debug;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    HeatingMinTemperature,
    HeatingMaxTemperature,
    HeatingCurrentTemperature,
    HeatingTargetTemperature,
    HeatingMode,
    HeatingState,
    HeatingBoost,
    HotWaterMode,
    HotWaterBoost,
    HotWaterState,
    LightState,
    LightBrightness,
    LightMinColourTemp,
    LightMaxColourTemp,
    LightColourTemp,
    LightColourMode,
    LightColour,
    PlugState,
    PlugPowerUsage,
    BatteryLevel,
    SensorState,
    DeviceMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Number(f64),
    Text(String),
    Flag(bool),
    Triple(f64, f64, f64),
}

/// Types that can be stored in the attribute cache.
pub trait Cacheable: Sized {
    fn to_cached(&self) -> CachedValue;
    fn from_cached(value: &CachedValue) -> Option<Self>;
}

impl Cacheable for f64 {
    fn to_cached(&self) -> CachedValue {
        CachedValue::Number(*self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl Cacheable for bool {
    fn to_cached(&self) -> CachedValue {
        CachedValue::Flag(*self)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

impl Cacheable for String {
    fn to_cached(&self) -> CachedValue {
        CachedValue::Text(self.clone())
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Text(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl Cacheable for (f64, f64, f64) {
    fn to_cached(&self) -> CachedValue {
        CachedValue::Triple(self.0, self.1, self.2)
    }

    fn from_cached(value: &CachedValue) -> Option<Self> {
        match value {
            CachedValue::Triple(a, b, c) => Some((*a, *b, *c)),
            _ => None,
        }
    }
}

macro_rules! cacheable_as_text {
    ($ty:ty, $parse:expr) => {
        impl Cacheable for $ty {
            fn to_cached(&self) -> CachedValue {
                CachedValue::Text(self.as_str().to_string())
            }

            fn from_cached(value: &CachedValue) -> Option<Self> {
                match value {
                    CachedValue::Text(s) => $parse(s.as_str()),
                    _ => None,
                }
            }
        }
    };
}

cacheable_as_text!(HeatingMode, HeatingMode::from_raw);
cacheable_as_text!(HotWaterMode, HotWaterMode::from_raw);
cacheable_as_text!(Boost, Boost::from_raw);
cacheable_as_text!(Power, Power::from_raw);

#[derive(Debug, Default)]
pub struct AttributeCache {
    entries: HashMap<NodeId, BTreeMap<Attribute, CachedValue>>,
}

impl AttributeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, id: &NodeId, attribute: Attribute, value: CachedValue) {
        self.entries.entry(id.clone()).or_default().insert(attribute, value);
    }

    pub fn get(&self, id: &NodeId, attribute: Attribute) -> Option<&CachedValue> {
        self.entries.get(id)?.get(&attribute)
    }

    /// Store `live` when present; otherwise return the cached value or `default`.
    pub fn resolve<T: Cacheable>(&mut self, id: &NodeId, attribute: Attribute, live: Option<T>, default: T) -> T {
        match live {
            Some(value) => {
                self.put(id, attribute, value.to_cached());
                value
            }
            None => match self.get(id, attribute).and_then(T::from_cached) {
                Some(cached) => {
                    debug!("Cache: {:?} for {} served from last known value", attribute, id);
                    cached
                }
                None => {
                    debug!("Cache: {:?} for {} unavailable; using default", attribute, id);
                    default
                }
            },
        }
    }
}
