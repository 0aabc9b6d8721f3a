//! Models for the Hive platform API payloads.
//!
//! Scope: types only; the HTTP client lives in `client`.
//!
//! Notes
//! - Device and product records keep their `state`/`props` objects as raw JSON maps.
//!   Resolvers read individual fields on demand and fall back to the attribute cache
//!   when a field is absent, so a partial record must still deserialize.
//! - Mode and on/off values are exchanged as SCREAMING_SNAKE_CASE strings.

use core::fmt;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

// =====================
// Raw device / product record
// =====================

/// One entry of the `/devices` or `/products` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DeviceRecord {
    pub id: Option<NodeId>,
    #[serde(rename = "type")]
    pub r#type: Option<String>,
    pub state: Option<Map<String, Value>>,
    pub props: Option<Map<String, Value>>,
}

impl DeviceRecord {
    pub fn state_field(&self, key: &str) -> Option<&Value> {
        self.state.as_ref()?.get(key)
    }

    pub fn prop(&self, key: &str) -> Option<&Value> {
        self.props.as_ref()?.get(key)
    }

    /// Walk nested objects under `props`, e.g. `["previous", "mode"]`.
    pub fn prop_path(&self, path: &[&str]) -> Option<&Value> {
        let (first, rest) = path.split_first()?;
        rest.iter().try_fold(self.prop(first)?, |v, key| v.get(key))
    }

    pub fn name(&self) -> Option<&str> {
        self.state_field("name").and_then(Value::as_str)
    }

    pub fn state_str(&self, key: &str) -> Option<&str> {
        self.state_field(key).and_then(Value::as_str)
    }

    pub fn state_f64(&self, key: &str) -> Option<f64> {
        self.state_field(key).and_then(Value::as_f64)
    }

    pub fn prop_f64(&self, key: &str) -> Option<f64> {
        self.prop(key).and_then(Value::as_f64)
    }
}

// =====================
// Mode and state enums
// =====================

/// Effective heating mode. Boost is reported separately, never as a mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeatingMode {
    Schedule,
    Manual,
    Off,
    Unknown,
}

impl HeatingMode {
    pub const OPERATION_MODES: [HeatingMode; 3] = [HeatingMode::Schedule, HeatingMode::Manual, HeatingMode::Off];

    /// Parse a raw mode value. `BOOST` and unrecognised values yield `None`.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULE" => Some(HeatingMode::Schedule),
            "MANUAL" => Some(HeatingMode::Manual),
            "OFF" => Some(HeatingMode::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HeatingMode::Schedule => "SCHEDULE",
            HeatingMode::Manual => "MANUAL",
            HeatingMode::Off => "OFF",
            HeatingMode::Unknown => "UNKNOWN",
        }
    }
}

/// Effective hot water mode. The device's raw `MANUAL` is surfaced as `On`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HotWaterMode {
    Schedule,
    On,
    Off,
    Unknown,
}

impl HotWaterMode {
    pub const OPERATION_MODES: [HotWaterMode; 3] = [HotWaterMode::Schedule, HotWaterMode::On, HotWaterMode::Off];

    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "SCHEDULE" => Some(HotWaterMode::Schedule),
            "MANUAL" | "ON" => Some(HotWaterMode::On),
            "OFF" => Some(HotWaterMode::Off),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            HotWaterMode::Schedule => "SCHEDULE",
            HotWaterMode::On => "ON",
            HotWaterMode::Off => "OFF",
            HotWaterMode::Unknown => "UNKNOWN",
        }
    }

    /// Value the device expects in a `mode` write.
    pub fn to_raw(self) -> Option<&'static str> {
        match self {
            HotWaterMode::Schedule => Some("SCHEDULE"),
            HotWaterMode::On => Some("MANUAL"),
            HotWaterMode::Off => Some("OFF"),
            HotWaterMode::Unknown => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Boost {
    On,
    Off,
    Unknown,
}

impl Boost {
    pub fn as_str(self) -> &'static str {
        match self {
            Boost::On => "ON",
            Boost::Off => "OFF",
            Boost::Unknown => "UNKNOWN",
        }
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "ON" => Some(Boost::On),
            "OFF" => Some(Boost::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Power {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
    #[serde(rename = "UNKNOWN")]
    Unknown,
}

impl Power {
    pub fn as_str(self) -> &'static str {
        match self {
            Power::On => "ON",
            Power::Off => "OFF",
            Power::Unknown => "UNKNOWN",
        }
    }

    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw {
            "ON" => Some(Power::On),
            "OFF" => Some(Power::Off),
            _ => None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    ContactSensor,
    MotionSensor,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum HubStatus {
    Online,
    Offline,
}

impl fmt::Display for HubStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HubStatus::Online => f.write_str("Online"),
            HubStatus::Offline => f.write_str("Offline"),
        }
    }
}

// =====================
// Login
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginUser {
    pub locale: Option<String>,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
    pub postcode: Option<String>,
    pub temperature_unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginPlatform {
    pub endpoint: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: Option<String>,
    pub user: Option<LoginUser>,
    pub platform: Option<LoginPlatform>,
}

// =====================
// Weather
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherTemperature {
    pub unit: Option<String>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherConditions {
    pub icon: Option<String>,
    pub description: Option<String>,
    pub temperature: Option<WeatherTemperature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub weather: Option<WeatherConditions>,
}
