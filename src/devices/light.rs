use crate::cache::Attribute;
use crate::models::hive::{DeviceRecord, NodeId};
use crate::session::{HiveSession, reported};
use crate::snapshot::Kind;
use crate::utils::{hsv_to_rgb, kelvin_to_mired};
use serde_json::{Value, json};

/// Light resolver. Cached values are the raw device readings; unit conversion happens
/// after fallback so cached and live reads agree.
pub struct Light<'a> {
    session: &'a HiveSession,
}

impl<'a> Light<'a> {
    pub(crate) fn new(session: &'a HiveSession) -> Self {
        Light { session }
    }

    fn record(&self, id: &NodeId) -> Option<DeviceRecord> {
        self.session.product(Kind::Light, id)
    }

    pub fn state(&self, id: &NodeId) -> bool {
        let live = self
            .record(id)
            .and_then(|r| r.state_str("status").map(|s| s == "ON"));
        self.session.cached(id, Attribute::LightState, live, false)
    }

    /// Brightness scaled from the device's 0-100 to 0-255.
    pub fn brightness(&self, id: &NodeId) -> u8 {
        let live = self.record(id).and_then(|r| r.state_f64("brightness"));
        let percent = self.session.cached(id, Attribute::LightBrightness, live, 0.0);
        (percent.clamp(0.0, 100.0) / 100.0 * 255.0).round() as u8
    }

    /// Coldest supported colour temperature, in mireds.
    pub fn min_colour_temp(&self, id: &NodeId) -> u32 {
        let live = self
            .record(id)
            .and_then(|r| r.prop_path(&["colourTemperature", "max"]).and_then(Value::as_f64));
        kelvin_to_mired(self.session.cached(id, Attribute::LightMinColourTemp, live, 0.0))
    }

    /// Warmest supported colour temperature, in mireds.
    pub fn max_colour_temp(&self, id: &NodeId) -> u32 {
        let live = self
            .record(id)
            .and_then(|r| r.prop_path(&["colourTemperature", "min"]).and_then(Value::as_f64));
        kelvin_to_mired(self.session.cached(id, Attribute::LightMaxColourTemp, live, 0.0))
    }

    pub fn colour_temp(&self, id: &NodeId) -> u32 {
        let live = self.record(id).and_then(|r| r.state_f64("colourTemperature"));
        kelvin_to_mired(self.session.cached(id, Attribute::LightColourTemp, live, 0.0))
    }

    pub fn colour_mode(&self, id: &NodeId) -> String {
        let live = self
            .record(id)
            .and_then(|r| r.state_str("colourMode").map(str::to_string));
        self.session
            .cached(id, Attribute::LightColourMode, live, "UNKNOWN".to_string())
    }

    pub fn rgb(&self, id: &NodeId) -> (u8, u8, u8) {
        let live = self.record(id).and_then(|r| {
            Some((
                r.state_f64("hue")?,
                r.state_f64("saturation")?,
                r.state_f64("value")?,
            ))
        });
        let (hue, saturation, value) = self
            .session
            .cached(id, Attribute::LightColour, live, (0.0, 0.0, 0.0));
        hsv_to_rgb(hue, saturation, value)
    }

    pub fn turn_on(&self, id: &NodeId) -> bool {
        self.send("turn on light", id, json!({"status": "ON"}))
    }

    pub fn turn_off(&self, id: &NodeId) -> bool {
        self.send("turn off light", id, json!({"status": "OFF"}))
    }

    /// `brightness` is a 0-100 percentage.
    pub fn set_brightness(&self, id: &NodeId, brightness: u8) -> bool {
        self.send(
            "set brightness",
            id,
            json!({"status": "ON", "brightness": brightness.min(100)}),
        )
    }

    pub fn set_colour_temp(&self, id: &NodeId, kelvin: u32) -> bool {
        self.send("set colour temperature", id, json!({"colourTemperature": kelvin}))
    }

    pub fn set_colour(&self, id: &NodeId, hue: u16, saturation: u8, value: u8) -> bool {
        self.send(
            "set colour",
            id,
            json!({"colourMode": "COLOUR", "hue": hue, "saturation": saturation, "value": value}),
        )
    }

    fn send(&self, action: &str, id: &NodeId, payload: Value) -> bool {
        reported(action, id, self.session.send_node_command(Kind::Light, id, payload))
    }
}
