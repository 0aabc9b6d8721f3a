/// Format a minute-of-day value as `HH:MM`.
pub fn minutes_to_time(minutes: u32) -> String {
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{:02}:{:02}", hours, minutes)
}

/// Convert a colour temperature in kelvin to mireds, rounded. Non-positive input yields 0.
pub fn kelvin_to_mired(kelvin: f64) -> u32 {
    if kelvin <= 0.0 {
        return 0;
    }
    (1_000_000.0 / kelvin).round() as u32
}

/// Convert hue (0-360), saturation (0-100) and value (0-100) to 8-bit RGB.
#[allow(clippy::many_single_char_names)]
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> (u8, u8, u8) {
    let h = hue.rem_euclid(360.0);
    let s = saturation.clamp(0.0, 100.0) / 100.0;
    let v = value.clamp(0.0, 100.0) / 100.0;

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let channel = |n: f64| ((n + m) * 255.0).round() as u8;
    (channel(r), channel(g), channel(b))
}
