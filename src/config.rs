//! Runtime configuration read from the environment.

use crate::client::{DEFAULT_LOGIN_URL, DEFAULT_WEATHER_URL};
use crate::session::SessionOptions;
use chrono::TimeDelta;
use std::num::NonZeroU32;
use std::time::Duration;
use std::{fs, path::Path};

pub const DEFAULT_UPDATE_INTERVAL_MINS: i64 = 2;
pub const DEFAULT_WEATHER_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_MAX_REQUEST_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    /// Minimum spacing between snapshot refreshes.
    pub update_interval: Duration,
    pub weather_interval: Duration,
    pub login_url: String,
    pub weather_url: String,
    /// Attempts per read request, including the first.
    pub max_request_retries: NonZeroU32,
    /// Keep polling after the first snapshot.
    pub poll_enabled: bool,
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|s| matches!(s.trim(), "1" | "true" | "TRUE" | "yes"))
        .unwrap_or(default)
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Minutes between refreshes; anything not a positive integer falls back to the default.
fn update_interval_mins(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|mins| *mins > 0)
        .unwrap_or(DEFAULT_UPDATE_INTERVAL_MINS)
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let username = non_empty_env("HIVE_USERNAME").ok_or_else(|| "Missing HIVE_USERNAME".to_string())?;

        // Prefer env var; fall back to password.txt in the working directory
        let password = match non_empty_env("HIVE_PASSWORD") {
            Some(v) => v,
            None => match fs::read_to_string(Path::new("password.txt")) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => {
                    return Err(
                        "Missing password: set HIVE_PASSWORD or provide password.txt in working directory".to_string(),
                    );
                }
            },
        };

        let update_mins = update_interval_mins(std::env::var("HIVE_UPDATE_INTERVAL_MINS").ok().as_deref());

        let weather_secs = std::env::var("HIVE_WEATHER_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_WEATHER_INTERVAL_SECS);

        let max_request_retries = match std::env::var("MAX_REQUEST_RETRIES") {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| "MAX_REQUEST_RETRIES must be a positive integer".to_string())?,
            _ => NonZeroU32::new(DEFAULT_MAX_REQUEST_RETRIES).ok_or_else(|| "invalid default retries".to_string())?,
        };

        Ok(Config {
            username,
            password,
            update_interval: Duration::from_secs(update_mins as u64 * 60),
            weather_interval: Duration::from_secs(weather_secs),
            login_url: non_empty_env("HIVE_LOGIN_URL").unwrap_or_else(|| DEFAULT_LOGIN_URL.to_string()),
            weather_url: non_empty_env("HIVE_WEATHER_URL").unwrap_or_else(|| DEFAULT_WEATHER_URL.to_string()),
            max_request_retries,
            poll_enabled: env_flag("POLL_ENABLED", true),
        })
    }

    pub fn session_options(&self) -> SessionOptions {
        let to_delta = |d: Duration| TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX);
        SessionOptions {
            update_interval: to_delta(self.update_interval),
            weather_interval: to_delta(self.weather_interval),
        }
    }
}
