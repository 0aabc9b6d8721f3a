//! Blocking HTTP client for the Hive platform API.
//!
//! - Blocking client using `ureq` (no async).
//! - Logs on with username/password against the global login endpoint; the response names
//!   the platform endpoint that serves `/devices`, `/products` and `/nodes`.
//! - The session token is renewed after 15 minutes, and once more on a 401 from a read.
//! - Reads retry transient failures with jittered backoff. Writes are sent once.

use crate::models::hive::{DeviceRecord, LoginResponse, WeatherReport};
use http::StatusCode;
use log::{debug, info, warn};
use rand::Rng;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::cell::RefCell;
use std::num::NonZeroU32;
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

pub const DEFAULT_LOGIN_URL: &str = "https://beekeeper.hivehome.com/1.0/global/login";
pub const DEFAULT_WEATHER_URL: &str = "https://weather-prod.bgchprod.info/weather";

const SESSION_LIFETIME: Duration = Duration::from_secs(15 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RETRY_BASE_DELAY_MS: u64 = 500;
const RETRY_JITTER_MS: u64 = 250;

#[derive(Debug, Error)]
pub enum HiveClientError {
    #[error("no active session")]
    MissingSession,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("json error at {path}: {message}")]
    Json { path: String, message: String },
    #[error("auth error: {0}")]
    Auth(String),
}

impl HiveClientError {
    fn is_transient(&self) -> bool {
        match self {
            HiveClientError::Transport(_) => true,
            HiveClientError::Http { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<ureq::Error> for HiveClientError {
    fn from(value: ureq::Error) -> Self {
        HiveClientError::Transport(value.to_string())
    }
}

/// Source of raw snapshots and sink for device commands.
pub trait HiveTransport {
    fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, HiveClientError>;

    fn fetch_products(&self) -> Result<Vec<DeviceRecord>, HiveClientError>;

    /// POST `payload` to `path` under the platform endpoint; returns the HTTP status.
    fn send_command(&self, path: &str, payload: &Value) -> Result<u16, HiveClientError>;

    fn fetch_weather(&self) -> Result<WeatherReport, HiveClientError>;
}

/// Account details returned at logon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Account {
    pub platform_name: Option<String>,
    pub locale: Option<String>,
    pub country_code: Option<String>,
    pub timezone: Option<String>,
    pub postcode: Option<String>,
    pub temperature_unit: Option<String>,
}

#[derive(Debug, Clone)]
struct SessionToken {
    token: String,
    base_url: String,
    logged_in_at: Instant,
    account: Account,
}

pub struct HiveClient {
    agent: ureq::Agent,
    login_url: String,
    weather_url: String,
    username: String,
    password: String,
    max_retries: NonZeroU32,
    session: RefCell<Option<SessionToken>>,
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, HiveClientError> {
    let de = &mut serde_json::Deserializer::from_str(body);
    serde_path_to_error::deserialize(de).map_err(|e| HiveClientError::Json {
        path: e.path().to_string(),
        message: e.inner().to_string(),
    })
}

fn retry_delay(attempt: u32) -> Duration {
    let exp = RETRY_BASE_DELAY_MS.saturating_mul(1 << attempt.saturating_sub(1).min(6));
    let jitter = rand::rng().random_range(0..RETRY_JITTER_MS);
    Duration::from_millis(exp + jitter)
}

impl HiveClient {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        login_url: impl Into<String>,
        weather_url: impl Into<String>,
        max_retries: NonZeroU32,
    ) -> Result<Self, HiveClientError> {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .http_status_as_error(false)
            .build();
        let agent = ureq::Agent::new_with_config(config);

        let client = HiveClient {
            agent,
            login_url: login_url.into(),
            weather_url: weather_url.into(),
            username: username.into(),
            password: password.into(),
            max_retries,
            session: RefCell::new(None),
        };
        client.logon()?;
        Ok(client)
    }

    pub fn account(&self) -> Option<Account> {
        self.session.borrow().as_ref().map(|s| s.account.clone())
    }

    fn logon(&self) -> Result<(), HiveClientError> {
        let body = serde_json::json!({
            "username": self.username,
            "password": self.password,
        });
        let mut resp = self
            .agent
            .post(&self.login_url)
            .header("Accept", "*/*")
            .send_json(&body)?;
        let status = resp.status();
        let text = resp.body_mut().read_to_string()?;
        if status != StatusCode::OK {
            *self.session.borrow_mut() = None;
            return Err(HiveClientError::Auth(format!("http {}: {}", status.as_u16(), text)));
        }

        let login: LoginResponse = decode(&text)?;
        let token = login
            .token
            .ok_or_else(|| HiveClientError::Auth("login response missing token".to_string()))?;
        let platform = login
            .platform
            .ok_or_else(|| HiveClientError::Auth("login response missing platform".to_string()))?;
        let base_url = platform
            .endpoint
            .ok_or_else(|| HiveClientError::Auth("login response missing platform endpoint".to_string()))?;
        let user = login.user.unwrap_or_else(|| {
            warn!("Hive: login response carried no user details");
            Default::default()
        });

        let account = Account {
            platform_name: platform.name,
            locale: user.locale,
            country_code: user.country_code,
            timezone: user.timezone,
            postcode: user.postcode,
            temperature_unit: user.temperature_unit,
        };
        info!(
            "Hive: logged in (platform={}, timezone={})",
            account.platform_name.as_deref().unwrap_or("-"),
            account.timezone.as_deref().unwrap_or("-")
        );
        *self.session.borrow_mut() = Some(SessionToken {
            token,
            base_url: base_url.trim_end_matches('/').to_string(),
            logged_in_at: Instant::now(),
            account,
        });
        Ok(())
    }

    /// Current `(token, base_url)`, logging on again when the session has aged out.
    fn session_credentials(&self) -> Result<(String, String), HiveClientError> {
        let expired = match self.session.borrow().as_ref() {
            None => true,
            Some(s) => s.logged_in_at.elapsed() >= SESSION_LIFETIME,
        };
        if expired {
            debug!("Hive: session missing or expired; logging on");
            self.logon()?;
        }
        self.session
            .borrow()
            .as_ref()
            .map(|s| (s.token.clone(), s.base_url.clone()))
            .ok_or(HiveClientError::MissingSession)
    }

    fn get_once<T: DeserializeOwned>(&self, path: &str) -> Result<T, HiveClientError> {
        let (token, base_url) = self.session_credentials()?;
        let url = format!("{}{}", base_url, path);
        let mut resp = self
            .agent
            .get(&url)
            .header("Accept", "*/*")
            .header("content-type", "application/json")
            .header("authorization", &token)
            .call()?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            // force a fresh logon and retry once
            self.logon()?;
            let (token, _) = self.session_credentials()?;
            resp = self
                .agent
                .get(&url)
                .header("Accept", "*/*")
                .header("content-type", "application/json")
                .header("authorization", &token)
                .call()?;
        }

        let status = resp.status();
        let text = resp.body_mut().read_to_string()?;
        if status != StatusCode::OK {
            return Err(HiveClientError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        decode(&text)
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HiveClientError> {
        let mut attempt = 1;
        loop {
            match self.get_once(path) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.max_retries.get() => {
                    let delay = retry_delay(attempt);
                    warn!(
                        "Hive: GET {} failed (attempt {}/{}): {}; retrying in {}ms",
                        path,
                        attempt,
                        self.max_retries.get(),
                        e,
                        delay.as_millis()
                    );
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl HiveTransport for HiveClient {
    fn fetch_devices(&self) -> Result<Vec<DeviceRecord>, HiveClientError> {
        self.get_json("/devices")
    }

    fn fetch_products(&self) -> Result<Vec<DeviceRecord>, HiveClientError> {
        self.get_json("/products")
    }

    fn send_command(&self, path: &str, payload: &Value) -> Result<u16, HiveClientError> {
        let (token, base_url) = self.session_credentials()?;
        let url = format!("{}{}", base_url, path);
        debug!("Hive: POST {} {}", path, payload);
        let resp = self
            .agent
            .post(&url)
            .header("Accept", "*/*")
            .header("authorization", &token)
            .send_json(payload)?;
        Ok(resp.status().as_u16())
    }

    fn fetch_weather(&self) -> Result<WeatherReport, HiveClientError> {
        let account = self.account().ok_or(HiveClientError::MissingSession)?;
        let postcode = account.postcode.unwrap_or_default();
        let country = account.country_code.unwrap_or_default();

        let mut resp = self
            .agent
            .get(&self.weather_url)
            .query("postcode", &postcode)
            .query("country", &country)
            .header("Accept", "*/*")
            .call()?;
        let status = resp.status();
        let text = resp.body_mut().read_to_string()?;
        if status != StatusCode::OK {
            return Err(HiveClientError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        decode(&text)
    }
}
