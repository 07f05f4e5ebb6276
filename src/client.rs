//! Session-managed HTTP client for the tado° v2 API.
//!
//! - Blocking calls (no async); multi-step operations are plain sequential calls.
//! - Every request goes through `authorized_call`, which refreshes the credential when needed and
//!   attaches it as a bearer token. Failures are returned as-is, nothing is retried.
//! - Read-modify-write operations live next to their builders in `crate::overlay` and `crate::presence`.
//!
//! Authentication
//! - `login` performs the OAuth2 password grant; see `crate::auth` for the refresh policy.

use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::auth::{Clock, Credential, CredentialManager, OAuthTokenProvider, SystemClock, TokenProvider};
use crate::config::Config;
use crate::models::tado::*;
use crate::transport::{ApiRequest, Method, Transport, UreqTransport};

pub const BASE_URL: &str = "https://my.tado.com/api/v2";

#[derive(Debug)]
pub enum TadoClientError {
    NotAuthenticated,
    AuthExchange(String),
    Transport(String),
    Http { status: u16, message: String },
    Json(serde_json::Error),
    Decode { path: String, source: serde_json::Error },
    InvalidPresence(String),
}

impl core::fmt::Display for TadoClientError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            TadoClientError::NotAuthenticated => write!(f, "not yet logged in"),
            TadoClientError::AuthExchange(e) => write!(f, "auth error: {}", e),
            TadoClientError::Transport(s) => write!(f, "transport error: {}", s),
            TadoClientError::Http { status, message } => write!(f, "http {}: {}", status, message),
            TadoClientError::Json(e) => write!(f, "json error: {}", e),
            TadoClientError::Decode { path, source } => write!(f, "unexpected response at {}: {}", path, source),
            TadoClientError::InvalidPresence(p) => {
                write!(f, "invalid presence \"{}\": must be \"HOME\", \"AWAY\", or \"AUTO\"", p)
            }
        }
    }
}

impl std::error::Error for TadoClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TadoClientError::Json(e) => Some(e),
            TadoClientError::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for TadoClientError {
    fn from(value: serde_json::Error) -> Self {
        TadoClientError::Json(value)
    }
}

pub struct TadoClient<T = UreqTransport, P = OAuthTokenProvider, C = SystemClock> {
    transport: T,
    base_url: String,
    credentials: CredentialManager<P, C>,
}

impl TadoClient {
    /// Client backed by `ureq` for both the API and the token endpoint. Call `login` before use.
    pub fn new(config: &Config) -> Self {
        let provider = OAuthTokenProvider::new(
            config.auth_url.as_str(),
            config.client_id.as_str(),
            config.client_secret.as_str(),
            config.http_timeout,
        );
        TadoClient::with_parts(
            config.api_url.as_str(),
            UreqTransport::new(config.http_timeout),
            provider,
            SystemClock,
        )
    }
}

impl<T: Transport, P: TokenProvider, C: Clock> TadoClient<T, P, C> {
    pub fn with_parts(base_url: impl Into<String>, transport: T, provider: P, clock: C) -> Self {
        TadoClient {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: CredentialManager::new(provider, clock),
        }
    }

    pub fn credentials(&self) -> &CredentialManager<P, C> {
        &self.credentials
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Credential, TadoClientError> {
        self.credentials.login(username, password)
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send one request with a fresh bearer token and return the decoded JSON body.
    pub fn authorized_call(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, TadoClientError> {
        let credential = self.credentials.ensure_fresh()?;
        self.transport.send(ApiRequest {
            method,
            url: self.url(path),
            bearer: &credential.access_token,
            body,
        })
    }

    pub(crate) fn call<R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<R, TadoClientError> {
        let value = self.authorized_call(method, path, body)?;
        decode(value)
    }

    fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, TadoClientError> {
        self.call(Method::Get, path, None)
    }

    pub(crate) fn send_json<B: Serialize, R: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<R, TadoClientError> {
        let body = serde_json::to_value(body)?;
        self.call(method, path, Some(&body))
    }

    pub fn get_me(&self) -> Result<User, TadoClientError> {
        self.get_json("/me")
    }

    pub fn get_home(&self, home_id: HomeId) -> Result<Home, TadoClientError> {
        self.get_json(&format!("/homes/{}", home_id.0))
    }

    pub fn get_weather(&self, home_id: HomeId) -> Result<Weather, TadoClientError> {
        self.get_json(&format!("/homes/{}/weather", home_id.0))
    }

    pub fn get_devices(&self, home_id: HomeId) -> Result<Vec<Device>, TadoClientError> {
        self.get_json(&format!("/homes/{}/devices", home_id.0))
    }

    pub fn get_device_temperature_offset(&self, device_id: &DeviceId) -> Result<Temperature, TadoClientError> {
        self.get_json(&format!("/devices/{}/temperatureOffset", device_id.0))
    }

    pub fn get_installations(&self, home_id: HomeId) -> Result<Value, TadoClientError> {
        self.get_json(&format!("/homes/{}/installations", home_id.0))
    }

    pub fn get_users(&self, home_id: HomeId) -> Result<Vec<User>, TadoClientError> {
        self.get_json(&format!("/homes/{}/users", home_id.0))
    }

    pub fn get_home_state(&self, home_id: HomeId) -> Result<HomeState, TadoClientError> {
        self.get_json(&format!("/homes/{}/state", home_id.0))
    }

    pub fn get_mobile_devices(&self, home_id: HomeId) -> Result<Vec<MobileDevice>, TadoClientError> {
        self.get_json(&format!("/homes/{}/mobileDevices", home_id.0))
    }

    pub fn get_mobile_device(&self, home_id: HomeId, device_id: MobileDeviceId) -> Result<MobileDevice, TadoClientError> {
        self.get_json(&format!("/homes/{}/mobileDevices/{}", home_id.0, device_id.0))
    }

    pub fn get_mobile_device_settings(
        &self,
        home_id: HomeId,
        device_id: MobileDeviceId,
    ) -> Result<MobileDeviceSettings, TadoClientError> {
        self.get_json(&format!("/homes/{}/mobileDevices/{}/settings", home_id.0, device_id.0))
    }

    pub fn get_zones(&self, home_id: HomeId) -> Result<Vec<Zone>, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones", home_id.0))
    }

    pub fn get_zone_state(&self, home_id: HomeId, zone_id: ZoneId) -> Result<ZoneState, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones/{}/state", home_id.0, zone_id.0))
    }

    pub fn get_zone_capabilities(&self, home_id: HomeId, zone_id: ZoneId) -> Result<Value, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones/{}/capabilities", home_id.0, zone_id.0))
    }

    /// The active overlay; the API answers 404 when the zone follows its schedule.
    pub fn get_zone_overlay(&self, home_id: HomeId, zone_id: ZoneId) -> Result<ZoneOverlay, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones/{}/overlay", home_id.0, zone_id.0))
    }

    pub fn get_zone_day_report(&self, home_id: HomeId, zone_id: ZoneId, date: NaiveDate) -> Result<Value, TadoClientError> {
        self.get_json(&format!(
            "/homes/{}/zones/{}/dayReport?date={}",
            home_id.0,
            zone_id.0,
            date.format("%Y-%m-%d")
        ))
    }

    pub fn get_active_timetable(&self, home_id: HomeId, zone_id: ZoneId) -> Result<TimetableType, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones/{}/schedule/activeTimetable", home_id.0, zone_id.0))
    }

    pub fn get_timetable_blocks(
        &self,
        home_id: HomeId,
        zone_id: ZoneId,
        timetable_id: TimetableId,
    ) -> Result<Vec<TimetableBlock>, TadoClientError> {
        self.get_json(&format!(
            "/homes/{}/zones/{}/schedule/timetables/{}/blocks",
            home_id.0, zone_id.0, timetable_id.0
        ))
    }

    pub fn get_away_configuration(&self, home_id: HomeId, zone_id: ZoneId) -> Result<Value, TadoClientError> {
        self.get_json(&format!("/homes/{}/zones/{}/awayConfiguration", home_id.0, zone_id.0))
    }

    pub fn set_device_temperature_offset(&self, device_id: &DeviceId, celsius: f64) -> Result<Temperature, TadoClientError> {
        self.send_json(
            Method::Put,
            &format!("/devices/{}/temperatureOffset", device_id.0),
            &Temperature::celsius(celsius),
        )
    }

    /// Make the device blink its display.
    pub fn identify_device(&self, device_id: &DeviceId) -> Result<(), TadoClientError> {
        self.authorized_call(Method::Post, &format!("/devices/{}/identify", device_id.0), None)?;
        Ok(())
    }

    /// Toggle geo-tracking for a mobile device, keeping its other settings as they are.
    pub fn set_geo_tracking(
        &self,
        home_id: HomeId,
        device_id: MobileDeviceId,
        enabled: bool,
    ) -> Result<MobileDeviceSettings, TadoClientError> {
        let mut settings = self.get_mobile_device_settings(home_id, device_id)?;
        settings.geo_tracking_enabled = Some(enabled);
        debug!("Setting geoTrackingEnabled={} for mobile device {}", enabled, device_id.0);
        self.send_json(
            Method::Put,
            &format!("/homes/{}/mobileDevices/{}/settings", home_id.0, device_id.0),
            &settings,
        )
    }
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, TadoClientError> {
    serde_path_to_error::deserialize(value).map_err(|e| TadoClientError::Decode {
        path: e.path().to_string(),
        source: e.into_inner(),
    })
}
