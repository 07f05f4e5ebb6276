//! Models for the tado° v2 API resources this crate reads and writes.
//!
//! Notes
//! - Fields are optional because the API omits them freely depending on zone type and firmware.
//! - Models that are read, patched and written back (`ZoneSetting`, `MobileDeviceSettings`, `ZoneState`)
//!   keep every unrecognised field in `extra`, so a round trip never drops data the API sent.
//! - `None` fields are skipped when serializing; the API treats `null` and absence differently.
//!   `ZoneSetting` keeps that distinction on read too (`Some(None)` is an explicit `null`).
//! - Date/time fields use `chrono` (`DateTime<Utc>`). Time-of-day fields remain strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Unrecognised JSON fields carried through a read-modify-write cycle.
pub type ExtraFields = BTreeMap<String, Value>;

// =====================
// Scalar ID newtype wrappers
// =====================

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub String);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HomeId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MobileDeviceId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub i64);

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimetableId(pub i64);

// =====================
// Core enums
// =====================

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HomePresence {
    Home,
    Away,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Power {
    #[serde(rename = "ON")]
    On,
    #[serde(rename = "OFF")]
    Off,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneType {
    AirConditioning,
    Heating,
    HotWater,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneOverlayTerminationType {
    Manual,
    TadoMode,
    Timer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneOverlayTerminationTypeSkillBasedApp {
    Manual,
    TadoMode,
    Timer,
    NextTimeBlock,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneOverlayType(pub String); // only known value is MANUAL

impl ZoneOverlayType {
    pub fn manual() -> Self {
        ZoneOverlayType("MANUAL".to_string())
    }
}

// =====================
// Datapoints
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Temperature {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub celsius: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fahrenheit: Option<f64>,
}

impl Temperature {
    pub fn celsius(value: f64) -> Self {
        Temperature {
            celsius: Some(value),
            fahrenheit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemperatureDataPoint {
    pub celsius: Option<f64>,
    pub fahrenheit: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub r#type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PercentageDataPoint {
    pub r#type: Option<String>,
    pub percentage: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SensorDataPoints {
    pub inside_temperature: Option<TemperatureDataPoint>,
    pub humidity: Option<PercentageDataPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherStateDataPoint {
    pub r#type: Option<String>,
    pub value: Option<String>, // SUN, CLOUDY_PARTLY, ...
    pub timestamp: Option<DateTime<Utc>>,
}

// =====================
// Users and homes
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeBase {
    pub id: Option<HomeId>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub name: Option<String>,
    pub email: Option<String>,
    pub username: Option<String>,
    pub id: Option<String>,
    pub locale: Option<String>,
    pub homes: Option<Vec<HomeBase>>,
    pub mobile_devices: Option<Vec<MobileDevice>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Home {
    pub id: Option<HomeId>,
    pub name: Option<String>,
    pub date_time_zone: Option<String>,
    pub date_created: Option<DateTime<Utc>>,
    pub temperature_unit: Option<String>,
    pub away_radius_in_meters: Option<f64>,
    pub installation_completed: Option<bool>,
    pub zones_count: Option<i64>,
    pub language: Option<String>,
    pub skills: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct HomeState {
    pub presence: Option<HomePresence>,
    pub presence_locked: Option<bool>,
    pub show_home_presence_switch_button: Option<bool>,
}

/// Body of `PUT /homes/{id}/presenceLock`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PresenceLock {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_presence: Option<HomePresence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Weather {
    pub solar_intensity: Option<PercentageDataPoint>,
    pub outside_temperature: Option<TemperatureDataPoint>,
    pub weather_state: Option<WeatherStateDataPoint>,
}

// =====================
// Devices
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConnectionState {
    pub value: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub device_type: Option<String>, // RU02, VA02, IB01, ...
    pub serial_no: Option<DeviceId>,
    pub short_serial_no: Option<String>,
    pub current_fw_version: Option<String>,
    pub connection_state: Option<DeviceConnectionState>,
    pub battery_state: Option<String>,
    pub child_lock_enabled: Option<bool>,
    pub duties: Option<Vec<String>>,
}

// =====================
// Mobile devices
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_tracking_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MobileDeviceLocation {
    pub stale: Option<bool>,
    pub at_home: Option<bool>,
    pub relative_distance_from_home_fence: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MobileDevice {
    pub id: Option<MobileDeviceId>,
    pub name: Option<String>,
    pub settings: Option<MobileDeviceSettings>,
    pub location: Option<MobileDeviceLocation>,
    pub device_metadata: Option<Value>,
}

impl MobileDevice {
    /// Geo-tracking is enabled and the last known location is inside the home fence.
    pub fn tracked_at_home(&self) -> bool {
        let tracking = self
            .settings
            .as_ref()
            .and_then(|s| s.geo_tracking_enabled)
            .unwrap_or(false);
        let at_home = self.location.as_ref().and_then(|l| l.at_home).unwrap_or(false);
        tracking && at_home
    }
}

// =====================
// Zones
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: Option<ZoneId>,
    pub name: Option<String>,
    pub r#type: Option<ZoneType>,
    pub date_created: Option<DateTime<Utc>>,
    pub device_types: Option<Vec<String>>,
    pub devices: Option<Vec<Device>>,
    pub report_available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneSetting {
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub r#type: Option<Option<ZoneType>>,
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub power: Option<Option<Power>>,
    /// `Some(None)` for a zone that is off; written back as `null`.
    #[serde(default, deserialize_with = "explicit_null", skip_serializing_if = "Option::is_none")]
    pub temperature: Option<Option<Temperature>>,
    /// Mode, fan level, swing, ... for AC zones; anything else the API adds later.
    #[serde(flatten)]
    pub extra: ExtraFields,
}

impl ZoneSetting {
    pub fn zone_type(&self) -> Option<ZoneType> {
        self.r#type.flatten()
    }
}

/// Present fields decode to `Some`, including `null`; absent ones fall back to `None` via `default`.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneOverlayTermination {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<ZoneOverlayTerminationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_time_in_seconds: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_skill_based_app: Option<ZoneOverlayTerminationTypeSkillBasedApp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projected_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneOverlay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r#type: Option<ZoneOverlayType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub setting: Option<ZoneSetting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<ZoneOverlayTermination>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneStateLink {
    pub state: Option<String>, // ONLINE/OFFLINE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ZoneState {
    pub tado_mode: Option<HomePresence>,
    pub geolocation_override: Option<bool>,
    pub setting: Option<ZoneSetting>,
    pub overlay_type: Option<ZoneOverlayType>,
    pub overlay: Option<ZoneOverlay>,
    pub link: Option<ZoneStateLink>,
    pub sensor_data_points: Option<SensorDataPoints>,
    #[serde(flatten)]
    pub extra: ExtraFields,
}

// =====================
// Schedules
// =====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimetableType {
    pub id: Option<TimetableId>,
    pub r#type: Option<String>, // ONE_DAY, THREE_DAY, SEVEN_DAY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TimetableBlock {
    pub day_type: Option<String>,
    pub start: Option<String>, // HH:MM
    pub end: Option<String>,   // HH:MM
    pub geolocation_override: Option<bool>,
    pub setting: Option<ZoneSetting>,
}
