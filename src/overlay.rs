//! Manual zone overrides ("overlays").
//!
//! An overlay is built by patching the zone's current setting rather than from scratch, so fields
//! this crate does not model (AC mode, fan level, swing, ...) survive the round trip.

use log::debug;

use crate::auth::{Clock, TokenProvider};
use crate::client::{TadoClient, TadoClientError};
use crate::models::tado::{
    HomeId, Power, Temperature, ZoneId, ZoneOverlay, ZoneOverlayTermination, ZoneOverlayTerminationType,
    ZoneOverlayTerminationTypeSkillBasedApp, ZoneOverlayType, ZoneSetting, ZoneState, ZoneType,
};
use crate::transport::{Method, Transport};

/// When a manual overlay ends.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Termination {
    /// Until cancelled.
    Manual,
    Timer { duration_in_seconds: i64 },
    /// Until the home's presence mode changes.
    TadoMode,
    /// Until the next block of the active schedule starts.
    NextTimeBlock,
}

impl Termination {
    /// Interpret a free-form termination hint.
    ///
    /// First match wins: a leading integer (parsed leniently, `"120abc"` is 120 seconds), then
    /// `"auto"`, then `"next_time_block"`, both case-insensitive. Anything else, or no hint, is manual.
    pub fn from_hint(hint: Option<&str>) -> Self {
        let Some(hint) = hint else {
            return Termination::Manual;
        };
        if let Some(seconds) = parse_int_prefix(hint) {
            Termination::Timer {
                duration_in_seconds: seconds,
            }
        } else if hint.eq_ignore_ascii_case("auto") {
            Termination::TadoMode
        } else if hint.eq_ignore_ascii_case("next_time_block") {
            Termination::NextTimeBlock
        } else {
            Termination::Manual
        }
    }

    pub fn to_wire(self) -> ZoneOverlayTermination {
        let mut wire = ZoneOverlayTermination::default();
        match self {
            Termination::Manual => wire.r#type = Some(ZoneOverlayTerminationType::Manual),
            Termination::Timer { duration_in_seconds } => {
                wire.r#type = Some(ZoneOverlayTerminationType::Timer);
                wire.duration_in_seconds = Some(duration_in_seconds);
            }
            Termination::TadoMode => wire.r#type = Some(ZoneOverlayTerminationType::TadoMode),
            Termination::NextTimeBlock => {
                wire.type_skill_based_app = Some(ZoneOverlayTerminationTypeSkillBasedApp::NextTimeBlock)
            }
        }
        wire
    }
}

/// Parse a leading integer the way JavaScript's `parseInt` does with no radix.
///
/// Leading whitespace and one sign are accepted, `0x`/`0X` switches to hexadecimal and parsing stops
/// at the first character that is not a digit. At least one digit is required. Values beyond the
/// `i64` range saturate.
pub fn parse_int_prefix(input: &str) -> Option<i64> {
    let s = input.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        _ => (10, s),
    };

    let mut value: i64 = 0;
    let mut seen_digit = false;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else {
            break;
        };
        seen_digit = true;
        value = value.saturating_mul(i64::from(radix)).saturating_add(i64::from(d));
    }

    if !seen_digit {
        return None;
    }
    Some(if negative { -value } else { value })
}

/// Compose the overlay body from the zone's current state.
///
/// `power` is compared case-insensitively against "on"; anything else switches the zone off and
/// ignores `temperature`. The temperature only applies to heating zones. The next-time-block
/// termination additionally marks the overlay itself as MANUAL, which the API expects for that
/// termination only.
pub fn build_overlay(state: ZoneState, power: &str, temperature: Option<f64>, termination: Termination) -> ZoneOverlay {
    let mut setting: ZoneSetting = state.setting.unwrap_or_default();

    if power.eq_ignore_ascii_case("on") {
        setting.power = Some(Some(Power::On));
        if setting.zone_type() == Some(ZoneType::Heating)
            && let Some(celsius) = temperature
        {
            setting.temperature = Some(Some(Temperature::celsius(celsius)));
        }
    } else {
        setting.power = Some(Some(Power::Off));
    }

    let overlay_type = match termination {
        Termination::NextTimeBlock => Some(ZoneOverlayType::manual()),
        _ => None,
    };

    ZoneOverlay {
        r#type: overlay_type,
        setting: Some(setting),
        termination: Some(termination.to_wire()),
    }
}

impl<T: Transport, P: TokenProvider, C: Clock> TadoClient<T, P, C> {
    /// Put a manual override on a zone, derived from its current setting.
    pub fn set_zone_overlay(
        &self,
        home_id: HomeId,
        zone_id: ZoneId,
        power: &str,
        temperature: Option<f64>,
        termination: Option<&str>,
    ) -> Result<ZoneOverlay, TadoClientError> {
        let state = self.get_zone_state(home_id, zone_id)?;
        let termination = Termination::from_hint(termination);
        let overlay = build_overlay(state, power, temperature, termination);
        debug!("Setting overlay on zone {}/{}: {:?}", home_id.0, zone_id.0, termination);
        self.send_json(
            Method::Put,
            &format!("/homes/{}/zones/{}/overlay", home_id.0, zone_id.0),
            &overlay,
        )
    }

    /// Remove the manual override; the zone resumes its schedule.
    pub fn clear_zone_overlay(&self, home_id: HomeId, zone_id: ZoneId) -> Result<(), TadoClientError> {
        self.authorized_call(
            Method::Delete,
            &format!("/homes/{}/zones/{}/overlay", home_id.0, zone_id.0),
            None,
        )?;
        Ok(())
    }
}
