//! Home presence: the manual lock and reconciliation from mobile-device geolocation.

use log::debug;
use std::fmt;
use std::str::FromStr;

use crate::auth::{Clock, TokenProvider};
use crate::client::{TadoClient, TadoClientError};
use crate::models::tado::{HomeId, HomePresence, HomeState, MobileDevice, PresenceLock};
use crate::transport::{Method, Transport};

/// Value accepted by the presence lock. `Auto` removes the lock instead of storing a value.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PresenceTarget {
    Home,
    Away,
    Auto,
}

impl FromStr for PresenceTarget {
    type Err = TadoClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "HOME" => Ok(PresenceTarget::Home),
            "AWAY" => Ok(PresenceTarget::Away),
            "AUTO" => Ok(PresenceTarget::Auto),
            _ => Err(TadoClientError::InvalidPresence(s.to_string())),
        }
    }
}

impl From<HomePresence> for PresenceTarget {
    fn from(value: HomePresence) -> Self {
        match value {
            HomePresence::Home => PresenceTarget::Home,
            HomePresence::Away => PresenceTarget::Away,
        }
    }
}

impl fmt::Display for PresenceTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PresenceTarget::Home => "HOME",
            PresenceTarget::Away => "AWAY",
            PresenceTarget::Auto => "AUTO",
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    AlreadyUpToDate,
    Changed(HomePresence),
}

impl fmt::Display for PresenceUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PresenceUpdate::AlreadyUpToDate => write!(f, "already up to date"),
            PresenceUpdate::Changed(HomePresence::Home) => write!(f, "presence set to HOME"),
            PresenceUpdate::Changed(HomePresence::Away) => write!(f, "presence set to AWAY"),
        }
    }
}

/// True when at least one geo-tracked device reports being at home.
pub fn anyone_home(devices: &[MobileDevice]) -> bool {
    devices.iter().any(MobileDevice::tracked_at_home)
}

/// The presence to submit, or `None` when the home already agrees with its devices.
///
/// A home without a reported presence counts as away.
pub fn reconcile(state: &HomeState, devices: &[MobileDevice]) -> Option<HomePresence> {
    let anyone_home = anyone_home(devices);
    let presence_home = state.presence == Some(HomePresence::Home);
    if anyone_home == presence_home {
        return None;
    }
    Some(if anyone_home {
        HomePresence::Home
    } else {
        HomePresence::Away
    })
}

impl<T: Transport, P: TokenProvider, C: Clock> TadoClient<T, P, C> {
    /// Lock the home's presence, or release the lock with `"auto"`. Case-insensitive.
    pub fn set_presence(&self, home_id: HomeId, presence: &str) -> Result<(), TadoClientError> {
        let target: PresenceTarget = presence.parse()?;
        self.apply_presence(home_id, target)
    }

    pub fn apply_presence(&self, home_id: HomeId, target: PresenceTarget) -> Result<(), TadoClientError> {
        let path = format!("/homes/{}/presenceLock", home_id.0);
        debug!("Setting presence of home {} to {}", home_id.0, target);
        match target {
            PresenceTarget::Auto => {
                self.authorized_call(Method::Delete, &path, None)?;
            }
            PresenceTarget::Home | PresenceTarget::Away => {
                let lock = PresenceLock {
                    home_presence: Some(if target == PresenceTarget::Home {
                        HomePresence::Home
                    } else {
                        HomePresence::Away
                    }),
                };
                self.send_json::<_, serde_json::Value>(Method::Put, &path, &lock)?;
            }
        }
        Ok(())
    }

    /// Align the home's presence with the geo-tracked mobile devices.
    pub fn update_presence(&self, home_id: HomeId) -> Result<PresenceUpdate, TadoClientError> {
        let state = self.get_home_state(home_id)?;
        let devices = self.get_mobile_devices(home_id)?;

        match reconcile(&state, &devices) {
            None => {
                debug!("Presence of home {} already matches its {} device(s)", home_id.0, devices.len());
                Ok(PresenceUpdate::AlreadyUpToDate)
            }
            Some(presence) => {
                self.apply_presence(home_id, presence.into())?;
                Ok(PresenceUpdate::Changed(presence))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixture, harness, logged_in_harness};
    use serde_json::{Value, json};

    const STATE_PATH: &str = "/homes/7/state";
    const DEVICES_PATH: &str = "/homes/7/mobileDevices";
    const LOCK_PATH: &str = "/homes/7/presenceLock";

    fn devices(name: &str) -> Vec<MobileDevice> {
        serde_json::from_value(fixture(name)).expect("mobile devices fixture")
    }

    fn state(presence: Option<HomePresence>) -> HomeState {
        HomeState {
            presence,
            ..Default::default()
        }
    }

    #[test]
    fn presence_parses_case_insensitively() {
        assert_eq!("home".parse::<PresenceTarget>().expect("home"), PresenceTarget::Home);
        assert_eq!("Away".parse::<PresenceTarget>().expect("away"), PresenceTarget::Away);
        assert_eq!("AUTO".parse::<PresenceTarget>().expect("auto"), PresenceTarget::Auto);
    }

    #[test]
    fn invalid_presence_names_the_value() {
        let err = "maybe".parse::<PresenceTarget>().expect_err("invalid");
        assert!(matches!(&err, TadoClientError::InvalidPresence(v) if v == "maybe"));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn anyone_home_needs_tracking_and_location() {
        assert!(!anyone_home(&devices("mobile-devices-nobody-home.json")));
        assert!(anyone_home(&devices("mobile-devices-one-home.json")));
        assert!(!anyone_home(&[]));
    }

    #[test]
    fn reconcile_decisions() {
        let nobody = devices("mobile-devices-nobody-home.json");
        let somebody = devices("mobile-devices-one-home.json");

        assert_eq!(reconcile(&state(Some(HomePresence::Away)), &nobody), None);
        assert_eq!(reconcile(&state(Some(HomePresence::Home)), &somebody), None);
        assert_eq!(
            reconcile(&state(Some(HomePresence::Away)), &somebody),
            Some(HomePresence::Home)
        );
        assert_eq!(
            reconcile(&state(Some(HomePresence::Home)), &nobody),
            Some(HomePresence::Away)
        );
        assert_eq!(reconcile(&state(None), &somebody), Some(HomePresence::Home));
        assert_eq!(reconcile(&state(None), &nobody), None);
    }

    #[test]
    fn set_presence_home_puts_lock() {
        let h = logged_in_harness();
        h.transport.respond(Method::Put, LOCK_PATH, Value::Null);

        h.client.set_presence(HomeId(7), "home").expect("home");
        let writes = h.transport.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, Method::Put);
        assert_eq!(writes[0].body, Some(json!({"homePresence": "HOME"})));
    }

    #[test]
    fn set_presence_auto_deletes_lock() {
        let h = logged_in_harness();
        h.transport.respond(Method::Delete, LOCK_PATH, Value::Null);

        h.client.set_presence(HomeId(7), "Auto").expect("auto");
        let writes = h.transport.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].method, Method::Delete);
        assert_eq!(writes[0].path, LOCK_PATH);
        assert_eq!(writes[0].body, None);
    }

    #[test]
    fn invalid_presence_makes_no_calls() {
        let h = logged_in_harness();
        let err = h.client.set_presence(HomeId(7), "maybe").expect_err("invalid");
        assert!(matches!(err, TadoClientError::InvalidPresence(_)));
        assert!(h.transport.requests().is_empty());
    }

    #[test]
    fn update_presence_is_noop_when_in_sync() {
        let h = logged_in_harness();
        h.transport.respond(Method::Get, STATE_PATH, fixture("home-state-away.json"));
        h.transport.respond(Method::Get, DEVICES_PATH, fixture("mobile-devices-nobody-home.json"));

        let outcome = h.client.update_presence(HomeId(7)).expect("update");
        assert_eq!(outcome, PresenceUpdate::AlreadyUpToDate);
        assert_eq!(outcome.to_string(), "already up to date");
        assert!(h.transport.writes().is_empty());
    }

    #[test]
    fn update_presence_sets_home_when_device_arrives() {
        let h = logged_in_harness();
        h.transport.respond(Method::Get, STATE_PATH, fixture("home-state-away.json"));
        h.transport.respond(Method::Get, DEVICES_PATH, fixture("mobile-devices-one-home.json"));
        h.transport.respond(Method::Put, LOCK_PATH, Value::Null);

        let outcome = h.client.update_presence(HomeId(7)).expect("update");
        assert_eq!(outcome, PresenceUpdate::Changed(HomePresence::Home));

        let writes = h.transport.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, LOCK_PATH);
        assert_eq!(writes[0].body, Some(json!({"homePresence": "HOME"})));
    }

    #[test]
    fn update_presence_aborts_when_device_read_fails() {
        let h = logged_in_harness();
        h.transport.respond(Method::Get, STATE_PATH, fixture("home-state-away.json"));
        h.transport.fail(Method::Get, DEVICES_PATH, 503);

        let err = h.client.update_presence(HomeId(7)).expect_err("devices fail");
        assert!(matches!(err, TadoClientError::Http { status: 503, .. }));
        assert!(h.transport.writes().is_empty());
    }

    #[test]
    fn update_presence_before_login_fails() {
        let h = harness();
        assert!(matches!(
            h.client.update_presence(HomeId(7)),
            Err(TadoClientError::NotAuthenticated)
        ));
        assert!(h.transport.requests().is_empty());
    }
}
