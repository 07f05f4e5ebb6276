//! Session-managed client for the tado° home-climate API.
//!
//! ```no_run
//! use tado_control::client::TadoClient;
//! use tado_control::config::Config;
//! use tado_control::models::tado::{HomeId, ZoneId};
//!
//! let cfg = Config::from_env()?;
//! let client = TadoClient::new(&cfg);
//! client.login(&cfg.username, &cfg.password).map_err(|e| e.to_string())?;
//! client
//!     .set_zone_overlay(HomeId(1), ZoneId(1), "on", Some(21.0), Some("next_time_block"))
//!     .map_err(|e| e.to_string())?;
//! # Ok::<(), String>(())
//! ```

pub mod models {
    pub mod tado;
}

pub mod auth;
pub mod client;
pub mod config;
pub mod overlay;
pub mod presence;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;
