mod cli;

use crate::cli::{CliArgs, Command};
use log::{error, info};
use serde::Serialize;
use std::path::PathBuf;
use tado_control::client::TadoClient;
use tado_control::config::{self, Config};

#[derive(Debug)]
struct LoadedEnvFile {
    path: PathBuf,
    explicit: bool,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|e| format!("rendering output failed: {}", e))?;
    println!("{}", rendered);
    Ok(())
}

fn run(command: Command) -> Result<(), String> {
    // 1) Load config
    let cfg = Config::from_env()?;
    info!(
        "Config loaded (api_url={}, auth_url={}, http_timeout={})",
        cfg.api_url,
        cfg.auth_url,
        cfg.http_timeout
            .map(|t| format!("{}s", t.as_secs()))
            .unwrap_or_else(|| "-".to_string())
    );

    // 2) Authenticate
    let client = TadoClient::new(&cfg);
    client
        .login(&cfg.username, &cfg.password)
        .map_err(|e| format!("Tado login failed (credentials invalid?): {}", e))?;
    info!("Authenticated to Tado API");

    // 3) Execute
    match command {
        Command::Me => print_json(&client.get_me().map_err(|e| format!("get_me failed: {}", e))?),
        Command::HomeState { home } => print_json(
            &client
                .get_home_state(home)
                .map_err(|e| format!("get_home_state({}) failed: {}", home.0, e))?,
        ),
        Command::Zones { home } => print_json(
            &client
                .get_zones(home)
                .map_err(|e| format!("get_zones({}) failed: {}", home.0, e))?,
        ),
        Command::ZoneState { home, zone } => print_json(
            &client
                .get_zone_state(home, zone)
                .map_err(|e| format!("get_zone_state({}, {}) failed: {}", home.0, zone.0, e))?,
        ),
        Command::MobileDevices { home } => print_json(
            &client
                .get_mobile_devices(home)
                .map_err(|e| format!("get_mobile_devices({}) failed: {}", home.0, e))?,
        ),
        Command::SetOverlay {
            home,
            zone,
            power,
            temperature,
            termination,
        } => {
            let overlay = client
                .set_zone_overlay(home, zone, &power, temperature, termination.as_deref())
                .map_err(|e| format!("set_zone_overlay({}, {}) failed: {}", home.0, zone.0, e))?;
            info!("Overlay set on zone {} of home {}", zone.0, home.0);
            print_json(&overlay)
        }
        Command::ClearOverlay { home, zone } => {
            client
                .clear_zone_overlay(home, zone)
                .map_err(|e| format!("clear_zone_overlay({}, {}) failed: {}", home.0, zone.0, e))?;
            info!("Overlay cleared on zone {} of home {}", zone.0, home.0);
            Ok(())
        }
        Command::SetPresence { home, presence } => {
            client
                .set_presence(home, &presence)
                .map_err(|e| format!("set_presence({}) failed: {}", home.0, e))?;
            info!("Presence of home {} set to {}", home.0, presence.to_uppercase());
            Ok(())
        }
        Command::UpdatePresence { home } => {
            let outcome = client
                .update_presence(home)
                .map_err(|e| format!("update_presence({}) failed: {}", home.0, e))?;
            info!("Home {}: {}", home.0, outcome);
            Ok(())
        }
        Command::SetOffset { device, celsius } => print_json(
            &client
                .set_device_temperature_offset(&device, celsius)
                .map_err(|e| format!("set_device_temperature_offset({}) failed: {}", device.0, e))?,
        ),
        Command::Identify { device } => {
            client
                .identify_device(&device)
                .map_err(|e| format!("identify_device({}) failed: {}", device.0, e))?;
            info!("Device {} is identifying itself", device.0);
            Ok(())
        }
        Command::GeoTracking { home, device, enabled } => print_json(
            &client
                .set_geo_tracking(home, device, enabled)
                .map_err(|e| format!("set_geo_tracking({}, {}) failed: {}", home.0, device.0, e))?,
        ),
    }
}

fn load_env(args: &CliArgs) -> Result<Option<LoadedEnvFile>, String> {
    if let Some(path) = &args.env_file {
        if !path.is_file() {
            return Err(format!("env file not found: {}", path.display()));
        }
        config::load_env_file(path)?;
        return Ok(Some(LoadedEnvFile {
            path: path.clone(),
            explicit: true,
        }));
    }

    let cwd = std::env::current_dir().map_err(|e| format!("unable to read current directory: {}", e))?;
    let default_path = cwd.join(".env");
    if default_path.is_file() {
        config::load_env_file(&default_path)?;
        Ok(Some(LoadedEnvFile {
            path: default_path,
            explicit: false,
        }))
    } else {
        Ok(None)
    }
}

fn main() {
    let args = match cli::parse_args(std::env::args_os().skip(1)) {
        Ok(args) => args,
        Err(err) => {
            eprintln!("{}", err);
            std::process::exit(2);
        }
    };

    let loaded_env = match load_env(&args) {
        Ok(info) => info,
        Err(err) => {
            eprintln!("fatal: {}", err);
            std::process::exit(1);
        }
    };

    // Init logging after environment so RUST_LOG from .env is respected.
    let default_filter = env_logger::Env::default().default_filter_or("info");
    env_logger::Builder::from_env(default_filter)
        .format_timestamp_secs()
        .init();

    if let Some(info) = loaded_env.as_ref() {
        let origin = if info.explicit { "CLI-specified" } else { "default" };
        info!("Environment loaded from {} .env file: {}", origin, info.path.display());
    }

    info!(
        "tado-control {} (git {}) starting",
        env!("CARGO_PKG_VERSION"),
        env!("BUILD_TIME_GIT_HASH")
    );
    if let Err(e) = run(args.command) {
        error!("fatal: {}", e);
        std::process::exit(1);
    }
}
