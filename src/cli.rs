//! Command-line parsing for the `tado-control` binary.

use std::ffi::OsString;
use std::path::PathBuf;

use tado_control::models::tado::{DeviceId, HomeId, MobileDeviceId, ZoneId};

pub const USAGE: &str = "\
usage: tado-control [--env-file PATH] <command> [args...]

commands:
  me
  home-state <home>
  zones <home>
  zone-state <home> <zone>
  mobile-devices <home>
  set-overlay <home> <zone> <on|off> [celsius|-] [seconds|auto|next_time_block|manual]
  clear-overlay <home> <zone>
  set-presence <home> <home|away|auto>
  update-presence <home>
  set-offset <device serial> <celsius>
  identify <device serial>
  geo-tracking <home> <mobile device> <on|off>";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Me,
    HomeState {
        home: HomeId,
    },
    Zones {
        home: HomeId,
    },
    ZoneState {
        home: HomeId,
        zone: ZoneId,
    },
    MobileDevices {
        home: HomeId,
    },
    SetOverlay {
        home: HomeId,
        zone: ZoneId,
        power: String,
        temperature: Option<f64>,
        termination: Option<String>,
    },
    ClearOverlay {
        home: HomeId,
        zone: ZoneId,
    },
    SetPresence {
        home: HomeId,
        presence: String,
    },
    UpdatePresence {
        home: HomeId,
    },
    SetOffset {
        device: DeviceId,
        celsius: f64,
    },
    Identify {
        device: DeviceId,
    },
    GeoTracking {
        home: HomeId,
        device: MobileDeviceId,
        enabled: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CliArgs {
    pub env_file: Option<PathBuf>,
    pub command: Command,
}

/// Parse everything after the program name.
pub fn parse_args(args: impl IntoIterator<Item = OsString>) -> Result<CliArgs, String> {
    let mut env_file: Option<PathBuf> = None;
    let mut positional: Vec<String> = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        let arg = arg
            .into_string()
            .map_err(|_| "argument contains invalid UTF-8".to_string())?;
        if arg == "--env-file" || arg.starts_with("--env-file=") {
            if env_file.is_some() {
                return Err("`--env-file` provided more than once".to_string());
            }
            let path = match arg.strip_prefix("--env-file=") {
                Some(p) => p.to_string(),
                None => args
                    .next()
                    .and_then(|p| p.into_string().ok())
                    .ok_or_else(|| "`--env-file` requires a path argument".to_string())?,
            };
            if path.is_empty() {
                return Err("`--env-file` requires a path argument".to_string());
            }
            env_file = Some(PathBuf::from(path));
        } else if arg == "--help" || arg == "-h" {
            return Err(USAGE.to_string());
        } else if arg.starts_with("--") && positional.is_empty() {
            return Err(format!("unrecognised argument: {}", arg));
        } else {
            positional.push(arg);
        }
    }

    let command = parse_command(&positional)?;
    Ok(CliArgs { env_file, command })
}

fn parse_command(args: &[String]) -> Result<Command, String> {
    let (name, rest) = args.split_first().ok_or_else(|| USAGE.to_string())?;
    let arg = |i: usize, what: &str| required(name, rest, i, what);
    let home = |i: usize| required(name, rest, i, "home").and_then(|s| parse_id(s, "home").map(HomeId));
    let zone = |i: usize| required(name, rest, i, "zone").and_then(|s| parse_id(s, "zone").map(ZoneId));

    let (command, used) = match name.as_str() {
        "me" => (Command::Me, 0),
        "home-state" => (Command::HomeState { home: home(0)? }, 1),
        "zones" => (Command::Zones { home: home(0)? }, 1),
        "zone-state" => (
            Command::ZoneState {
                home: home(0)?,
                zone: zone(1)?,
            },
            2,
        ),
        "mobile-devices" => (Command::MobileDevices { home: home(0)? }, 1),
        "set-overlay" => {
            let temperature = match rest.get(3).map(String::as_str) {
                None | Some("-") => None,
                Some(s) => Some(parse_celsius(s)?),
            };
            let command = Command::SetOverlay {
                home: home(0)?,
                zone: zone(1)?,
                power: arg(2, "on|off")?.to_string(),
                temperature,
                termination: rest.get(4).cloned(),
            };
            (command, rest.len().clamp(3, 5))
        }
        "clear-overlay" => (
            Command::ClearOverlay {
                home: home(0)?,
                zone: zone(1)?,
            },
            2,
        ),
        "set-presence" => (
            Command::SetPresence {
                home: home(0)?,
                presence: arg(1, "home|away|auto")?.to_string(),
            },
            2,
        ),
        "update-presence" => (Command::UpdatePresence { home: home(0)? }, 1),
        "set-offset" => (
            Command::SetOffset {
                device: DeviceId(arg(0, "device serial")?.to_string()),
                celsius: parse_celsius(arg(1, "celsius")?)?,
            },
            2,
        ),
        "identify" => (
            Command::Identify {
                device: DeviceId(arg(0, "device serial")?.to_string()),
            },
            1,
        ),
        "geo-tracking" => {
            let enabled = match arg(2, "on|off")?.to_ascii_lowercase().as_str() {
                "on" | "true" | "1" => true,
                "off" | "false" | "0" => false,
                other => return Err(format!("geo-tracking expects on or off, got {}", other)),
            };
            let command = Command::GeoTracking {
                home: home(0)?,
                device: MobileDeviceId(parse_id(arg(1, "mobile device")?, "mobile device")?),
                enabled,
            };
            (command, 3)
        }
        other => return Err(format!("unknown command: {}\n\n{}", other, USAGE)),
    };

    if rest.len() > used {
        return Err(format!("unexpected argument for `{}`: {}", name, rest[used]));
    }
    Ok(command)
}

fn required<'a>(command: &str, rest: &'a [String], index: usize, what: &str) -> Result<&'a str, String> {
    rest.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("`{}` requires <{}>\n\n{}", command, what, USAGE))
}

fn parse_id(s: &str, what: &str) -> Result<i64, String> {
    s.parse::<i64>()
        .map_err(|_| format!("{} id must be an integer, got {}", what, s))
}

fn parse_celsius(s: &str) -> Result<f64, String> {
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("temperature must be a number in celsius, got {}", s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<CliArgs, String> {
        parse_args(args.iter().map(OsString::from))
    }

    #[test]
    fn parses_env_file_forms() {
        let a = parse(&["--env-file", "prod.env", "me"]).expect("args");
        assert_eq!(a.env_file, Some(PathBuf::from("prod.env")));
        assert_eq!(a.command, Command::Me);

        let a = parse(&["--env-file=dev.env", "update-presence", "12"]).expect("args");
        assert_eq!(a.env_file, Some(PathBuf::from("dev.env")));
        assert_eq!(a.command, Command::UpdatePresence { home: HomeId(12) });

        assert!(parse(&["--env-file"]).is_err());
        assert!(parse(&["--env-file=a", "--env-file=b", "me"]).is_err());
    }

    #[test]
    fn parses_set_overlay_variants() {
        let a = parse(&["set-overlay", "1", "5", "on", "21.5", "next_time_block"]).expect("args");
        assert_eq!(
            a.command,
            Command::SetOverlay {
                home: HomeId(1),
                zone: ZoneId(5),
                power: "on".to_string(),
                temperature: Some(21.5),
                termination: Some("next_time_block".to_string()),
            }
        );

        let a = parse(&["set-overlay", "1", "5", "off", "-", "auto"]).expect("args");
        assert!(matches!(a.command, Command::SetOverlay { temperature: None, .. }));

        let a = parse(&["set-overlay", "1", "5", "off"]).expect("args");
        assert!(matches!(
            a.command,
            Command::SetOverlay {
                temperature: None,
                termination: None,
                ..
            }
        ));

        assert!(parse(&["set-overlay", "1", "5"]).is_err());
        assert!(parse(&["set-overlay", "1", "5", "on", "warm"]).is_err());
        assert!(parse(&["set-overlay", "1", "5", "on", "20", "auto", "extra"]).is_err());
    }

    #[test]
    fn parses_device_commands() {
        let a = parse(&["set-offset", "VA1234567890", "-0.5"]).expect("args");
        assert_eq!(
            a.command,
            Command::SetOffset {
                device: DeviceId("VA1234567890".to_string()),
                celsius: -0.5,
            }
        );

        let a = parse(&["geo-tracking", "1", "42", "OFF"]).expect("args");
        assert_eq!(
            a.command,
            Command::GeoTracking {
                home: HomeId(1),
                device: MobileDeviceId(42),
                enabled: false,
            }
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["frobnicate"]).is_err());
        assert!(parse(&["zones", "abc"]).is_err());
        assert!(parse(&["zones", "1", "2"]).is_err());
        assert!(parse(&["--verbose", "me"]).is_err());
        assert!(parse(&["set-presence", "1"]).is_err());
    }
}
