//! Runtime configuration from the process environment and optional `.env` files.

use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::auth::{OAUTH_CLIENT_ID, OAUTH_CLIENT_SECRET, OAUTH_TOKEN_URL};
use crate::client::BASE_URL;

pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Read when `TADO_PASSWORD` is unset, so the password can stay out of the environment.
pub const PASSWORD_FILE: &str = "password.txt";

#[derive(Clone)]
pub struct Config {
    pub username: String,
    pub password: String,
    pub api_url: String,
    /// OAuth token endpoint.
    pub auth_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// Global per-request timeout; `None` when `TADO_HTTP_TIMEOUT_SECS=0`.
    pub http_timeout: Option<Duration>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("username", &self.username)
            .field("api_url", &self.api_url)
            .field("auth_url", &self.auth_url)
            .field("client_id", &self.client_id)
            .field("http_timeout", &self.http_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok(), Path::new(PASSWORD_FILE))
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>, password_file: &Path) -> Result<Self, String> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let username = non_empty("TADO_USERNAME").ok_or_else(|| "Missing TADO_USERNAME".to_string())?;
        let password = match non_empty("TADO_PASSWORD") {
            Some(v) => v,
            None => match fs::read_to_string(password_file) {
                Ok(s) if !s.trim().is_empty() => s.trim().to_string(),
                _ => {
                    return Err(format!(
                        "Missing password: set TADO_PASSWORD or provide {} in working directory",
                        password_file.display()
                    ));
                }
            },
        };

        let timeout_secs = match non_empty("TADO_HTTP_TIMEOUT_SECS") {
            Some(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("TADO_HTTP_TIMEOUT_SECS must be a whole number of seconds, got {:?}", s))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Config {
            username,
            password,
            api_url: non_empty("TADO_API_URL").unwrap_or_else(|| BASE_URL.to_string()),
            auth_url: non_empty("TADO_AUTH_URL").unwrap_or_else(|| OAUTH_TOKEN_URL.to_string()),
            client_id: non_empty("TADO_CLIENT_ID").unwrap_or_else(|| OAUTH_CLIENT_ID.to_string()),
            client_secret: non_empty("TADO_CLIENT_SECRET").unwrap_or_else(|| OAUTH_CLIENT_SECRET.to_string()),
            http_timeout: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
        })
    }
}

/// Export every assignment in `path` that is not already set in the process environment.
pub fn load_env_file(path: &Path) -> Result<usize, String> {
    let contents = fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
    let mut applied = 0;
    for (index, line) in contents.lines().enumerate() {
        let Some((key, value)) =
            parse_env_assignment(line).map_err(|e| format!("{}:{}: {}", path.display(), index + 1, e))?
        else {
            continue;
        };
        if std::env::var_os(&key).is_none() {
            // Updating process-level environment variables is unsafe on some targets.
            unsafe {
                std::env::set_var(&key, value);
            }
            applied += 1;
        }
    }
    Ok(applied)
}

/// Parse one `.env` line. Blank lines and comments yield `None`.
pub fn parse_env_assignment(line: &str) -> Result<Option<(String, String)>, String> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let line = line.strip_prefix("export ").map(str::trim_start).unwrap_or(line);

    let (key, raw) = line.split_once('=').ok_or_else(|| "missing '=' in assignment".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("environment variable name cannot be empty".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err(format!("environment variable name contains whitespace: {}", key));
    }

    let raw = raw.trim();
    let value = if let Some(rest) = raw.strip_prefix('"') {
        unquote(rest, '"', true)?
    } else if let Some(rest) = raw.strip_prefix('\'') {
        unquote(rest, '\'', false)?
    } else {
        raw.split('#').next().unwrap_or_default().trim_end().to_string()
    };
    Ok(Some((key.to_string(), value)))
}

/// Read a quoted value up to `quote`; only a comment may follow the closing quote.
fn unquote(input: &str, quote: char, escapes: bool) -> Result<String, String> {
    let mut value = String::new();
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if escapes && c == '\\' {
            let escaped = chars
                .next()
                .ok_or_else(|| "unterminated escape sequence in quoted value".to_string())?;
            value.push(match escaped {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                other => other,
            });
        } else if c == quote {
            let rest = chars.as_str().trim();
            if rest.is_empty() || rest.starts_with('#') {
                return Ok(value);
            }
            return Err(format!("unexpected characters after closing {} quote", quote));
        } else {
            value.push(c);
        }
    }
    Err("unterminated quoted value".to_string())
}
