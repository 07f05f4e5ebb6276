//! Access credential lifecycle.
//!
//! - `login` performs the OAuth2 password grant and makes the resulting credential current.
//! - Every authorized call goes through `ensure_fresh`, which refreshes the credential once the
//!   expiry window (the last five minutes of its lifetime) has started. There is no background task.
//! - A refresh replaces the current credential with a new value; credentials are never edited.

use chrono::{DateTime, Duration, Utc};
use log::debug;
use std::cell::RefCell;
use std::fmt;

use crate::client::TadoClientError;
use crate::transport::{build_agent, parse_json_body, read_response};

pub const OAUTH_TOKEN_URL: &str = "https://auth.tado.com/oauth/token";
pub const OAUTH_CLIENT_ID: &str = "tado-web-app";
pub const OAUTH_CLIENT_SECRET: &str = "wZaRN7rpjn3FoNyF5IFuxg9uMzYJcvOoQ8QWiIqS3hfk6gLhVlG57j5YNoZL2Rtc";
pub const OAUTH_SCOPE: &str = "home.user";

/// Lead time before expiry during which a credential is refreshed.
pub const EXPIRATION_WINDOW_SECS: i64 = 300;

#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn expiration_window_start(&self) -> DateTime<Utc> {
        self.expires_at
            .checked_sub_signed(Duration::seconds(EXPIRATION_WINDOW_SECS))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration_window_start()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The OAuth exchanges the credential manager relies on.
pub trait TokenProvider {
    fn password_grant(&self, username: &str, password: &str, scope: &str) -> Result<Credential, TadoClientError>;

    fn refresh(&self, current: &Credential) -> Result<Credential, TadoClientError>;
}

pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Copy, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Form-encoded grants against the tado° token endpoint.
pub struct OAuthTokenProvider {
    agent: ureq::Agent,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl OAuthTokenProvider {
    pub fn new(
        token_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        timeout: Option<std::time::Duration>,
    ) -> Self {
        OAuthTokenProvider {
            agent: build_agent(timeout),
            token_url: token_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    fn exchange(&self, grant: &[(&str, &str)]) -> Result<TokenResponse, TadoClientError> {
        let mut form = vec![
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        form.extend_from_slice(grant);

        let response = self
            .agent
            .post(self.token_url.as_str())
            .header("Accept", "application/json")
            .send_form(form)
            .map_err(|e| TadoClientError::AuthExchange(format!("token request failed: {}", e)))?;
        let (status, body) = read_response(response).map_err(|e| TadoClientError::AuthExchange(e.to_string()))?;
        if !status.is_success() {
            return Err(TadoClientError::AuthExchange(format!("http {}: {}", status.as_u16(), body)));
        }
        let value = parse_json_body(&body).map_err(|e| TadoClientError::AuthExchange(e.to_string()))?;
        serde_json::from_value(value)
            .map_err(|e| TadoClientError::AuthExchange(format!("malformed token response: {}", e)))
    }
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    #[serde(default)]
    refresh_token: Option<String>,
}

impl TokenResponse {
    fn into_credential(
        self,
        issued_at: DateTime<Utc>,
        previous_refresh: Option<&str>,
    ) -> Result<Credential, TadoClientError> {
        let expires_at = Duration::try_seconds(self.expires_in)
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime))
            .ok_or_else(|| TadoClientError::AuthExchange(format!("token expiry out of range: {}", self.expires_in)))?;
        Ok(Credential {
            access_token: self.access_token,
            expires_at,
            refresh_token: self.refresh_token.or_else(|| previous_refresh.map(str::to_string)),
        })
    }
}

impl TokenProvider for OAuthTokenProvider {
    fn password_grant(&self, username: &str, password: &str, scope: &str) -> Result<Credential, TadoClientError> {
        let issued_at = Utc::now();
        let token = self.exchange(&[
            ("grant_type", "password"),
            ("scope", scope),
            ("username", username),
            ("password", password),
        ])?;
        token.into_credential(issued_at, None)
    }

    fn refresh(&self, current: &Credential) -> Result<Credential, TadoClientError> {
        let refresh_token = current
            .refresh_token
            .as_deref()
            .ok_or_else(|| TadoClientError::AuthExchange("credential carries no refresh token".to_string()))?;
        let issued_at = Utc::now();
        let token = self.exchange(&[
            ("grant_type", "refresh_token"),
            ("scope", OAUTH_SCOPE),
            ("refresh_token", refresh_token),
        ])?;
        token.into_credential(issued_at, Some(refresh_token))
    }
}

/// Owns the single current credential.
pub struct CredentialManager<P, C = SystemClock> {
    provider: P,
    clock: C,
    current: RefCell<Option<Credential>>,
}

impl<P: TokenProvider, C: Clock> CredentialManager<P, C> {
    pub fn new(provider: P, clock: C) -> Self {
        CredentialManager {
            provider,
            clock,
            current: RefCell::new(None),
        }
    }

    pub fn login(&self, username: &str, password: &str) -> Result<Credential, TadoClientError> {
        let credential = self.provider.password_grant(username, password, OAUTH_SCOPE)?;
        debug!("Logged in; access token expires at {}", credential.expires_at);
        self.current.replace(Some(credential.clone()));
        Ok(credential)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Return the current credential, refreshing it first if its expiry window has started.
    pub fn ensure_fresh(&self) -> Result<Credential, TadoClientError> {
        let current = self.current.borrow().clone().ok_or(TadoClientError::NotAuthenticated)?;
        let now = self.clock.now();
        if !current.needs_refresh(now) {
            return Ok(current);
        }

        debug!(
            "Access token expires at {}; refresh window started at {}, refreshing",
            current.expires_at,
            current.expiration_window_start()
        );
        let refreshed = self.provider.refresh(&current)?;
        self.current.replace(Some(refreshed.clone()));
        Ok(refreshed)
    }
}
