//! In-memory stand-ins for the network collaborators, shared by the unit tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::auth::{Clock, Credential, TokenProvider};
use crate::client::{TadoClient, TadoClientError};
use crate::transport::{ApiRequest, Method, Transport};

pub(crate) const TEST_BASE_URL: &str = "https://api.test/v2";

pub(crate) fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

pub(crate) fn fixture(name: &str) -> Value {
    let path = format!("tests/data/{}", name);
    let json = std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("fixture {} missing: {}", path, e));
    serde_json::from_str(&json).unwrap_or_else(|e| panic!("fixture {} is not JSON: {}", path, e))
}

#[derive(Clone)]
pub(crate) struct FixedClock(Rc<Cell<DateTime<Utc>>>);

impl FixedClock {
    pub(crate) fn new(now: DateTime<Utc>) -> Self {
        FixedClock(Rc::new(Cell::new(now)))
    }

    pub(crate) fn advance(&self, by: Duration) {
        self.0.set(self.0.get() + by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0.get()
    }
}

#[derive(Default)]
struct ProviderState {
    login_expires_at: Option<DateTime<Utc>>,
    refresh_calls: usize,
    reject_login: bool,
    reject_refresh: bool,
}

/// Issues `initial` on login and `refreshed-N` on the N-th refresh, each valid one hour past the previous expiry.
#[derive(Clone)]
pub(crate) struct FakeTokenProvider(Rc<RefCell<ProviderState>>);

impl FakeTokenProvider {
    pub(crate) fn new(login_expires_at: DateTime<Utc>) -> Self {
        FakeTokenProvider(Rc::new(RefCell::new(ProviderState {
            login_expires_at: Some(login_expires_at),
            ..Default::default()
        })))
    }

    pub(crate) fn refresh_calls(&self) -> usize {
        self.0.borrow().refresh_calls
    }

    pub(crate) fn reject_login(&self) {
        self.0.borrow_mut().reject_login = true;
    }

    pub(crate) fn reject_refresh(&self) {
        self.0.borrow_mut().reject_refresh = true;
    }
}

impl TokenProvider for FakeTokenProvider {
    fn password_grant(&self, _username: &str, _password: &str, _scope: &str) -> Result<Credential, TadoClientError> {
        let state = self.0.borrow();
        if state.reject_login {
            return Err(TadoClientError::AuthExchange("http 401: invalid_grant".to_string()));
        }
        Ok(Credential {
            access_token: "initial".to_string(),
            expires_at: state.login_expires_at.unwrap_or_else(t0),
            refresh_token: Some("refresh-0".to_string()),
        })
    }

    fn refresh(&self, current: &Credential) -> Result<Credential, TadoClientError> {
        let mut state = self.0.borrow_mut();
        state.refresh_calls += 1;
        if state.reject_refresh {
            return Err(TadoClientError::AuthExchange("http 400: invalid refresh token".to_string()));
        }
        Ok(Credential {
            access_token: format!("refreshed-{}", state.refresh_calls),
            expires_at: current.expires_at + Duration::hours(1),
            refresh_token: Some(format!("refresh-{}", state.refresh_calls)),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub bearer: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct TransportState {
    responses: HashMap<(Method, String), Result<Value, u16>>,
    requests: Vec<RecordedRequest>,
}

/// Serves canned responses keyed by method and path (relative to `TEST_BASE_URL`) and records every request.
#[derive(Clone, Default)]
pub(crate) struct FakeTransport(Rc<RefCell<TransportState>>);

impl FakeTransport {
    pub(crate) fn respond(&self, method: Method, path: &str, body: Value) {
        self.0.borrow_mut().responses.insert((method, path.to_string()), Ok(body));
    }

    pub(crate) fn fail(&self, method: Method, path: &str, status: u16) {
        self.0.borrow_mut().responses.insert((method, path.to_string()), Err(status));
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.0.borrow().requests.clone()
    }

    pub(crate) fn writes(&self) -> Vec<RecordedRequest> {
        self.requests().into_iter().filter(|r| r.method != Method::Get).collect()
    }
}

impl Transport for FakeTransport {
    fn send(&self, request: ApiRequest<'_>) -> Result<Value, TadoClientError> {
        let path = request
            .url
            .strip_prefix(TEST_BASE_URL)
            .unwrap_or(&request.url)
            .to_string();
        let mut state = self.0.borrow_mut();
        state.requests.push(RecordedRequest {
            method: request.method,
            path: path.clone(),
            bearer: request.bearer.to_string(),
            body: request.body.cloned(),
        });
        match state.responses.get(&(request.method, path.clone())) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(status)) => Err(TadoClientError::Http {
                status: *status,
                message: format!("canned failure for {} {}", request.method, path),
            }),
            None => Err(TadoClientError::Http {
                status: 404,
                message: format!("no canned response for {} {}", request.method, path),
            }),
        }
    }
}

pub(crate) type TestClient = TadoClient<FakeTransport, FakeTokenProvider, FixedClock>;

pub(crate) struct Harness {
    pub client: TestClient,
    pub transport: FakeTransport,
    pub provider: FakeTokenProvider,
    pub clock: FixedClock,
}

/// A client whose initial credential expires one hour after `t0()`.
pub(crate) fn harness() -> Harness {
    let transport = FakeTransport::default();
    let provider = FakeTokenProvider::new(t0() + Duration::hours(1));
    let clock = FixedClock::new(t0());
    let client = TadoClient::with_parts(TEST_BASE_URL, transport.clone(), provider.clone(), clock.clone());
    Harness {
        client,
        transport,
        provider,
        clock,
    }
}

pub(crate) fn logged_in_harness() -> Harness {
    let h = harness();
    h.client.login("user@example.com", "secret").expect("login");
    h
}
