//! HTTP transport used for authorized API calls.
//!
//! The client only ever needs "send this JSON, give me JSON back", so the transport is a small
//! trait. `UreqTransport` is the real implementation; tests substitute an in-memory fake.

use http::{Response, StatusCode};
use log::debug;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::client::TadoClientError;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        };
        f.write_str(name)
    }
}

/// A single authorized request.
#[derive(Debug, Clone)]
pub struct ApiRequest<'a> {
    pub method: Method,
    /// Absolute URL including any query string.
    pub url: String,
    pub bearer: &'a str,
    pub body: Option<&'a Value>,
}

pub trait Transport {
    /// Send the request and decode the response body as JSON.
    ///
    /// An empty 2xx body decodes to `Value::Null`. Non-2xx statuses and network failures are errors.
    fn send(&self, request: ApiRequest<'_>) -> Result<Value, TadoClientError>;
}

pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole request; `None` leaves it to the OS.
    pub fn new(timeout: Option<Duration>) -> Self {
        UreqTransport {
            agent: build_agent(timeout),
        }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: ApiRequest<'_>) -> Result<Value, TadoClientError> {
        debug!("{} {}", request.method, request.url);
        let auth = format!("Bearer {}", request.bearer);
        let url = request.url.as_str();

        let result = match request.method {
            Method::Get => self
                .agent
                .get(url)
                .header("Accept", "application/json")
                .header("Authorization", &auth)
                .call(),
            Method::Delete => self
                .agent
                .delete(url)
                .header("Accept", "application/json")
                .header("Authorization", &auth)
                .call(),
            Method::Put | Method::Post => {
                let builder = if request.method == Method::Put {
                    self.agent.put(url)
                } else {
                    self.agent.post(url)
                };
                let builder = builder
                    .header("Accept", "application/json")
                    .header("Authorization", &auth);
                match request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };

        let response = result.map_err(|e| TadoClientError::Transport(e.to_string()))?;
        let (status, text) = read_response(response)?;
        if !status.is_success() {
            return Err(TadoClientError::Http {
                status: status.as_u16(),
                message: text,
            });
        }
        parse_json_body(&text)
    }
}

/// Agent that hands back non-2xx responses instead of erroring, so their bodies can be reported.
pub(crate) fn build_agent(timeout: Option<Duration>) -> ureq::Agent {
    ureq::Agent::config_builder()
        .http_status_as_error(false)
        .timeout_global(timeout)
        .build()
        .into()
}

pub(crate) fn read_response(mut response: Response<ureq::Body>) -> Result<(StatusCode, String), TadoClientError> {
    let status = response.status();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| TadoClientError::Transport(e.to_string()))?;
    Ok((status, text))
}

pub(crate) fn parse_json_body(text: &str) -> Result<Value, TadoClientError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(TadoClientError::Json)
}
