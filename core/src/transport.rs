//! Executes `HttpRequest` values against the network.
//!
//! `Transport` is the seam between the pure request builder and real I/O.
//! `UreqTransport` is the default; tests substitute recording fakes.

use std::fmt;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Upper bound on a response body read into memory.
const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Performs one HTTP round-trip.
///
/// Implementations return every status code as data; only failures to get
/// a response at all (connect, DNS, timeout, body read) are errors, and they
/// must be reported as `ApiError::Network`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a pooled `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl fmt::Debug for UreqTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqTransport").finish_non_exhaustive()
    }
}

impl UreqTransport {
    /// `timeout` bounds the whole call, connect through body read.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.url);
                for (key, value) in &request.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.url);
                for (key, value) in &request.headers {
                    builder = builder.header(key.as_str(), value.as_str());
                }
                let body = request.body.as_deref().unwrap_or(&[]);
                builder.send(body)
            }
        };
        let mut response = result.map_err(network)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(MAX_RESPONSE_BYTES)
            .read_to_vec()
            .map_err(network)?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn network(err: ureq::Error) -> ApiError {
    ApiError::Network(err.to_string())
}
