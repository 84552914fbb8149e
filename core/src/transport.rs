//! Executes `HttpRequest` values against the network.
//!
//! `UreqTransport` disables ureq's status-code-as-error behavior so 4xx/5xx
//! responses come back as data and the client decides what they mean. Only
//! failures to obtain a response at all become `TransportError`.

use std::time::Duration;

use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, RequestBuilder};

use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.as_str();
        let result = match request.method {
            HttpMethod::Get => without_body(self.agent.get(url), request),
            HttpMethod::Delete => without_body(self.agent.delete(url), request),
            HttpMethod::Post => with_body(self.agent.post(url), request),
            HttpMethod::Patch => with_body(self.agent.patch(url), request),
        };

        let mut response = result.map_err(|e| TransportError::Request {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        // Non-UTF-8 bodies are still responses; decode lossily.
        let bytes = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| TransportError::Body {
                url: request.url.clone(),
                message: e.to_string(),
            })?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn apply_headers<B>(mut builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn without_body(
    builder: RequestBuilder<WithoutBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    apply_headers(builder, request).call()
}

fn with_body(
    builder: RequestBuilder<WithBody>,
    request: &HttpRequest,
) -> Result<ureq::http::Response<ureq::Body>, ureq::Error> {
    let builder = apply_headers(builder, request);
    match request.body.as_deref() {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}
