//! Request builder behind the interactive API playground.
//!
//! # Overview
//! Applies a `RequestDraft` (the user's raw string inputs plus an optional
//! bearer token) to an `EndpointDescriptor` and derives:
//!
//! - the request URL, with path placeholders substituted and the query string
//!   appended;
//! - an equivalent `curl` command for copy/paste;
//! - an executable `HttpRequest` carrying the same headers and body.
//!
//! # Design
//! Building is pure and deterministic: the same descriptor and draft always
//! produce byte-identical output. A missing path value leaves `{name}` in the
//! URL so the preview shows what is still needed. Values are never coerced;
//! a `number` parameter is sent as the string the user typed.
//!
//! Execution goes through `ApiClient::send_raw`, so the caller sees the true
//! status and body of any upstream response. Only transport failures are
//! errors, and they are reduced to a plain message.

use std::collections::HashMap;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::client::ApiClient;
use crate::endpoint::{EndpointDescriptor, ParamLocation};
use crate::http::{encode_query, with_query, HttpRequest};
use crate::transport::Transport;

/// User-entered values for one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestDraft {
    values: HashMap<String, String>,
    token: Option<String>,
}

impl RequestDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.set(name, value);
        self
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.values.insert(name.to_string(), value.to_string());
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// The value for `name`, if one was entered and it is non-empty.
    pub fn value(&self, name: &str) -> Option<&str> {
        self.values
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref().filter(|t| !t.is_empty())
    }

    /// Drop every value and the token, e.g. when another endpoint is selected.
    pub fn clear(&mut self) {
        self.values.clear();
        self.token = None;
    }
}

/// Preview of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltRequest {
    pub url: String,
    pub curl_command: String,
}

/// A response as received, for display.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaygroundResponse {
    pub status: u16,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Text(String),
}

impl ResponseBody {
    fn from_text(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => ResponseBody::Json(value),
            Err(_) => ResponseBody::Text(text),
        }
    }

    /// Pretty-printed JSON, or the raw text unchanged.
    pub fn render(&self) -> String {
        match self {
            ResponseBody::Json(value) => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            }
            ResponseBody::Text(text) => text.clone(),
        }
    }
}

/// The request could not be sent or its response could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
}

/// Derives previews and requests for one endpoint against one base URL.
#[derive(Debug, Clone, Copy)]
pub struct RequestBuilder<'a> {
    endpoint: &'a EndpointDescriptor,
    base_url: &'a str,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(endpoint: &'a EndpointDescriptor, base_url: &'a str) -> Self {
        Self {
            endpoint,
            base_url: base_url.trim_end_matches('/'),
        }
    }

    pub fn endpoint(&self) -> &EndpointDescriptor {
        self.endpoint
    }

    /// The path template with every available value substituted verbatim.
    pub fn path(&self, draft: &RequestDraft) -> String {
        substitute_path(&self.endpoint.path, draft)
    }

    /// Encoded query string without the leading `?`; empty if nothing qualifies.
    pub fn query(&self, draft: &RequestDraft) -> String {
        encode_query(
            self.endpoint
                .parameters_in(ParamLocation::Query)
                .filter_map(|p| draft.value(&p.name).map(|v| (p.name.as_str(), v))),
        )
    }

    pub fn url(&self, draft: &RequestDraft) -> String {
        with_query(
            format!("{}{}", self.base_url, self.path(draft)),
            &self.query(draft),
        )
    }

    /// JSON body for POST/PATCH, or `None` when no body value was entered.
    pub fn body(&self, draft: &RequestDraft) -> Option<String> {
        if !self.endpoint.method.has_body() {
            return None;
        }
        let fields: Map<String, Value> = self
            .endpoint
            .parameters_in(ParamLocation::Body)
            .filter_map(|p| {
                draft
                    .value(&p.name)
                    .map(|v| (p.name.clone(), Value::String(v.to_string())))
            })
            .collect();
        if fields.is_empty() {
            None
        } else {
            Some(Value::Object(fields).to_string())
        }
    }

    /// Headers in display casing: `Authorization` then `Content-Type`.
    pub fn headers(&self, draft: &RequestDraft) -> Vec<(String, String)> {
        let mut headers = Vec::new();
        if let Some(token) = draft.token() {
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }
        if self.endpoint.method.has_body() {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }
        headers
    }

    pub fn curl_command(&self, draft: &RequestDraft) -> String {
        let mut segments = vec![format!(
            "curl -X {} {}",
            self.endpoint.method,
            double_quote(&self.url(draft))
        )];
        for (name, value) in self.headers(draft) {
            segments.push(format!("-H {}", double_quote(&format!("{name}: {value}"))));
        }
        if let Some(body) = self.body(draft) {
            segments.push(format!("-d {}", single_quote(&body)));
        }
        segments.join(" \\\n  ")
    }

    pub fn build(&self, draft: &RequestDraft) -> BuiltRequest {
        BuiltRequest {
            url: self.url(draft),
            curl_command: self.curl_command(draft),
        }
    }

    /// The request `execute` would send.
    pub fn http_request(&self, draft: &RequestDraft) -> HttpRequest {
        HttpRequest {
            method: self.endpoint.method,
            url: self.url(draft),
            headers: self.headers(draft),
            body: self.body(draft),
        }
    }

    /// Send the request and capture status and body, whatever the status.
    pub fn execute<T: Transport>(
        &self,
        client: &ApiClient<T>,
        draft: &RequestDraft,
    ) -> Result<PlaygroundResponse, ExecutionError> {
        let request = self.http_request(draft);
        debug!(endpoint = %self.endpoint.id, "executing playground request");
        let response = client.send_raw(&request).map_err(|e| ExecutionError {
            message: e.to_string(),
        })?;
        Ok(PlaygroundResponse {
            status: response.status,
            body: ResponseBody::from_text(response.body),
        })
    }
}

fn substitute_path(template: &str, draft: &RequestDraft) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let name = &after[..close];
        match draft.value(name) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

fn double_quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn single_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
