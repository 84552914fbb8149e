//! Error types for the Solvr API client and request builder.
//!
//! # Design
//! Errors are split by origin. `TransportError` means the server was never
//! reached (or the body could not be read); `ApiError` means the server
//! answered outside the 2xx envelope contract. `ClientError` aggregates both
//! so callers can still tell them apart with a `match`.
//!
//! Success-path parse failures surface as `ClientError::Decode`, not as an
//! `ApiError`. Failure-path parse failures are normalised into an `ApiError`
//! with code `INTERNAL_ERROR`.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

/// Error codes the Solvr API returns in `{"error": {"code": ...}}`.
pub mod codes {
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const FORBIDDEN: &str = "FORBIDDEN";
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    pub const DUPLICATE_CONTENT: &str = "DUPLICATE_CONTENT";
    pub const CONTENT_TOO_SHORT: &str = "CONTENT_TOO_SHORT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const METHOD_NOT_ALLOWED: &str = "METHOD_NOT_ALLOWED";
}

/// A non-2xx response, normalised.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{code} (HTTP {status}): {message}")]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
    pub details: Option<Value>,
}

impl ApiError {
    pub fn new(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Fallback for a non-2xx response whose body is not an error envelope.
    pub fn unstructured(status: u16) -> Self {
        Self::new(
            status,
            codes::INTERNAL_ERROR,
            format!("request failed with status {status} and an unreadable error body"),
        )
    }

    pub fn is_not_found(&self) -> bool {
        self.code == codes::NOT_FOUND
    }

    pub fn is_unauthorized(&self) -> bool {
        self.code == codes::UNAUTHORIZED
    }

    pub fn is_rate_limited(&self) -> bool {
        self.code == codes::RATE_LIMITED || self.status == 429
    }

    pub fn is_validation(&self) -> bool {
        self.code == codes::VALIDATION_ERROR
    }
}

/// The request never produced a readable HTTP response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Connection refused, DNS failure, timeout or protocol error.
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The status line arrived but the body could not be read.
    #[error("failed to read response body from {url}: {message}")]
    Body { url: String, message: String },
}

/// Errors returned by `ApiClient`.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered outside the 2xx envelope contract.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server was never reached.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A 2xx body was not a valid `{data, meta}` envelope for the requested type.
    #[error("failed to decode response envelope: {0}")]
    Decode(#[source] serde_json::Error),

    /// The request payload could not be serialized to JSON.
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl ClientError {
    /// Returns the `ApiError` if the server answered with a non-2xx status.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of the failed response, if one was received.
    pub fn status(&self) -> Option<u16> {
        self.api_error().map(|err| err.status)
    }
}

/// Configuration errors in an `EndpointDescriptor`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EndpointError {
    #[error("unknown HTTP method `{0}`")]
    UnknownMethod(String),

    #[error("path `{path}` has an unterminated placeholder")]
    UnterminatedPlaceholder { path: String },

    #[error("path `{path}` has an empty placeholder")]
    EmptyPlaceholder { path: String },

    #[error("placeholder `{{{name}}}` appears more than once in `{path}`")]
    DuplicatePlaceholder { path: String, name: String },

    #[error("placeholder `{{{name}}}` in `{path}` has no declared parameter")]
    UndeclaredPlaceholder { path: String, name: String },

    #[error("path parameter `{name}` in `{path}` must be required")]
    OptionalPathParameter { path: String, name: String },

    #[error("parameter `{name}` is declared more than once for `{path}`")]
    DuplicateParameter { path: String, name: String },
}

/// Failures of a durable credential store.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read credentials from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write credentials to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
