//! Request building and typed HTTP access for the Solvr API.
//!
//! # Overview
//! Two leaves make up the crate:
//!
//! - [`playground`]: turns an [`EndpointDescriptor`] plus the user's raw
//!   inputs into a URL, a `curl` command and an executable request.
//! - [`client`]: a thin client over a configured base URL that attaches the
//!   stored bearer token, unwraps the `{data, meta}` envelope and normalises
//!   every non-2xx response into an [`ApiError`].
//!
//! # Design
//! - Requests and responses are plain data ([`HttpRequest`],
//!   [`HttpResponse`]); only a [`Transport`] performs I/O, so building and
//!   parsing stay deterministic and testable.
//! - The bearer token lives behind the injectable [`CredentialStore`] trait.
//! - Payloads are generic `serde` types; the client has no domain knowledge.

pub mod catalog;
pub mod client;
pub mod config;
pub mod credentials;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod playground;
pub mod transport;
pub mod types;

pub use client::ApiClient;
pub use config::ClientConfig;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore, TOKEN_KEY};
pub use endpoint::{AuthRequirement, EndpointDescriptor, ParamLocation, ParamType, ParameterSpec};
pub use error::{ApiError, ClientError, CredentialError, EndpointError, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use playground::{BuiltRequest, ExecutionError, PlaygroundResponse, RequestBuilder, RequestDraft, ResponseBody};
pub use transport::{Transport, UreqTransport};
pub use types::{Envelope, Meta};
