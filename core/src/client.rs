//! Typed HTTP client for the Solvr API.
//!
//! # Design
//! `ApiClient` splits every call into building and parsing:
//! `build_*` methods produce an `HttpRequest`, `parse_*` methods consume an
//! `HttpResponse`, and neither touches the network. The convenience methods
//! (`get`, `post`, `patch`, `delete`) run the two halves through the injected
//! `Transport`.
//!
//! The only state read per call is the bearer token, fetched from the
//! `CredentialStore` every time a request is built. Nothing is retried,
//! cached or deduplicated.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::credentials::CredentialStore;
use crate::error::{ApiError, ClientError, TransportError};
use crate::http::{encode_query, with_query, HttpMethod, HttpRequest, HttpResponse};
use crate::transport::{Transport, UreqTransport};
use crate::types::{Envelope, ErrorEnvelope, Meta};

pub struct ApiClient<T = UreqTransport> {
    base_url: String,
    user_agent: String,
    credentials: Arc<dyn CredentialStore>,
    transport: T,
}

impl ApiClient<UreqTransport> {
    /// Client with a blocking `ureq` transport honouring `config.timeout`.
    pub fn new(config: &ClientConfig, credentials: Arc<dyn CredentialStore>) -> Self {
        Self::with_transport(config, credentials, UreqTransport::new(config.timeout))
    }

    /// Client configured from `SOLVR_API_URL` / `SOLVR_API_TIMEOUT_SECS`.
    pub fn from_env(credentials: Arc<dyn CredentialStore>) -> Self {
        Self::new(&ClientConfig::from_env(), credentials)
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn with_transport(
        config: &ClientConfig,
        credentials: Arc<dyn CredentialStore>,
        transport: T,
    ) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            credentials,
            transport,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &dyn CredentialStore {
        self.credentials.as_ref()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // -----------------------------------------------------------------------
    // Build
    // -----------------------------------------------------------------------

    /// `GET base_url + path`, with `query` percent-encoded in the given order.
    pub fn build_get(&self, path: &str, query: &[(&str, &str)]) -> HttpRequest {
        let url = with_query(self.url(path), &encode_query(query.iter().copied()));
        self.request(HttpMethod::Get, url, None)
    }

    pub fn build_post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ClientError> {
        self.build_with_body(HttpMethod::Post, path, body)
    }

    pub fn build_patch<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ClientError> {
        self.build_with_body(HttpMethod::Patch, path, body)
    }

    pub fn build_delete(&self, path: &str) -> HttpRequest {
        self.request(HttpMethod::Delete, self.url(path), None)
    }

    fn build_with_body<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest, ClientError> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(ClientError::Encode)?;
        Ok(self.request(method, self.url(path), body))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: HttpMethod, url: String, body: Option<String>) -> HttpRequest {
        let mut headers = vec![("user-agent".to_string(), self.user_agent.clone())];
        if let Some(token) = self.credentials.get_token() {
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }
        if method.has_body() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            url,
            headers,
            body,
        }
    }

    // -----------------------------------------------------------------------
    // Parse
    // -----------------------------------------------------------------------

    /// Unwrap `data` from a 2xx envelope, or normalise a failure.
    pub fn parse_data<D: DeserializeOwned>(&self, response: HttpResponse) -> Result<D, ClientError> {
        self.parse_envelope::<D, Value>(response).map(|env| env.data)
    }

    /// Return the whole `{data, meta}` envelope of a 2xx response.
    pub fn parse_envelope<D: DeserializeOwned, M: DeserializeOwned>(
        &self,
        response: HttpResponse,
    ) -> Result<Envelope<D, M>, ClientError> {
        check_status(&response)?;
        if response.status == 204 {
            let data = serde_json::from_value(Value::Null).map_err(ClientError::Decode)?;
            return Ok(Envelope { data, meta: None });
        }
        serde_json::from_str(&response.body).map_err(ClientError::Decode)
    }

    // -----------------------------------------------------------------------
    // Execute
    // -----------------------------------------------------------------------

    /// Send `request` as-is and return the raw response, whatever its status.
    ///
    /// No credentials are added and no envelope is unwrapped.
    pub fn send_raw(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = %request.method, url = %request.url, "sending request");
        let response = self.transport.send(request)?;
        debug!(status = response.status, url = %request.url, "received response");
        Ok(response)
    }

    pub fn execute<D: DeserializeOwned>(&self, request: &HttpRequest) -> Result<D, ClientError> {
        let response = self.send_raw(request)?;
        self.parse_data(response)
    }

    pub fn execute_with_meta<D: DeserializeOwned, M: DeserializeOwned>(
        &self,
        request: &HttpRequest,
    ) -> Result<Envelope<D, M>, ClientError> {
        let response = self.send_raw(request)?;
        self.parse_envelope(response)
    }

    pub fn get<D: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<D, ClientError> {
        self.execute(&self.build_get(path, query))
    }

    /// Like `get`, but keeps the envelope's `meta` alongside `data`.
    pub fn get_with_meta<D: DeserializeOwned, M: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<D, M>, ClientError> {
        self.execute_with_meta(&self.build_get(path, query))
    }

    /// `get_with_meta` with the standard pagination `Meta`.
    pub fn list<D: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Envelope<D, Meta>, ClientError> {
        self.get_with_meta(path, query)
    }

    pub fn post<D: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<D, ClientError> {
        self.execute(&self.build_post(path, body)?)
    }

    pub fn patch<D: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<D, ClientError> {
        self.execute(&self.build_patch(path, body)?)
    }

    pub fn delete<D: DeserializeOwned>(&self, path: &str) -> Result<D, ClientError> {
        self.execute(&self.build_delete(path))
    }
}

/// Map a non-2xx response to an `ApiError`.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    match serde_json::from_str::<ErrorEnvelope>(&response.body) {
        Ok(envelope) => Err(ApiError {
            status: response.status,
            code: envelope.error.code,
            message: envelope.error.message,
            details: envelope.error.details,
        }),
        Err(err) => {
            warn!(status = response.status, error = %err, "error response is not an error envelope");
            Err(ApiError::unstructured(response.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;
    use tracing_test::traced_test;

    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::codes;

    /// Returns a canned response and records every request it is given.
    struct StubTransport {
        reply: Result<HttpResponse, TransportError>,
        sent: Mutex<Vec<HttpRequest>>,
    }

    impl StubTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                reply: Ok(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                reply: Err(TransportError::Request {
                    url: "http://localhost:3000/v1/posts".to_string(),
                    message: message.to_string(),
                }),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn last(&self) -> HttpRequest {
            self.sent.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for StubTransport {
        fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.sent.lock().unwrap().push(request.clone());
            self.reply.clone()
        }
    }

    fn client_with(transport: StubTransport, token: Option<&str>) -> ApiClient<StubTransport> {
        let store: Arc<dyn CredentialStore> = match token {
            Some(t) => Arc::new(MemoryCredentialStore::with_token(t)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        ApiClient::with_transport(&ClientConfig::new("http://localhost:3000/v1/"), store, transport)
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    #[test]
    fn build_get_encodes_query_in_order() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let req = client.build_get("/search", &[("q", "async postgres race"), ("limit", "5")]);
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/v1/search?q=async%20postgres%20race&limit=5");
        assert!(req.body.is_none());
        assert!(req.header("content-type").is_none());
    }

    #[test]
    fn build_get_without_query_has_no_question_mark() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        assert_eq!(client.build_get("/posts", &[]).url, "http://localhost:3000/v1/posts");
    }

    #[test]
    fn build_post_serializes_json() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let req = client
            .build_post("/posts", Some(&json!({"title": "Race in pool", "tags": ["go"]})))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["title"], "Race in pool");
    }

    #[test]
    fn build_patch_without_body() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let req = client.build_patch::<Value>("/posts/p1", None).unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert!(req.body.is_none());
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn build_delete_has_no_body() {
        let client = client_with(StubTransport::replying(204, ""), None);
        let req = client.build_delete("/posts/p1");
        assert_eq!(req.method, HttpMethod::Delete);
        assert_eq!(req.url, "http://localhost:3000/v1/posts/p1");
        assert!(req.body.is_none());
    }

    #[test]
    fn token_is_attached_to_every_request() {
        let client = client_with(StubTransport::replying(200, "{}"), Some("solvr_key"));
        let reqs = [
            client.build_get("/me", &[]),
            client.build_post("/posts", Some(&json!({}))).unwrap(),
            client.build_patch("/posts/1", Some(&json!({}))).unwrap(),
            client.build_delete("/posts/1"),
        ];
        for req in reqs {
            assert_eq!(req.header("authorization"), Some("Bearer solvr_key"), "{}", req.method);
        }
    }

    #[test]
    fn no_token_means_no_authorization_header() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let reqs = [
            client.build_get("/me", &[]),
            client.build_post("/posts", Some(&json!({}))).unwrap(),
            client.build_delete("/posts/1"),
        ];
        for req in reqs {
            assert!(req.headers.iter().all(|(k, _)| !k.eq_ignore_ascii_case("authorization")));
        }
    }

    #[test]
    fn token_changes_apply_to_the_next_request() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        client.credentials().set_token("fresh").unwrap();
        assert_eq!(client.build_get("/me", &[]).header("authorization"), Some("Bearer fresh"));
        client.credentials().clear_token().unwrap();
        assert!(client.build_get("/me", &[]).header("authorization").is_none());
    }

    #[test]
    fn get_unwraps_data() {
        let client = client_with(
            StubTransport::replying(200, r#"{"data":{"id":"p1"},"meta":{"total":1}}"#),
            None,
        );
        let data: Value = client.get("/posts/p1", &[]).unwrap();
        assert_eq!(data, json!({"id": "p1"}));
    }

    #[test]
    fn get_with_meta_keeps_envelope() {
        let client = client_with(
            StubTransport::replying(200, r#"{"data":{"id":"p1"},"meta":{"total":1}}"#),
            None,
        );
        let env: Envelope<Value, Meta> = client.get_with_meta("/posts/p1", &[]).unwrap();
        assert_eq!(env.data, json!({"id": "p1"}));
        assert_eq!(env.meta.unwrap().total, Some(1));

        let raw: Envelope<Value, Value> = client.get_with_meta("/posts/p1", &[]).unwrap();
        assert_eq!(raw.meta, Some(json!({"total": 1})));
    }

    #[test]
    fn structured_error_is_normalized() {
        let client = client_with(
            StubTransport::replying(404, r#"{"error":{"code":"NOT_FOUND","message":"missing"}}"#),
            None,
        );
        let err = client.get::<Value>("/posts/nope", &[]).unwrap_err();
        let api = err.api_error().unwrap();
        assert_eq!(api.status, 404);
        assert_eq!(api.code, "NOT_FOUND");
        assert_eq!(api.message, "missing");
        assert!(api.details.is_none());
    }

    #[test]
    fn structured_error_keeps_details() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let err = client
            .parse_data::<Value>(response(
                400,
                r#"{"error":{"code":"VALIDATION_ERROR","message":"bad","details":{"field":"title"}}}"#,
            ))
            .unwrap_err();
        let api = err.api_error().unwrap();
        assert!(api.is_validation());
        assert_eq!(api.details, Some(json!({"field": "title"})));
    }

    #[test]
    fn unparseable_error_becomes_internal_error() {
        let client = client_with(StubTransport::replying(500, "<html>Bad Gateway</html>"), None);
        let err = client.get::<Value>("/posts", &[]).unwrap_err();
        let api = err.api_error().unwrap();
        assert_eq!(api.status, 500);
        assert_eq!(api.code, codes::INTERNAL_ERROR);
    }

    #[test]
    fn json_error_without_envelope_becomes_internal_error() {
        let client = client_with(StubTransport::replying(200, "{}"), None);
        let err = client
            .parse_data::<Value>(response(429, r#"{"message":"slow down"}"#))
            .unwrap_err();
        let api = err.api_error().unwrap();
        assert_eq!(api.code, codes::INTERNAL_ERROR);
        assert!(api.is_rate_limited());
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let client = client_with(StubTransport::replying(200, "not json"), None);
        let err = client.get::<Value>("/posts", &[]).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn success_body_of_wrong_shape_is_a_decode_error() {
        #[derive(Debug, serde::Deserialize)]
        struct Post {
            #[allow(dead_code)]
            id: String,
        }
        let client = client_with(StubTransport::replying(200, r#"{"data":{"title":"x"}}"#), None);
        let err = client.get::<Post>("/posts/1", &[]).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn no_content_yields_null_data() {
        let client = client_with(StubTransport::replying(204, ""), Some("t"));
        let data: Value = client.delete("/posts/p1").unwrap();
        assert_eq!(data, Value::Null);
        client.delete::<()>("/posts/p1").unwrap();
    }

    #[test]
    fn transport_failure_is_propagated_unchanged() {
        let client = client_with(StubTransport::failing("connection refused"), None);
        let err = client.get::<Value>("/posts", &[]).unwrap_err();
        match err {
            ClientError::Transport(TransportError::Request { message, .. }) => {
                assert_eq!(message, "connection refused")
            }
            other => panic!("expected transport error, got {other:?}"),
        }
    }

    #[test]
    fn post_sends_built_request() {
        let client = client_with(
            StubTransport::replying(201, r#"{"data":{"id":"p9"}}"#),
            Some("tok"),
        );
        let created: Value = client.post("/posts", Some(&json!({"title": "t"}))).unwrap();
        assert_eq!(created["id"], "p9");

        let sent = client.transport().last();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.url, "http://localhost:3000/v1/posts");
        assert_eq!(sent.header("authorization"), Some("Bearer tok"));
        assert!(sent.header("user-agent").unwrap().starts_with("solvr-rs/"));
    }

    #[test]
    fn send_raw_does_not_interpret_status() {
        let client = client_with(StubTransport::replying(503, "down"), Some("tok"));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: "http://localhost:3000/v1/health".to_string(),
            headers: Vec::new(),
            body: None,
        };
        let resp = client.send_raw(&req).unwrap();
        assert_eq!(resp.status, 503);
        assert_eq!(resp.body, "down");
        assert!(client.transport().last().headers.is_empty());
    }

    #[test]
    #[traced_test]
    fn requests_are_logged_without_the_token() {
        let client = client_with(
            StubTransport::replying(200, r#"{"data":[]}"#),
            Some("super-secret-token"),
        );
        let _: Value = client.get("/posts", &[("status", "open")]).unwrap();
        assert!(logs_contain("sending request"));
        assert!(logs_contain("received response"));
        assert!(!logs_contain("super-secret-token"));
    }
}
