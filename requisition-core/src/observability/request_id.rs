//! Request correlation for calls to the backend REST API.
//!
//! Every outbound request carries an `x-request-id` header so a failed
//! submission can be matched against backend logs.

use reqwest::header::HeaderMap;
use uuid::Uuid;

/// Header name for request correlation ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Inject a request ID into HTTP request headers, generating one when the
/// caller has none to propagate.
pub fn inject_request_id(headers: &mut HeaderMap, request_id: Option<&str>) -> String {
    let id = match request_id {
        Some(id) => id.to_string(),
        None => Uuid::new_v4().to_string(),
    };

    if let Ok(value) = id.parse() {
        headers.insert(REQUEST_ID_HEADER, value);
    }

    id
}

/// Extract the request ID from response or request headers.
pub fn extract_request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// A thin wrapper over reqwest's RequestBuilder that attaches a request ID
/// on send.
pub struct TracedRequest {
    request: reqwest::RequestBuilder,
}

impl TracedRequest {
    pub fn new(request: reqwest::RequestBuilder) -> Self {
        Self { request }
    }

    /// Add a header to the request.
    pub fn header(self, key: &str, value: &str) -> Self {
        Self {
            request: self.request.header(key, value),
        }
    }

    /// Add JSON body to the request.
    pub fn json<T: serde::Serialize + ?Sized>(self, json: &T) -> Self {
        Self {
            request: self.request.json(json),
        }
    }

    /// Add bearer auth token.
    pub fn bearer_auth<T: std::fmt::Display>(self, token: T) -> Self {
        Self {
            request: self.request.bearer_auth(token),
        }
    }

    /// Send the request with a fresh request ID header.
    pub async fn send(self) -> Result<reqwest::Response, reqwest::Error> {
        let mut headers = HeaderMap::new();
        let id = inject_request_id(&mut headers, None);
        tracing::debug!(request_id = %id, "sending backend request");

        self.request.headers(headers).send().await
    }

    /// Send the request propagating an existing request ID.
    pub async fn send_with_request_id(
        self,
        request_id: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut headers = HeaderMap::new();
        inject_request_id(&mut headers, Some(request_id));

        self.request.headers(headers).send().await
    }
}

/// Extension trait for reqwest::Client to create traced requests.
pub trait TracedClientExt {
    fn traced_get(&self, url: &str) -> TracedRequest;
    fn traced_post(&self, url: &str) -> TracedRequest;
    fn traced_put(&self, url: &str) -> TracedRequest;
    fn traced_delete(&self, url: &str) -> TracedRequest;
}

impl TracedClientExt for reqwest::Client {
    fn traced_get(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.get(url))
    }

    fn traced_post(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.post(url))
    }

    fn traced_put(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.put(url))
    }

    fn traced_delete(&self, url: &str) -> TracedRequest {
        TracedRequest::new(self.delete(url))
    }
}
