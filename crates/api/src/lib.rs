//! Runway model API client.
//!
//! Every hosted or local model exposes two endpoints below its base URL:
//!
//! - `GET {base}info` returns the model's metadata document
//! - `POST {base}query` runs the model on a JSON payload
//!
//! [`RunwayClient`] is bound to one model base URL. It attaches
//! `Accept: application/json` to every request and an
//! `Authorization: Bearer <token>` header only when a credential is
//! configured; local models run unauthenticated.
//!
//! Calls block the calling thread. Node evaluation is synchronous, so the
//! async `reqwest` futures are driven to completion through
//! [`runway_util::block_on_future`]. No timeout is configured beyond the
//! client defaults and nothing is retried.
//!
//! # Example
//!
//! ```ignore
//! use runway_api::RunwayClient;
//! use serde_json::json;
//!
//! let client = RunwayClient::new("http://localhost:8000", None)?;
//! let info = client.fetch_info()?;
//! let outputs = client.query(&json!({ "prompt": "a red fox" }))?;
//! ```

use std::env;
use std::time::Instant;

use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, Url};
use runway_util::http::truncate_response_preview;
use runway_util::{JsonParseError, block_on_future, parse_response_json_strict, redact_sensitive, status_error_message};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

/// Path of the metadata endpoint relative to a model base URL.
pub const INFO_PATH: &str = "info";
/// Path of the invocation endpoint relative to a model base URL.
pub const QUERY_PATH: &str = "query";

/// Thin wrapper around a configured `reqwest::Client` for one model.
#[derive(Debug, Clone)]
pub struct RunwayClient {
    base_url: String,
    http: Client,
    user_agent: String,
    authenticated: bool,
}

impl RunwayClient {
    /// Construct a client for the model served at `base_url`.
    ///
    /// The base URL is normalized to end with exactly one `/`. A blank
    /// credential is treated as absent.
    ///
    /// # Errors
    /// Fails when the base URL does not parse as an `http`/`https` URL with a
    /// host, or when the credential cannot be carried in a header.
    pub fn new(base_url: &str, credential: Option<&str>) -> Result<Self, ApiError> {
        let base_url = normalize_base_url(base_url);
        validate_base_url(&base_url)?;

        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let credential = credential.map(str::trim).filter(|token| !token.is_empty());
        if let Some(token) = credential {
            let mut authorization = HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| ApiError::InvalidCredential)?;
            authorization.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, authorization);
        }

        // Each blocking call may run on its own short-lived runtime, so pooled
        // connections must not outlive the call that opened them.
        let http = Client::builder()
            .default_headers(default_headers)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(ApiError::Client)?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("runway-nodes/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
            authenticated: credential.is_some(),
        })
    }

    /// The normalized base URL, always ending with `/`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Whether requests carry a bearer token.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Absolute URL of an endpoint below the base URL.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Build a `reqwest::RequestBuilder` for a method and base-relative path.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.endpoint(path);
        debug!(%url, "building request");

        self.http
            .request(method, url)
            .header(header::USER_AGENT, &self.user_agent)
    }

    /// Fetch the model's metadata document from `{base}info`.
    pub fn fetch_info(&self) -> Result<Value, ApiError> {
        let request = self.request(Method::GET, INFO_PATH);
        block_on_future(send_json(request, Method::GET, self.endpoint(INFO_PATH)))
    }

    /// Run the model on `payload` via `{base}query`.
    ///
    /// An empty response body is returned as `Value::Null`.
    pub fn query(&self, payload: &Value) -> Result<Value, ApiError> {
        let request = self.request(Method::POST, QUERY_PATH).json(payload);
        block_on_future(send_json(request, Method::POST, self.endpoint(QUERY_PATH)))
    }
}

async fn send_json(request: RequestBuilder, method: Method, url: String) -> Result<Value, ApiError> {
    let start = Instant::now();
    debug!(method = %method, %url, "model request started");

    let response = match request.send().await {
        Ok(response) => response,
        Err(source) => {
            warn!(
                method = %method,
                %url,
                error = %source,
                duration_ms = start.elapsed().as_millis(),
                "model request failed"
            );
            return Err(ApiError::Network { url, source });
        }
    };

    let status = response.status();
    let body_text = response
        .text()
        .await
        .map_err(|source| ApiError::Network { url: url.clone(), source })?;

    if !status.is_success() {
        warn!(
            method = %method,
            %url,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "model request returned an error status"
        );
        return Err(ApiError::Status {
            url,
            status: status.as_u16(),
            body_preview: redact_sensitive(&truncate_response_preview(&body_text, 200)),
        });
    }

    if body_text.trim().is_empty() {
        debug!(
            method = %method,
            %url,
            status = %status,
            duration_ms = start.elapsed().as_millis(),
            "model request completed with empty response"
        );
        return Ok(Value::Null);
    }

    let parsed = parse_response_json_strict(&body_text, Some(status)).inspect_err(|error| {
        warn!(
            method = %method,
            %url,
            status = %status,
            body_len = body_text.len(),
            error = %error,
            "model response JSON parse failed"
        );
    })?;
    debug!(
        method = %method,
        %url,
        status = %status,
        duration_ms = start.elapsed().as_millis(),
        "model request completed"
    );
    Ok(parsed)
}

/// Normalize a model base URL so that endpoint paths can be appended.
///
/// ```rust
/// use runway_api::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000/");
/// assert_eq!(normalize_base_url(" https://model.hosted-models.runwayml.cloud/v1// "), "https://model.hosted-models.runwayml.cloud/v1/");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    format!("{}/", base_url.trim().trim_matches('/'))
}

fn validate_base_url(base_url: &str) -> Result<(), ApiError> {
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: base_url.to_string(),
        reason,
    };
    let parsed = Url::parse(base_url).map_err(|error| invalid(error.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}://'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("a host is required".into()));
    }
    Ok(())
}

fn status_hint(status: &u16) -> String {
    status_error_message(*status)
        .map(|hint| format!(" ({hint})"))
        .unwrap_or_default()
}

/// Errors raised by [`RunwayClient`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid model base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("model credential contains characters that cannot be sent in an HTTP header")]
    InvalidCredential,

    #[error("could not build the HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("network error calling {url}: {source}. Hint: check connection/proxy and the model base URL")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP {status} from {url}: {body_preview}{hint}", hint = status_hint(.status))]
    Status { url: String, status: u16, body_preview: String },

    #[error(transparent)]
    MalformedBody(#[from] JsonParseError),

    #[error("async runtime unavailable: {0}")]
    Runtime(#[from] std::io::Error),
}

impl ApiError {
    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True exactly when the server answered `404 Not Found`.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_hang_off_the_normalized_base() {
        let client = RunwayClient::new("http://localhost:8000", None).expect("valid base url");
        assert_eq!(client.base_url(), "http://localhost:8000/");
        assert_eq!(client.endpoint(INFO_PATH), "http://localhost:8000/info");
        assert_eq!(client.endpoint("/query"), "http://localhost:8000/query");
    }

    #[test]
    fn blank_credentials_leave_the_client_unauthenticated() {
        let local = RunwayClient::new("http://localhost:8000/", Some("   ")).expect("valid");
        assert!(!local.is_authenticated());

        let hosted = RunwayClient::new("https://example.runwayml.cloud/", Some("tok3n")).expect("valid");
        assert!(hosted.is_authenticated());
    }

    #[test]
    fn rejects_unusable_base_urls() {
        let error = RunwayClient::new("not a url", None).expect_err("no scheme");
        assert!(matches!(error, ApiError::InvalidBaseUrl { .. }));

        let error = RunwayClient::new("ftp://models.example.com", None).expect_err("wrong scheme");
        assert!(error.to_string().contains("unsupported scheme"));
    }

    #[test]
    fn rejects_credentials_that_break_headers() {
        let error = RunwayClient::new("http://localhost:8000", Some("bad\ntoken")).expect_err("newline in token");
        assert!(matches!(error, ApiError::InvalidCredential));
    }

    #[test]
    fn only_404_counts_as_not_found() {
        let not_found = ApiError::Status {
            url: "http://localhost:8000/info".into(),
            status: 404,
            body_preview: "<empty>".into(),
        };
        assert!(not_found.is_not_found());
        assert!(not_found.to_string().contains("inactive"));

        let server_error = ApiError::Status {
            url: "http://localhost:8000/info".into(),
            status: 500,
            body_preview: "boom".into(),
        };
        assert!(!server_error.is_not_found());
        assert_eq!(server_error.status(), Some(500));
    }

    #[test]
    fn unreachable_server_is_a_network_error() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .and_then(|listener| listener.local_addr())
            .expect("reserve a port")
            .port();
        let client = RunwayClient::new(&format!("http://127.0.0.1:{port}"), None).expect("valid");

        let error = client.fetch_info().expect_err("nothing is listening");
        assert!(matches!(error, ApiError::Network { .. }), "unexpected error: {error}");
        assert!(!error.is_not_found());
    }
}
