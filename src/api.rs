// API client module: a small blocking HTTP client for the mockup API.
// Every call is a single attempt with a fixed timeout; there are no retries.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, warn};

pub const API_KEY_HEADER: &str = "x-api-key";

/// Longest raw-body excerpt kept when a response is not JSON.
const BODY_EXCERPT_CHARS: usize = 500;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a status code of 400 or above.
    #[error("{method} {path} failed ({status}): {message}")]
    Status {
        method: Method,
        path: String,
        status: u16,
        message: String,
    },
    /// Timeouts, refused connections and unreadable bodies.
    #[error("{method} {path} failed: {source}")]
    Transport {
        method: Method,
        path: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("invalid API key header value")]
    InvalidKey,
}

/// The one operation the steps need from the API: send `payload` (if any)
/// to `path` and get the decoded JSON body back.
pub trait MockupApi {
    fn request(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, ApiError>;
}

/// Blocking client bound to one base URL and one API key.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let mut key = HeaderValue::from_str(api_key).map_err(|_| ApiError::InvalidKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(ApiError::Client)?;
        Ok(ApiClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl MockupApi for ApiClient {
    fn request(&self, method: Method, path: &str, payload: Option<&Value>) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "sending request");

        let mut req = self.client.request(method.clone(), &url);
        // Bodies only go out on write methods.
        if let Some(body) = payload.filter(|_| method != Method::GET) {
            req = req.json(body);
        }

        let transport = |source| ApiError::Transport {
            method: method.clone(),
            path: path.to_string(),
            source,
        };
        let res = req.send().map_err(transport)?;
        let status = res.status();
        let text = res.text().map_err(transport)?;
        debug!(status = status.as_u16(), bytes = text.len(), "received response");

        let body = decode_body(&text);
        if status.as_u16() >= 400 {
            return Err(ApiError::Status {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                message: message_of(&body),
            });
        }
        Ok(body)
    }
}

/// Decode a response body, substituting a failure envelope with a short
/// excerpt when the body is not JSON.
pub fn decode_body(text: &str) -> Value {
    match serde_json::from_str(text) {
        Ok(value) => value,
        Err(err) => {
            warn!("response body is not JSON: {err}");
            let excerpt: String = text.chars().take(BODY_EXCERPT_CHARS).collect();
            json!({
                "success": false,
                "message": format!("Non-JSON response: {excerpt}"),
            })
        }
    }
}

/// True only when the envelope carries `success: true`.
pub fn is_success(body: &Value) -> bool {
    body.get("success").and_then(Value::as_bool).unwrap_or(false)
}

/// The envelope's `message` when it holds something, otherwise the whole
/// body rendered as JSON. Null, false, zero and empty values count as nothing.
pub fn message_of(body: &Value) -> String {
    match body.get("message") {
        Some(Value::String(msg)) if !msg.is_empty() => msg.clone(),
        Some(msg) if !is_blank(msg) && !msg.is_string() => msg.to_string(),
        _ => body.to_string(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}
