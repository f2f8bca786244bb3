use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, USER_AGENT};
use http::Method;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("Invalid header '{0}'")]
    InvalidHeader(String),
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("HTTP {status}: {reason}")]
    HttpStatus {
        status: u16,
        reason: String,
        url: String,
    },
    #[error("Failed to decode JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl FetchError {
    /// Status code of a non-success response, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Per-request options, the subset of a fetch init that a loading step needs.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RequestOptions {
    /// HTTP method, GET when unset
    pub method: Option<String>,
    pub headers: HashMap<String, String>,
    /// Raw request body
    pub body: Option<String>,
    /// JSON request body, takes precedence over `body`
    pub json: Option<Value>,
    pub timeout_ms: Option<u64>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json(mut self, json: Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    fn resolve_method(&self) -> Result<Method, FetchError> {
        match &self.method {
            None => Ok(Method::GET),
            Some(m) => Method::from_bytes(m.to_uppercase().as_bytes())
                .map_err(|_| FetchError::InvalidMethod(m.clone())),
        }
    }
}

/// Client-wide settings shared by every request issued through a [`Fetcher`].
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_ms: u64,
    pub user_agent: String,
    pub default_headers: HashMap<String, String>,
    /// Idle connections kept per host; `0` disables pooling
    pub pool_max_idle_per_host: Option<usize>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
            default_headers: HashMap::new(),
            pool_max_idle_per_host: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_user_agent() -> String {
    format!("pipekit/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

impl Fetcher {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a fetcher whose client carries the configured timeout, user agent and headers
    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let mut headers = header_map(&config.default_headers)?;
        let agent = HeaderValue::from_str(&config.user_agent)
            .map_err(|_| FetchError::InvalidHeader(USER_AGENT.to_string()))?;
        headers.insert(USER_AGENT, agent);

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .default_headers(headers);
        if let Some(idle) = config.pool_max_idle_per_host {
            builder = builder.pool_max_idle_per_host(idle);
        }
        let client = builder.build()?;

        Ok(Self::new(client))
    }

    /// Issue a single request and decode its body.
    ///
    /// # Flow
    /// 1. Parse `url` and resolve the method (GET when unset)
    /// 2. Attach per-request headers, then the JSON or raw body
    /// 3. Apply the per-request timeout, if any, over the client's own
    /// 4. Send and reject non-success statuses
    /// 5. Decode the body by content type
    ///
    /// # Arguments
    /// * `url` - Absolute URL to request
    /// * `options` - Method, headers, body and timeout for this request
    ///
    /// # Returns
    /// The parsed body when the content type declares JSON, otherwise a
    /// `Value::String` holding the raw text. Fails with
    /// [`FetchError::HttpStatus`] for non-success statuses and
    /// [`FetchError::InvalidUrl`] before any I/O for malformed URLs.
    ///
    /// Must run inside a Tokio runtime.
    pub async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<Value, FetchError> {
        let parsed = Url::parse(url).map_err(|source| FetchError::InvalidUrl {
            url: url.to_string(),
            source,
        })?;
        let method = options.resolve_method()?;

        tracing::debug!("Fetching {} {}", method, parsed);

        let mut request = self
            .client
            .request(method, parsed)
            .headers(header_map(&options.headers)?);

        if let Some(json) = &options.json {
            request = request.json(json);
        } else if let Some(body) = &options.body {
            request = request.body(body.clone());
        }
        if let Some(ms) = options.timeout_ms {
            request = request.timeout(Duration::from_millis(ms));
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Request to {} failed with status {}", url, status);
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
                url: url.to_string(),
            });
        }

        let structured = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(is_structured)
            .unwrap_or(false);

        let text = response.text().await?;
        decode_body(&text, structured)
    }
}

/// Whether a content type declares a JSON body.
pub fn is_structured(content_type: &str) -> bool {
    content_type.to_ascii_lowercase().contains("application/json")
}

fn decode_body(text: &str, structured: bool) -> Result<Value, FetchError> {
    if structured {
        Ok(serde_json::from_str(text)?)
    } else {
        Ok(Value::String(text.to_string()))
    }
}

fn header_map(headers: &HashMap<String, String>) -> Result<HeaderMap, FetchError> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let key = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        let val =
            HeaderValue::from_str(value).map_err(|_| FetchError::InvalidHeader(name.clone()))?;
        map.insert(key, val);
    }
    Ok(map)
}
