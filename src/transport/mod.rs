//! # Transport Abstraction Layer
//!
//! Trait and implementations for fetching list data and template documents.
//!
//! - [`Transport`] - async request returning the raw body
//! - [`HttpTransport`] - production transport over `reqwest`
//! - [`MockTransport`] - queued responses, request recording, delays
//!
//! [`Transport::request_json`] parses the body and reports unparseable
//! responses as [`TransportError::Parse`], distinct from network failures.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::MockTransport;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Timeout for a whole data/template request
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing the connection
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum redirects followed
pub const REDIRECT_LIMIT: usize = 5;

/// HTTP method of data requests; POST sends the query as a form body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    #[default]
    Get,
    Post,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
        }
    }
}

/// One request: url, ordered query pairs, method, cacheability
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
    pub method: Method,
    pub cacheable: bool,
}

impl DataRequest {
    pub fn new(url: impl Into<String>, method: Method) -> Self {
        Self {
            url: url.into(),
            query: Vec::new(),
            method,
            cacheable: true,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(url, Method::Get)
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn cacheable(mut self, cacheable: bool) -> Self {
        self.cacheable = cacheable;
        self
    }

    /// Value of the first query pair named `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `url?k=v&...` with values left unencoded (for logs and diagnostics)
    pub fn full_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let params = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.url, params)
    }
}

/// Transport-level failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Response body could not be parsed as the expected type
    #[error("response from '{url}' could not be parsed: {details}")]
    Parse { url: String, details: String },

    #[error("request to '{url}' failed: {reason}")]
    Network { url: String, reason: String },

    #[error("request to '{url}' returned HTTP {status}")]
    Status { url: String, status: u16 },
}

impl TransportError {
    pub fn is_parse(&self) -> bool {
        matches!(self, TransportError::Parse { .. })
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Issue the request and return the raw response body
    async fn request(&self, request: &DataRequest) -> Result<String, TransportError>;

    /// Issue the request and parse the body as JSON
    async fn request_json(&self, request: &DataRequest) -> Result<Value, TransportError> {
        let body = self.request(request).await?;
        serde_json::from_str(&body).map_err(|e| TransportError::Parse {
            url: request.full_url(),
            details: e.to_string(),
        })
    }
}
