//! HTTP transport over a shared `reqwest::Client`

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use tracing::{debug, instrument};

use super::{
    DataRequest, Method, Transport, TransportError, CONNECT_TIMEOUT, FETCH_TIMEOUT,
    REDIRECT_LIMIT,
};
use crate::error::{DataListError, Result};

/// Production transport (connection pooling via one shared client)
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .user_agent(concat!("datalist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataListError::Config {
                reason: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(url = %request.url, method = %request.method))]
    async fn request(&self, request: &DataRequest) -> std::result::Result<String, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url).query(&request.query),
            Method::Post => self.client.post(&request.url).form(&request.query),
        };

        if !request.cacheable {
            builder = builder
                .header(CACHE_CONTROL, "no-cache")
                .header(PRAGMA, "no-cache");
        }

        let response = builder.send().await.map_err(|e| TransportError::Network {
            url: request.full_url(),
            reason: e.to_string(),
        })?;

        let status = response.status();
        debug!(status = status.as_u16(), "response received");
        if !status.is_success() {
            return Err(TransportError::Status {
                url: request.full_url(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| TransportError::Network {
            url: request.full_url(),
            reason: format!("failed to read response: {}", e),
        })
    }
}
