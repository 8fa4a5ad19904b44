//! Request transport: the seam between the load engine and the network

use crate::config::HttpConfig;
use crate::errors::{HttpError, TransportError};
use crate::types::HttpMethod;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value as JsonValue;
use std::str::FromStr;
use tracing::{debug, trace};
use url::Url;

/// A fully rendered request, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(JsonValue),
    Text(String),
}

/// What the engine keeps from a response: its status and size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub bytes_received: u64,
}

/// Sends a single request and reports status or transport failure.
///
/// Implementations must not retry and must not treat HTTP error statuses
/// as errors: a 503 is a successful transport round trip.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    config: HttpConfig,
}

impl ReqwestTransport {
    /// Build a transport with a client configured from `config`
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        debug!(
            "Creating HTTP transport with {}s timeout, pool of {} idle connections per host",
            config.timeout.as_secs(),
            config.pool_max_idle_per_host
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_ssl)
            .redirect(match config.max_redirects {
                0 => reqwest::redirect::Policy::none(),
                max => reqwest::redirect::Policy::limited(max as usize),
            })
            .build()?;

        Ok(Self { client, config })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client, config: HttpConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    fn build_headers(headers: &[(String, String)]) -> Result<HeaderMap, TransportError> {
        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (key, value) in headers {
            let name = HeaderName::from_str(key).map_err(|_| {
                TransportError::InvalidRequest(HttpError::InvalidHeaderName(key.clone()).to_string())
            })?;
            let value = HeaderValue::from_str(value).map_err(|_| {
                TransportError::InvalidRequest(HttpError::InvalidHeaderValue(key.clone()).to_string())
            })?;
            header_map.insert(name, value);
        }
        Ok(header_map)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: PreparedRequest) -> Result<TransportResponse, TransportError> {
        trace!("Sending {} {}", request.method, request.url);

        let headers = Self::build_headers(&request.headers)?;
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(headers);

        builder = match request.body {
            Some(RequestBody::Json(json)) => builder.json(&json),
            Some(RequestBody::Text(text)) => builder.body(text),
            None => builder,
        };

        let mut response = builder.send().await?;
        let status = response.status().as_u16();

        // Drain the body so the measured latency covers the whole response
        // and the connection can go back to the pool.
        let mut bytes_received = 0u64;
        while let Some(chunk) = response.chunk().await? {
            bytes_received += chunk.len() as u64;
        }

        Ok(TransportResponse {
            status,
            bytes_received,
        })
    }
}
