//! HTTP client for the SABnzbd JSON API.
//!
//! Every request goes to `<base_url>/sabnzbd/api` with `mode`, `apikey` and
//! `output=json` in the query string. Responses may be gzip-compressed.

use std::time::{Duration, Instant};

use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::models::{QueueResponse, ServerStatsResponse};

/// Path of the API endpoint, appended to the configured base URL.
pub const API_PATH: &str = "/sabnzbd/api";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for SABnzbd API calls.
#[derive(Debug)]
pub enum ClientError {
    /// Base URL is neither a URL nor `host:port`.
    InvalidUrl(String),
    /// Transport failure (connect, timeout, body read).
    Http(reqwest::Error),
    /// 4xx response.
    Client(StatusCode),
    /// 5xx response.
    Server(StatusCode),
    /// Body was not the expected JSON.
    Decode(serde_json::Error),
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::InvalidUrl(url) => {
                write!(f, "base url is not a valid URL or host:port: {}", url)
            }
            ClientError::Http(e) => write!(f, "request failed: {}", e),
            ClientError::Client(code) => write!(f, "client error: {}", code.as_u16()),
            ClientError::Server(code) => write!(f, "server error: {}", code.as_u16()),
            ClientError::Decode(e) => write!(f, "invalid response body: {}", e),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Http(e) => Some(e),
            ClientError::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        // The request URL carries the API key.
        ClientError::Http(e.without_url())
    }
}

/// SABnzbd API client.
#[derive(Debug, Clone)]
pub struct SabnzbdClient {
    api_url: Url,
    api_key: String,
    http: reqwest::Client,
}

impl SabnzbdClient {
    /// Creates a client for the instance at `base_url`.
    ///
    /// `base_url` may be a full URL (`https://host/prefix`) or a bare
    /// `host:port`, which is treated as plain HTTP.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, ClientError> {
        let api_url = resolve_api_url(base_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("sabnzbd-exporter/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            api_url,
            api_key: api_key.to_string(),
            http,
        })
    }

    /// Full endpoint URL, without credentials.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Issues `GET ?mode=<mode>` and returns the successful response.
    pub async fn get(&self, mode: &str) -> Result<reqwest::Response, ClientError> {
        let started = Instant::now();
        let response = self
            .http
            .get(self.api_url.clone())
            .query(&[
                ("mode", mode),
                ("apikey", self.api_key.as_str()),
                ("output", "json"),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!(
            mode,
            status = status.as_u16(),
            duration_ms = started.elapsed().as_millis() as u64,
            "sabnzbd request completed"
        );

        if status.is_client_error() {
            return Err(ClientError::Client(status));
        }
        if status.is_server_error() {
            return Err(ClientError::Server(status));
        }
        Ok(response)
    }

    pub async fn queue(&self) -> Result<QueueResponse, ClientError> {
        self.get_json("queue").await
    }

    pub async fn server_stats(&self) -> Result<ServerStatsResponse, ClientError> {
        self.get_json("server_stats").await
    }

    async fn get_json<T: DeserializeOwned>(&self, mode: &str) -> Result<T, ClientError> {
        let body = self.get(mode).await?.bytes().await?;
        serde_json::from_slice(&body).map_err(ClientError::Decode)
    }
}

/// Resolves the API endpoint from a configured base URL.
pub fn resolve_api_url(base_url: &str) -> Result<Url, ClientError> {
    let mut url = match Url::parse(base_url) {
        Ok(url) if url.has_host() => url,
        _ => {
            warn!(
                base_url,
                "base url is not a valid URL, trying to parse as host:port"
            );
            match Url::parse(&format!("http://{}", base_url)) {
                Ok(url) if url.has_host() => url,
                _ => return Err(ClientError::InvalidUrl(base_url.to_string())),
            }
        }
    };

    let path = format!("{}{}", url.path().trim_end_matches('/'), API_PATH);
    url.set_path(&path);
    Ok(url)
}
