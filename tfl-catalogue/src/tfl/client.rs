//! TfL Unified API HTTP client.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, USER_AGENT};

use super::Transport;
use super::error::TflError;

/// Default base URL for the TfL Unified API.
const DEFAULT_BASE_URL: &str = "https://api.tfl.gov.uk";

/// User agent sent with every request.
const CLIENT_USER_AGENT: &str = concat!("tfl-catalogue/", env!("CARGO_PKG_VERSION"));

/// Configuration for the TfL client.
#[derive(Debug, Clone)]
pub struct TflConfig {
    /// Application id issued by the TfL API portal
    pub app_id: String,
    /// Application key issued by the TfL API portal
    pub app_key: String,
    /// Base URL for the API
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl TflConfig {
    /// Create a new config with the given credentials.
    pub fn new(app_id: impl Into<String>, app_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_key: app_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// HTTP client for the TfL Unified API.
///
/// Credentials travel as `app_id`/`app_key` default headers on every
/// request. This client performs the literal network exchange only;
/// wrap it in [`super::RateLimited`] before handing it to anything that
/// issues bulk traffic.
#[derive(Debug, Clone)]
pub struct TflClient {
    http: reqwest::Client,
    base_url: String,
}

impl TflClient {
    /// Create a new TfL client with the given configuration.
    pub fn new(config: TflConfig) -> Result<Self, TflError> {
        let mut headers = HeaderMap::new();

        let app_id = HeaderValue::from_str(&config.app_id).map_err(|_| TflError::Config {
            message: "invalid app_id header value".to_string(),
        })?;
        let app_key = HeaderValue::from_str(&config.app_key).map_err(|_| TflError::Config {
            message: "invalid app_key header value".to_string(),
        })?;
        headers.insert(HeaderName::from_static("app_id"), app_id);
        headers.insert(HeaderName::from_static("app_key"), app_key);
        headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TflError::Config {
                message: e.to_string(),
            })?;

        Ok(Self {
            http,
            base_url: config.base_url,
        })
    }
}

impl Transport for TflClient {
    async fn get(&self, endpoint: &str) -> Result<String, TflError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| TflError::Http {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(TflError::Unauthorized {
                endpoint: endpoint.to_string(),
            });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TflError::Status {
                status: status.as_u16(),
                endpoint: endpoint.to_string(),
                message,
            });
        }

        response.text().await.map_err(|source| TflError::Http {
            endpoint: endpoint.to_string(),
            source,
        })
    }
}
