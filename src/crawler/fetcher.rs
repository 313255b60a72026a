//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests to fetch page content
//! - Error classification
//!
//! Retries are not done here; a failed fetch is a failed page.

use crate::config::{Config, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum redirect hops followed for one request
const MAX_REDIRECTS: usize = 10;

/// Why a page could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP status {status}")]
    Http { status: u16 },

    #[error("Request timeout")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Failed to read body: {0}")]
    Body(String),

    #[error("{0}")]
    Other(String),
}

impl FetchError {
    /// True for 404 and 410, pages that are gone rather than broken
    pub fn is_gone(&self) -> bool {
        matches!(
            self,
            Self::Http {
                status: 404 | 410
            }
        )
    }
}

/// Source of raw page bytes
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a shared reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Builds a fetcher from the user agent and timeout settings
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(&config.user_agent, config.request_timeout())?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    /// # Error Mapping
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | 2xx | body bytes |
    /// | any other status | `Http { status }` |
    /// | timeout | `Timeout` |
    /// | connection refused, DNS, TLS | `Connect` |
    /// | body read failure | `Body` |
    async fn fetch(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if !status.is_success() {
            if status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!("Rate limited by remote host on {}", url);
            }
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|e| FetchError::Body(e.to_string()))
    }
}

fn classify_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Other(e.to_string())
    }
}

/// Formats the User-Agent header value
///
/// Format: `Name/Version` or `Name/Version (+ContactURL)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    match &config.contact_url {
        Some(contact) => format!(
            "{}/{} (+{})",
            config.crawler_name, config.crawler_version, contact
        ),
        None => format!("{}/{}", config.crawler_name, config.crawler_version),
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use docmirror::config::UserAgentConfig;
/// use docmirror::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: Some("https://example.com/about".to_string()),
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        assert!(build_http_client(&config, Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_user_agent_format() {
        let mut config = create_test_config();
        assert_eq!(
            user_agent_string(&config),
            "TestCrawler/1.0 (+https://example.com/about)"
        );

        config.contact_url = None;
        assert_eq!(user_agent_string(&config), "TestCrawler/1.0");
    }

    #[test]
    fn test_is_gone() {
        assert!(FetchError::Http { status: 404 }.is_gone());
        assert!(FetchError::Http { status: 410 }.is_gone());
        assert!(!FetchError::Http { status: 500 }.is_gone());
        assert!(!FetchError::Timeout.is_gone());
    }

    // Status and body handling are exercised against a mock server in the
    // integration tests
}
