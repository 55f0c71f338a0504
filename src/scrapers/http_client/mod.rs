//! HTTP client for direct page fetches.
//!
//! Tolerates self-signed and otherwise invalid TLS certificates by default,
//! since pages hosting embedded video are often served from misconfigured
//! hosts.

mod response;
mod user_agent;

pub use response::HttpResponse;
use user_agent::resolve_user_agent;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Settings;
use crate::discovery::{FetchError, FetchedPage, PageFetcher};

/// Plain HTTP page fetcher.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
    timeout: Duration,
}

impl HttpClient {
    /// Create a new HTTP client.
    ///
    /// `user_agent_config` follows `resolve_user_agent`: `None` for the
    /// default, `"impersonate"` for a browser user agent, anything else verbatim.
    pub fn new(
        timeout: Duration,
        user_agent_config: Option<&str>,
        accept_invalid_certs: bool,
    ) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            user_agent,
            timeout,
        })
    }

    /// Create a client from application settings.
    pub fn from_settings(settings: &Settings) -> Result<Self, reqwest::Error> {
        Self::new(
            Duration::from_secs(settings.request_timeout),
            settings.user_agent.as_deref(),
            settings.accept_invalid_certs,
        )
    }

    /// The user agent sent with every request.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        debug!("GET {} -> {}", url, response.status());
        Ok(HttpResponse::new(response))
    }
}

impl HttpClient {
    fn request_error(&self, url: &str, source: reqwest::Error) -> FetchError {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            }
        } else {
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        }
    }
}

#[async_trait]
impl PageFetcher for HttpClient {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let response = self
            .get(url)
            .await
            .map_err(|source| self.request_error(url, source))?;

        debug!(
            "{} content-type: {}",
            url,
            response.content_type().unwrap_or("unknown")
        );

        if !response.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: response.status.as_u16(),
            });
        }

        response
            .into_page()
            .await
            .map_err(|source| self.request_error(url, source))
    }
}
