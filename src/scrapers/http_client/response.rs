//! HTTP response wrapper.

use std::collections::HashMap;

use reqwest::{Response, StatusCode};

use crate::discovery::FetchedPage;

/// HTTP response with headers captured up front.
pub struct HttpResponse {
    pub status: StatusCode,
    pub final_url: String,
    pub headers: HashMap<String, String>,
    pub(crate) response: Response,
}

impl HttpResponse {
    pub(crate) fn new(response: Response) -> Self {
        let mut headers = HashMap::new();
        for (name, value) in response.headers() {
            if let Ok(v) = value.to_str() {
                headers.insert(name.as_str().to_ascii_lowercase(), v.to_string());
            }
        }

        Self {
            status: response.status(),
            final_url: response.url().to_string(),
            headers,
            response,
        }
    }

    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the Content-Type header.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get("content-type").map(|s| s.as_str())
    }

    /// Read the body and convert into a fetched page.
    pub async fn into_page(self) -> Result<FetchedPage, reqwest::Error> {
        let status = self.status.as_u16();
        let final_url = self.final_url;
        let headers = self.headers;
        let body = self.response.text().await?;

        Ok(FetchedPage {
            final_url,
            status,
            headers,
            body,
        })
    }
}
