//! HTTP response wrapper.

use reqwest::{Response, StatusCode};

use crate::scrapers::ScraperError;

/// HTTP response wrapper.
pub struct HttpResponse {
    pub url: String,
    pub status: StatusCode,
    pub(crate) response: Response,
}

impl HttpResponse {
    /// Check if the response is successful.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Turn a non-2xx status into [`ScraperError::Status`].
    pub fn error_for_status(self) -> Result<Self, ScraperError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ScraperError::Status {
                url: self.url,
                status: self.status.as_u16(),
            })
        }
    }

    /// Get response body as bytes.
    pub async fn bytes(self) -> Result<Vec<u8>, ScraperError> {
        let url = self.url;
        self.response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|source| ScraperError::Request { url, source })
    }

    /// Get response body as text.
    pub async fn text(self) -> Result<String, ScraperError> {
        let url = self.url;
        self.response
            .text()
            .await
            .map_err(|source| ScraperError::Request { url, source })
    }
}
