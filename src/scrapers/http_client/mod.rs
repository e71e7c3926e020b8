//! HTTP client with browser-like headers for publisher requests.

mod response;
mod user_agent;

pub use response::HttpResponse;
pub use user_agent::{random_user_agent, resolve_user_agent, IMPERSONATE_USER_AGENTS};

use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, ORIGIN, REFERER};
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::ScraperError;

/// HTTP client bound to one publisher.
///
/// Every request carries the configured user agent plus the optional
/// `Referer`, `Origin` and extra headers set on the client.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    source_id: String,
    referer: Option<String>,
    origin: Option<String>,
    extra_headers: HeaderMap,
}

impl HttpClient {
    /// Create a new HTTP client.
    /// - None: random real browser user agent
    /// - Some(custom): custom user agent string
    pub fn new(
        source_id: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, ScraperError> {
        Self::build(source_id, timeout, user_agent_config, false)
    }

    /// Create a client that skips TLS certificate verification.
    ///
    /// Only for legacy hosts whose certificate chain does not validate.
    pub fn with_invalid_certs(
        source_id: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
    ) -> Result<Self, ScraperError> {
        Self::build(source_id, timeout, user_agent_config, true)
    }

    fn build(
        source_id: &str,
        timeout: Duration,
        user_agent_config: Option<&str>,
        accept_invalid_certs: bool,
    ) -> Result<Self, ScraperError> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| ScraperError::Client(e.to_string()))?;

        Ok(Self {
            client,
            source_id: source_id.to_string(),
            referer: None,
            origin: None,
            extra_headers: HeaderMap::new(),
        })
    }

    /// Set the Referer header for requests.
    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    /// Set the Origin header for requests.
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Add a static header sent with every request.
    pub fn with_header(mut self, name: &'static str, value: &'static str) -> Self {
        self.extra_headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
        self
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, ScraperError> {
        self.send(url, "GET", self.client.get(url), None).await
    }

    /// GET with an explicit Referer, overriding the client default.
    pub async fn get_with_referer(
        &self,
        url: &str,
        referer: &str,
    ) -> Result<HttpResponse, ScraperError> {
        self.send(url, "GET", self.client.get(url), Some(referer))
            .await
    }

    /// POST an already-encoded `application/x-www-form-urlencoded` body.
    pub async fn post_form(&self, url: &str, body: String) -> Result<HttpResponse, ScraperError> {
        let request = self
            .client
            .post(url)
            .header(
                CONTENT_TYPE,
                "application/x-www-form-urlencoded; charset=UTF-8",
            )
            .body(body);
        self.send(url, "POST", request, None).await
    }

    /// GET a URL and return its body, failing on non-2xx status.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, ScraperError> {
        self.get(url).await?.error_for_status()?.bytes().await
    }

    async fn send(
        &self,
        url: &str,
        method: &str,
        mut request: RequestBuilder,
        referer: Option<&str>,
    ) -> Result<HttpResponse, ScraperError> {
        if let Some(referer) = referer.or(self.referer.as_deref()) {
            request = request.header(REFERER, referer);
        }
        if let Some(ref origin) = self.origin {
            request = request.header(ORIGIN, origin);
        }
        request = request.headers(self.extra_headers.clone());

        let start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|source| ScraperError::Request {
                url: url.to_string(),
                source,
            })?;

        debug!(
            "[{}] {} {} -> {} ({} ms)",
            self.source_id,
            method,
            url,
            response.status().as_u16(),
            start.elapsed().as_millis()
        );

        Ok(HttpResponse {
            url: url.to_string(),
            status: response.status(),
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_builds_with_headers() {
        let client = HttpClient::new("governo-pi", Duration::from_secs(20), None)
            .unwrap()
            .with_referer("https://www.diario.pi.gov.br/doe/")
            .with_origin("https://www.diario.pi.gov.br")
            .with_header("x-requested-with", "XMLHttpRequest");
        assert_eq!(
            client.referer.as_deref(),
            Some("https://www.diario.pi.gov.br/doe/")
        );
        assert_eq!(client.extra_headers.len(), 1);
    }

    #[test]
    fn test_insecure_client_builds() {
        assert!(HttpClient::with_invalid_certs("municipios-pi", Duration::from_secs(5), None).is_ok());
    }
}
