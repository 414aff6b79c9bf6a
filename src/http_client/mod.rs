//! HTTP client shared by discovery, fetching and the filings API.
//!
//! Every request goes through the per-domain [`RateLimiter`] and reports its
//! status back so the limiter can back off on 429/503.

mod response;
mod user_agent;

pub use response::{HeadResponse, HttpResponse};
pub use user_agent::{has_contact, resolve_user_agent, USER_AGENT};

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::rate_limit::{parse_retry_after, RateLimiter};
use response::header_map;

/// HTTP client with a descriptive user agent, a per-request timeout and
/// adaptive rate limiting.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    user_agent: String,
    timeout: Duration,
    rate_limiter: RateLimiter,
}

impl HttpClient {
    /// Build a client. `user_agent_config` of None uses [`USER_AGENT`].
    pub fn new(
        timeout: Duration,
        rate_limiter: RateLimiter,
        user_agent_config: Option<&str>,
    ) -> Result<Self, reqwest::Error> {
        let user_agent = resolve_user_agent(user_agent_config);
        let client = Client::builder()
            .user_agent(&user_agent)
            .timeout(timeout)
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            user_agent,
            timeout,
            rate_limiter,
        })
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the rate limiter for this client.
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Wait for the domain slot, send, and report the status to the limiter.
    async fn send(
        &self,
        method: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let domain = self.rate_limiter.acquire(url).await;

        let start = Instant::now();
        let result = request.send().await;
        let duration = start.elapsed();

        match (&result, domain) {
            (Ok(response), Some(domain)) => {
                let status = response.status().as_u16();
                let retry_after = parse_retry_after(
                    response
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok()),
                );
                debug!("{} {} -> {} in {:?}", method, url, status, duration);
                self.rate_limiter
                    .report_response_status(&domain, status, retry_after)
                    .await;
            }
            (Err(e), _) => debug!("{} {} failed after {:?}: {}", method, url, duration, e),
            _ => {}
        }

        result
    }

    /// GET a URL.
    pub async fn get(&self, url: &str) -> Result<HttpResponse, reqwest::Error> {
        self.get_with_headers(url, &[]).await
    }

    /// GET with extra request headers (e.g. `Authorization`).
    pub async fn get_with_headers(
        &self,
        url: &str,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = self.send("GET", url, request).await?;

        Ok(HttpResponse {
            status: response.status(),
            headers: header_map(response.headers()),
            response,
        })
    }

    /// HEAD a URL to check that a document exists without downloading it.
    pub async fn head(&self, url: &str) -> Result<HeadResponse, reqwest::Error> {
        let request = self.client.head(url);
        let response = self.send("HEAD", url, request).await?;

        Ok(HeadResponse {
            status: response.status(),
            headers: header_map(response.headers()),
        })
    }

    /// POST a JSON body with extra headers.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &T,
        headers: &[(&str, String)],
    ) -> Result<HttpResponse, reqwest::Error> {
        let mut request = self.client.post(url).json(body);
        for (name, value) in headers {
            request = request.header(*name, value);
        }
        let response = self.send("POST", url, request).await?;

        Ok(HttpResponse {
            status: response.status(),
            headers: header_map(response.headers()),
            response,
        })
    }
}
