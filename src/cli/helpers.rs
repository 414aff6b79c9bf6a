//! Shared construction for CLI commands.

use std::sync::Arc;
use std::time::Duration;

use crate::config::Settings;
use crate::http_client::HttpClient;
use crate::llm::{AiExtractor, LlmClient};
use crate::rate_limit::RateLimiter;

/// HTTP client for registries and documents, with the configured timeout and pacing.
pub fn http_client(settings: &Settings, rate_limiter: RateLimiter) -> anyhow::Result<HttpClient> {
    Ok(HttpClient::new(
        settings.http.timeout(),
        rate_limiter,
        settings.http.user_agent.as_deref(),
    )?)
}

/// AI extractor, when enabled. It shares the rate limiter but has its own timeout.
pub fn ai_extractor(
    settings: &Settings,
    rate_limiter: RateLimiter,
) -> anyhow::Result<Option<AiExtractor>> {
    if !settings.llm.enabled {
        return Ok(None);
    }
    let http = HttpClient::new(
        Duration::from_secs(settings.llm.timeout_secs),
        rate_limiter,
        settings.http.user_agent.as_deref(),
    )?;
    let client = LlmClient::new(settings.llm.clone(), http);
    tracing::info!(
        "AI extraction enabled ({} / {})",
        settings.llm.provider.as_str(),
        settings.llm.model
    );
    Ok(Some(AiExtractor::new(
        Arc::new(client),
        settings.llm.max_content_chars,
    )))
}
