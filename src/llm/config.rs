//! LLM client configuration.

use serde::{Deserialize, Serialize};

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    /// Ollama API (local, default)
    #[default]
    Ollama,
    /// OpenAI-compatible API (OpenAI, Groq, Together.ai, etc.)
    OpenAI,
}

impl LlmProvider {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ollama" => Some(Self::Ollama),
            "openai" | "groq" | "together" => Some(Self::OpenAI),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ollama => "ollama",
            Self::OpenAI => "openai",
        }
    }
}

/// Configuration for the AI-assisted extractor (`[llm]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// The AI pass is optional and off unless enabled.
    pub enabled: bool,
    pub provider: LlmProvider,
    /// API base URL (provider-specific defaults apply)
    pub endpoint: String,
    /// API key for OpenAI-compatible providers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub model: String,
    /// Token budget for the response
    pub max_tokens: u32,
    pub temperature: f32,
    /// Characters of the document excerpt sent to the model
    pub max_content_chars: usize,
    /// Per-call timeout
    pub timeout_secs: u64,
}

fn default_endpoint(provider: LlmProvider, flavour: Option<&str>) -> &'static str {
    match (provider, flavour) {
        (LlmProvider::Ollama, _) => "http://localhost:11434",
        (LlmProvider::OpenAI, Some("groq")) => "https://api.groq.com/openai",
        (LlmProvider::OpenAI, Some("together")) => "https://api.together.xyz",
        (LlmProvider::OpenAI, _) => "https://api.openai.com",
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            provider: LlmProvider::default(),
            endpoint: default_endpoint(LlmProvider::Ollama, None).to_string(),
            api_key: None,
            model: "llama3.1:8b".to_string(),
            max_tokens: 1024,
            temperature: 0.1,
            max_content_chars: 24_000,
            timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LLM_ENABLED`: "true"/"1" or "false"
    /// - `LLM_PROVIDER`: "ollama", "openai", "groq" or "together"
    /// - `LLM_ENDPOINT`: API endpoint (defaults based on provider)
    /// - `LLM_API_KEY`: API key for OpenAI-compatible providers
    /// - `LLM_MODEL`, `LLM_MAX_TOKENS`, `LLM_TEMPERATURE`, `LLM_MAX_CONTENT_CHARS`
    pub fn with_env_overrides(self) -> Self {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(val) = lookup("LLM_ENABLED") {
            self.enabled = val.eq_ignore_ascii_case("true") || val == "1";
        }

        let explicit_provider = lookup("LLM_PROVIDER");
        let explicit_endpoint = lookup("LLM_ENDPOINT");
        if let Some(ref name) = explicit_provider {
            if let Some(provider) = LlmProvider::from_str(name) {
                self.provider = provider;
                if explicit_endpoint.is_none() {
                    let flavour = name.to_lowercase();
                    self.endpoint = default_endpoint(provider, Some(flavour.as_str())).to_string();
                }
            }
        }
        if let Some(endpoint) = explicit_endpoint {
            self.endpoint = endpoint;
        }
        if let Some(key) = lookup("LLM_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.model = model;
        }
        if let Some(n) = lookup("LLM_MAX_TOKENS").and_then(|v| v.parse().ok()) {
            self.max_tokens = n;
        }
        if let Some(t) = lookup("LLM_TEMPERATURE").and_then(|v| v.parse().ok()) {
            self.temperature = t;
        }
        if let Some(n) = lookup("LLM_MAX_CONTENT_CHARS").and_then(|v| v.parse().ok()) {
            self.max_content_chars = n;
        }
        self
    }

    /// Whether the configured provider has what it needs to make calls.
    pub fn missing_credentials(&self) -> bool {
        self.enabled
            && self.provider == LlmProvider::OpenAI
            && self.api_key.as_deref().map_or(true, str::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = LlmConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.provider, LlmProvider::Ollama);
        assert!(config.temperature <= 0.2);
        assert!(!config.missing_credentials());
    }

    #[test]
    fn test_groq_provider_sets_endpoint() {
        let config = LlmConfig::default().apply_env(lookup(&[
            ("LLM_ENABLED", "true"),
            ("LLM_PROVIDER", "groq"),
            ("LLM_MODEL", "llama-3.1-70b-versatile"),
        ]));
        assert!(config.enabled);
        assert_eq!(config.provider, LlmProvider::OpenAI);
        assert_eq!(config.endpoint, "https://api.groq.com/openai");
        assert!(config.missing_credentials());

        let config = config.apply_env(lookup(&[("LLM_API_KEY", "gsk_test")]));
        assert!(!config.missing_credentials());
    }

    #[test]
    fn test_explicit_endpoint_wins() {
        let config = LlmConfig::default().apply_env(lookup(&[
            ("LLM_PROVIDER", "openai"),
            ("LLM_ENDPOINT", "http://gateway.internal:8080"),
        ]));
        assert_eq!(config.endpoint, "http://gateway.internal:8080");
    }
}
