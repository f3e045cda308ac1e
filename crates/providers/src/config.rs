use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Credentials and tuning for the external Generation/Search services.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub openai_model: String,
    pub temperature: f32,
    pub tavily_api_key: Option<String>,
    pub tavily_endpoint: String,
    pub search_max_results: usize,
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
    pub kb_root: Option<PathBuf>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            temperature: 0.7,
            tavily_api_key: None,
            tavily_endpoint: DEFAULT_TAVILY_ENDPOINT.to_string(),
            search_max_results: 5,
            http_timeout: Duration::from_secs(60),
            retry: RetryPolicy::default(),
            kb_root: None,
        }
    }
}

impl ProviderConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; blank values count as
    /// unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            openai_api_key: get("AROGYA_OPENAI_API_KEY").or_else(|| get("OPENAI_API_KEY")),
            openai_base_url: get("AROGYA_OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            openai_model: get("AROGYA_OPENAI_MODEL").unwrap_or(defaults.openai_model),
            temperature: parse_or(get("AROGYA_TEMPERATURE"), defaults.temperature).clamp(0.0, 2.0),
            tavily_api_key: get("AROGYA_TAVILY_API_KEY").or_else(|| get("TAVILY_API_KEY")),
            tavily_endpoint: get("AROGYA_TAVILY_ENDPOINT").unwrap_or(defaults.tavily_endpoint),
            search_max_results: parse_or(
                get("AROGYA_SEARCH_MAX_RESULTS"),
                defaults.search_max_results,
            ),
            http_timeout: Duration::from_secs(parse_or(get("AROGYA_HTTP_TIMEOUT_SECONDS"), 60)),
            retry: RetryPolicy {
                max_retries: parse_or(get("AROGYA_MAX_RETRIES"), defaults.retry.max_retries),
                initial_delay: Duration::from_millis(parse_or(get("AROGYA_RETRY_INITIAL_MS"), 500)),
                max_delay: Duration::from_millis(parse_or(get("AROGYA_RETRY_MAX_MS"), 8_000)),
            },
            kb_root: get("AROGYA_KB_ROOT").map(PathBuf::from),
        }
    }
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse::<T>().ok()).unwrap_or(default)
}
