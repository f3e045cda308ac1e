use anyhow::{Context, Result};
use arogya_core::{SearchFailure, SearchHit, SearchPort};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::ProviderConfig;
use crate::retry::RetryPolicy;

/// Search Port backed by the Tavily web search API.
#[derive(Debug, Clone)]
pub struct TavilySearch {
    client: Client,
    api_key: String,
    endpoint: String,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    url: String,
}

impl TavilySearch {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .tavily_api_key
            .clone()
            .context("Tavily API key not found. Set AROGYA_TAVILY_API_KEY or TAVILY_API_KEY")?;

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(6))
            .timeout(config.http_timeout)
            .build()
            .context("failed to build HTTP client for the search provider")?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.tavily_endpoint.clone(),
            retry: config.retry.clone(),
        })
    }

    async fn search_once(&self, body: &TavilyRequest<'_>) -> Result<Vec<SearchHit>, SearchFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|error| SearchFailure::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchFailure::Upstream {
                status: status.as_u16(),
                body: body.chars().take(400).collect(),
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|error| SearchFailure::Decode(error.to_string()))?;
        Ok(into_hits(parsed))
    }
}

#[async_trait]
impl SearchPort for TavilySearch {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchHit>, SearchFailure> {
        if max_results == 0 || query.trim().is_empty() {
            return Ok(Vec::new());
        }

        let body = TavilyRequest {
            query,
            max_results,
            search_depth: "basic",
        };
        self.retry
            .run("tavily.search", SearchFailure::is_transient, || self.search_once(&body))
            .await
    }
}

fn into_hits(response: TavilyResponse) -> Vec<SearchHit> {
    response
        .results
        .into_iter()
        .filter(|result| !result.content.trim().is_empty() || !result.title.trim().is_empty())
        .map(|result| SearchHit {
            title: result.title,
            snippet: result.content,
            url: result.url,
        })
        .collect()
}
