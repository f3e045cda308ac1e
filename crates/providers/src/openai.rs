use anyhow::{Context, Result};
use arogya_core::{GenerationFailure, GenerationPort, GenerationRequest, StructuredRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::ProviderConfig;
use crate::retry::RetryPolicy;

const MAX_ERROR_BODY_CHARS: usize = 400;

/// Generation Port backed by an OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    refusal: Option<String>,
}

impl OpenAiGenerator {
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let api_key = config
            .openai_api_key
            .clone()
            .context("OpenAI API key not found. Set AROGYA_OPENAI_API_KEY or OPENAI_API_KEY")?;

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(6))
            .timeout(config.http_timeout)
            .build()
            .context("failed to build HTTP client for the generation provider")?;

        Ok(Self {
            client,
            api_key,
            endpoint: format!("{}/chat/completions", config.openai_base_url),
            model: config.openai_model.clone(),
            temperature: config.temperature,
            retry: config.retry.clone(),
        })
    }

    async fn complete(
        &self,
        request: &GenerationRequest,
        response_format: Option<Value>,
    ) -> Result<AssistantMessage, GenerationFailure> {
        let system_prompt = request.rendered_system_prompt();
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_content,
                },
            ],
            temperature: self.temperature,
            response_format,
        };

        self.retry
            .run("openai.chat_completions", GenerationFailure::is_transient, || {
                self.send_once(&body)
            })
            .await
    }

    async fn send_once(
        &self,
        body: &ChatCompletionRequest<'_>,
    ) -> Result<AssistantMessage, GenerationFailure> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationFailure::Upstream {
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await.map_err(transport_failure)?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| GenerationFailure::Rejected("response contained no choices".to_string()))
    }
}

#[async_trait]
impl GenerationPort for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure> {
        let message = self.complete(request, None).await?;
        if let Some(refusal) = message.refusal {
            return Err(GenerationFailure::Rejected(refusal));
        }
        message
            .content
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GenerationFailure::Rejected("empty completion".to_string()))
    }

    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<Value, GenerationFailure> {
        let response_format = json!({
            "type": "json_schema",
            "json_schema": {
                "name": request.shape.name,
                "schema": request.shape.schema,
                "strict": true
            }
        });
        let message = self.complete(&request.prompt, Some(response_format)).await?;
        parse_structured(request.shape.name, message)
    }
}

fn parse_structured(shape: &str, message: AssistantMessage) -> Result<Value, GenerationFailure> {
    if let Some(refusal) = message.refusal {
        return Err(GenerationFailure::Rejected(refusal));
    }
    let content = message
        .content
        .ok_or_else(|| GenerationFailure::invalid_output(shape, "completion had no content"))?;

    let value: Value = serde_json::from_str(strip_code_fence(&content))
        .map_err(|error| GenerationFailure::invalid_output(shape, error.to_string()))?;
    if !value.is_object() {
        return Err(GenerationFailure::invalid_output(shape, "expected a JSON object"));
    }
    Ok(value)
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

fn transport_failure(error: reqwest::Error) -> GenerationFailure {
    if error.is_timeout() {
        GenerationFailure::Timeout
    } else {
        GenerationFailure::Transport(error.to_string())
    }
}

fn truncate(body: &str) -> String {
    body.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
