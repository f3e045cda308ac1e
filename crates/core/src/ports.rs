use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{GenerationFailure, SearchFailure};
use crate::models::SearchHit;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// May contain `{key}` placeholders, filled from `context`.
    pub system_prompt: String,
    pub user_content: String,
    pub context: BTreeMap<String, String>,
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_content: user_content.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn rendered_system_prompt(&self) -> String {
        render_template(&self.system_prompt, &self.context)
    }
}

/// Declared shape of a structured result: a name plus a JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultShape {
    pub name: &'static str,
    pub schema: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    pub prompt: GenerationRequest,
    pub shape: ResultShape,
}

#[async_trait]
pub trait GenerationPort: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationFailure>;

    /// Returns a JSON record conforming to `request.shape` or fails; never a
    /// partially filled default.
    async fn generate_structured(
        &self,
        request: &StructuredRequest,
    ) -> Result<Value, GenerationFailure>;
}

#[async_trait]
pub trait SearchPort: Send + Sync {
    async fn search(&self, query: &str, max_results: usize)
        -> Result<Vec<SearchHit>, SearchFailure>;
}

/// Record types that can be requested through `generate_structured`.
pub trait StructuredShape: DeserializeOwned {
    const NAME: &'static str;

    fn schema() -> Value;

    fn shape() -> ResultShape {
        ResultShape {
            name: Self::NAME,
            schema: Self::schema(),
        }
    }
}

/// Runs a structured generation and decodes it into `T`. A record that does
/// not decode is reported as `InvalidStructuredOutput`.
pub async fn generate_record<T: StructuredShape>(
    port: &dyn GenerationPort,
    prompt: GenerationRequest,
) -> Result<T, GenerationFailure> {
    let request = StructuredRequest {
        prompt,
        shape: T::shape(),
    };
    let value = port.generate_structured(&request).await?;
    serde_json::from_value(value)
        .map_err(|error| GenerationFailure::invalid_output(T::NAME, error.to_string()))
}

/// Replaces `{key}` with the matching context value. Unknown placeholders are
/// left untouched.
pub fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    context
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}
