mod config;
mod openai;
mod retry;
mod tavily;

use std::sync::Arc;

use anyhow::{Context, Result};
use arogya_core::{GenerationPort, SearchPort};
use arogya_retrieval::{KnowledgeBaseSearch, NullSearch};

pub use config::{ProviderConfig, DEFAULT_OPENAI_MODEL};
pub use openai::OpenAiGenerator;
pub use retry::RetryPolicy;
pub use tavily::TavilySearch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchBackend {
    Tavily,
    KnowledgeBase,
    Disabled,
}

impl SearchBackend {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Tavily => "tavily",
            Self::KnowledgeBase => "knowledge_base",
            Self::Disabled => "disabled",
        }
    }
}

/// Resolved port instances handed to the workflow.
#[derive(Clone)]
pub struct Ports {
    pub generation: Arc<dyn GenerationPort>,
    pub search: Arc<dyn SearchPort>,
    pub search_backend: SearchBackend,
}

impl Ports {
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let generation = Arc::new(OpenAiGenerator::new(config)?) as Arc<dyn GenerationPort>;
        let (search, search_backend) = search_port(config)?;
        tracing::info!(
            model = %config.openai_model,
            search_backend = search_backend.as_str(),
            "provider ports ready"
        );

        Ok(Self {
            generation,
            search,
            search_backend,
        })
    }
}

/// Web search when a Tavily key is present, otherwise the local knowledge
/// base when one is configured, otherwise no search at all.
pub fn search_port(config: &ProviderConfig) -> Result<(Arc<dyn SearchPort>, SearchBackend)> {
    if config.tavily_api_key.is_some() {
        return Ok((Arc::new(TavilySearch::new(config)?), SearchBackend::Tavily));
    }

    if let Some(root) = config.kb_root.as_ref() {
        let kb = KnowledgeBaseSearch::from_dir(root)
            .with_context(|| format!("failed loading knowledge base from {}", root.display()))?;
        return Ok((Arc::new(kb), SearchBackend::KnowledgeBase));
    }

    tracing::warn!("no search backend configured, advisors will answer without search results");
    Ok((Arc::new(NullSearch), SearchBackend::Disabled))
}
