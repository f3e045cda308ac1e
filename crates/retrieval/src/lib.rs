mod chunking;
mod tokenize;

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use arogya_core::{SearchFailure, SearchHit, SearchPort};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use walkdir::WalkDir;

pub use chunking::chunk_document;
pub use tokenize::tokenize;

const MAX_CHUNK_CHARS: usize = 420;
const SNIPPET_GRAPHEMES: usize = 240;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("valid heading regex"));

#[derive(Debug, Clone)]
pub struct KnowledgeDoc {
    pub title: String,
    pub source_path: String,
    pub body: String,
}

#[derive(Debug, Clone)]
struct IndexedChunk {
    title: String,
    source_path: String,
    text: String,
    keywords: HashSet<String>,
}

#[derive(Debug, Clone)]
pub struct KnowledgeBaseStats {
    pub docs_loaded: usize,
    pub chunks_loaded: usize,
}

/// Offline Search Port over a directory of markdown/json health notes.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseSearch {
    docs: Vec<KnowledgeDoc>,
    chunks: Vec<IndexedChunk>,
}

impl KnowledgeBaseSearch {
    pub fn from_dir(path: impl AsRef<Path>) -> Result<Self> {
        let docs = load_docs(path.as_ref())?;
        let mut chunks = Vec::new();

        for doc in &docs {
            for chunk in chunk_document(&doc.body, MAX_CHUNK_CHARS) {
                let keywords = tokenize(&format!("{} {}", doc.title, chunk))
                    .into_iter()
                    .collect::<HashSet<_>>();

                chunks.push(IndexedChunk {
                    title: doc.title.clone(),
                    source_path: doc.source_path.clone(),
                    text: chunk,
                    keywords,
                });
            }
        }

        tracing::info!(docs = docs.len(), chunks = chunks.len(), "knowledge base loaded");
        Ok(Self { docs, chunks })
    }

    pub fn stats(&self) -> KnowledgeBaseStats {
        KnowledgeBaseStats {
            docs_loaded: self.docs.len(),
            chunks_loaded: self.chunks.len(),
        }
    }

    /// Keyword-overlap ranking; at most one hit per source document.
    pub fn lookup(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let query_tokens = tokenize(query).into_iter().collect::<HashSet<_>>();

        let mut scored = self
            .chunks
            .iter()
            .map(|chunk| (keyword_score(&query_tokens, &chunk.keywords), chunk))
            .filter(|(score, _)| *score > 0.0)
            .collect::<Vec<_>>();

        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(Ordering::Equal));

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for (_, chunk) in scored {
            if hits.len() >= top_k {
                break;
            }
            if !seen.insert(chunk.source_path.clone()) {
                continue;
            }
            hits.push(SearchHit {
                title: chunk.title.clone(),
                snippet: snippet(&chunk.text, SNIPPET_GRAPHEMES),
                url: format!("kb://{}", chunk.source_path),
            });
        }
        hits
    }
}

#[async_trait]
impl SearchPort for KnowledgeBaseSearch {
    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchFailure> {
        Ok(self.lookup(query, max_results))
    }
}

/// Search backend used when nothing is configured; every lookup is empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSearch;

#[async_trait]
impl SearchPort for NullSearch {
    async fn search(
        &self,
        _query: &str,
        _max_results: usize,
    ) -> Result<Vec<SearchHit>, SearchFailure> {
        Ok(Vec::new())
    }
}

fn load_docs(root: &Path) -> Result<Vec<KnowledgeDoc>> {
    let mut docs = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            matches!(
                entry.path().extension().and_then(|ext| ext.to_str()),
                Some("md") | Some("json")
            )
        })
    {
        let path = entry.path();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading knowledge document: {}", path.display()))?;

        let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
        let body = if is_json {
            serde_json::from_str::<serde_json::Value>(&raw)
                .map(|value| json_to_search_text(&value))
                .unwrap_or(raw)
        } else {
            raw
        };

        let source_path = path
            .strip_prefix(root)
            .map(|p| p.to_string_lossy().replace('\\', "/"))
            .unwrap_or_else(|_| path.to_string_lossy().to_string());

        let title = HEADING
            .captures(&body)
            .and_then(|captures| captures.get(1).map(|value| value.as_str().trim().to_string()))
            .unwrap_or_else(|| {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .unwrap_or("untitled")
                    .replace(['-', '_'], " ")
            });

        docs.push(KnowledgeDoc {
            title,
            source_path,
            body,
        });
    }

    Ok(docs)
}

fn json_to_search_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::Bool(v) => v.to_string(),
        serde_json::Value::Number(v) => v.to_string(),
        serde_json::Value::String(v) => v.clone(),
        serde_json::Value::Array(values) => values
            .iter()
            .map(json_to_search_text)
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n"),
        serde_json::Value::Object(map) => map
            .iter()
            .map(|(k, v)| format!("{} {}", k, json_to_search_text(v)))
            .collect::<Vec<_>>()
            .join("\n\n"),
    }
}

fn keyword_score(query_tokens: &HashSet<String>, doc_tokens: &HashSet<String>) -> f32 {
    if query_tokens.is_empty() || doc_tokens.is_empty() {
        return 0.0;
    }

    let overlap = query_tokens
        .iter()
        .filter(|token| doc_tokens.contains(*token))
        .count() as f32;

    overlap / query_tokens.len() as f32
}

fn snippet(input: &str, max_graphemes: usize) -> String {
    let compact = input.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.graphemes(true).count() <= max_graphemes {
        compact
    } else {
        compact.graphemes(true).take(max_graphemes).collect::<String>() + "..."
    }
}
