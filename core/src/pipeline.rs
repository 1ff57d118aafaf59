//! Query pipeline: detect -> translate -> analyze -> rank -> assemble.
//!
//! Every collaborator failure has a fallback, so `search` never returns an error.

use crate::bm25;
use crate::config::{SearchConfig, SNIPPET_MARKER};
use crate::index::Index;
use crate::language::{same_language, LanguageDetector, Passthrough, Translator, UNKNOWN_LANGUAGE};
use crate::{DocId, Query, ScoredResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
    Ok,
    /// Blank query text; nothing was searched.
    EmptyQuery,
    /// The query ran but matched no document.
    NoResults,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: Query,
    pub status: SearchStatus,
    /// Matching documents before the top-k cut.
    pub total_hits: usize,
    pub results: Vec<ScoredResult>,
}

/// Holds a read-only snapshot and collaborator handles. One instance serves any
/// number of concurrent queries.
pub struct QueryPipeline {
    index: Arc<Index>,
    detector: Arc<dyn LanguageDetector>,
    translator: Arc<dyn Translator>,
    config: SearchConfig,
}

impl QueryPipeline {
    pub fn new(
        index: Arc<Index>,
        detector: Arc<dyn LanguageDetector>,
        translator: Arc<dyn Translator>,
        config: SearchConfig,
    ) -> Self {
        Self { index, detector, translator, config }
    }

    /// Pipeline that treats every query as already in the corpus language.
    pub fn offline(index: Arc<Index>, config: SearchConfig) -> Self {
        let passthrough = Arc::new(Passthrough::new(config.corpus_language.clone()));
        Self::new(index, passthrough.clone(), passthrough, config)
    }

    /// Same collaborators and config over a different snapshot.
    pub fn with_index(&self, index: Arc<Index>) -> Self {
        Self {
            index,
            detector: Arc::clone(&self.detector),
            translator: Arc::clone(&self.translator),
            config: self.config.clone(),
        }
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub async fn search(&self, raw: &str) -> SearchResponse {
        self.search_top(raw, self.config.top_k).await
    }

    pub async fn search_top(&self, raw: &str, k: usize) -> SearchResponse {
        if raw.trim().is_empty() {
            return SearchResponse {
                query: Query {
                    raw: raw.to_string(),
                    detected_language: UNKNOWN_LANGUAGE.to_string(),
                    translated: String::new(),
                    terms: Vec::new(),
                },
                status: SearchStatus::EmptyQuery,
                total_hits: 0,
                results: Vec::new(),
            };
        }

        let detected = self.detect(raw).await;
        let translated = match detected.as_deref() {
            Some(lang) => self.translate(raw, lang).await,
            None => raw.to_string(),
        };
        let terms = self.index.analyzer().analyze(&translated);
        tracing::debug!(?detected, %translated, ?terms, "query analyzed");

        let ranked = self.rank_terms(&terms);
        let total_hits = ranked.len();
        let results = self.assemble(ranked, k.max(1));
        let status = if results.is_empty() { SearchStatus::NoResults } else { SearchStatus::Ok };

        SearchResponse {
            query: Query {
                raw: raw.to_string(),
                detected_language: detected.unwrap_or_else(|| UNKNOWN_LANGUAGE.to_string()),
                translated,
                terms,
            },
            status,
            total_hits,
            results,
        }
    }

    /// BM25 over the snapshot with this pipeline's parameters.
    pub fn rank_terms(&self, terms: &[String]) -> Vec<(DocId, f32)> {
        bm25::rank(&self.index, terms, self.config.bm25, self.config.field_weights)
    }

    async fn detect(&self, text: &str) -> Option<String> {
        match timeout(self.config.collaborator_timeout(), self.detector.detect(text)).await {
            Ok(Ok(lang)) if !lang.trim().is_empty() => Some(lang),
            Ok(Ok(_)) => {
                tracing::warn!("detector returned an empty language code");
                None
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, "language detection failed, skipping translation");
                None
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.collaborator_timeout_ms, "language detection timed out");
                None
            }
        }
    }

    async fn translate(&self, text: &str, source: &str) -> String {
        let target = self.config.corpus_language.as_str();
        if same_language(source, target) {
            return text.to_string();
        }
        match timeout(self.config.collaborator_timeout(), self.translator.translate(text, source, target)).await {
            Ok(Ok(out)) if !out.trim().is_empty() => out,
            Ok(Ok(_)) => {
                tracing::warn!(source, target, "translator returned empty text, using original");
                text.to_string()
            }
            Ok(Err(err)) => {
                tracing::warn!(%err, source, target, "translation failed, using original");
                text.to_string()
            }
            Err(_) => {
                tracing::warn!(timeout_ms = self.config.collaborator_timeout_ms, "translation timed out, using original");
                text.to_string()
            }
        }
    }

    fn assemble(&self, ranked: Vec<(DocId, f32)>, k: usize) -> Vec<ScoredResult> {
        ranked
            .into_iter()
            .take(k)
            .filter_map(|(doc_id, score)| {
                let doc = self.index.document(doc_id)?;
                Some(ScoredResult {
                    doc_id,
                    score,
                    title: doc.title.clone(),
                    snippet: snippet(&doc.content, self.config.snippet_chars),
                })
            })
            .collect()
    }
}

/// First `max_chars` characters of `content`, plus a marker if anything was cut.
pub fn snippet(content: &str, max_chars: usize) -> String {
    match content.char_indices().nth(max_chars) {
        None => content.to_string(),
        Some((cut, _)) => {
            let mut s = content[..cut].trim_end().to_string();
            s.push_str(SNIPPET_MARKER);
            s
        }
    }
}
