//! Tuning constants and the runtime [`SearchConfig`].
//!
//! Constants are the defaults; a JSON file may override any subset of them.

use crate::bm25::{Bm25Params, FieldWeights};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// BM25 term frequency saturation.
pub const BM25_K1: f32 = 1.2;

/// BM25 document length normalization. 0.0 disables it, 1.0 is full normalization.
pub const BM25_B: f32 = 0.75;

/// Results returned per query when the caller does not ask for a count.
pub const DEFAULT_TOP_K: usize = 5;

/// Upper bound on results per query accepted from callers.
pub const MAX_TOP_K: usize = 100;

/// Snippet length in characters (not bytes).
pub const SNIPPET_CHARS: usize = 250;

/// Appended to a snippet when the content was cut.
pub const SNIPPET_MARKER: &str = "...";

/// Documents accepted from a single ingestion batch.
pub const MAX_INGEST_DOCS: usize = 2000;

/// Language the corpus is stored in; queries are translated into it.
pub const CORPUS_LANGUAGE: &str = "en";

/// Bound on each call to the detection or translation service.
pub const COLLABORATOR_TIMEOUT_MS: u64 = 3000;

/// Bumped whenever the persisted snapshot layout changes.
pub const INDEX_FORMAT_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub bm25: Bm25Params,
    pub field_weights: FieldWeights,
    pub top_k: usize,
    pub snippet_chars: usize,
    pub max_docs: usize,
    /// Drop records with a missing title or content instead of failing ingestion.
    pub drop_incomplete: bool,
    pub corpus_language: String,
    pub collaborator_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            bm25: Bm25Params::default(),
            field_weights: FieldWeights::default(),
            top_k: DEFAULT_TOP_K,
            snippet_chars: SNIPPET_CHARS,
            max_docs: MAX_INGEST_DOCS,
            drop_incomplete: true,
            corpus_language: CORPUS_LANGUAGE.to_string(),
            collaborator_timeout_ms: COLLABORATOR_TIMEOUT_MS,
        }
    }
}

impl SearchConfig {
    /// Load a JSON config file; absent keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().display().to_string();
        let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io { path: path_str.clone(), source })?;
        let cfg: SearchConfig =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse { path: path_str, source })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Bm25Params { k1, b } = self.bm25;
        if !k1.is_finite() || k1 <= 0.0 {
            return Err(ConfigError::Invalid(format!("bm25.k1 must be > 0, got {k1}")));
        }
        if !(0.0..=1.0).contains(&b) {
            return Err(ConfigError::Invalid(format!("bm25.b must be within [0, 1], got {b}")));
        }
        let FieldWeights { title, content } = self.field_weights;
        if !title.is_finite() || !content.is_finite() || title < 0.0 || content < 0.0 {
            return Err(ConfigError::Invalid("field weights must be finite and >= 0".into()));
        }
        if title < content {
            tracing::warn!(title, content, "title weight is below content weight");
        }
        if self.top_k == 0 || self.snippet_chars == 0 || self.max_docs == 0 {
            return Err(ConfigError::Invalid("top_k, snippet_chars and max_docs must be > 0".into()));
        }
        if self.corpus_language.trim().is_empty() {
            return Err(ConfigError::Invalid("corpus_language must not be empty".into()));
        }
        Ok(())
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }
}
