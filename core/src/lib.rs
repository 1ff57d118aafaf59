//! Cross-language retrieval core: analysis, inverted index, BM25 ranking and the
//! query pipeline that turns a query in any language into ranked results over an
//! English corpus.

pub mod bm25;
pub mod config;
pub mod error;
pub mod index;
pub mod ingest;
pub mod language;
pub mod persist;
pub mod pipeline;
pub mod source;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub use bm25::{Bm25Params, FieldWeights};
pub use config::SearchConfig;
pub use error::{ConfigError, DetectionError, IngestionError, SourceError, TranslationError};
pub use index::Index;
pub use pipeline::{QueryPipeline, SearchResponse, SearchStatus};

pub type DocId = u32;

/// Searchable document fields. `ALL` fixes the order in which fields are scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Title,
    Content,
}

impl Field {
    pub const ALL: [Field; 2] = [Field::Title, Field::Content];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Content => "content",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocId,
    pub title: String,
    pub content: String,
}

impl Document {
    pub fn new(id: DocId, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id, title: title.into(), content: content.into() }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Title => &self.title,
            Field::Content => &self.content,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    pub tf: u32,
}

/// Analysis output for one field of one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldStats {
    pub doc_len: u32,
    pub tf: HashMap<String, u32>,
}

impl FieldStats {
    pub fn from_terms(terms: Vec<String>) -> Self {
        let doc_len = terms.len() as u32;
        let mut tf: HashMap<String, u32> = HashMap::new();
        for term in terms {
            *tf.entry(term).or_insert(0) += 1;
        }
        Self { doc_len, tf }
    }
}

/// Corpus-wide statistics for a single field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusStats {
    /// N: number of documents in the snapshot.
    pub doc_count: u32,
    pub total_len: u64,
    /// avgdl: `total_len / doc_count`.
    pub avg_doc_len: f32,
}

/// A single search request after it has been through detection, translation and analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub raw: String,
    pub detected_language: String,
    pub translated: String,
    pub terms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub doc_id: DocId,
    pub score: f32,
    pub title: String,
    pub snippet: String,
}
