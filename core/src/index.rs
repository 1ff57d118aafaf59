//! Immutable inverted index snapshot over the `title` and `content` fields.

use crate::error::IngestionError;
use crate::tokenizer::Analyzer;
use crate::{CorpusStats, DocId, Document, Field, FieldStats, Posting};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Postings and length statistics for one field.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct FieldIndex {
    /// term -> postings sorted ascending by doc_id. df is the list length.
    postings: HashMap<String, Vec<Posting>>,
    doc_lens: HashMap<DocId, u32>,
    stats: CorpusStats,
}

impl FieldIndex {
    fn from_stats(per_doc: Vec<(DocId, FieldStats)>) -> Self {
        let mut postings: HashMap<String, Vec<Posting>> = HashMap::new();
        let mut doc_lens = HashMap::with_capacity(per_doc.len());
        let mut total_len = 0u64;
        let doc_count = per_doc.len() as u32;

        for (doc_id, fs) in per_doc {
            total_len += fs.doc_len as u64;
            doc_lens.insert(doc_id, fs.doc_len);
            for (term, tf) in fs.tf {
                postings.entry(term).or_default().push(Posting { doc_id, tf });
            }
        }
        for plist in postings.values_mut() {
            plist.sort_by_key(|p| p.doc_id);
        }

        let avg_doc_len = if doc_count == 0 { 0.0 } else { total_len as f32 / doc_count as f32 };
        Self { postings, doc_lens, stats: CorpusStats { doc_count, total_len, avg_doc_len } }
    }

    pub fn num_terms(&self) -> usize {
        self.postings.len()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Index {
    title: FieldIndex,
    content: FieldIndex,
    docs: BTreeMap<DocId, Document>,
    analyzer: Analyzer,
}

impl Index {
    /// Build with the default analyzer.
    pub fn build(docs: Vec<Document>) -> Result<Index, IngestionError> {
        Self::build_with(docs, Analyzer::default())
    }

    /// Single pass over the batch: validate, analyze each field, then invert.
    /// Nothing is returned unless every document is valid.
    pub fn build_with(docs: Vec<Document>, analyzer: Analyzer) -> Result<Index, IngestionError> {
        if docs.is_empty() {
            return Err(IngestionError::EmptyCorpus);
        }

        let mut table: BTreeMap<DocId, Document> = BTreeMap::new();
        let mut title_stats = Vec::with_capacity(docs.len());
        let mut content_stats = Vec::with_capacity(docs.len());

        for doc in docs {
            for field in Field::ALL {
                if doc.field(field).trim().is_empty() {
                    return Err(IngestionError::MissingField { doc_id: doc.id, field });
                }
            }
            if table.contains_key(&doc.id) {
                return Err(IngestionError::DuplicateId(doc.id));
            }
            title_stats.push((doc.id, FieldStats::from_terms(analyzer.analyze(&doc.title))));
            content_stats.push((doc.id, FieldStats::from_terms(analyzer.analyze(&doc.content))));
            table.insert(doc.id, doc);
        }

        let index = Index {
            title: FieldIndex::from_stats(title_stats),
            content: FieldIndex::from_stats(content_stats),
            docs: table,
            analyzer,
        };
        tracing::debug!(
            num_docs = index.len(),
            title_terms = index.title.num_terms(),
            content_terms = index.content.num_terms(),
            "index built"
        );
        Ok(index)
    }

    pub fn field(&self, field: Field) -> &FieldIndex {
        match field {
            Field::Title => &self.title,
            Field::Content => &self.content,
        }
    }

    pub fn postings(&self, field: Field, term: &str) -> &[Posting] {
        self.field(field).postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn df(&self, field: Field, term: &str) -> u32 {
        self.postings(field, term).len() as u32
    }

    /// Term frequency of `term` in `doc_id`'s field, 0 when absent.
    pub fn tf(&self, field: Field, term: &str, doc_id: DocId) -> u32 {
        let plist = self.postings(field, term);
        match plist.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(i) => plist[i].tf,
            Err(_) => 0,
        }
    }

    pub fn doc_len(&self, field: Field, doc_id: DocId) -> u32 {
        self.field(field).doc_lens.get(&doc_id).copied().unwrap_or(0)
    }

    pub fn stats(&self, field: Field) -> CorpusStats {
        self.field(field).stats
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        self.docs.get(&doc_id)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.docs.values()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn analyzer(&self) -> Analyzer {
        self.analyzer
    }

    /// Distinct terms in a field, in no particular order.
    pub fn terms(&self, field: Field) -> impl Iterator<Item = &str> {
        self.field(field).postings.keys().map(String::as_str)
    }
}
