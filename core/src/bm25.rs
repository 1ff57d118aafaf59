//! BM25 Okapi scoring over an [`Index`] snapshot.
//!
//! ```text
//! idf(t)    = ln(1 + (N - df + 0.5) / (df + 0.5))
//! score(d,t) = idf(t) * tf * (k1 + 1) / (tf + k1 * (1 - b + b * dl / avgdl))
//! ```
//!
//! A document's total score is the weighted sum of `score(d, t)` over distinct
//! query terms and over both fields. Terms with `df == 0` are skipped.

use crate::config::{BM25_B, BM25_K1};
use crate::index::Index;
use crate::{DocId, Field};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bm25Params {
    pub k1: f32,
    pub b: f32,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self { k1: BM25_K1, b: BM25_B }
    }
}

/// Per-field multipliers applied to BM25 contributions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldWeights {
    pub title: f32,
    pub content: f32,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self { title: 1.0, content: 1.0 }
    }
}

impl FieldWeights {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Title => self.title,
            Field::Content => self.content,
        }
    }
}

/// Inverse document frequency. `None` when the term occurs nowhere (`df == 0`).
pub fn idf(n: u32, df: u32) -> Option<f32> {
    if df == 0 {
        return None;
    }
    let n = n as f32;
    let df = df as f32;
    Some((1.0 + (n - df + 0.5) / (df + 0.5)).ln())
}

/// Saturating tf component, without idf.
pub fn tf_norm(params: Bm25Params, tf: u32, doc_len: u32, avgdl: f32) -> f32 {
    if tf == 0 {
        return 0.0;
    }
    let avgdl = if avgdl > 0.0 { avgdl } else { 1.0 };
    let tf = tf as f32;
    let Bm25Params { k1, b } = params;
    (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * doc_len as f32 / avgdl))
}

/// Unweighted BM25 contribution of one term to one document's field.
pub fn term_score(index: &Index, params: Bm25Params, field: Field, term: &str, doc_id: DocId) -> f32 {
    let stats = index.stats(field);
    let Some(idf) = idf(stats.doc_count, index.df(field, term)) else {
        return 0.0;
    };
    let tf = index.tf(field, term, doc_id);
    idf * tf_norm(params, tf, index.doc_len(field, doc_id), stats.avg_doc_len)
}

/// Disjunctive BM25 ranking. Returns every matching document ordered by
/// descending score, ties by ascending doc id.
pub fn rank(index: &Index, terms: &[String], params: Bm25Params, weights: FieldWeights) -> Vec<(DocId, f32)> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut scores: HashMap<DocId, f32> = HashMap::new();

    // Summation order per document is term order then Field::ALL, so float
    // rounding is the same on every run.
    for term in terms.iter().map(String::as_str) {
        if !seen.insert(term) {
            continue;
        }
        for field in Field::ALL {
            // a zero-weighted field contributes nothing, so it must not add candidates either
            let weight = weights.get(field);
            if weight == 0.0 {
                continue;
            }
            let postings = index.postings(field, term);
            let stats = index.stats(field);
            let Some(idf) = idf(stats.doc_count, postings.len() as u32) else {
                continue;
            };
            for p in postings {
                let dl = index.doc_len(field, p.doc_id);
                let contrib = weight * idf * tf_norm(params, p.tf, dl, stats.avg_doc_len);
                *scores.entry(p.doc_id).or_insert(0.0) += contrib;
            }
        }
    }

    let mut scored: Vec<(DocId, f32)> = scores.into_iter().collect();
    sort_scored(&mut scored);
    scored
}

/// Descending score, ascending doc id on ties.
pub fn sort_scored(scored: &mut [(DocId, f32)]) {
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.cmp(&b.0)));
}
