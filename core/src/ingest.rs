use crate::config::SearchConfig;
use crate::error::IngestionError;
use crate::index::Index;
use crate::source::{DatasetSource, RawRecord};
use crate::tokenizer::Analyzer;
use crate::{DocId, Document};

/// Turn raw rows into documents. Each document's id is its row position in the
/// source, so ids stay stable when incomplete rows are dropped.
pub fn prepare_documents(records: Vec<RawRecord>, config: &SearchConfig) -> Vec<Document> {
    let total = records.len();
    let mut dropped = 0usize;
    let docs: Vec<Document> = records
        .into_iter()
        .enumerate()
        .filter(|(_, r)| {
            let keep = !config.drop_incomplete || r.is_complete();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .take(config.max_docs)
        .map(|(row, r)| Document {
            id: row as DocId,
            title: r.title.unwrap_or_default(),
            content: r.content.unwrap_or_default(),
        })
        .collect();
    tracing::info!(total, dropped, kept = docs.len(), max_docs = config.max_docs, "prepared documents");
    docs
}

/// Fetch, prepare and index a whole batch. Any failure aborts the build.
pub async fn ingest(
    source: &dyn DatasetSource,
    config: &SearchConfig,
    analyzer: Analyzer,
) -> Result<Index, IngestionError> {
    let origin = source.describe();
    let records = source.records().await?;
    tracing::info!(%origin, rows = records.len(), "loaded dataset");
    ingest_records(records, config, analyzer)
}

pub fn ingest_records(
    records: Vec<RawRecord>,
    config: &SearchConfig,
    analyzer: Analyzer,
) -> Result<Index, IngestionError> {
    let docs = prepare_documents(records, config);
    Index::build_with(docs, analyzer)
}
