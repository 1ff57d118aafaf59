use crate::{DocId, Field};

/// Fatal failure while turning a dataset into an index. No snapshot is produced.
#[derive(thiserror::Error, Debug)]
pub enum IngestionError {
    #[error("dataset contains no documents")]
    EmptyCorpus,
    #[error("document {doc_id} is missing required field `{field}`")]
    MissingField { doc_id: DocId, field: Field },
    #[error("document id {0} appears more than once")]
    DuplicateId(DocId),
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("dataset source {origin} unavailable: {reason}")]
    Unavailable { origin: String, reason: String },
    #[error("dataset {origin} has no `{column}` column")]
    SchemaMismatch { origin: String, column: &'static str },
    #[error("malformed csv in {origin}: {source}")]
    Malformed {
        origin: String,
        #[source]
        source: csv::Error,
    },
}

/// Recovered at query time: the pipeline falls back to language `"unknown"`.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectionError {
    #[error("language could not be determined")]
    Inconclusive,
    #[error("detection service error: {0}")]
    Service(String),
    #[error("detection timed out")]
    Timeout,
}

/// Recovered at query time: the pipeline keeps the untranslated text.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation service error: {0}")]
    Service(String),
    #[error("unsupported language pair {source_lang} -> {target_lang}")]
    UnsupportedPair { source_lang: String, target_lang: String },
    #[error("translation timed out")]
    Timeout,
}

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
