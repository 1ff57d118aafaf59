//! Dataset sources: anything that yields `(title, content)` records.
//!
//! A local CSV (file or directory) and a remote CSV over HTTP both go through
//! [`parse_csv`] and feed the same ingestion entry point.

use crate::error::SourceError;
use async_trait::async_trait;
use reqwest::Client;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;
use walkdir::WalkDir;

/// One dataset row before validation. `None` marks a missing or blank cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRecord {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl RawRecord {
    pub fn new(title: &str, content: &str) -> Self {
        Self { title: non_blank(title), content: non_blank(content) }
    }

    pub fn is_complete(&self) -> bool {
        self.title.is_some() && self.content.is_some()
    }
}

fn non_blank(s: &str) -> Option<String> {
    let t = s.trim();
    if t.is_empty() { None } else { Some(t.to_string()) }
}

#[async_trait]
pub trait DatasetSource: Send + Sync {
    /// Human-readable origin used in logs and errors.
    fn describe(&self) -> String;

    async fn records(&self) -> Result<Vec<RawRecord>, SourceError>;
}

/// Parse CSV with a header row containing `title` and `content` (case-insensitive).
/// Other columns are ignored.
pub fn parse_csv<R: Read>(reader: R, origin: &str) -> Result<Vec<RawRecord>, SourceError> {
    let malformed = |source: csv::Error| SourceError::Malformed { origin: origin.to_string(), source };
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let headers = rdr.headers().map_err(malformed)?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
            .ok_or(SourceError::SchemaMismatch { origin: origin.to_string(), column: name })
    };
    let title_idx = column("title")?;
    let content_idx = column("content")?;

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row.map_err(malformed)?;
        records.push(RawRecord {
            title: row.get(title_idx).and_then(non_blank),
            content: row.get(content_idx).and_then(non_blank),
        });
    }
    Ok(records)
}

/// A CSV file, or every `*.csv` under a directory (sorted by path).
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }

    fn files(&self) -> Result<Vec<PathBuf>, SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable { origin: self.describe(), reason };
        if self.path.is_file() {
            return Ok(vec![self.path.clone()]);
        }
        if !self.path.is_dir() {
            return Err(unavailable("no such file or directory".into()));
        }
        let mut files: Vec<PathBuf> = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && p.extension().and_then(|s| s.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("csv")))
            .collect();
        files.sort();
        if files.is_empty() {
            return Err(unavailable("directory contains no .csv files".into()));
        }
        Ok(files)
    }
}

#[async_trait]
impl DatasetSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    async fn records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let mut records = Vec::new();
        for file in self.files()? {
            let origin = file.display().to_string();
            let f = File::open(&file)
                .map_err(|e| SourceError::Unavailable { origin: origin.clone(), reason: e.to_string() })?;
            let mut batch = parse_csv(f, &origin)?;
            tracing::debug!(file = %origin, rows = batch.len(), "read csv");
            records.append(&mut batch);
        }
        Ok(records)
    }
}

/// CSV downloaded over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpCsvSource {
    url: String,
    client: Client,
}

impl HttpCsvSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url: url.into(), client })
    }
}

#[async_trait]
impl DatasetSource for HttpCsvSource {
    fn describe(&self) -> String {
        self.url.clone()
    }

    async fn records(&self) -> Result<Vec<RawRecord>, SourceError> {
        let unavailable = |reason: String| SourceError::Unavailable { origin: self.url.clone(), reason };
        let resp = self.client.get(&self.url).send().await.map_err(|e| unavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(unavailable(format!("http status {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| unavailable(e.to_string()))?;
        tracing::debug!(url = %self.url, bytes = bytes.len(), "downloaded dataset");
        parse_csv(bytes.as_ref(), &self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_columns_in_any_order_and_case() {
        let csv = "id,Content,TITLE\n1,body one,Title One\n2,body two,Title Two\n";
        let recs = parse_csv(csv.as_bytes(), "mem").unwrap();
        assert_eq!(recs, vec![RawRecord::new("Title One", "body one"), RawRecord::new("Title Two", "body two")]);
    }

    #[test]
    fn blank_cells_are_missing() {
        let csv = "title,content\nA,\n,B\n";
        let recs = parse_csv(csv.as_bytes(), "mem").unwrap();
        assert_eq!(recs[0].content, None);
        assert_eq!(recs[1].title, None);
        assert!(!recs[0].is_complete());
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let err = parse_csv("title,body\nA,B\n".as_bytes(), "mem").unwrap_err();
        assert!(matches!(err, SourceError::SchemaMismatch { column: "content", .. }));
    }

    #[test]
    fn quoted_fields_with_commas() {
        let csv = "title,content\n\"Cats, Dogs\",\"Rain, expected\"\n";
        let recs = parse_csv(csv.as_bytes(), "mem").unwrap();
        assert_eq!(recs[0].title.as_deref(), Some("Cats, Dogs"));
    }

    #[tokio::test]
    async fn reads_directory_in_sorted_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "title,content\nSecond,two\n").unwrap();
        std::fs::write(dir.path().join("a.csv"), "title,content\nFirst,one\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        let recs = CsvFileSource::new(dir.path()).records().await.unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0].title.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn missing_path_is_unavailable() {
        let err = CsvFileSource::new("/definitely/not/here.csv").records().await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable { .. }));
    }
}
