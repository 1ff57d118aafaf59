//! Language detection and translation collaborators.
//!
//! The pipeline only sees the two traits. [`Passthrough`] is deterministic and
//! offline; [`GoogleTranslate`] calls the public Google Translate endpoint.

use crate::error::{DetectionError, TranslationError};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;

pub const UNKNOWN_LANGUAGE: &str = "unknown";

pub const GOOGLE_TRANSLATE_URL: &str = "https://translate.googleapis.com/translate_a/single";

#[async_trait]
pub trait LanguageDetector: Send + Sync {
    /// ISO 639-1 style code of `text`.
    async fn detect(&self, text: &str) -> Result<String, DetectionError>;
}

#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError>;
}

/// Compare language codes on their primary subtag, case-insensitively (`en-US` == `en`).
pub fn same_language(a: &str, b: &str) -> bool {
    fn primary(code: &str) -> String {
        code.split(['-', '_']).next().unwrap_or("").trim().to_ascii_lowercase()
    }
    primary(a) == primary(b)
}

fn has_letters(text: &str) -> bool {
    text.chars().any(char::is_alphabetic)
}

/// Reports a fixed language and returns text unchanged.
#[derive(Debug, Clone)]
pub struct Passthrough {
    language: String,
}

impl Passthrough {
    pub fn new(language: impl Into<String>) -> Self {
        Self { language: language.into() }
    }
}

#[async_trait]
impl LanguageDetector for Passthrough {
    async fn detect(&self, text: &str) -> Result<String, DetectionError> {
        if !has_letters(text) {
            return Err(DetectionError::Inconclusive);
        }
        Ok(self.language.clone())
    }
}

#[async_trait]
impl Translator for Passthrough {
    async fn translate(&self, text: &str, _source: &str, _target: &str) -> Result<String, TranslationError> {
        Ok(text.to_string())
    }
}

/// Client for the keyless `translate_a/single` endpoint. Detection is a
/// translation request with `sl=auto` into the corpus language; the detected
/// code comes back in slot 2.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: Client,
    base_url: Url,
    corpus_language: String,
}

impl GoogleTranslate {
    pub fn new(corpus_language: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        Self::with_base_url(GOOGLE_TRANSLATE_URL, corpus_language, timeout)
    }

    pub fn with_base_url(base_url: &str, corpus_language: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url).with_context(|| format!("invalid translate url {base_url}"))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url, corpus_language: corpus_language.into() })
    }

    fn request_url(&self, text: &str, source: &str, target: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("client", "gtx")
            .append_pair("sl", source)
            .append_pair("tl", target)
            .append_pair("dt", "t")
            .append_pair("q", text);
        url
    }

    fn detect_url(&self, text: &str) -> Url {
        self.request_url(text, "auto", &self.corpus_language)
    }

    async fn call(&self, url: Url) -> Result<Value, String> {
        let resp = self.client.get(url).send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            return Err(format!("http status {}", resp.status()));
        }
        resp.json::<Value>().await.map_err(|e| e.to_string())
    }
}

/// Pull `(translated text, detected source language)` out of a gtx response.
pub fn parse_gtx_response(body: &Value) -> Option<(String, Option<String>)> {
    let segments = body.get(0)?.as_array()?;
    let mut translated = String::new();
    for seg in segments {
        if let Some(part) = seg.get(0).and_then(Value::as_str) {
            translated.push_str(part);
        }
    }
    let detected = body.get(2).and_then(Value::as_str).map(str::to_string);
    Some((translated, detected))
}

#[async_trait]
impl LanguageDetector for GoogleTranslate {
    async fn detect(&self, text: &str) -> Result<String, DetectionError> {
        if !has_letters(text) {
            return Err(DetectionError::Inconclusive);
        }
        let body = self.call(self.detect_url(text)).await.map_err(DetectionError::Service)?;
        match parse_gtx_response(&body) {
            Some((_, Some(lang))) if !lang.is_empty() => Ok(lang),
            _ => Err(DetectionError::Inconclusive),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslate {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, TranslationError> {
        if same_language(source, target) {
            return Ok(text.to_string());
        }
        let body = self.call(self.request_url(text, source, target)).await.map_err(TranslationError::Service)?;
        match parse_gtx_response(&body) {
            Some((translated, _)) if !translated.trim().is_empty() => Ok(translated),
            Some(_) => Err(TranslationError::UnsupportedPair {
                source_lang: source.to_string(),
                target_lang: target.to_string(),
            }),
            None => Err(TranslationError::Service("unexpected response shape".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primary_subtag_comparison() {
        assert!(same_language("en", "EN"));
        assert!(same_language("en-US", "en"));
        assert!(same_language("pt_BR", "pt"));
        assert!(!same_language("es", "en"));
    }

    #[test]
    fn parses_multi_segment_response() {
        let body = json!([[["Cats are ", "Los gatos son ", null, null, 10], ["great pets", "grandes mascotas", null, null, 10]], null, "es"]);
        let (text, lang) = parse_gtx_response(&body).unwrap();
        assert_eq!(text, "Cats are great pets");
        assert_eq!(lang.as_deref(), Some("es"));
    }

    #[test]
    fn rejects_malformed_response() {
        assert!(parse_gtx_response(&json!({"error": "nope"})).is_none());
    }

    #[tokio::test]
    async fn passthrough_is_identity() {
        let p = Passthrough::new("en");
        let text = "The rocket launch was successful.";
        assert_eq!(p.translate(text, "en", "en").await.unwrap(), text);
        assert_eq!(p.detect(text).await.unwrap(), "en");
    }

    #[tokio::test]
    async fn detection_needs_letters() {
        let p = Passthrough::new("en");
        assert_eq!(p.detect("12 34 !!").await, Err(DetectionError::Inconclusive));
    }

    #[tokio::test]
    async fn invalid_base_url_is_rejected() {
        assert!(GoogleTranslate::with_base_url("not a url", "en", Duration::from_millis(50)).is_err());
    }

    #[test]
    fn detection_targets_corpus_language() {
        let g = GoogleTranslate::with_base_url("http://127.0.0.1:9/single", "de", Duration::from_millis(50)).unwrap();
        let url = g.detect_url("hola mundo");
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["sl"], "auto");
        assert_eq!(pairs["tl"], "de");
        assert_eq!(pairs["q"], "hola mundo");
    }

    #[tokio::test]
    async fn google_same_language_skips_network() {
        // unroutable base url: any request would fail, so success proves no call was made
        let g = GoogleTranslate::with_base_url("http://127.0.0.1:9/", "en", Duration::from_millis(50)).unwrap();
        let text = "Rocket launch successful";
        assert_eq!(g.translate(text, "en", "en-GB").await.unwrap(), text);
    }

    #[tokio::test]
    async fn google_unreachable_is_service_error() {
        let g = GoogleTranslate::with_base_url("http://127.0.0.1:9/", "en", Duration::from_millis(200)).unwrap();
        assert!(matches!(g.translate("hola", "es", "en").await, Err(TranslationError::Service(_))));
        assert!(matches!(g.detect("hola").await, Err(DetectionError::Service(_))));
    }
}
