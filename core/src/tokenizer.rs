use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{M}\p{N}]+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","did","do","does","doing","down","during",
            "each","few","for","from","further","had","has","have","having","he","her","here","hers",
            "herself","him","himself","his","how","i","if","in","into","is","it","its","itself",
            "me","more","most","my","myself","no","nor","not","of","off","on","once","only","or",
            "other","ought","our","ours","ourselves","out","over","own","same","she","should","so",
            "some","such","than","that","the","their","theirs","them","themselves","then","there",
            "these","they","this","those","through","to","too","under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with",
            "would","you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Term normalization shared by indexing and querying.
///
/// The default analyzer only case-folds and splits; stopword removal and English
/// stemming are opt-in. An [`Index`](crate::Index) remembers the analyzer it was
/// built with so queries are analyzed the same way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analyzer {
    pub stem: bool,
    pub stopwords: bool,
}

impl Analyzer {
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let normalized = text.nfkc().collect::<String>().to_lowercase();
        let mut terms = Vec::new();
        for mat in RE.find_iter(&normalized) {
            let token = mat.as_str();
            if self.stopwords && STOPWORDS.contains(token) {
                continue;
            }
            if self.stem {
                terms.push(STEMMER.stem(token).into_owned());
            } else {
                terms.push(token.to_string());
            }
        }
        terms
    }
}

/// Analyze with the default (plain) analyzer: NFKC, lowercase, split on anything
/// that is not a letter, combining mark or digit.
pub fn analyze(text: &str) -> Vec<String> {
    Analyzer::default().analyze(text)
}
