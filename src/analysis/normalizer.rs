//! Email text normalization.
//!
//! [`TextNormalizer`] turns raw message text into the cleaned form consumed by
//! the vectorizer: lowercase, ASCII punctuation removed, whitespace tokenized,
//! English stop words dropped, survivors joined by single spaces.
//!
//! Normalization is total: it never fails and maps anything that is not text
//! to the empty string.
//!
//! # Examples
//!
//! ```
//! use spamsieve::analysis::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new();
//! assert_eq!(normalizer.normalize("Subject: WIN a FREE prize, now!!!"), "subject win free prize");
//! assert_eq!(normalizer.normalize("The... and, of!"), "");
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use log::warn;
use serde_json::Value;

use crate::analysis::analyzer::{Analyzer, PipelineAnalyzer};
use crate::analysis::char_filter::lowercase::LowercaseCharFilter;
use crate::analysis::char_filter::punctuation::PunctuationCharFilter;
use crate::analysis::token_filter::stop::StopFilter;
use crate::analysis::tokenizer::whitespace::WhitespaceTokenizer;

/// Cleans raw message text.
#[derive(Clone, Debug)]
pub struct TextNormalizer {
    analyzer: PipelineAnalyzer,
}

impl TextNormalizer {
    /// Create a normalizer using the default English stop words.
    pub fn new() -> Self {
        Self::with_stop_filter(StopFilter::new())
    }

    /// Create a normalizer with a custom stop-word set.
    pub fn with_stop_words(stop_words: Arc<HashSet<String>>) -> Self {
        Self::with_stop_filter(StopFilter::with_shared_stop_words(stop_words))
    }

    fn with_stop_filter(stop_filter: StopFilter) -> Self {
        let analyzer = PipelineAnalyzer::new(Arc::new(WhitespaceTokenizer::new()))
            .add_char_filter(Arc::new(LowercaseCharFilter::new()))
            .add_char_filter(Arc::new(PunctuationCharFilter::new()))
            .add_filter(Arc::new(stop_filter))
            .with_name("email_normalizer");

        TextNormalizer { analyzer }
    }

    /// Normalize a piece of text.
    pub fn normalize(&self, text: &str) -> String {
        match self.analyzer.analyze(text) {
            Ok(tokens) => tokens
                .filter(|token| !token.is_stopped())
                .map(|token| token.text)
                .collect::<Vec<_>>()
                .join(" "),
            Err(e) => {
                warn!("Normalization failed, using empty text: {e}");
                String::new()
            }
        }
    }

    /// Normalize an optional text field; a missing field yields `""`.
    pub fn normalize_field(&self, text: Option<&str>) -> String {
        text.map(|t| self.normalize(t)).unwrap_or_default()
    }

    /// Normalize a JSON value; anything other than a string yields `""`.
    pub fn normalize_value(&self, value: &Value) -> String {
        self.normalize_field(value.as_str())
    }

    /// Normalize a batch of texts, preserving order.
    pub fn normalize_all<S: AsRef<str>>(&self, texts: &[S]) -> Vec<String> {
        texts.iter().map(|t| self.normalize(t.as_ref())).collect()
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lowercase_punctuation_and_stop_words() {
        let normalizer = TextNormalizer::new();
        assert_eq!(
            normalizer.normalize("Hello, World! This is a TEST of the system."),
            "hello world test system"
        );
    }

    #[test]
    fn test_punctuation_is_deleted_not_replaced() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("e-mail me@example.com"), "email meexamplecom");
    }

    #[test]
    fn test_collapses_whitespace() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize("  cheap\n\n\tmeds   online  "), "cheap meds online");
    }

    #[test]
    fn test_degenerate_inputs_yield_empty_string() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize(""), "");
        assert_eq!(normalizer.normalize("!!! ... ???"), "");
        assert_eq!(normalizer.normalize("The and OF to"), "");
    }

    #[test]
    fn test_non_textual_inputs() {
        let normalizer = TextNormalizer::new();
        assert_eq!(normalizer.normalize_field(None), "");
        assert_eq!(normalizer.normalize_value(&json!(null)), "");
        assert_eq!(normalizer.normalize_value(&json!(42)), "");
        assert_eq!(normalizer.normalize_value(&json!(["free", "money"])), "");
        assert_eq!(normalizer.normalize_value(&json!("FREE money")), "free money");
    }

    #[test]
    fn test_idempotent() {
        let normalizer = TextNormalizer::new();
        let samples = [
            "Subject: re: your ACCOUNT -- don't miss out!!!",
            "Ünïcödé   TEXT, with Ümlauts.",
            "you're the one who's won $1,000,000",
            "",
            "    ",
            "a b c d e f g",
        ];
        for sample in samples {
            let once = normalizer.normalize(sample);
            assert_eq!(normalizer.normalize(&once), once, "input: {sample:?}");
        }
    }

    #[test]
    fn test_custom_stop_words() {
        let stop_words: HashSet<String> = ["enron"].iter().map(|s| s.to_string()).collect();
        let normalizer = TextNormalizer::with_stop_words(Arc::new(stop_words));
        assert_eq!(normalizer.normalize("The Enron meeting"), "the meeting");
    }

    #[test]
    fn test_normalize_all_preserves_order() {
        let normalizer = TextNormalizer::new();
        let cleaned = normalizer.normalize_all(&["B b", "", "A a"]);
        assert_eq!(cleaned, vec!["b b", "", ""]);
    }
}
