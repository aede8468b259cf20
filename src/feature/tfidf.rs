//! TF-IDF vectorizer for text feature extraction.
//!
//! The vectorizer is split into two steps:
//!
//! - [`TfIdfVectorizer::fit`] learns a [`Vocabulary`] from a fitting corpus
//!   (the training partition only).
//! - [`TfIdfVectorizer::transform`] maps any corpus onto that vocabulary.
//!
//! The vocabulary is returned as an `Arc` so the exact same mapping can be
//! handed to every consumer; it is never refit on test data.
//!
//! # Examples
//!
//! ```
//! use spamsieve::feature::TfIdfVectorizer;
//!
//! let corpus = vec!["cheap meds online".to_string(), "meeting notes attached".to_string()];
//! let vectorizer = TfIdfVectorizer::new(3000).unwrap();
//! let vocabulary = vectorizer.fit(&corpus).unwrap();
//!
//! let features = vectorizer.transform(&["cheap meeting".to_string()], &vocabulary).unwrap();
//! assert_eq!(features[0].len(), vocabulary.len());
//! ```

use std::sync::Arc;

use ahash::{AHashMap, AHashSet};
use log::debug;

use crate::analysis::tokenizer::Tokenizer;
use crate::analysis::tokenizer::regex::RegexTokenizer;
use crate::error::{Result, SpamSieveError};
use crate::feature::FeatureVector;

/// Default cap on the number of vocabulary terms.
pub const DEFAULT_MAX_FEATURES: usize = 3000;

/// A fitted vocabulary: term → column mapping plus per-column IDF weights.
#[derive(Debug, Clone, PartialEq)]
pub struct Vocabulary {
    /// Terms in column order (lexicographic).
    terms: Vec<String>,
    /// Term -> column index.
    index: AHashMap<String, usize>,
    /// Smoothed inverse document frequency per column.
    idf: Vec<f64>,
    /// Number of documents in the fitting corpus.
    n_documents: usize,
}

impl Vocabulary {
    /// Number of columns.
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Whether the vocabulary has no terms.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Column index of a term.
    pub fn column(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Term stored at a column.
    pub fn term(&self, column: usize) -> Option<&str> {
        self.terms.get(column).map(String::as_str)
    }

    /// IDF weight of a column.
    pub fn idf(&self, column: usize) -> Option<f64> {
        self.idf.get(column).copied()
    }

    /// All terms in column order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Number of documents the vocabulary was fitted on.
    pub fn n_documents(&self) -> usize {
        self.n_documents
    }
}

/// TF-IDF vectorizer with a bounded vocabulary.
pub struct TfIdfVectorizer {
    /// Maximum number of terms kept in the vocabulary.
    max_features: usize,
    /// Tokenizer used to extract terms from cleaned text.
    tokenizer: Arc<dyn Tokenizer>,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("max_features", &self.max_features)
            .field("tokenizer", &self.tokenizer.name())
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create a vectorizer keeping at most `max_features` terms.
    pub fn new(max_features: usize) -> Result<Self> {
        Ok(Self::with_tokenizer(
            max_features,
            Arc::new(RegexTokenizer::new()?),
        ))
    }

    /// Create a vectorizer with a custom term tokenizer.
    pub fn with_tokenizer(max_features: usize, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            max_features,
            tokenizer,
        }
    }

    /// Maximum vocabulary size.
    pub fn max_features(&self) -> usize {
        self.max_features
    }

    /// Learn a vocabulary from the fitting corpus.
    ///
    /// Terms are ranked by their total occurrence count across the corpus,
    /// ties broken lexicographically, and the top `max_features` are kept.
    /// Kept terms get columns in lexicographic order.
    pub fn fit(&self, documents: &[String]) -> Result<Arc<Vocabulary>> {
        if documents.is_empty() {
            return Err(SpamSieveError::vectorize("cannot fit on an empty corpus"));
        }
        if self.max_features == 0 {
            return Err(SpamSieveError::vectorize("max_features must be at least 1"));
        }

        let mut term_frequency: AHashMap<String, usize> = AHashMap::new();
        let mut document_frequency: AHashMap<String, usize> = AHashMap::new();

        for doc in documents {
            let tokens = self.terms_of(doc)?;
            let mut seen = AHashSet::new();
            for token in tokens {
                if seen.insert(token.clone()) {
                    *document_frequency.entry(token.clone()).or_insert(0) += 1;
                }
                *term_frequency.entry(token).or_insert(0) += 1;
            }
        }

        if term_frequency.is_empty() {
            return Err(SpamSieveError::vectorize(
                "fitting corpus produced an empty vocabulary",
            ));
        }

        let mut ranked: Vec<(String, usize)> = term_frequency.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        ranked.truncate(self.max_features);

        let mut terms: Vec<String> = ranked.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let n_documents = documents.len();
        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0);
                // IDF = ln((N + 1) / (df + 1)) + 1
                ((n_documents as f64 + 1.0) / (df as f64 + 1.0)).ln() + 1.0
            })
            .collect();

        let index = terms
            .iter()
            .enumerate()
            .map(|(column, term)| (term.clone(), column))
            .collect();

        debug!(
            "Fitted vocabulary of {} terms on {} documents",
            terms.len(),
            n_documents
        );

        Ok(Arc::new(Vocabulary {
            terms,
            index,
            idf,
            n_documents,
        }))
    }

    /// Transform a corpus into L2-normalized TF-IDF vectors.
    pub fn transform(
        &self,
        documents: &[String],
        vocabulary: &Vocabulary,
    ) -> Result<Vec<FeatureVector>> {
        documents
            .iter()
            .map(|doc| self.transform_one(doc, vocabulary))
            .collect()
    }

    /// Transform a single document.
    pub fn transform_one(&self, document: &str, vocabulary: &Vocabulary) -> Result<FeatureVector> {
        let mut features = vec![0.0; vocabulary.len()];

        for token in self.terms_of(document)? {
            if let Some(column) = vocabulary.column(&token) {
                features[column] += 1.0;
            }
        }

        for (column, value) in features.iter_mut().enumerate() {
            *value *= vocabulary.idf[column];
        }

        let norm = features.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut features {
                *value /= norm;
            }
        }

        Ok(features)
    }

    fn terms_of(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.tokenizer.tokenize(text)?.map(|token| token.text).collect())
    }
}
