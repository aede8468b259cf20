//! Feature extraction: cleaned text to fixed-width numeric vectors.

pub mod tfidf;

pub use tfidf::{TfIdfVectorizer, Vocabulary};

/// A dense feature vector; every vector produced by one vocabulary has the
/// same length and column semantics.
pub type FeatureVector = Vec<f64>;
