//! Text analysis for spamsieve.
//!
//! Raw message text flows through a small analysis pipeline before it is
//! vectorized:
//!
//! ```text
//! Raw Text → Char Filters → Tokenizer → Token Filters → Tokens
//! ```
//!
//! The [`normalizer::TextNormalizer`] wires the pipeline used to clean email
//! bodies (lowercase, strip ASCII punctuation, split on whitespace, drop
//! English stop words). The vectorizer reuses the same [`Tokenizer`] trait with
//! a regex tokenizer to extract terms from already-cleaned text.

pub mod analyzer;
pub mod char_filter;
pub mod normalizer;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

// Re-export commonly used types
pub use analyzer::{Analyzer, PipelineAnalyzer};
pub use normalizer::TextNormalizer;
pub use token::{Token, TokenStream};
