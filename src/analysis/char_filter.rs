//! Char filters that rewrite text before it reaches the tokenizer.
//!
//! # Available Filters
//!
//! - [`lowercase::LowercaseCharFilter`] - Unicode-aware lowercasing
//! - [`punctuation::PunctuationCharFilter`] - Removes ASCII punctuation
//!
//! # Examples
//!
//! ```
//! use spamsieve::analysis::char_filter::CharFilter;
//! use spamsieve::analysis::char_filter::punctuation::PunctuationCharFilter;
//!
//! let filter = PunctuationCharFilter::new();
//! assert_eq!(filter.filter("Free!!! money, now."), "Free money now");
//! ```

pub mod lowercase;
pub mod punctuation;

/// Trait for character filters that transform text before tokenization.
pub trait CharFilter: Send + Sync {
    /// Apply this filter to the input text and return the rewritten text.
    fn filter(&self, input: &str) -> String;

    /// Get the name of this char filter.
    fn name(&self) -> &'static str;
}
