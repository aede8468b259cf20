//! Punctuation removal char filter.

use crate::analysis::char_filter::CharFilter;

/// The fixed punctuation set removed by [`PunctuationCharFilter`].
pub const ASCII_PUNCTUATION: &str = "!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

/// Removes every ASCII punctuation character from the text.
///
/// Characters are deleted, not replaced, so `"don't"` becomes `"dont"` and
/// `"re:subject"` becomes `"resubject"`. Non-ASCII symbols are kept.
#[derive(Clone, Debug, Default)]
pub struct PunctuationCharFilter;

impl PunctuationCharFilter {
    /// Create a new punctuation char filter.
    pub fn new() -> Self {
        PunctuationCharFilter
    }
}

impl CharFilter for PunctuationCharFilter {
    fn filter(&self, input: &str) -> String {
        input.chars().filter(|c| !c.is_ascii_punctuation()).collect()
    }

    fn name(&self) -> &'static str {
        "punctuation"
    }
}
