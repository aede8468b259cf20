//! Integration tests for message normalization.

use spamsieve::analysis::TextNormalizer;
use spamsieve::dataset::{RawRecord, Label, clean_records};

fn samples() -> Vec<&'static str> {
    vec![
        "Subject: WIN a FREE prize!!! Click here >>> http://spam.example.com",
        "Hi team,\n\nthe meeting is moved to 3pm.\tThanks, Bob",
        "",
        "   ",
        "!!!???...",
        "The and of to a in",
        "Ünïcödé façade naïve café 日本語 テキスト",
        "price: $1,000.00 (50% off) -- act now",
        "re: re: fw: FWD: Re:",
        "tab\tseparated\rcarriage\r\nreturns",
    ]
}

#[test]
fn test_normalization_is_idempotent() {
    let normalizer = TextNormalizer::new();
    for sample in samples() {
        let once = normalizer.normalize(sample);
        let twice = normalizer.normalize(&once);
        assert_eq!(once, twice, "not idempotent for {sample:?}");
    }
}

#[test]
fn test_output_shape() {
    let normalizer = TextNormalizer::new();
    for sample in samples() {
        let cleaned = normalizer.normalize(sample);
        assert_eq!(cleaned, cleaned.to_lowercase());
        assert!(!cleaned.chars().any(|c| c.is_ascii_punctuation()));
        assert!(!cleaned.starts_with(' ') && !cleaned.ends_with(' '));
        assert!(!cleaned.contains("  "));
        assert!(!cleaned.contains('\n') && !cleaned.contains('\t'));
    }
}

#[test]
fn test_stop_words_and_punctuation_only_yield_empty_text() {
    let normalizer = TextNormalizer::new();
    assert_eq!(normalizer.normalize("The and of to a in"), "");
    assert_eq!(normalizer.normalize("!!!???..."), "");
    assert_eq!(normalizer.normalize(""), "");
}

#[test]
fn test_missing_text_is_cleaned_to_empty() {
    let records = vec![
        RawRecord::new(None::<String>, Label::Spam),
        RawRecord::new(Some("Cheap meds"), Label::Spam),
    ];
    let cleaned = clean_records(&records, &TextNormalizer::new());
    assert_eq!(cleaned[0].cleaned_text, "");
    assert_eq!(cleaned[0].label, Label::Spam);
    assert_eq!(cleaned[1].cleaned_text, "cheap meds");
}
