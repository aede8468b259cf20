//! Record types for raw and cleaned messages.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SpamSieveError;

/// Binary message class. Serialized as `0` (ham) and `1` (spam).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Label {
    /// Legitimate message.
    Ham = 0,
    /// Unsolicited message.
    Spam = 1,
}

impl Label {
    /// Fixed label order used by every metric.
    pub const ORDER: [Label; 2] = [Label::Ham, Label::Spam];

    /// Numeric value of the label.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Position of the label in [`Label::ORDER`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Display name of the class.
    pub fn name(self) -> &'static str {
        match self {
            Label::Ham => "Ham",
            Label::Spam => "Spam",
        }
    }
}

impl From<Label> for u8 {
    fn from(label: Label) -> Self {
        label.as_u8()
    }
}

impl TryFrom<u8> for Label {
    type Error = SpamSieveError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Label::Ham),
            1 => Ok(Label::Spam),
            other => Err(SpamSieveError::dataset(format!(
                "label must be 0 or 1, got {other}"
            ))),
        }
    }
}

impl FromStr for Label {
    type Err = SpamSieveError;

    /// Accepts `0`/`1` (also written as floats such as `1.0`) and `ham`/`spam`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("ham") {
            return Ok(Label::Ham);
        }
        if trimmed.eq_ignore_ascii_case("spam") {
            return Ok(Label::Spam);
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v == 0.0 => Ok(Label::Ham),
            Ok(v) if v == 1.0 => Ok(Label::Spam),
            _ => Err(SpamSieveError::dataset(format!(
                "unrecognized label {trimmed:?} (expected 0, 1, ham or spam)"
            ))),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// A labeled message as loaded from the input table.
///
/// `text` is `None` when the source field was missing or not textual; such
/// records are cleaned to the empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawRecord {
    /// Raw message text.
    pub text: Option<String>,
    /// Message class.
    pub label: Label,
}

impl RawRecord {
    /// Create a raw record.
    pub fn new<S: Into<String>>(text: Option<S>, label: Label) -> Self {
        Self {
            text: text.map(Into::into),
            label,
        }
    }
}

/// A record after normalization; the row format of the cleaned table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanedRecord {
    /// Message class.
    pub label: Label,
    /// Normalized text, possibly empty.
    #[serde(default)]
    pub cleaned_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parsing() {
        assert_eq!("0".parse::<Label>().unwrap(), Label::Ham);
        assert_eq!(" 1 ".parse::<Label>().unwrap(), Label::Spam);
        assert_eq!("1.0".parse::<Label>().unwrap(), Label::Spam);
        assert_eq!("SPAM".parse::<Label>().unwrap(), Label::Spam);
        assert_eq!("ham".parse::<Label>().unwrap(), Label::Ham);
        assert!("2".parse::<Label>().is_err());
        assert!("maybe".parse::<Label>().is_err());
    }

    #[test]
    fn test_label_serde_as_integer() {
        assert_eq!(serde_json::to_string(&Label::Spam).unwrap(), "1");
        assert_eq!(serde_json::from_str::<Label>("0").unwrap(), Label::Ham);
        assert!(serde_json::from_str::<Label>("7").is_err());
    }

    #[test]
    fn test_label_order() {
        assert_eq!(Label::ORDER.map(Label::index), [0, 1]);
        assert_eq!(Label::Spam.name(), "Spam");
    }
}
