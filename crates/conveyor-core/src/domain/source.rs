//! Source - the named logical queue a producer or consumer works against.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::QueueError;

/// Name of a logical queue (e.g. `mailers`).
///
/// Only `[A-Za-z0-9_.-]` is accepted so a source can double as a directory
/// name in file-backed queues.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Source(String);

impl Source {
    pub fn new(name: impl Into<String>) -> Result<Self, QueueError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if !valid {
            return Err(QueueError::InvalidSource(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for Source {
    type Error = QueueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for Source {
    type Error = QueueError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Source> for String {
    fn from(source: Source) -> Self {
        source.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::plain("mailers")]
    #[case::dotted("billing.invoices")]
    #[case::mixed("Queue_01-a")]
    fn accepts_path_safe_names(#[case] name: &str) {
        let source = Source::new(name).unwrap();
        assert_eq!(source.as_str(), name);
    }

    #[rstest]
    #[case::empty("")]
    #[case::dot(".")]
    #[case::parent("..")]
    #[case::slash("a/b")]
    #[case::space("with space")]
    fn rejects_unsafe_names(#[case] name: &str) {
        assert!(matches!(Source::new(name), Err(QueueError::InvalidSource(_))));
    }

    #[test]
    fn deserialization_validates() {
        assert!(serde_json::from_str::<Source>("\"mailers\"").is_ok());
        assert!(serde_json::from_str::<Source>("\"../etc\"").is_err());
    }
}
