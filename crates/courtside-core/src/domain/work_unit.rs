use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Key of one independently fetchable batch, e.g. the season `2021-22`.
///
/// The fetch client treats the key as opaque and passes it upstream as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkUnitKey(String);

impl WorkUnitKey {
    /// Parse a key, trimming surrounding whitespace.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyWorkUnit);
        }

        if let Some((index, _)) = trimmed.char_indices().find(|(_, ch)| ch.is_control()) {
            return Err(ValidationError::WorkUnitControlChar { index });
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for WorkUnitKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for WorkUnitKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for WorkUnitKey {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<WorkUnitKey> for String {
    fn from(value: WorkUnitKey) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_trims_key() {
        let parsed = WorkUnitKey::parse(" 2021-22 ").expect("key should parse");
        assert_eq!(parsed.as_str(), "2021-22");
    }

    #[test]
    fn rejects_empty_key() {
        let err = WorkUnitKey::parse("   ").expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyWorkUnit);
    }

    #[test]
    fn rejects_control_characters() {
        let err = WorkUnitKey::parse("2021\n22").expect_err("must fail");
        assert!(matches!(err, ValidationError::WorkUnitControlChar { index: 4 }));
    }

    #[test]
    fn deserializes_through_validation() {
        let key: WorkUnitKey = serde_json::from_str("\"2019-20\"").expect("valid key");
        assert_eq!(key.to_string(), "2019-20");
        assert!(serde_json::from_str::<WorkUnitKey>("\"\"").is_err());
    }
}
