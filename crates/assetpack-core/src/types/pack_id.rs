//! Pack identifier type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Identifier of a downloadable pack, as issued by the service.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackId(String);

impl PackId {
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let original = s.as_ref();
        let value = original.trim();

        if value.is_empty() {
            return Err(InvalidInputError::PackId {
                value: original.to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if value.chars().any(char::is_control) {
            return Err(InvalidInputError::PackId {
                value: original.to_string(),
                reason: "must not contain control characters".to_string(),
            }
            .into());
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PackId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PackId> for String {
    fn from(id: PackId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_whitespace() {
        assert_eq!(PackId::new("  pk_123 ").unwrap().as_str(), "pk_123");
    }

    #[test]
    fn rejects_empty() {
        assert!(PackId::new("   ").is_err());
    }

    #[test]
    fn deserializes_with_validation() {
        let id: PackId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(serde_json::from_str::<PackId>("\"\"").is_err());
    }
}
