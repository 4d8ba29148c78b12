//! Deployment flavor discriminator.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Name of a deployment configuration (e.g. `prod`, `staging`).
///
/// Persisted credentials are namespaced by flavor so tokens issued by one
/// deployment are never sent to another. Flavors are lower-case ASCII
/// letters, digits, `-` and `_`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Flavor(String);

impl Flavor {
    /// The production flavor.
    pub const PROD: &'static str = "prod";

    /// Create a new flavor, validating the format.
    ///
    /// Input is trimmed and lower-cased before validation.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let original = s.as_ref();
        let value = original.trim().to_ascii_lowercase();

        if value.is_empty() {
            return Err(InvalidInputError::Flavor {
                value: original.to_string(),
                reason: "must not be empty".to_string(),
            }
            .into());
        }

        if value.len() > 32 {
            return Err(InvalidInputError::Flavor {
                value: original.to_string(),
                reason: "must be at most 32 characters".to_string(),
            }
            .into());
        }

        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(InvalidInputError::Flavor {
                value: original.to_string(),
                reason: "only letters, digits, '-' and '_' are allowed".to_string(),
            }
            .into());
        }

        Ok(Self(value))
    }

    /// The production flavor.
    pub fn prod() -> Self {
        Self(Self::PROD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Flavor {
    fn default() -> Self {
        Self::prod()
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Serialize for Flavor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Flavor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Flavor::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_prod() {
        assert_eq!(Flavor::default().as_str(), "prod");
    }

    #[test]
    fn input_is_normalized() {
        assert_eq!(Flavor::new(" Staging ").unwrap().as_str(), "staging");
    }

    #[test]
    fn path_characters_are_rejected() {
        assert!(Flavor::new("../prod").is_err());
        assert!(Flavor::new("a/b").is_err());
        assert!(Flavor::new("").is_err());
    }
}
