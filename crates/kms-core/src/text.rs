//! # Validated Pool Text
//!
//! Pool names and descriptions share one rule set: non-empty, not blank,
//! and no leading or trailing whitespace. `PoolText` can only be built
//! through [`PoolText::parse`], so a value of this type is proof that the
//! rules were checked.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A validated pool name or description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PoolText(String);

impl PoolText {
    /// Validate `value` as the field named `field`.
    ///
    /// Checks run in order: length > 0, trimmed length > 0, trimmed length
    /// equals original length.
    pub fn parse(field: &'static str, value: &str) -> Result<Self, ValidationError> {
        if value.is_empty() {
            return Err(ValidationError::EmptyField { field });
        }
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::BlankField { field });
        }
        if trimmed.len() != value.len() {
            return Err(ValidationError::PaddedField { field });
        }
        Ok(Self(value.to_string()))
    }

    /// The validated text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PoolText {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse("text", &value)
    }
}

impl From<PoolText> for String {
    fn from(value: PoolText) -> Self {
        value.0
    }
}

impl std::fmt::Display for PoolText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
