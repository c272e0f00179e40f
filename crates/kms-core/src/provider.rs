//! # Key Providers
//!
//! A provider is where key material is created and held. Only the
//! in-process `Internal` provider exists; the enum is closed so that adding
//! a provider is a compile-time change everywhere providers are dispatched.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ValidationError;

/// The key material provider backing a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Key material is generated and held in-process.
    Internal,
}

impl Provider {
    /// All known providers.
    pub fn all() -> &'static [Provider] {
        &[Provider::Internal]
    }

    /// The canonical identifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Internal => "Internal",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidProvider(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_parses() {
        assert_eq!("Internal".parse::<Provider>().unwrap(), Provider::Internal);
    }

    #[test]
    fn test_parse_is_exact() {
        for bad in ["internal", "INTERNAL", " Internal", "Hsm", ""] {
            assert_eq!(
                bad.parse::<Provider>(),
                Err(ValidationError::InvalidProvider(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_display_matches_as_str() {
        for p in Provider::all() {
            assert_eq!(p.to_string(), p.as_str());
        }
    }
}
