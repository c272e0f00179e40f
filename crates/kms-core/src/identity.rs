//! # Identifier Newtypes
//!
//! Pool and material-key identifiers are distinct types so one can never be
//! passed where the other is expected. A material key identifier travels in
//! JOSE headers as the `kid` parameter; swapping it for a pool identifier
//! would silently resolve nothing, so the type system rules it out.
//!
//! Both identifiers are UUIDv7: they sort by creation time, which gives
//! stores a natural oldest-first order and gives the key selector a
//! deterministic tie-break when two keys share a generation timestamp.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an elastic key pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElasticKeyId(pub Uuid);

/// Unique identifier for a material key within a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialKeyId(pub Uuid);

impl ElasticKeyId {
    /// Generate a new time-ordered pool identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl MaterialKeyId {
    /// Generate a new time-ordered material key identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ElasticKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for MaterialKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ElasticKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for MaterialKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ElasticKeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl FromStr for MaterialKeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
