//! # kms-cli: CLI Tool for the Elastic Key Pool Core
//!
//! Provides the `kms` command-line interface over the in-process service.
//! Nothing is persisted between invocations: every command that needs pools
//! builds a fresh in-memory service.
//!
//! ## Subcommands
//!
//! - `kms algorithms`: List the algorithm catalog.
//! - `kms keygen`: Emit a private JWK suitable for import.
//! - `kms roundtrip`: Drive one pool through key creation, a crypto
//!   round-trip, and rotation.
//! - `kms inspect`: Decode the protected header of a compact JWE or JWS.
//! - `kms config`: Print the effective service configuration.
//!
//! ```bash
//! kms algorithms --family signature
//! kms keygen --algorithm ES256 --out es256.jwk
//! kms roundtrip --algorithm ES256 --import es256.jwk --rotations 2
//! ```

pub mod algorithms;
pub mod inspect;
pub mod keygen;
pub mod roundtrip;
pub mod settings;

use std::path::Path;

use anyhow::{Context, Result};

use kms_service::ServiceConfig;

/// Load the service configuration from `path`, or from `KMS_*` environment
/// variables when no file is given.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => ServiceConfig::from_file(path)
            .with_context(|| format!("failed to load config: {}", path.display())),
        None => ServiceConfig::from_env().context("invalid KMS_* environment configuration"),
    }
}
