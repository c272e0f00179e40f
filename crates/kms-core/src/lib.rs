//! # kms-core: Foundational Types for the Elastic Key Pool KMS
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on:
//!
//! - **Identifiers.** `ElasticKeyId` and `MaterialKeyId` are distinct UUIDv7
//!   newtypes; no bare UUIDs cross crate boundaries.
//! - **Timestamps.** `Timestamp` is UTC-only with millisecond precision.
//! - **Pool text.** `PoolText` carries the name/description validation rules
//!   in its constructor.
//! - **Providers.** `Provider` is a closed enum with a single `Internal`
//!   variant.
//! - **Errors.** `KmsError` and its category enums.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `kms-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod provider;
pub mod temporal;
pub mod text;

pub use error::{
    ConcurrencyError, CryptoError, KmsError, NotFoundError, StateError, ValidationError,
};
pub use identity::{ElasticKeyId, MaterialKeyId};
pub use provider::Provider;
pub use temporal::Timestamp;
pub use text::PoolText;
