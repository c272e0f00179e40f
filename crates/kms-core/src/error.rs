//! # Error Types: KMS Error Taxonomy
//!
//! Every fallible operation in the KMS returns [`KmsError`], which partitions
//! failures into the categories a transport layer needs to map onto
//! responses: validation, not-found, state/policy, crypto, concurrency,
//! cancellation, and storage.
//!
//! ## Security Invariant
//!
//! [`CryptoError`] variants are unit variants with fixed messages. They never
//! carry key material, partial plaintext, or integrity-check intermediates,
//! so formatting or logging one cannot leak anything an attacker could use
//! to tell *which* check failed. Validation and state errors may name the
//! offending field or policy because they never touch secret material.

use thiserror::Error;

use crate::identity::{ElasticKeyId, MaterialKeyId};

/// Top-level error type for the KMS core.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KmsError {
    /// Malformed caller input.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A referenced pool or material key does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The operation is forbidden by pool state or policy flags.
    #[error(transparent)]
    State(#[from] StateError),

    /// A cryptographic operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// A generation/import race was detected and rejected.
    #[error(transparent)]
    Concurrency(#[from] ConcurrencyError),

    /// The caller cancelled the request before the named stage started.
    #[error("request cancelled before {stage}")]
    Cancelled {
        /// The stage that was not started.
        stage: &'static str,
    },

    /// The caller's deadline expired at the named stage.
    #[error("request deadline exceeded during {stage}")]
    DeadlineExceeded {
        /// The stage during which the deadline expired.
        stage: &'static str,
    },

    /// The storage collaborator reported a failure. Owned by the store;
    /// the core never retries it.
    #[error("storage error: {0}")]
    Storage(String),
}

impl KmsError {
    /// Stable category name for mapping onto transport-level responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::State(_) => "state",
            Self::Crypto(_) => "crypto",
            Self::Concurrency(_) => "concurrency",
            Self::Cancelled { .. } => "cancelled",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
            Self::Storage(_) => "storage",
        }
    }
}

/// Malformed input to pool creation, update, or key import.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The field was the empty string.
    #[error("{field} must not be empty")]
    EmptyField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The field consisted only of whitespace.
    #[error("{field} must not be blank")]
    BlankField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The field carried leading or trailing whitespace.
    #[error("{field} must not have leading or trailing whitespace")]
    PaddedField {
        /// Name of the offending field.
        field: &'static str,
    },

    /// The algorithm identifier is not in the catalog.
    #[error("invalid algorithm: {0:?}")]
    InvalidAlgorithm(String),

    /// The provider identifier is not recognised.
    #[error("invalid provider: {0:?}")]
    InvalidProvider(String),

    /// Imported key material could not be parsed or does not match the
    /// pool's key shape.
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Why the material was rejected. Never includes key bytes.
        reason: String,
    },

    /// The data-key generation algorithm is not recognised.
    #[error("invalid generate algorithm: {0:?}")]
    InvalidGenerateAlgorithm(String),

    /// A configuration value is out of range or inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// A referenced record does not exist.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotFoundError {
    /// No pool with this identifier.
    #[error("elastic key {0} not found")]
    Pool(ElasticKeyId),

    /// No material key with this identifier in the given pool.
    #[error("material key {key} not found in elastic key {pool}")]
    MaterialKey {
        /// The owning pool.
        pool: ElasticKeyId,
        /// The requested key.
        key: MaterialKeyId,
    },
}

/// Operation forbidden by the current pool state or policy flags.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// The pool does not allow versioning and already holds a material key.
    #[error("elastic key {pool} does not allow versioning and already holds a material key")]
    VersioningViolation {
        /// The pool.
        pool: ElasticKeyId,
    },

    /// The pool was created with `import_allowed = false`.
    #[error("elastic key {pool} does not allow import")]
    ImportNotAllowed {
        /// The pool.
        pool: ElasticKeyId,
    },

    /// The pool has no usable material key.
    #[error("elastic key {pool} has no usable material key")]
    NoUsableKey {
        /// The pool.
        pool: ElasticKeyId,
    },

    /// The pool's status forbids the requested operation.
    #[error("elastic key {pool} is {status}; {operation} is not permitted")]
    PoolNotActive {
        /// The pool.
        pool: ElasticKeyId,
        /// The pool's current status.
        status: String,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The pool's algorithm family does not support the operation.
    #[error("algorithm {algorithm} does not support {operation}")]
    OperationNotSupported {
        /// The pool's algorithm identifier.
        algorithm: String,
        /// The attempted operation.
        operation: &'static str,
    },

    /// A lifecycle transition is not valid from the current status.
    #[error("invalid elastic key transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Attempted target status.
        to: String,
    },

    /// The material key has been revoked and may not be used.
    #[error("material key {key} is revoked")]
    KeyRevoked {
        /// The revoked key.
        key: MaterialKeyId,
    },

    /// The material key was already revoked.
    #[error("material key {key} is already revoked")]
    AlreadyRevoked {
        /// The revoked key.
        key: MaterialKeyId,
    },
}

/// Cryptographic failure. Deliberately uninformative.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    /// The message header names an algorithm other than the pool's.
    #[error("algorithm mismatch")]
    AlgorithmMismatch,

    /// The ciphertext is malformed or failed an integrity check.
    #[error("decryption failed")]
    DecryptionFailed,

    /// The signed message is malformed or the signature does not verify.
    #[error("verification failed")]
    VerificationFailed,

    /// Encryption could not be performed with the resolved key.
    #[error("encryption failed")]
    EncryptionFailed,

    /// Signing could not be performed with the resolved key.
    #[error("signing failed")]
    SigningFailed,

    /// Fresh key material could not be generated.
    #[error("key generation failed")]
    KeyGenerationFailed,
}

/// A concurrent generation/import was detected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConcurrencyError {
    /// Another caller created a material key in the same pool first.
    #[error("concurrent material key creation in elastic key {pool} was rejected")]
    GenerationRace {
        /// The contended pool.
        pool: ElasticKeyId,
    },
}
