//! # Elastic Key Pool Lifecycle
//!
//! An elastic key pool is a named, policy-bearing container for a sequence
//! of material keys sharing one algorithm.
//!
//! ## States
//!
//! ```text
//! PendingImport ──▶ Active ◀──▶ Disabled
//!       │             │            │
//!       ▼             ▼            ▼
//! PendingDelete   PendingDelete  PendingDelete
//!  WasPendingImport WasActive    WasDisabled
//! ```
//!
//! A pool starts in `PendingImport` exactly when it was created with
//! `import_allowed`, and in `Active` otherwise. It leaves `PendingImport`
//! when its first usable material key exists. Activation is monotonic:
//! there is no edge back to `PendingImport`, and activating an `Active`
//! pool is a no-op.
//!
//! ## Operation Gating
//!
//! | Status | Permitted |
//! |--------|-----------|
//! | `PendingImport` | generate, import, update, revoke |
//! | `Active` | everything |
//! | `Disabled` | decrypt, verify, update, revoke |
//! | `PendingDelete*` | nothing |
//!
//! A disabled pool keeps its decrypt/verify capability so that data sealed
//! before the pool was disabled stays readable.

use serde::{Deserialize, Serialize};

use kms_core::{ElasticKeyId, PoolText, Provider, StateError, Timestamp};
use kms_crypto::AlgorithmSpec;

// ─── Status ──────────────────────────────────────────────────────────

/// The lifecycle status of an elastic key pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElasticKeyStatus {
    /// Awaiting the first imported (or generated) material key.
    PendingImport,
    /// Usable for every operation.
    Active,
    /// Retired from new encryption/signing; decrypt/verify still work.
    Disabled,
    /// Scheduled for deletion from `PendingImport`.
    PendingDeleteWasPendingImport,
    /// Scheduled for deletion from `Active`.
    PendingDeleteWasActive,
    /// Scheduled for deletion from `Disabled`.
    PendingDeleteWasDisabled,
}

impl ElasticKeyStatus {
    /// All statuses.
    pub fn all() -> &'static [ElasticKeyStatus] {
        &[
            Self::PendingImport,
            Self::Active,
            Self::Disabled,
            Self::PendingDeleteWasPendingImport,
            Self::PendingDeleteWasActive,
            Self::PendingDeleteWasDisabled,
        ]
    }

    /// Whether the pool is scheduled for deletion.
    pub fn is_pending_delete(&self) -> bool {
        matches!(
            self,
            Self::PendingDeleteWasPendingImport
                | Self::PendingDeleteWasActive
                | Self::PendingDeleteWasDisabled
        )
    }

    /// Whether `operation` is permitted in this status.
    pub fn permits(&self, operation: PoolOperation) -> bool {
        use PoolOperation as Op;
        match self {
            Self::PendingImport => matches!(
                operation,
                Op::GenerateKey | Op::ImportKey | Op::Update | Op::RevokeKey
            ),
            Self::Active => true,
            Self::Disabled => matches!(
                operation,
                Op::Decrypt | Op::Verify | Op::Update | Op::RevokeKey
            ),
            Self::PendingDeleteWasPendingImport
            | Self::PendingDeleteWasActive
            | Self::PendingDeleteWasDisabled => false,
        }
    }
}

impl std::fmt::Display for ElasticKeyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PendingImport => "PENDING_IMPORT",
            Self::Active => "ACTIVE",
            Self::Disabled => "DISABLED",
            Self::PendingDeleteWasPendingImport => "PENDING_DELETE_WAS_PENDING_IMPORT",
            Self::PendingDeleteWasActive => "PENDING_DELETE_WAS_ACTIVE",
            Self::PendingDeleteWasDisabled => "PENDING_DELETE_WAS_DISABLED",
        };
        f.write_str(s)
    }
}

/// Operations gated by pool status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolOperation {
    /// JWE encryption.
    Encrypt,
    /// JWE decryption.
    Decrypt,
    /// JWS signing.
    Sign,
    /// JWS verification.
    Verify,
    /// Material key generation.
    GenerateKey,
    /// Material key import.
    ImportKey,
    /// Data key generation.
    GenerateDataKey,
    /// Material key revocation.
    RevokeKey,
    /// Name/description update.
    Update,
}

impl PoolOperation {
    /// Stable lowercase name, used in errors and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Encrypt => "encrypt",
            Self::Decrypt => "decrypt",
            Self::Sign => "sign",
            Self::Verify => "verify",
            Self::GenerateKey => "generate",
            Self::ImportKey => "import",
            Self::GenerateDataKey => "generate_data_key",
            Self::RevokeKey => "revoke",
            Self::Update => "update",
        }
    }
}

// ─── Transition Records ──────────────────────────────────────────────

/// Record of a pool status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolTransitionRecord {
    /// Status before the transition.
    pub from_status: ElasticKeyStatus,
    /// Status after the transition.
    pub to_status: ElasticKeyStatus,
    /// When the transition occurred.
    pub timestamp: Timestamp,
    /// Why the transition happened.
    pub reason: String,
}

// ─── Pool ────────────────────────────────────────────────────────────

/// Validated creation input for a pool.
#[derive(Debug, Clone)]
pub struct PoolDefinition {
    /// Pool name.
    pub name: PoolText,
    /// Pool description.
    pub description: PoolText,
    /// The pool's algorithm.
    pub algorithm: AlgorithmSpec,
    /// The key provider.
    pub provider: Provider,
    /// Whether data keys may be returned in the clear.
    pub export_allowed: bool,
    /// Whether material keys may be imported.
    pub import_allowed: bool,
    /// Whether more than one material key may be held.
    pub versioning_allowed: bool,
}

/// An elastic key pool with its lifecycle status and transition history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticKeyPool {
    /// Unique pool identifier.
    pub id: ElasticKeyId,
    /// Pool name.
    pub name: PoolText,
    /// Pool description.
    pub description: PoolText,
    /// The pool's algorithm. Immutable.
    pub algorithm: AlgorithmSpec,
    /// The key provider.
    pub provider: Provider,
    /// Whether data keys may be returned in the clear.
    pub export_allowed: bool,
    /// Whether material keys may be imported.
    pub import_allowed: bool,
    /// Whether more than one material key may be held.
    pub versioning_allowed: bool,
    /// Current lifecycle status.
    pub status: ElasticKeyStatus,
    /// When the pool was created.
    pub created_at: Timestamp,
    /// When the pool was last modified.
    pub updated_at: Timestamp,
    /// Ordered log of status transitions.
    pub transitions: Vec<PoolTransitionRecord>,
}

impl ElasticKeyPool {
    /// Create a pool from a validated definition.
    ///
    /// The initial status is `PendingImport` iff `import_allowed`.
    pub fn new(id: ElasticKeyId, definition: PoolDefinition) -> Self {
        let now = Timestamp::now();
        let status = if definition.import_allowed {
            ElasticKeyStatus::PendingImport
        } else {
            ElasticKeyStatus::Active
        };
        Self {
            id,
            name: definition.name,
            description: definition.description,
            algorithm: definition.algorithm,
            provider: definition.provider,
            export_allowed: definition.export_allowed,
            import_allowed: definition.import_allowed,
            versioning_allowed: definition.versioning_allowed,
            status,
            created_at: now,
            updated_at: now,
            transitions: Vec::new(),
        }
    }

    /// Activate the pool (PENDING_IMPORT → ACTIVE).
    ///
    /// Returns `Ok(false)` without recording anything if the pool is already
    /// active.
    pub fn activate(&mut self, reason: &str) -> Result<bool, StateError> {
        match self.status {
            ElasticKeyStatus::Active => Ok(false),
            ElasticKeyStatus::PendingImport => {
                self.do_transition(ElasticKeyStatus::Active, reason);
                Ok(true)
            }
            _ => Err(self.invalid_transition(ElasticKeyStatus::Active)),
        }
    }

    /// Disable the pool (ACTIVE → DISABLED).
    pub fn disable(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_status(ElasticKeyStatus::Active, ElasticKeyStatus::Disabled)?;
        self.do_transition(ElasticKeyStatus::Disabled, reason);
        Ok(())
    }

    /// Re-enable the pool (DISABLED → ACTIVE).
    pub fn enable(&mut self, reason: &str) -> Result<(), StateError> {
        self.require_status(ElasticKeyStatus::Disabled, ElasticKeyStatus::Active)?;
        self.do_transition(ElasticKeyStatus::Active, reason);
        Ok(())
    }

    /// Schedule the pool for deletion, remembering where it came from.
    pub fn schedule_deletion(&mut self, reason: &str) -> Result<(), StateError> {
        let to = match self.status {
            ElasticKeyStatus::PendingImport => ElasticKeyStatus::PendingDeleteWasPendingImport,
            ElasticKeyStatus::Active => ElasticKeyStatus::PendingDeleteWasActive,
            ElasticKeyStatus::Disabled => ElasticKeyStatus::PendingDeleteWasDisabled,
            ElasticKeyStatus::PendingDeleteWasPendingImport
            | ElasticKeyStatus::PendingDeleteWasActive
            | ElasticKeyStatus::PendingDeleteWasDisabled => {
                return Err(StateError::InvalidTransition {
                    from: self.status.to_string(),
                    to: "PENDING_DELETE".to_string(),
                });
            }
        };
        self.do_transition(to, reason);
        Ok(())
    }

    /// Replace the name and/or description.
    pub fn update_details(
        &mut self,
        name: Option<PoolText>,
        description: Option<PoolText>,
    ) -> Result<(), StateError> {
        self.require_permits(PoolOperation::Update)?;
        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = description {
            self.description = description;
        }
        self.updated_at = Timestamp::now();
        Ok(())
    }

    /// Fail with [`StateError::PoolNotActive`] unless the current status
    /// permits `operation`.
    pub fn require_permits(&self, operation: PoolOperation) -> Result<(), StateError> {
        if self.status.permits(operation) {
            return Ok(());
        }
        Err(StateError::PoolNotActive {
            pool: self.id,
            status: self.status.to_string(),
            operation: operation.as_str(),
        })
    }

    fn require_status(
        &self,
        expected: ElasticKeyStatus,
        target: ElasticKeyStatus,
    ) -> Result<(), StateError> {
        if self.status != expected {
            return Err(self.invalid_transition(target));
        }
        Ok(())
    }

    fn invalid_transition(&self, target: ElasticKeyStatus) -> StateError {
        StateError::InvalidTransition {
            from: self.status.to_string(),
            to: target.to_string(),
        }
    }

    fn do_transition(&mut self, to: ElasticKeyStatus, reason: &str) {
        let now = Timestamp::now();
        self.transitions.push(PoolTransitionRecord {
            from_status: self.status,
            to_status: to,
            timestamp: now,
            reason: reason.to_string(),
        });
        self.status = to;
        self.updated_at = now;
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(import_allowed: bool) -> PoolDefinition {
        PoolDefinition {
            name: PoolText::parse("name", "K1").unwrap(),
            description: PoolText::parse("description", "D1").unwrap(),
            algorithm: kms_crypto::resolve("A256GCM/A256KW").unwrap(),
            provider: Provider::Internal,
            export_allowed: false,
            import_allowed,
            versioning_allowed: true,
        }
    }

    fn make_pool(import_allowed: bool) -> ElasticKeyPool {
        ElasticKeyPool::new(ElasticKeyId::new(), definition(import_allowed))
    }

    // ── Initial status ───────────────────────────────────────────────

    #[test]
    fn test_initial_status_follows_import_allowed() {
        assert_eq!(make_pool(true).status, ElasticKeyStatus::PendingImport);
        assert_eq!(make_pool(false).status, ElasticKeyStatus::Active);
        assert!(make_pool(false).transitions.is_empty());
    }

    // ── Activation ───────────────────────────────────────────────────

    #[test]
    fn test_activate_from_pending_import() {
        let mut pool = make_pool(true);
        assert!(pool.activate("first key").unwrap());
        assert_eq!(pool.status, ElasticKeyStatus::Active);
        assert_eq!(pool.transitions.len(), 1);
        assert_eq!(
            pool.transitions[0].from_status,
            ElasticKeyStatus::PendingImport
        );
    }

    #[test]
    fn test_activate_is_idempotent() {
        let mut pool = make_pool(true);
        pool.activate("first key").unwrap();
        assert!(!pool.activate("second key").unwrap());
        assert_eq!(pool.transitions.len(), 1);
    }

    #[test]
    fn test_cannot_activate_disabled_pool() {
        let mut pool = make_pool(false);
        pool.disable("retire").unwrap();
        assert!(matches!(
            pool.activate("key"),
            Err(StateError::InvalidTransition { .. })
        ));
    }

    // ── Disable / enable / delete ────────────────────────────────────

    #[test]
    fn test_disable_enable_cycle() {
        let mut pool = make_pool(false);
        pool.disable("retire").unwrap();
        assert_eq!(pool.status, ElasticKeyStatus::Disabled);
        pool.enable("restore").unwrap();
        assert_eq!(pool.status, ElasticKeyStatus::Active);
        assert_eq!(pool.transitions.len(), 2);
    }

    #[test]
    fn test_cannot_disable_pending_import() {
        let mut pool = make_pool(true);
        assert!(pool.disable("retire").is_err());
        assert!(pool.enable("restore").is_err());
    }

    #[test]
    fn test_schedule_deletion_remembers_origin() {
        for (setup, expected) in [
            (None, ElasticKeyStatus::PendingDeleteWasActive),
            (Some(true), ElasticKeyStatus::PendingDeleteWasDisabled),
            (Some(false), ElasticKeyStatus::PendingDeleteWasPendingImport),
        ] {
            let mut pool = make_pool(setup == Some(false));
            if setup == Some(true) {
                pool.disable("retire").unwrap();
            }
            pool.schedule_deletion("delete").unwrap();
            assert_eq!(pool.status, expected);
            assert!(pool.status.is_pending_delete());
        }
    }

    #[test]
    fn test_repeat_deletion_rejected() {
        let mut pool = make_pool(false);
        pool.schedule_deletion("delete").unwrap();
        assert!(matches!(
            pool.schedule_deletion("again"),
            Err(StateError::InvalidTransition { .. })
        ));
    }

    // ── Gating ───────────────────────────────────────────────────────

    #[test]
    fn test_disabled_retains_decrypt_and_verify() {
        let s = ElasticKeyStatus::Disabled;
        assert!(s.permits(PoolOperation::Decrypt));
        assert!(s.permits(PoolOperation::Verify));
        assert!(!s.permits(PoolOperation::Encrypt));
        assert!(!s.permits(PoolOperation::Sign));
        assert!(!s.permits(PoolOperation::GenerateKey));
        assert!(!s.permits(PoolOperation::ImportKey));
    }

    #[test]
    fn test_pending_import_blocks_crypto() {
        let pool = make_pool(true);
        let err = pool.require_permits(PoolOperation::Encrypt).unwrap_err();
        assert_eq!(
            err,
            StateError::PoolNotActive {
                pool: pool.id,
                status: "PENDING_IMPORT".to_string(),
                operation: "encrypt",
            }
        );
        assert!(pool.require_permits(PoolOperation::ImportKey).is_ok());
    }

    #[test]
    fn test_pending_delete_blocks_everything() {
        let mut pool = make_pool(false);
        pool.schedule_deletion("delete").unwrap();
        for op in [
            PoolOperation::Encrypt,
            PoolOperation::Decrypt,
            PoolOperation::Sign,
            PoolOperation::Verify,
            PoolOperation::GenerateKey,
            PoolOperation::ImportKey,
            PoolOperation::GenerateDataKey,
            PoolOperation::RevokeKey,
            PoolOperation::Update,
        ] {
            assert!(pool.require_permits(op).is_err(), "{}", op.as_str());
        }
    }

    #[test]
    fn test_update_details() {
        let mut pool = make_pool(false);
        pool.update_details(Some(PoolText::parse("name", "K2").unwrap()), None)
            .unwrap();
        assert_eq!(pool.name.as_str(), "K2");
        assert_eq!(pool.description.as_str(), "D1");
    }

    #[test]
    fn test_status_display_is_screaming_case() {
        assert_eq!(ElasticKeyStatus::PendingImport.to_string(), "PENDING_IMPORT");
        assert_eq!(
            ElasticKeyStatus::PendingDeleteWasDisabled.to_string(),
            "PENDING_DELETE_WAS_DISABLED"
        );
        assert_eq!(ElasticKeyStatus::all().len(), 6);
    }

    #[test]
    fn test_pool_serde_roundtrip() {
        let pool = make_pool(true);
        let json = serde_json::to_string(&pool).unwrap();
        assert!(json.contains(r#""algorithm":"A256GCM/A256KW""#));
        let back: ElasticKeyPool = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pool);
    }
}
