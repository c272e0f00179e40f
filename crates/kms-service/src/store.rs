//! # Storage Adapters
//!
//! Defines the [`PoolStore`] and [`MaterialKeyStore`] traits through which
//! the service reaches its persistence layer. Stores are owned outside the
//! service and shared as `Arc<dyn PoolStore>` / `Arc<dyn MaterialKeyStore>`.
//!
//! ## Object Safety
//!
//! Both traits are object-safe and `Send + Sync`. Methods are synchronous:
//! the in-memory implementations in [`crate::memory`] do no I/O, and the
//! per-pool lock in [`crate::locks`] is a blocking lock.
//!
//! ## Conditional Writes
//!
//! [`MaterialKeyStore::create`] takes a [`WriteCondition`]. For pools that
//! do not allow versioning the service writes with
//! [`WriteCondition::PoolHasNoKeys`], and the store must evaluate the
//! condition atomically with the insert. A failed condition is reported as
//! [`StoreError::Conflict`], which the service surfaces as
//! `ConcurrencyError::GenerationRace`.

use thiserror::Error;

use kms_core::{ElasticKeyId, KmsError, MaterialKeyId, Provider, Timestamp};
use kms_state::{ElasticKeyPool, ElasticKeyStatus, StoredMaterialKey};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Errors reported by a storage adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A write precondition did not hold, or the record already exists.
    #[error("store conflict: {0}")]
    Conflict(String),

    /// The record to update does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<StoreError> for KmsError {
    fn from(err: StoreError) -> Self {
        KmsError::Storage(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// Data types
// ---------------------------------------------------------------------------

/// Precondition evaluated atomically with a material key insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteCondition {
    /// Insert regardless of existing keys.
    Unconditional,
    /// Insert only if the pool holds no material key yet.
    PoolHasNoKeys,
}

/// Filter for [`PoolStore::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolFilter {
    /// Exact algorithm identifier.
    pub algorithm: Option<String>,
    /// Exact status.
    pub status: Option<ElasticKeyStatus>,
    /// Exact provider.
    pub provider: Option<Provider>,
    /// Case-sensitive substring of the pool name.
    pub name_contains: Option<String>,
}

impl PoolFilter {
    /// Whether `pool` passes every populated field of the filter.
    pub fn matches(&self, pool: &ElasticKeyPool) -> bool {
        self.algorithm
            .as_deref()
            .map_or(true, |a| pool.algorithm.identifier() == a)
            && self.status.map_or(true, |s| pool.status == s)
            && self.provider.map_or(true, |p| pool.provider == p)
            && self
                .name_contains
                .as_deref()
                .map_or(true, |n| pool.name.as_str().contains(n))
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Persistence for elastic key pools.
pub trait PoolStore: Send + Sync {
    /// Persist a new pool.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if a pool with the same id exists.
    fn create(&self, pool: &ElasticKeyPool) -> Result<(), StoreError>;

    /// Fetch a snapshot of the pool.
    fn get_by_id(&self, id: ElasticKeyId) -> Result<Option<ElasticKeyPool>, StoreError>;

    /// Persist the pool's status, transition history, and `updated_at`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the pool does not exist.
    fn update_status(&self, pool: &ElasticKeyPool) -> Result<(), StoreError>;

    /// Persist the pool's name, description, and `updated_at`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the pool does not exist.
    fn update_details(&self, pool: &ElasticKeyPool) -> Result<(), StoreError>;

    /// All pools passing `filter`, ordered by id.
    fn list(&self, filter: &PoolFilter) -> Result<Vec<ElasticKeyPool>, StoreError>;
}

/// Persistence for material keys, including their secret material.
pub trait MaterialKeyStore: Send + Sync {
    /// Insert a material key if `condition` holds.
    ///
    /// # Errors
    ///
    /// [`StoreError::Conflict`] if the condition fails or the key id is
    /// already present.
    fn create(&self, record: StoredMaterialKey, condition: WriteCondition)
        -> Result<(), StoreError>;

    /// Every key of the pool, oldest first.
    fn list_by_pool(&self, pool: ElasticKeyId) -> Result<Vec<StoredMaterialKey>, StoreError>;

    /// One key of the pool, revoked or not.
    fn get_by_id(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
    ) -> Result<Option<StoredMaterialKey>, StoreError>;

    /// The most recent usable key of the pool.
    fn get_latest_by_pool(&self, pool: ElasticKeyId)
        -> Result<Option<StoredMaterialKey>, StoreError>;

    /// Stamp the key's `revocation_date` and return the updated record.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] if the key does not exist.
    fn update_revocation(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
        revoked_at: Timestamp,
    ) -> Result<StoredMaterialKey, StoreError>;
}
