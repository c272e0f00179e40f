//! # In-Memory Stores
//!
//! [`InMemoryPoolStore`] and [`InMemoryMaterialKeyStore`] implement the
//! storage traits over a shared [`Store`]. They back the test suites and
//! the `kms` CLI, and serve as the reference for what a durable adapter
//! must guarantee.
//!
//! Every read clones the record out under a read lock, so callers hold
//! consistent snapshots and readers never block one another. Conditional
//! material key writes are evaluated and applied under one write lock.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

use kms_core::{ElasticKeyId, MaterialKeyId, Timestamp};
use kms_state::{compare_recency, latest_usable, ElasticKeyPool, StoredMaterialKey};

use crate::store::{MaterialKeyStore, PoolFilter, PoolStore, StoreError, WriteCondition};

// -- Generic In-Memory Store --------------------------------------------------

/// Thread-safe, cloneable in-memory key-value store.
///
/// The lock is `parking_lot`, which does not poison: a panicking writer does
/// not leave the store permanently unusable.
#[derive(Debug)]
pub struct Store<K, T> {
    data: Arc<RwLock<HashMap<K, T>>>,
}

impl<K, T> Clone for Store<K, T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Store<K, T> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Insert a record unless the key is already present.
    /// Returns `false` if it was.
    pub fn insert_new(&self, id: K, value: T) -> bool {
        let mut guard = self.data.write();
        if guard.contains_key(&id) {
            return false;
        }
        guard.insert(id, value);
        true
    }

    /// Retrieve a record by key.
    pub fn get(&self, id: &K) -> Option<T> {
        self.data.read().get(id).cloned()
    }

    /// All records.
    pub fn list(&self) -> Vec<T> {
        self.data.read().values().cloned().collect()
    }

    /// Atomically read-validate-update a record.
    ///
    /// The closure runs under a single write lock, so no other writer can
    /// interleave between its check and its mutation. Returns `None` if
    /// the record doesn't exist.
    pub fn try_update<R, E>(
        &self,
        id: &K,
        f: impl FnOnce(&mut T) -> Result<R, E>,
    ) -> Option<Result<R, E>> {
        self.data.write().get_mut(id).map(f)
    }

    /// Like [`Store::try_update`], but starts from `T::default()` when the
    /// key is absent. The default is only kept if the closure succeeds.
    pub fn try_upsert<R, E>(&self, id: K, f: impl FnOnce(&mut T) -> Result<R, E>) -> Result<R, E>
    where
        T: Default,
    {
        let mut guard = self.data.write();
        match guard.get_mut(&id) {
            Some(entry) => f(entry),
            None => {
                let mut entry = T::default();
                let result = f(&mut entry)?;
                guard.insert(id, entry);
                Ok(result)
            }
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Copy, T: Clone> Default for Store<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

// -- Pools --------------------------------------------------------------------

/// In-memory [`PoolStore`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryPoolStore {
    pools: Store<ElasticKeyId, ElasticKeyPool>,
}

impl InMemoryPoolStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted pools.
    pub fn len(&self) -> usize {
        self.pools.len()
    }

    /// Whether no pool has been persisted.
    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

fn missing_pool(id: ElasticKeyId) -> StoreError {
    StoreError::NotFound(format!("elastic key {id}"))
}

impl PoolStore for InMemoryPoolStore {
    fn create(&self, pool: &ElasticKeyPool) -> Result<(), StoreError> {
        if self.pools.insert_new(pool.id, pool.clone()) {
            Ok(())
        } else {
            Err(StoreError::Conflict(format!("elastic key {} exists", pool.id)))
        }
    }

    fn get_by_id(&self, id: ElasticKeyId) -> Result<Option<ElasticKeyPool>, StoreError> {
        Ok(self.pools.get(&id))
    }

    fn update_status(&self, pool: &ElasticKeyPool) -> Result<(), StoreError> {
        self.pools
            .try_update(&pool.id, |stored| {
                stored.status = pool.status;
                stored.transitions = pool.transitions.clone();
                stored.updated_at = pool.updated_at;
                Ok(())
            })
            .unwrap_or_else(|| Err(missing_pool(pool.id)))
    }

    fn update_details(&self, pool: &ElasticKeyPool) -> Result<(), StoreError> {
        self.pools
            .try_update(&pool.id, |stored| {
                stored.name = pool.name.clone();
                stored.description = pool.description.clone();
                stored.updated_at = pool.updated_at;
                Ok(())
            })
            .unwrap_or_else(|| Err(missing_pool(pool.id)))
    }

    fn list(&self, filter: &PoolFilter) -> Result<Vec<ElasticKeyPool>, StoreError> {
        let mut pools: Vec<_> = self
            .pools
            .list()
            .into_iter()
            .filter(|p| filter.matches(p))
            .collect();
        pools.sort_by_key(|p| p.id);
        Ok(pools)
    }
}

// -- Material Keys ------------------------------------------------------------

/// In-memory [`MaterialKeyStore`]. Keys are grouped per pool.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMaterialKeyStore {
    keys: Store<ElasticKeyId, Vec<StoredMaterialKey>>,
}

impl InMemoryMaterialKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MaterialKeyStore for InMemoryMaterialKeyStore {
    fn create(
        &self,
        record: StoredMaterialKey,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        let pool = record.metadata.elastic_key_id;
        self.keys.try_upsert(pool, |keys| {
            match condition {
                WriteCondition::Unconditional => {}
                WriteCondition::PoolHasNoKeys => {
                    if !keys.is_empty() {
                        return Err(StoreError::Conflict(format!(
                            "elastic key {pool} already holds a material key"
                        )));
                    }
                }
            }
            if keys.iter().any(|k| k.id() == record.id()) {
                return Err(StoreError::Conflict(format!(
                    "material key {} exists",
                    record.id()
                )));
            }
            keys.push(record);
            Ok(())
        })
    }

    fn list_by_pool(&self, pool: ElasticKeyId) -> Result<Vec<StoredMaterialKey>, StoreError> {
        let mut keys = self.keys.get(&pool).unwrap_or_default();
        keys.sort_by(|a, b| compare_recency(&a.metadata, &b.metadata));
        Ok(keys)
    }

    fn get_by_id(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
    ) -> Result<Option<StoredMaterialKey>, StoreError> {
        Ok(self
            .keys
            .get(&pool)
            .and_then(|keys| keys.into_iter().find(|k| k.id() == key)))
    }

    fn get_latest_by_pool(
        &self,
        pool: ElasticKeyId,
    ) -> Result<Option<StoredMaterialKey>, StoreError> {
        let Some(keys) = self.keys.get(&pool) else {
            return Ok(None);
        };
        let latest = latest_usable(keys.iter().map(|k| &k.metadata)).map(|m| m.material_key_id);
        Ok(latest.and_then(|id| keys.into_iter().find(|k| k.id() == id)))
    }

    fn update_revocation(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
        revoked_at: Timestamp,
    ) -> Result<StoredMaterialKey, StoreError> {
        let missing = || StoreError::NotFound(format!("material key {key} in elastic key {pool}"));
        self.keys
            .try_update(&pool, |keys| {
                let record = keys.iter_mut().find(|k| k.id() == key).ok_or_else(missing)?;
                record.metadata.revocation_date = Some(revoked_at);
                Ok(record.clone())
            })
            .unwrap_or_else(|| Err(missing()))
    }
}
