//! # Material Key Manager
//!
//! Generates, imports, lists, and revokes the material keys of a pool.
//!
//! ## Security Invariant
//!
//! Generation and import are serialized per pool by two mechanisms that
//! must both hold:
//!
//! 1. The per-pool lock ([`PoolManager::lock`]) orders competing callers
//!    inside one process. The versioning check runs under it.
//! 2. The store write for a non-versioned pool carries
//!    [`WriteCondition::PoolHasNoKeys`], so a second writer the lock did
//!    not see (another process sharing the store) is rejected by the
//!    store itself and surfaces as `ConcurrencyError::GenerationRace`.
//!
//! A non-versioned pool therefore never holds more than one material key.
//!
//! Once a key is stored, activation of a `PendingImport` pool no longer
//! checks the request deadline. If activation still fails (the pool store
//! is down), the next generate or import finds the stored key under the
//! lock and activates the pool before anything else.

use std::sync::Arc;

use kms_core::{
    ConcurrencyError, ElasticKeyId, KmsError, MaterialKeyId, StateError, Timestamp,
};
use kms_crypto::{Jwk, KeyMaterial};
use kms_state::{
    ElasticKeyPool, ElasticKeyStatus, KeyOrigin, MaterialKey, PoolOperation, StoredMaterialKey,
};

use crate::context::RequestContext;
use crate::locks::PoolGuard;
use crate::pools::PoolManager;
use crate::selector::KeySelector;
use crate::store::{MaterialKeyStore, StoreError, WriteCondition};

/// Material key lifecycle within pools.
pub struct MaterialKeyManager {
    pools: Arc<PoolManager>,
    keys: Arc<dyn MaterialKeyStore>,
    selector: KeySelector,
}

impl std::fmt::Debug for MaterialKeyManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialKeyManager")
            .field("pools", &self.pools)
            .finish_non_exhaustive()
    }
}

impl MaterialKeyManager {
    /// Create a manager over `keys`, using `pools` for lookups and locking.
    pub fn new(pools: Arc<PoolManager>, keys: Arc<dyn MaterialKeyStore>) -> Self {
        let selector = KeySelector::new(Arc::clone(&keys));
        Self {
            pools,
            keys,
            selector,
        }
    }

    /// Generate a material key of the pool's key shape.
    ///
    /// Activates a `PendingImport` pool.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Pool` for an unknown pool.
    /// - `StateError::PoolNotActive` if the pool's status forbids generation.
    /// - `StateError::VersioningViolation` if the pool does not allow
    ///   versioning and already holds a key.
    /// - `ConcurrencyError::GenerationRace` if the store rejected the write.
    pub fn generate(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.pools
            .get(ctx, id)?
            .require_permits(PoolOperation::GenerateKey)?;
        let guard = self.pools.lock(ctx, id)?;
        let pool = self.locked_snapshot(ctx, &guard)?;
        pool.require_permits(PoolOperation::GenerateKey)?;
        let condition = self.versioning_condition(ctx, &pool)?;

        let material = KeyMaterial::generate(pool.algorithm.key_shape())?;
        let record = StoredMaterialKey::new(id, KeyOrigin::Generated, material);
        self.persist(ctx, &guard, pool, record, condition)
    }

    /// Import a private JWK as the pool's newest material key.
    ///
    /// The JWK's key type, size, and curve must match the pool's key
    /// shape. Activates a `PendingImport` pool.
    ///
    /// # Errors
    ///
    /// - `NotFoundError::Pool` for an unknown pool.
    /// - `StateError::ImportNotAllowed` if the pool was created without
    ///   `import_allowed`.
    /// - `StateError::VersioningViolation` as for [`Self::generate`].
    /// - `ValidationError::InvalidKeyMaterial` if the JWK is malformed or
    ///   does not fit the pool.
    pub fn import(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        jwk_json: &str,
    ) -> Result<MaterialKey, KmsError> {
        let pool = self.pools.get(ctx, id)?;
        if !pool.import_allowed {
            return Err(StateError::ImportNotAllowed { pool: id }.into());
        }
        pool.require_permits(PoolOperation::ImportKey)?;
        let guard = self.pools.lock(ctx, id)?;
        let pool = self.locked_snapshot(ctx, &guard)?;
        pool.require_permits(PoolOperation::ImportKey)?;
        let condition = self.versioning_condition(ctx, &pool)?;

        let jwk = Jwk::from_json(jwk_json)?;
        let material = KeyMaterial::from_jwk(&jwk, pool.algorithm.key_shape())?;
        let record = StoredMaterialKey::new(id, KeyOrigin::Imported, material);
        self.persist(ctx, &guard, pool, record, condition)
    }

    /// Every key of the pool, oldest first.
    pub fn list(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<Vec<MaterialKey>, KmsError> {
        self.pools.get(ctx, id)?;
        ctx.check("material key lookup")?;
        Ok(self
            .keys
            .list_by_pool(id)?
            .into_iter()
            .map(|k| k.metadata)
            .collect())
    }

    /// One key of the pool, revoked or not.
    pub fn get(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        kid: MaterialKeyId,
    ) -> Result<MaterialKey, KmsError> {
        let pool = self.pools.get(ctx, id)?;
        Ok(self.selector.select_by_identifier(ctx, &pool, kid)?.metadata)
    }

    /// The pool's current key.
    ///
    /// # Errors
    ///
    /// `StateError::NoUsableKey` if the pool holds no usable key.
    pub fn current(&self, ctx: &RequestContext, id: ElasticKeyId) -> Result<MaterialKey, KmsError> {
        let pool = self.pools.get(ctx, id)?;
        Ok(self.selector.select_for_new_operation(ctx, &pool)?.metadata)
    }

    /// Stamp a key's revocation date. Revoked keys are never selected for
    /// new operations and fail decrypt/verify with `KeyRevoked`.
    ///
    /// # Errors
    ///
    /// `StateError::AlreadyRevoked` if the key was revoked before.
    pub fn revoke(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        kid: MaterialKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.pools
            .get(ctx, id)?
            .require_permits(PoolOperation::RevokeKey)?;
        let _guard = self.pools.lock(ctx, id)?;
        let pool = self.pools.get(ctx, id)?;
        pool.require_permits(PoolOperation::RevokeKey)?;
        let key = self.selector.select_by_identifier(ctx, &pool, kid)?;
        if key.metadata.is_revoked() {
            return Err(StateError::AlreadyRevoked { key: kid }.into());
        }
        ctx.check("material key store")?;
        let revoked = self.keys.update_revocation(id, kid, Timestamp::now())?;
        tracing::info!(pool = %id, key = %kid, "material key revoked");
        Ok(revoked.metadata)
    }

    /// Re-read the pool under its lock. A `PendingImport` pool that already
    /// holds a usable key lost its activation after the key was stored;
    /// finish that activation now.
    fn locked_snapshot(
        &self,
        ctx: &RequestContext,
        guard: &PoolGuard,
    ) -> Result<ElasticKeyPool, KmsError> {
        let pool = self.pools.get(ctx, guard.pool())?;
        if pool.status != ElasticKeyStatus::PendingImport {
            return Ok(pool);
        }
        ctx.check("material key lookup")?;
        if self.keys.get_latest_by_pool(pool.id)?.is_none() {
            return Ok(pool);
        }
        tracing::warn!(pool = %pool.id, "activating pool left pending with a stored key");
        self.pools.transition_to_active(guard, pool)
    }

    fn versioning_condition(
        &self,
        ctx: &RequestContext,
        pool: &ElasticKeyPool,
    ) -> Result<WriteCondition, KmsError> {
        if pool.versioning_allowed {
            return Ok(WriteCondition::Unconditional);
        }
        ctx.check("material key lookup")?;
        if !self.keys.list_by_pool(pool.id)?.is_empty() {
            return Err(StateError::VersioningViolation { pool: pool.id }.into());
        }
        Ok(WriteCondition::PoolHasNoKeys)
    }

    fn persist(
        &self,
        ctx: &RequestContext,
        guard: &PoolGuard,
        snapshot: ElasticKeyPool,
        record: StoredMaterialKey,
        condition: WriteCondition,
    ) -> Result<MaterialKey, KmsError> {
        let pool = guard.pool();
        let metadata = record.metadata.clone();
        ctx.check("material key store")?;
        self.keys.create(record, condition).map_err(|e| match e {
            StoreError::Conflict(_) => {
                tracing::warn!(pool = %pool, "concurrent material key creation rejected");
                KmsError::from(ConcurrencyError::GenerationRace { pool })
            }
            other => other.into(),
        })?;
        tracing::info!(
            pool = %pool,
            key = %metadata.material_key_id,
            origin = %metadata.origin,
            "material key created"
        );
        self.pools.transition_to_active(guard, snapshot)?;
        Ok(metadata)
    }
}
