//! # Key Pool Service
//!
//! [`KeyPoolService`] is the single entry point for callers. It wires the
//! pool manager, material key manager, and crypto engine over a shared pair
//! of stores, applies the configured default timeout to requests that
//! carry no deadline, and verifies the algorithm catalog at construction.

use std::sync::Arc;

use kms_core::{ElasticKeyId, KmsError, MaterialKeyId, ValidationError};
use kms_crypto::verify_catalog;
use kms_state::{ElasticKeyPool, MaterialKey};

use crate::config::ServiceConfig;
use crate::context::RequestContext;
use crate::engine::{CryptoEngine, DataKey, Decrypted, Verified};
use crate::materials::MaterialKeyManager;
use crate::memory::{InMemoryMaterialKeyStore, InMemoryPoolStore};
use crate::pools::{CreatePool, PoolManager};
use crate::selector::KeySelector;
use crate::store::{MaterialKeyStore, PoolFilter, PoolStore};

/// Elastic key pool service facade.
#[derive(Debug)]
pub struct KeyPoolService {
    config: ServiceConfig,
    pools: Arc<PoolManager>,
    materials: MaterialKeyManager,
    engine: CryptoEngine,
}

impl KeyPoolService {
    /// Wire a service over externally owned stores.
    ///
    /// # Errors
    ///
    /// `ValidationError::InvalidConfiguration` if the configuration is out
    /// of range or the algorithm catalog is inconsistent.
    pub fn new(
        pool_store: Arc<dyn PoolStore>,
        key_store: Arc<dyn MaterialKeyStore>,
        config: ServiceConfig,
    ) -> Result<Self, KmsError> {
        verify_catalog().map_err(|e| ValidationError::InvalidConfiguration(e.to_string()))?;
        let config = config.validated()?;
        let pools = Arc::new(PoolManager::new(
            pool_store,
            config.lock_wait,
            config.allowed_providers.clone(),
        ));
        let materials = MaterialKeyManager::new(Arc::clone(&pools), Arc::clone(&key_store));
        let engine = CryptoEngine::new(Arc::clone(&pools), KeySelector::new(key_store));
        Ok(Self {
            config,
            pools,
            materials,
            engine,
        })
    }

    /// A service over fresh in-memory stores.
    pub fn in_memory(config: ServiceConfig) -> Result<Self, KmsError> {
        Self::new(
            Arc::new(InMemoryPoolStore::new()),
            Arc::new(InMemoryMaterialKeyStore::new()),
            config,
        )
    }

    /// The effective configuration.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn scoped(&self, ctx: &RequestContext) -> RequestContext {
        ctx.clone().or_timeout(self.config.default_timeout)
    }

    // ── Pools ────────────────────────────────────────────────────────

    /// Validate and create a pool. With `generate_initial_key`, a pool
    /// that does not await import gets its first material key at once.
    ///
    /// The pool is persisted before that key is generated, so a failed
    /// generation is logged and the created pool is still returned; the
    /// caller can generate the key later.
    #[tracing::instrument(
        level = "debug",
        skip_all,
        fields(name = %request.name, algorithm = %request.algorithm)
    )]
    pub fn create_pool(
        &self,
        ctx: &RequestContext,
        request: &CreatePool,
    ) -> Result<ElasticKeyPool, KmsError> {
        let ctx = self.scoped(ctx);
        let pool = self.pools.create(&ctx, request)?;
        if self.config.generate_initial_key && !pool.import_allowed {
            if let Err(e) = self.materials.generate(&ctx, pool.id) {
                tracing::warn!(
                    pool = %pool.id,
                    error = %e,
                    "initial material key generation failed"
                );
            }
        }
        Ok(pool)
    }

    /// Fetch a pool.
    pub fn get_pool(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.pools.get(&self.scoped(ctx), id)
    }

    /// Pools passing `filter`, ordered by id.
    pub fn list_pools(
        &self,
        ctx: &RequestContext,
        filter: &PoolFilter,
    ) -> Result<Vec<ElasticKeyPool>, KmsError> {
        self.pools.list(&self.scoped(ctx), filter)
    }

    /// Replace a pool's name and/or description.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn update_pool(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.pools.update(&self.scoped(ctx), id, name, description)
    }

    /// Active → Disabled.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn disable_pool(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.pools.disable(&self.scoped(ctx), id)
    }

    /// Disabled → Active.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn enable_pool(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.pools.enable(&self.scoped(ctx), id)
    }

    /// Schedule a pool for deletion.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn delete_pool(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.pools.delete(&self.scoped(ctx), id)
    }

    // ── Material keys ────────────────────────────────────────────────

    /// Generate a new material key in the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn generate_material_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.materials.generate(&self.scoped(ctx), id)
    }

    /// Import a private JWK into the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn import_material_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        jwk_json: &str,
    ) -> Result<MaterialKey, KmsError> {
        self.materials.import(&self.scoped(ctx), id, jwk_json)
    }

    /// Every key of the pool, oldest first.
    pub fn list_material_keys(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<Vec<MaterialKey>, KmsError> {
        self.materials.list(&self.scoped(ctx), id)
    }

    /// One key of the pool.
    pub fn get_material_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        kid: MaterialKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.materials.get(&self.scoped(ctx), id, kid)
    }

    /// The pool's current key.
    pub fn current_material_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.materials.current(&self.scoped(ctx), id)
    }

    /// Revoke one key of the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id, key = %kid))]
    pub fn revoke_material_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        kid: MaterialKeyId,
    ) -> Result<MaterialKey, KmsError> {
        self.materials.revoke(&self.scoped(ctx), id, kid)
    }

    // ── Crypto ───────────────────────────────────────────────────────

    /// Encrypt to a compact JWE under the pool's current key.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn encrypt(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        plaintext: &[u8],
        context: Option<&[u8]>,
    ) -> Result<String, KmsError> {
        self.engine.encrypt(&self.scoped(ctx), id, plaintext, context)
    }

    /// Decrypt a compact JWE produced under the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn decrypt(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        compact: &str,
    ) -> Result<Decrypted, KmsError> {
        self.engine.decrypt(&self.scoped(ctx), id, compact)
    }

    /// Sign to a compact JWS with the pool's current key.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn sign(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        payload: &[u8],
        context: Option<&[u8]>,
    ) -> Result<String, KmsError> {
        self.engine.sign(&self.scoped(ctx), id, payload, context)
    }

    /// Verify a compact JWS produced under the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id))]
    pub fn verify(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        compact: &str,
    ) -> Result<Verified, KmsError> {
        self.engine.verify(&self.scoped(ctx), id, compact)
    }

    /// Generate a data key encrypted under the pool.
    #[tracing::instrument(level = "debug", skip_all, fields(pool = %id, algorithm = %algorithm))]
    pub fn generate_data_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        algorithm: &str,
        context: Option<&[u8]>,
    ) -> Result<DataKey, KmsError> {
        self.engine
            .generate_data_key(&self.scoped(ctx), id, algorithm, context)
    }
}
