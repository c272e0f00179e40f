//! # Key Pool Manager
//!
//! Creates, reads, and moves elastic key pools through their lifecycle.
//!
//! ## Validation Order
//!
//! Creation validates name, then description, then algorithm, then
//! provider, and reports the first failure. Nothing is persisted unless
//! every check passes.
//!
//! ## Serialization
//!
//! Lifecycle changes run under the pool's lock from [`PoolLocks`] and
//! re-read the pool after acquiring it, so a status change is always
//! applied to the latest persisted state.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use kms_core::{
    ElasticKeyId, KmsError, NotFoundError, PoolText, Provider, StateError, ValidationError,
};
use kms_crypto::resolve;
use kms_state::{ElasticKeyPool, PoolDefinition};

use crate::context::RequestContext;
use crate::locks::{PoolGuard, PoolLocks};
use crate::store::{PoolFilter, PoolStore};

/// Unvalidated pool creation input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePool {
    /// Pool name.
    pub name: String,
    /// Pool description.
    pub description: String,
    /// Catalog algorithm identifier, e.g. `A256GCM/A256KW` or `ES256`.
    pub algorithm: String,
    /// Provider identifier.
    pub provider: String,
    /// Whether data keys may be returned in the clear.
    #[serde(default)]
    pub export_allowed: bool,
    /// Whether material keys may be imported.
    #[serde(default)]
    pub import_allowed: bool,
    /// Whether the pool may hold more than one material key.
    #[serde(default)]
    pub versioning_allowed: bool,
}

impl CreatePool {
    /// A request for an `Internal` pool with every policy flag off.
    pub fn new(name: &str, description: &str, algorithm: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            algorithm: algorithm.to_string(),
            provider: Provider::Internal.as_str().to_string(),
            export_allowed: false,
            import_allowed: false,
            versioning_allowed: false,
        }
    }

    /// Set the provider identifier.
    pub fn provider(mut self, provider: &str) -> Self {
        self.provider = provider.to_string();
        self
    }

    /// Set `export_allowed`.
    pub fn export_allowed(mut self, allowed: bool) -> Self {
        self.export_allowed = allowed;
        self
    }

    /// Set `import_allowed`.
    pub fn import_allowed(mut self, allowed: bool) -> Self {
        self.import_allowed = allowed;
        self
    }

    /// Set `versioning_allowed`.
    pub fn versioning_allowed(mut self, allowed: bool) -> Self {
        self.versioning_allowed = allowed;
        self
    }
}

/// Pool lifecycle and lookup.
pub struct PoolManager {
    store: Arc<dyn PoolStore>,
    locks: PoolLocks,
    lock_wait: Duration,
    allowed_providers: Vec<Provider>,
}

impl std::fmt::Debug for PoolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolManager")
            .field("locks", &self.locks.len())
            .field("lock_wait", &self.lock_wait)
            .field("allowed_providers", &self.allowed_providers)
            .finish_non_exhaustive()
    }
}

impl PoolManager {
    /// Create a manager over `store`.
    pub fn new(
        store: Arc<dyn PoolStore>,
        lock_wait: Duration,
        allowed_providers: Vec<Provider>,
    ) -> Self {
        Self {
            store,
            locks: PoolLocks::new(),
            lock_wait,
            allowed_providers,
        }
    }

    /// Validate a creation request in the fixed order.
    pub fn validate(&self, request: &CreatePool) -> Result<PoolDefinition, ValidationError> {
        let name = PoolText::parse("name", &request.name)?;
        let description = PoolText::parse("description", &request.description)?;
        let algorithm = resolve(&request.algorithm)?;
        let provider: Provider = request.provider.parse()?;
        if !self.allowed_providers.contains(&provider) {
            return Err(ValidationError::InvalidProvider(request.provider.clone()));
        }
        Ok(PoolDefinition {
            name,
            description,
            algorithm,
            provider,
            export_allowed: request.export_allowed,
            import_allowed: request.import_allowed,
            versioning_allowed: request.versioning_allowed,
        })
    }

    /// Validate and persist a new pool.
    pub fn create(
        &self,
        ctx: &RequestContext,
        request: &CreatePool,
    ) -> Result<ElasticKeyPool, KmsError> {
        let definition = self.validate(request)?;
        let pool = ElasticKeyPool::new(ElasticKeyId::new(), definition);
        ctx.check("pool store")?;
        self.store.create(&pool)?;
        tracing::info!(
            pool = %pool.id,
            algorithm = pool.algorithm.identifier(),
            status = %pool.status,
            "elastic key created"
        );
        Ok(pool)
    }

    /// Fetch a pool snapshot.
    ///
    /// # Errors
    ///
    /// `NotFoundError::Pool` if no such pool exists.
    pub fn get(&self, ctx: &RequestContext, id: ElasticKeyId) -> Result<ElasticKeyPool, KmsError> {
        ctx.check("pool lookup")?;
        self.store
            .get_by_id(id)?
            .ok_or_else(|| NotFoundError::Pool(id).into())
    }

    /// Pools passing `filter`, ordered by id.
    pub fn list(
        &self,
        ctx: &RequestContext,
        filter: &PoolFilter,
    ) -> Result<Vec<ElasticKeyPool>, KmsError> {
        ctx.check("pool lookup")?;
        Ok(self.store.list(filter)?)
    }

    /// Acquire the pool's lock, bounded by the request deadline and the
    /// configured lock wait.
    pub fn lock(&self, ctx: &RequestContext, id: ElasticKeyId) -> Result<PoolGuard, KmsError> {
        self.locks.acquire(id, ctx, self.lock_wait)
    }

    /// Replace the name and/or description.
    pub fn update(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        name: Option<&str>,
        description: Option<&str>,
    ) -> Result<ElasticKeyPool, KmsError> {
        let name = name.map(|n| PoolText::parse("name", n)).transpose()?;
        let description = description
            .map(|d| PoolText::parse("description", d))
            .transpose()?;
        self.get(ctx, id)?;
        let _guard = self.lock(ctx, id)?;
        let mut pool = self.get(ctx, id)?;
        pool.update_details(name, description)?;
        ctx.check("pool store")?;
        self.store.update_details(&pool)?;
        tracing::info!(pool = %id, "elastic key details updated");
        Ok(pool)
    }

    /// Active → Disabled.
    pub fn disable(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.transition(ctx, id, |pool| pool.disable("disabled by caller"))
    }

    /// Disabled → Active.
    pub fn enable(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.transition(ctx, id, |pool| pool.enable("enabled by caller"))
    }

    /// Soft-delete into the matching `PendingDeleteWas*` status.
    pub fn delete(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.transition(ctx, id, |pool| pool.schedule_deletion("deletion requested"))
    }

    /// Move a `PendingImport` pool to `Active`. Idempotent: an already
    /// active pool is left untouched.
    ///
    /// `pool` must be the snapshot read under `guard`. Runs after a material
    /// key is stored, so it never checks the request deadline or
    /// cancellation.
    pub fn transition_to_active(
        &self,
        guard: &PoolGuard,
        mut pool: ElasticKeyPool,
    ) -> Result<ElasticKeyPool, KmsError> {
        debug_assert_eq!(pool.id, guard.pool());
        if pool.activate("first material key available")? {
            self.store.update_status(&pool)?;
            tracing::info!(pool = %pool.id, "elastic key activated");
        } else {
            tracing::debug!(pool = %pool.id, "elastic key already active");
        }
        Ok(pool)
    }

    fn transition(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        apply: impl FnOnce(&mut ElasticKeyPool) -> Result<(), StateError>,
    ) -> Result<ElasticKeyPool, KmsError> {
        self.get(ctx, id)?;
        let _guard = self.lock(ctx, id)?;
        let mut pool = self.get(ctx, id)?;
        let from = pool.status;
        apply(&mut pool)?;
        ctx.check("pool store")?;
        self.store.update_status(&pool)?;
        tracing::info!(pool = %id, from = %from, to = %pool.status, "elastic key status changed");
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPoolStore;
    use kms_state::ElasticKeyStatus;

    fn manager() -> (PoolManager, InMemoryPoolStore) {
        let store = InMemoryPoolStore::new();
        let manager = PoolManager::new(
            Arc::new(store.clone()),
            Duration::from_secs(1),
            Provider::all().to_vec(),
        );
        (manager, store)
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    // ── Creation ─────────────────────────────────────────────────────

    #[test]
    fn test_create_persists_with_initial_status() {
        let (m, store) = manager();
        let pool = m
            .create(&ctx(), &CreatePool::new("orders", "order data", "A256GCM/A256KW"))
            .unwrap();
        assert_eq!(pool.status, ElasticKeyStatus::Active);
        assert_eq!(store.len(), 1);

        let imported = m
            .create(
                &ctx(),
                &CreatePool::new("byok", "imported", "ES256").import_allowed(true),
            )
            .unwrap();
        assert_eq!(imported.status, ElasticKeyStatus::PendingImport);
    }

    #[test]
    fn test_validation_order_name_first() {
        let (m, store) = manager();
        let request = CreatePool::new("", " ", "nope").provider("Vault");
        let err = m.create(&ctx(), &request).unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::EmptyField { field: "name" }));
        assert!(store.is_empty());
    }

    #[test]
    fn test_validation_order_description_before_algorithm() {
        let (m, _) = manager();
        let err = m
            .create(&ctx(), &CreatePool::new("ok", " padded", "nope"))
            .unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::PaddedField { field: "description" }));
    }

    #[test]
    fn test_validation_order_algorithm_before_provider() {
        let (m, _) = manager();
        let err = m
            .create(&ctx(), &CreatePool::new("ok", "ok", "A256GCM").provider("Vault"))
            .unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::InvalidAlgorithm("A256GCM".into())));
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let (m, store) = manager();
        let err = m
            .create(&ctx(), &CreatePool::new("ok", "ok", "ES256").provider("internal"))
            .unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::InvalidProvider("internal".into())));
        assert!(store.is_empty());
    }

    #[test]
    fn test_disallowed_provider_rejected() {
        let m = PoolManager::new(
            Arc::new(InMemoryPoolStore::new()),
            Duration::from_secs(1),
            vec![],
        );
        let err = m.create(&ctx(), &CreatePool::new("ok", "ok", "ES256")).unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::InvalidProvider("Internal".into())));
    }

    #[test]
    fn test_create_respects_expired_deadline() {
        let (m, store) = manager();
        let ctx = RequestContext::background().with_deadline(std::time::Instant::now());
        let err = m.create(&ctx, &CreatePool::new("ok", "ok", "ES256")).unwrap_err();
        assert!(matches!(err, KmsError::DeadlineExceeded { .. }));
        assert!(store.is_empty());
    }

    // ── Lookup ───────────────────────────────────────────────────────

    #[test]
    fn test_get_unknown_is_not_found() {
        let (m, _) = manager();
        let id = ElasticKeyId::new();
        assert_eq!(m.get(&ctx(), id).unwrap_err(), KmsError::from(NotFoundError::Pool(id)));
    }

    #[test]
    fn test_list_filters_by_status() {
        let (m, _) = manager();
        m.create(&ctx(), &CreatePool::new("a", "a", "ES256")).unwrap();
        m.create(&ctx(), &CreatePool::new("b", "b", "ES256").import_allowed(true))
            .unwrap();
        let filter = PoolFilter {
            status: Some(ElasticKeyStatus::PendingImport),
            ..Default::default()
        };
        let pools = m.list(&ctx(), &filter).unwrap();
        assert_eq!(pools.len(), 1);
        assert_eq!(pools[0].name.as_str(), "b");
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    #[test]
    fn test_disable_enable_roundtrip() {
        let (m, _) = manager();
        let pool = m.create(&ctx(), &CreatePool::new("a", "a", "ES256")).unwrap();
        assert_eq!(m.disable(&ctx(), pool.id).unwrap().status, ElasticKeyStatus::Disabled);
        assert_eq!(m.enable(&ctx(), pool.id).unwrap().status, ElasticKeyStatus::Active);
        assert_eq!(m.get(&ctx(), pool.id).unwrap().transitions.len(), 2);
    }

    #[test]
    fn test_delete_twice_is_invalid_transition() {
        let (m, _) = manager();
        let pool = m.create(&ctx(), &CreatePool::new("a", "a", "ES256")).unwrap();
        assert_eq!(
            m.delete(&ctx(), pool.id).unwrap().status,
            ElasticKeyStatus::PendingDeleteWasActive
        );
        let err = m.delete(&ctx(), pool.id).unwrap_err();
        assert!(matches!(err, KmsError::State(StateError::InvalidTransition { .. })));
    }

    #[test]
    fn test_transition_to_active_is_idempotent() {
        let (m, _) = manager();
        let pool = m
            .create(&ctx(), &CreatePool::new("a", "a", "ES256").import_allowed(true))
            .unwrap();
        let guard = m.lock(&ctx(), pool.id).unwrap();
        let first = m
            .transition_to_active(&guard, m.get(&ctx(), pool.id).unwrap())
            .unwrap();
        let second = m
            .transition_to_active(&guard, m.get(&ctx(), pool.id).unwrap())
            .unwrap();
        assert_eq!(first.status, ElasticKeyStatus::Active);
        assert_eq!(second, first);
        assert_eq!(second.transitions.len(), 1);
    }

    #[test]
    fn test_update_validates_before_lookup() {
        let (m, _) = manager();
        let err = m
            .update(&ctx(), ElasticKeyId::new(), Some("bad "), None)
            .unwrap_err();
        assert_eq!(err, KmsError::from(ValidationError::PaddedField { field: "name" }));
    }

    #[test]
    fn test_update_rejected_when_pending_delete() {
        let (m, _) = manager();
        let pool = m.create(&ctx(), &CreatePool::new("a", "a", "ES256")).unwrap();
        m.delete(&ctx(), pool.id).unwrap();
        let err = m.update(&ctx(), pool.id, None, Some("new")).unwrap_err();
        assert!(matches!(err, KmsError::State(StateError::PoolNotActive { .. })));
    }

    #[test]
    fn test_update_persists_details() {
        let (m, _) = manager();
        let pool = m.create(&ctx(), &CreatePool::new("a", "a", "ES256")).unwrap();
        m.update(&ctx(), pool.id, Some("renamed"), None).unwrap();
        let stored = m.get(&ctx(), pool.id).unwrap();
        assert_eq!(stored.name.as_str(), "renamed");
        assert_eq!(stored.description.as_str(), "a");
    }
}
