//! # Concurrent Generation and Import
//!
//! A pool that does not allow versioning must never hold more than one
//! material key, whether the competing callers share one service (and so
//! one lock arena) or reach the same stores through separate services.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use kms_core::{ConcurrencyError, ElasticKeyId, KmsError, MaterialKeyId, StateError, Timestamp};
use kms_crypto::{KeyMaterial, KeyShape};
use kms_service::{
    CreatePool, InMemoryMaterialKeyStore, InMemoryPoolStore, KeyPoolService, MaterialKeyStore,
    PoolStore, RequestContext, ServiceConfig, StoreError, WriteCondition,
};
use kms_state::{KeyOrigin, MaterialKey, StoredMaterialKey};

const CALLERS: usize = 8;

fn ctx() -> RequestContext {
    RequestContext::background()
}

fn is_rejected_race(err: &KmsError) -> bool {
    matches!(
        err,
        KmsError::State(StateError::VersioningViolation { .. })
            | KmsError::Concurrency(ConcurrencyError::GenerationRace { .. })
    )
}

fn race(services: &[KeyPoolService], pool: ElasticKeyId) -> Vec<Result<MaterialKey, KmsError>> {
    let barrier = Barrier::new(CALLERS);
    std::thread::scope(|s| {
        let handles: Vec<_> = (0..CALLERS)
            .map(|i| {
                let service = &services[i % services.len()];
                let barrier = &barrier;
                s.spawn(move || {
                    barrier.wait();
                    service.generate_material_key(&ctx(), pool)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn concurrent_generation_in_one_service_yields_one_key() {
    let service = KeyPoolService::in_memory(ServiceConfig::default()).unwrap();
    let pool = service
        .create_pool(&ctx(), &CreatePool::new("race", "d", "A256GCM/A256KW"))
        .unwrap();

    let results = race(std::slice::from_ref(&service), pool.id);
    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(
            *err,
            KmsError::from(StateError::VersioningViolation { pool: pool.id })
        );
    }
    assert_eq!(service.list_material_keys(&ctx(), pool.id).unwrap().len(), 1);
}

#[test]
fn concurrent_generation_across_services_yields_one_key() {
    let pools: Arc<dyn PoolStore> = Arc::new(InMemoryPoolStore::new());
    let keys: Arc<dyn MaterialKeyStore> = Arc::new(InMemoryMaterialKeyStore::new());
    let services: Vec<_> = (0..2)
        .map(|_| {
            KeyPoolService::new(Arc::clone(&pools), Arc::clone(&keys), ServiceConfig::default())
                .unwrap()
        })
        .collect();
    let pool = services[0]
        .create_pool(&ctx(), &CreatePool::new("race", "d", "HS512"))
        .unwrap();

    let results = race(&services, pool.id);
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(is_rejected_race));
    assert_eq!(keys.list_by_pool(pool.id).unwrap().len(), 1);
}

#[test]
fn concurrent_generation_in_versioned_pool_all_succeed() {
    let service = KeyPoolService::in_memory(ServiceConfig::default()).unwrap();
    let pool = service
        .create_pool(
            &ctx(),
            &CreatePool::new("race", "d", "A128GCM/dir").versioning_allowed(true),
        )
        .unwrap();
    let results = race(std::slice::from_ref(&service), pool.id);
    assert!(results.iter().all(|r| r.is_ok()));
    let listed = service.list_material_keys(&ctx(), pool.id).unwrap();
    assert_eq!(listed.len(), CALLERS);
    assert_eq!(
        service.current_material_key(&ctx(), pool.id).unwrap(),
        *listed.last().unwrap()
    );
}

/// Key store that lets another writer slip a key in right before the
/// first conditional write, as a second process sharing the store would.
struct InterleavingKeyStore {
    inner: InMemoryMaterialKeyStore,
    interleaved: AtomicBool,
}

impl MaterialKeyStore for InterleavingKeyStore {
    fn create(
        &self,
        record: StoredMaterialKey,
        condition: WriteCondition,
    ) -> Result<(), StoreError> {
        if !self.interleaved.swap(true, Ordering::SeqCst) {
            let material = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
            let other = StoredMaterialKey::new(
                record.metadata.elastic_key_id,
                KeyOrigin::Generated,
                material,
            );
            self.inner.create(other, WriteCondition::Unconditional)?;
        }
        self.inner.create(record, condition)
    }

    fn list_by_pool(&self, pool: ElasticKeyId) -> Result<Vec<StoredMaterialKey>, StoreError> {
        self.inner.list_by_pool(pool)
    }

    fn get_by_id(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
    ) -> Result<Option<StoredMaterialKey>, StoreError> {
        self.inner.get_by_id(pool, key)
    }

    fn get_latest_by_pool(
        &self,
        pool: ElasticKeyId,
    ) -> Result<Option<StoredMaterialKey>, StoreError> {
        self.inner.get_latest_by_pool(pool)
    }

    fn update_revocation(
        &self,
        pool: ElasticKeyId,
        key: MaterialKeyId,
        revoked_at: Timestamp,
    ) -> Result<StoredMaterialKey, StoreError> {
        self.inner.update_revocation(pool, key, revoked_at)
    }
}

#[test]
fn conditional_write_conflict_is_generation_race() {
    let keys = Arc::new(InterleavingKeyStore {
        inner: InMemoryMaterialKeyStore::new(),
        interleaved: AtomicBool::new(false),
    });
    let service = KeyPoolService::new(
        Arc::new(InMemoryPoolStore::new()),
        keys.clone(),
        ServiceConfig::default(),
    )
    .unwrap();
    let pool = service
        .create_pool(&ctx(), &CreatePool::new("race", "d", "A256GCM/A256KW"))
        .unwrap();

    assert_eq!(
        service.generate_material_key(&ctx(), pool.id).unwrap_err(),
        KmsError::from(ConcurrencyError::GenerationRace { pool: pool.id })
    );
    assert_eq!(keys.list_by_pool(pool.id).unwrap().len(), 1);
}

#[test]
fn expired_deadline_fails_before_generation() {
    let service = KeyPoolService::in_memory(ServiceConfig {
        lock_wait: Duration::from_secs(30),
        ..ServiceConfig::default()
    })
    .unwrap();
    let pool = service
        .create_pool(&ctx(), &CreatePool::new("slow", "d", "RS256").versioning_allowed(true))
        .unwrap();

    let expired = RequestContext::background().with_deadline(std::time::Instant::now());
    assert!(matches!(
        service.generate_material_key(&expired, pool.id),
        Err(KmsError::DeadlineExceeded { .. })
    ));
    assert!(service.list_material_keys(&ctx(), pool.id).unwrap().is_empty());
}
