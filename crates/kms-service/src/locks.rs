//! # Per-Pool Lock Arena
//!
//! Material key generation and import, and pool lifecycle changes, are
//! serialized per pool. [`PoolLocks`] hands out one lock per
//! [`ElasticKeyId`]; the wait for it is bounded by the request deadline and
//! by the configured `lock_wait`, whichever comes first.
//!
//! Each pool lock is a held-flag guarded by a `parking_lot` mutex and
//! condvar, so the returned [`PoolGuard`] owns its lock through an `Arc`
//! and can outlive the arena borrow.
//!
//! An entry lives only while someone holds or waits for it. The last
//! guard or waiter to let go removes it, so the arena stays sized to the
//! pools currently in contention rather than every pool ever locked.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use kms_core::{ElasticKeyId, KmsError};

use crate::context::RequestContext;

#[derive(Debug, Default)]
struct PoolLock {
    held: Mutex<bool>,
    released: Condvar,
}

type Arena = Arc<Mutex<HashMap<ElasticKeyId, Arc<PoolLock>>>>;

/// Arena of per-pool locks.
#[derive(Debug, Default)]
pub struct PoolLocks {
    arena: Arena,
}

/// Exclusive hold on one pool. Released on drop.
#[derive(Debug)]
pub struct PoolGuard {
    arena: Arena,
    lock: Arc<PoolLock>,
    pool: ElasticKeyId,
}

impl PoolGuard {
    /// The pool this guard serializes.
    pub fn pool(&self) -> ElasticKeyId {
        self.pool
    }
}

impl Drop for PoolGuard {
    fn drop(&mut self) {
        *self.lock.held.lock() = false;
        self.lock.released.notify_one();
        evict_if_idle(&self.arena, self.pool, &self.lock);
    }
}

/// Remove `pool`'s entry when the caller's handle is the only one left
/// besides the arena's own. New handles are cloned only under the arena
/// mutex, so the count cannot grow while it is held here.
fn evict_if_idle(arena: &Arena, pool: ElasticKeyId, lock: &Arc<PoolLock>) {
    let mut arena = arena.lock();
    if Arc::strong_count(lock) == 2 && !*lock.held.lock() {
        arena.remove(&pool);
    }
}

impl PoolLocks {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `pool`, waiting at most `max_wait` and never
    /// past the request deadline.
    ///
    /// # Errors
    ///
    /// `KmsError::Cancelled` / `KmsError::DeadlineExceeded` if the request
    /// is already done, or `DeadlineExceeded` if the wait runs out.
    pub fn acquire(
        &self,
        pool: ElasticKeyId,
        ctx: &RequestContext,
        max_wait: Duration,
    ) -> Result<PoolGuard, KmsError> {
        const STAGE: &str = "pool lock";
        ctx.check(STAGE)?;

        let lock = Arc::clone(self.arena.lock().entry(pool).or_default());
        let wait_until = Instant::now() + max_wait;
        let until = ctx.deadline().map_or(wait_until, |d| d.min(wait_until));

        let mut held = lock.held.lock();
        while *held {
            if lock.released.wait_until(&mut held, until).timed_out() && *held {
                drop(held);
                evict_if_idle(&self.arena, pool, &lock);
                tracing::debug!(pool = %pool, "timed out waiting for pool lock");
                return Err(KmsError::DeadlineExceeded { stage: STAGE });
            }
        }
        *held = true;
        drop(held);

        Ok(PoolGuard {
            arena: Arc::clone(&self.arena),
            lock,
            pool,
        })
    }

    /// Number of pools currently held or waited for.
    pub fn len(&self) -> usize {
        self.arena.lock().len()
    }

    /// Whether no pool is currently held or waited for.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
