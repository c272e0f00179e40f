//! # Key Selector
//!
//! Chooses the material key for an operation. New encryptions and
//! signatures use the pool's current key: the usable key with the latest
//! `generate_date`, ties broken by the greater `material_key_id`.
//! Decryption and verification resolve the key named by the message's
//! `kid`, which may be an older, retired key.

use std::sync::Arc;

use kms_core::{KmsError, MaterialKeyId, NotFoundError, StateError};
use kms_state::{ElasticKeyPool, StoredMaterialKey};

use crate::context::RequestContext;
use crate::store::MaterialKeyStore;

/// Material key selection over a [`MaterialKeyStore`].
#[derive(Clone)]
pub struct KeySelector {
    keys: Arc<dyn MaterialKeyStore>,
}

impl std::fmt::Debug for KeySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeySelector").finish_non_exhaustive()
    }
}

impl KeySelector {
    /// Create a selector over `keys`.
    pub fn new(keys: Arc<dyn MaterialKeyStore>) -> Self {
        Self { keys }
    }

    /// The pool's current key.
    ///
    /// # Errors
    ///
    /// `StateError::NoUsableKey` if every key is revoked or none exists.
    pub fn select_for_new_operation(
        &self,
        ctx: &RequestContext,
        pool: &ElasticKeyPool,
    ) -> Result<StoredMaterialKey, KmsError> {
        ctx.check("material key lookup")?;
        self.keys
            .get_latest_by_pool(pool.id)?
            .filter(|k| k.metadata.is_usable())
            .ok_or_else(|| StateError::NoUsableKey { pool: pool.id }.into())
    }

    /// The key named `kid`, revoked or not.
    ///
    /// # Errors
    ///
    /// `NotFoundError::MaterialKey` if the pool holds no such key.
    pub fn select_by_identifier(
        &self,
        ctx: &RequestContext,
        pool: &ElasticKeyPool,
        kid: MaterialKeyId,
    ) -> Result<StoredMaterialKey, KmsError> {
        ctx.check("material key lookup")?;
        self.keys.get_by_id(pool.id, kid)?.ok_or_else(|| {
            NotFoundError::MaterialKey {
                pool: pool.id,
                key: kid,
            }
            .into()
        })
    }
}
