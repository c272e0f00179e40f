//! # Material Key Records
//!
//! A material key is one concrete key inside a pool. Callers see the
//! metadata view [`MaterialKey`], which never carries secret material; the
//! store holds [`StoredMaterialKey`], which adds the [`KeyMaterial`] behind
//! an `Arc` so snapshots can be handed to readers without copying secrets.
//!
//! ## Recency
//!
//! The current key of a pool is the usable key with the latest
//! `generate_date`. Timestamps are millisecond-resolution, so ties are
//! broken by the greater `material_key_id`; identifiers are UUIDv7, so the
//! tie-break agrees with creation order for keys minted in one process.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use kms_core::{ElasticKeyId, MaterialKeyId, Timestamp};
use kms_crypto::{Jwk, KeyMaterial};

/// How a material key came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyOrigin {
    /// Generated in-process.
    Generated,
    /// Supplied by the caller.
    Imported,
}

impl std::fmt::Display for KeyOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generated => f.write_str("GENERATED"),
            Self::Imported => f.write_str("IMPORTED"),
        }
    }
}

/// Metadata view of a material key. Safe to serialize and log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialKey {
    /// The owning pool.
    pub elastic_key_id: ElasticKeyId,
    /// This key's identifier.
    pub material_key_id: MaterialKeyId,
    /// When the material became available. `None` while awaiting import.
    pub generate_date: Option<Timestamp>,
    /// Generated or imported.
    pub origin: KeyOrigin,
    /// When the key was revoked, if it was.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revocation_date: Option<Timestamp>,
    /// Public JWK for asymmetric keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_jwk: Option<Jwk>,
}

impl MaterialKey {
    /// Whether the key has been revoked.
    pub fn is_revoked(&self) -> bool {
        self.revocation_date.is_some()
    }

    /// Whether the key may be selected for new operations.
    pub fn is_usable(&self) -> bool {
        self.generate_date.is_some() && !self.is_revoked()
    }
}

/// Order two keys by recency: `generate_date`, then `material_key_id`.
/// Keys without a `generate_date` sort oldest.
pub fn compare_recency(a: &MaterialKey, b: &MaterialKey) -> Ordering {
    a.generate_date
        .cmp(&b.generate_date)
        .then_with(|| a.material_key_id.cmp(&b.material_key_id))
}

/// The most recent usable key, if any.
pub fn latest_usable<'a, I>(keys: I) -> Option<&'a MaterialKey>
where
    I: IntoIterator<Item = &'a MaterialKey>,
{
    keys.into_iter()
        .filter(|k| k.is_usable())
        .max_by(|a, b| compare_recency(a, b))
}

/// A material key as held by the store: metadata plus the secret.
#[derive(Debug, Clone)]
pub struct StoredMaterialKey {
    /// Metadata view.
    pub metadata: MaterialKey,
    /// The secret key material.
    pub material: Arc<KeyMaterial>,
}

impl StoredMaterialKey {
    /// Build a record for freshly generated or imported material, stamped
    /// with the current time.
    pub fn new(elastic_key_id: ElasticKeyId, origin: KeyOrigin, material: KeyMaterial) -> Self {
        let public_jwk = material.public_jwk();
        Self {
            metadata: MaterialKey {
                elastic_key_id,
                material_key_id: MaterialKeyId::new(),
                generate_date: Some(Timestamp::now()),
                origin,
                revocation_date: None,
                public_jwk,
            },
            material: Arc::new(material),
        }
    }

    /// This key's identifier.
    pub fn id(&self) -> MaterialKeyId {
        self.metadata.material_key_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use kms_crypto::KeyShape;
    use proptest::prelude::*;

    fn key_at(millis: i64, id: u128) -> MaterialKey {
        MaterialKey {
            elastic_key_id: ElasticKeyId(uuid::Uuid::nil()),
            material_key_id: MaterialKeyId(uuid::Uuid::from_u128(id)),
            generate_date: Some(Timestamp::from_utc(
                Utc.timestamp_millis_opt(millis).unwrap(),
            )),
            origin: KeyOrigin::Generated,
            revocation_date: None,
            public_jwk: None,
        }
    }

    #[test]
    fn test_latest_by_generate_date() {
        let keys = [key_at(1_000, 9), key_at(3_000, 1), key_at(2_000, 5)];
        assert_eq!(latest_usable(&keys).unwrap().material_key_id, keys[1].material_key_id);
    }

    #[test]
    fn test_tie_broken_by_greater_id() {
        let keys = [key_at(1_000, 1), key_at(1_000, 7), key_at(1_000, 3)];
        assert_eq!(latest_usable(&keys).unwrap().material_key_id, keys[1].material_key_id);
    }

    #[test]
    fn test_revoked_and_pending_keys_skipped() {
        let mut revoked = key_at(5_000, 1);
        revoked.revocation_date = Some(Timestamp::now());
        let mut pending = key_at(6_000, 2);
        pending.generate_date = None;
        let keys = [key_at(1_000, 3), revoked, pending];
        assert_eq!(latest_usable(&keys).unwrap().material_key_id, keys[0].material_key_id);
    }

    #[test]
    fn test_no_usable_key() {
        let mut revoked = key_at(1_000, 1);
        revoked.revocation_date = Some(Timestamp::now());
        assert!(latest_usable(&[revoked]).is_none());
        assert!(latest_usable(&Vec::<MaterialKey>::new()).is_none());
    }

    #[test]
    fn test_stored_key_carries_public_jwk_for_asymmetric() {
        let material = KeyMaterial::generate(KeyShape::Ed25519).unwrap();
        let stored = StoredMaterialKey::new(ElasticKeyId::new(), KeyOrigin::Generated, material);
        let public = stored.metadata.public_jwk.as_ref().unwrap();
        assert!(!public.is_private());
        assert!(stored.metadata.is_usable());
    }

    #[test]
    fn test_metadata_serialization_has_no_secret() {
        let material = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
        let secret = material.to_private_jwk().k.clone().unwrap();
        let stored = StoredMaterialKey::new(ElasticKeyId::new(), KeyOrigin::Imported, material);
        assert!(stored.metadata.public_jwk.is_none());
        let json = serde_json::to_string(&stored.metadata).unwrap();
        assert!(!json.contains(&secret));
        assert!(!format!("{stored:?}").contains(&secret));
    }

    proptest! {
        #[test]
        fn prop_latest_is_never_older_than_any_key(
            entries in proptest::collection::vec((0i64..4, 0u128..4), 1..16)
        ) {
            let keys: Vec<MaterialKey> = entries.iter().map(|(m, i)| key_at(*m, *i)).collect();
            let latest = latest_usable(&keys).unwrap();
            for k in &keys {
                prop_assert_ne!(compare_recency(latest, k), Ordering::Less);
            }
        }
    }
}
