//! # Crypto Operation Engine
//!
//! Runs JWE encrypt/decrypt, JWS sign/verify, and data-key generation
//! against a pool.
//!
//! ## Security Invariant
//!
//! Every message presented for decryption or verification is checked
//! against the pool's algorithm *before* any key is touched. A header
//! naming a different `alg`/`enc` fails with `AlgorithmMismatch`, so a
//! ciphertext cannot be downgraded to a weaker algorithm by rewriting its
//! header. Failures are logged at `warn` with the pool and operation only.
//!
//! ## Dispatch
//!
//! Each operation matches the pool's [`Algorithm`] exhaustively. Asking a
//! signature pool to encrypt (or the reverse) is
//! `StateError::OperationNotSupported`.

use std::sync::Arc;

use zeroize::Zeroizing;

use kms_core::{CryptoError, ElasticKeyId, KmsError, MaterialKeyId, StateError};
use kms_crypto::{
    jwe, jws, Algorithm, ContentEncryption, DataKeyAlgorithm, Jwk, JweMessage, JwsMessage,
    KeyManagement, KeyMaterial, SignatureAlgorithm,
};
use kms_state::{ElasticKeyPool, PoolOperation, StoredMaterialKey};

use crate::context::RequestContext;
use crate::pools::PoolManager;
use crate::selector::KeySelector;

// ─── Results ─────────────────────────────────────────────────────────

/// A decrypted JWE.
pub struct Decrypted {
    /// The plaintext. Wiped on drop.
    pub plaintext: Zeroizing<Vec<u8>>,
    /// The `ctx` bound into the protected header, if any.
    pub context: Option<Vec<u8>>,
    /// The material key that decrypted it.
    pub material_key_id: MaterialKeyId,
}

impl std::fmt::Debug for Decrypted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decrypted")
            .field("plaintext", &"[REDACTED]")
            .field("context", &self.context)
            .field("material_key_id", &self.material_key_id)
            .finish()
    }
}

/// A verified JWS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    /// The signed payload.
    pub payload: Vec<u8>,
    /// The `ctx` bound into the protected header, if any.
    pub context: Option<Vec<u8>>,
    /// The material key that verified it.
    pub material_key_id: MaterialKeyId,
}

/// A freshly generated data key.
#[derive(Debug)]
pub struct DataKey {
    /// What was generated.
    pub algorithm: DataKeyAlgorithm,
    /// The private JWK encrypted under the pool's current key.
    pub encrypted: String,
    /// The private JWK in the clear. `None` unless the pool allows export.
    pub private_jwk: Option<Jwk>,
    /// The public JWK, for asymmetric data keys.
    pub public_jwk: Option<Jwk>,
    /// The pool key that encrypted it.
    pub material_key_id: MaterialKeyId,
}

// ─── Engine ──────────────────────────────────────────────────────────

/// Cryptographic operations over pools.
#[derive(Debug)]
pub struct CryptoEngine {
    pools: Arc<PoolManager>,
    selector: KeySelector,
}

impl CryptoEngine {
    /// Create an engine using `pools` for lookups and `selector` for keys.
    pub fn new(pools: Arc<PoolManager>, selector: KeySelector) -> Self {
        Self { pools, selector }
    }

    /// Encrypt `plaintext` under the pool's current key.
    ///
    /// `context`, when given, is carried in the protected header and is
    /// therefore covered by the AEAD tag.
    pub fn encrypt(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        plaintext: &[u8],
        context: Option<&[u8]>,
    ) -> Result<String, KmsError> {
        let pool = self.pools.get(ctx, id)?;
        let (alg, enc) = encryption_algorithm(&pool, PoolOperation::Encrypt)?;
        pool.require_permits(PoolOperation::Encrypt)?;
        let key = self.selector.select_for_new_operation(ctx, &pool)?;
        logged(
            id,
            PoolOperation::Encrypt,
            jwe::encrypt(alg, enc, key.id(), &key.material, plaintext, context),
        )
    }

    /// Decrypt a compact JWE produced under this pool.
    ///
    /// # Errors
    ///
    /// - `CryptoError::AlgorithmMismatch` if the header names another
    ///   algorithm.
    /// - `NotFoundError::MaterialKey` if `kid` names no key of this pool.
    /// - `StateError::KeyRevoked` if `kid` names a revoked key.
    /// - `CryptoError::DecryptionFailed` for every format or integrity
    ///   failure.
    pub fn decrypt(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        compact: &str,
    ) -> Result<Decrypted, KmsError> {
        const OP: PoolOperation = PoolOperation::Decrypt;
        let pool = self.pools.get(ctx, id)?;
        let (alg, enc) = encryption_algorithm(&pool, OP)?;
        pool.require_permits(OP)?;

        let message = logged(id, OP, JweMessage::parse(compact))?;
        logged(id, OP, message.check_algorithm(alg, enc))?;
        let kid = logged(id, OP, message.key_id().ok_or(CryptoError::DecryptionFailed))?;
        let key = self.resolve_key(ctx, &pool, kid)?;

        let plaintext = logged(id, OP, message.decrypt(alg, enc, &key.material))?;
        let context = logged(id, OP, message.context())?;
        Ok(Decrypted {
            plaintext,
            context,
            material_key_id: kid,
        })
    }

    /// Sign `payload` with the pool's current key.
    pub fn sign(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        payload: &[u8],
        context: Option<&[u8]>,
    ) -> Result<String, KmsError> {
        let pool = self.pools.get(ctx, id)?;
        let alg = signature_algorithm(&pool, PoolOperation::Sign)?;
        pool.require_permits(PoolOperation::Sign)?;
        let key = self.selector.select_for_new_operation(ctx, &pool)?;
        logged(
            id,
            PoolOperation::Sign,
            jws::sign(alg, key.id(), &key.material, payload, context),
        )
    }

    /// Verify a compact JWS produced under this pool and return its payload.
    ///
    /// # Errors
    ///
    /// As for [`Self::decrypt`], with `CryptoError::VerificationFailed` in
    /// place of `DecryptionFailed`.
    pub fn verify(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        compact: &str,
    ) -> Result<Verified, KmsError> {
        const OP: PoolOperation = PoolOperation::Verify;
        let pool = self.pools.get(ctx, id)?;
        let alg = signature_algorithm(&pool, OP)?;
        pool.require_permits(OP)?;

        let message = logged(id, OP, JwsMessage::parse(compact))?;
        logged(id, OP, message.check_algorithm(alg))?;
        let kid = logged(id, OP, message.key_id().ok_or(CryptoError::VerificationFailed))?;
        let key = self.resolve_key(ctx, &pool, kid)?;

        let payload = logged(id, OP, message.verify(alg, &key.material))?;
        let context = logged(id, OP, message.context())?;
        Ok(Verified {
            payload,
            context,
            material_key_id: kid,
        })
    }

    /// Generate a data key of `algorithm` and return it encrypted under
    /// the pool's current key. The clear private JWK is included only when
    /// the pool allows export.
    ///
    /// # Errors
    ///
    /// - `StateError::OperationNotSupported` for signature pools.
    /// - `ValidationError::InvalidGenerateAlgorithm` for an unknown
    ///   `algorithm`.
    pub fn generate_data_key(
        &self,
        ctx: &RequestContext,
        id: ElasticKeyId,
        algorithm: &str,
        context: Option<&[u8]>,
    ) -> Result<DataKey, KmsError> {
        const OP: PoolOperation = PoolOperation::GenerateDataKey;
        let pool = self.pools.get(ctx, id)?;
        let (alg, enc) = encryption_algorithm(&pool, OP)?;
        pool.require_permits(OP)?;
        let data_algorithm: DataKeyAlgorithm = algorithm.parse()?;
        let key = self.selector.select_for_new_operation(ctx, &pool)?;

        let material = logged(id, OP, KeyMaterial::generate(data_algorithm.key_shape()))?;
        let private_jwk = material.to_private_jwk();
        let document = logged(
            id,
            OP,
            private_jwk.to_json().map_err(|_| CryptoError::EncryptionFailed),
        )?;
        let encrypted = logged(
            id,
            OP,
            jwe::encrypt(alg, enc, key.id(), &key.material, document.as_bytes(), context),
        )?;
        tracing::info!(
            pool = %id,
            key = %key.id(),
            algorithm = data_algorithm.as_str(),
            exported = pool.export_allowed,
            "data key generated"
        );
        Ok(DataKey {
            algorithm: data_algorithm,
            encrypted,
            public_jwk: material.public_jwk(),
            private_jwk: pool.export_allowed.then_some(private_jwk),
            material_key_id: key.id(),
        })
    }

    fn resolve_key(
        &self,
        ctx: &RequestContext,
        pool: &ElasticKeyPool,
        kid: MaterialKeyId,
    ) -> Result<StoredMaterialKey, KmsError> {
        let key = self.selector.select_by_identifier(ctx, pool, kid)?;
        if key.metadata.is_revoked() {
            tracing::warn!(pool = %pool.id, key = %kid, "revoked material key presented");
            return Err(StateError::KeyRevoked { key: kid }.into());
        }
        Ok(key)
    }
}

fn not_supported(pool: &ElasticKeyPool, operation: PoolOperation) -> StateError {
    StateError::OperationNotSupported {
        algorithm: pool.algorithm.identifier().to_string(),
        operation: operation.as_str(),
    }
}

fn encryption_algorithm(
    pool: &ElasticKeyPool,
    operation: PoolOperation,
) -> Result<(KeyManagement, ContentEncryption), StateError> {
    match pool.algorithm.algorithm() {
        Algorithm::Encryption { enc, alg } => Ok((alg, enc)),
        Algorithm::Signature(_) => Err(not_supported(pool, operation)),
    }
}

fn signature_algorithm(
    pool: &ElasticKeyPool,
    operation: PoolOperation,
) -> Result<SignatureAlgorithm, StateError> {
    match pool.algorithm.algorithm() {
        Algorithm::Signature(alg) => Ok(alg),
        Algorithm::Encryption { .. } => Err(not_supported(pool, operation)),
    }
}

fn logged<T>(
    pool: ElasticKeyId,
    operation: PoolOperation,
    result: Result<T, CryptoError>,
) -> Result<T, KmsError> {
    result.map_err(|e| {
        tracing::warn!(
            pool = %pool,
            operation = operation.as_str(),
            error = %e,
            "crypto operation failed"
        );
        e.into()
    })
}
