//! # Compact JWE
//!
//! Builds and parses JWE compact serializations (RFC 7516 §7.1):
//!
//! ```text
//! BASE64URL(protected) . BASE64URL(encrypted_key) . BASE64URL(iv)
//!                      . BASE64URL(ciphertext)    . BASE64URL(tag)
//! ```
//!
//! The protected header carries `alg`, `enc`, `kid`, and when the
//! algorithm needs them `epk`, `iv`, and `tag`. An optional caller context
//! travels as `ctx`; since the ASCII of the encoded protected header is the
//! AEAD additional data, the context is integrity-protected with the rest
//! of the header.
//!
//! ## Security Invariant
//!
//! The header `alg`/`enc` pair is checked against the pool's algorithm
//! before any key is touched ([`JweMessage::check_algorithm`]). A rewritten
//! header yields [`CryptoError::AlgorithmMismatch`]; every other failure
//! yields [`CryptoError::DecryptionFailed`].

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use kms_core::{CryptoError, MaterialKeyId};

use crate::algorithm::{ContentEncryption, KeyManagement};
use crate::content::{self, Sealed};
use crate::encoding::{b64_decode, b64_encode};
use crate::jwk::Jwk;
use crate::keymgmt::{self, KeyParams};
use crate::material::KeyMaterial;

/// The JWE protected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JweHeader {
    /// Key management algorithm.
    pub alg: String,
    /// Content encryption algorithm.
    pub enc: String,
    /// Material key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Ephemeral public key (ECDH-ES).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub epk: Option<Jwk>,
    /// Key-encryption IV (AES-GCMKW).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Key-encryption tag (AES-GCMKW).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Caller-supplied context, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<String>,
}

/// Encrypt `plaintext` to a compact JWE under `material`.
pub fn encrypt(
    alg: KeyManagement,
    enc: ContentEncryption,
    kid: MaterialKeyId,
    material: &KeyMaterial,
    plaintext: &[u8],
    context: Option<&[u8]>,
) -> Result<String, CryptoError> {
    let produced = keymgmt::produce(alg, enc, material)?;
    let header = JweHeader {
        alg: alg.as_str().to_string(),
        enc: enc.as_str().to_string(),
        kid: Some(kid.to_string()),
        epk: produced.params.epk,
        iv: produced.params.iv,
        tag: produced.params.tag,
        ctx: context.map(b64_encode),
    };
    let header_json = serde_json::to_vec(&header).map_err(|_| CryptoError::EncryptionFailed)?;
    let protected = b64_encode(header_json);
    let sealed = content::seal(enc, &produced.cek, protected.as_bytes(), plaintext)?;
    Ok(format!(
        "{}.{}.{}.{}.{}",
        protected,
        b64_encode(&produced.encrypted_key),
        b64_encode(&sealed.iv),
        b64_encode(&sealed.ciphertext),
        b64_encode(&sealed.tag),
    ))
}

/// A parsed, not yet decrypted, compact JWE.
#[derive(Debug, Clone)]
pub struct JweMessage {
    header: JweHeader,
    protected: String,
    encrypted_key: Vec<u8>,
    sealed: Sealed,
}

impl JweMessage {
    /// Parse a compact JWE. Any structural problem is a
    /// [`CryptoError::DecryptionFailed`].
    pub fn parse(compact: &str) -> Result<Self, CryptoError> {
        let segments: Vec<&str> = compact.split('.').collect();
        let [protected, encrypted_key, iv, ciphertext, tag] = segments.as_slice() else {
            return Err(CryptoError::DecryptionFailed);
        };
        let decode = |s: &str| b64_decode(s).map_err(|_| CryptoError::DecryptionFailed);
        let header: JweHeader = serde_json::from_slice(&decode(*protected)?)
            .map_err(|_| CryptoError::DecryptionFailed)?;
        Ok(Self {
            header,
            protected: protected.to_string(),
            encrypted_key: decode(*encrypted_key)?,
            sealed: Sealed {
                iv: decode(*iv)?,
                ciphertext: decode(*ciphertext)?,
                tag: decode(*tag)?,
            },
        })
    }

    /// The protected header.
    pub fn header(&self) -> &JweHeader {
        &self.header
    }

    /// Require the header to name exactly `alg` and `enc`.
    pub fn check_algorithm(
        &self,
        alg: KeyManagement,
        enc: ContentEncryption,
    ) -> Result<(), CryptoError> {
        if self.header.alg != alg.as_str() || self.header.enc != enc.as_str() {
            return Err(CryptoError::AlgorithmMismatch);
        }
        Ok(())
    }

    /// The material key named by `kid`, if present and well-formed.
    pub fn key_id(&self) -> Option<MaterialKeyId> {
        self.header.kid.as_deref()?.parse().ok()
    }

    /// The decoded `ctx` header, if present.
    pub fn context(&self) -> Result<Option<Vec<u8>>, CryptoError> {
        self.header
            .ctx
            .as_deref()
            .map(|c| b64_decode(c).map_err(|_| CryptoError::DecryptionFailed))
            .transpose()
    }

    /// Recover the CEK with `material` and decrypt the content.
    pub fn decrypt(
        &self,
        alg: KeyManagement,
        enc: ContentEncryption,
        material: &KeyMaterial,
    ) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
        self.check_algorithm(alg, enc)?;
        let params = KeyParams {
            epk: self.header.epk.clone(),
            iv: self.header.iv.clone(),
            tag: self.header.tag.clone(),
        };
        let cek = keymgmt::recover(alg, enc, material, &self.encrypted_key, &params)?;
        content::open(enc, &cek, self.protected.as_bytes(), &self.sealed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::KeyShape;
    use proptest::prelude::*;

    fn a256kw_key() -> KeyMaterial {
        KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap()
    }

    fn rewrite_header(compact: &str, edit: impl FnOnce(&mut JweHeader)) -> String {
        let mut parts: Vec<String> = compact.split('.').map(str::to_string).collect();
        let mut header: JweHeader =
            serde_json::from_slice(&b64_decode(&parts[0]).unwrap()).unwrap();
        edit(&mut header);
        parts[0] = b64_encode(serde_json::to_vec(&header).unwrap());
        parts.join(".")
    }

    #[test]
    fn test_encrypt_decrypt_with_context() {
        let key = a256kw_key();
        let kid = MaterialKeyId::new();
        let compact = encrypt(
            KeyManagement::A256Kw,
            ContentEncryption::A256Gcm,
            kid,
            &key,
            b"hello",
            Some(&b"tenant-7"[..]),
        )
        .unwrap();
        assert_eq!(compact.split('.').count(), 5);

        let message = JweMessage::parse(&compact).unwrap();
        assert_eq!(message.key_id(), Some(kid));
        assert_eq!(message.context().unwrap().as_deref(), Some(&b"tenant-7"[..]));
        let plaintext = message
            .decrypt(KeyManagement::A256Kw, ContentEncryption::A256Gcm, &key)
            .unwrap();
        assert_eq!(plaintext.as_slice(), b"hello");
    }

    #[test]
    fn test_header_fields() {
        let key = a256kw_key();
        let compact = encrypt(
            KeyManagement::A256Kw,
            ContentEncryption::A256Gcm,
            MaterialKeyId::new(),
            &key,
            b"",
            None,
        )
        .unwrap();
        let header = JweMessage::parse(&compact).unwrap().header().clone();
        assert_eq!(header.alg, "A256KW");
        assert_eq!(header.enc, "A256GCM");
        assert!(header.kid.is_some());
        assert!(header.ctx.is_none());
        assert!(header.epk.is_none());
    }

    #[test]
    fn test_substituted_header_is_algorithm_mismatch() {
        let key = a256kw_key();
        let compact = encrypt(
            KeyManagement::A256Kw,
            ContentEncryption::A256Gcm,
            MaterialKeyId::new(),
            &key,
            b"secret",
            None,
        )
        .unwrap();
        let forged = rewrite_header(&compact, |h| {
            h.alg = "A128KW".into();
            h.enc = "A128GCM".into();
        });
        let message = JweMessage::parse(&forged).unwrap();
        assert_eq!(
            message
                .decrypt(KeyManagement::A256Kw, ContentEncryption::A256Gcm, &key)
                .unwrap_err(),
            CryptoError::AlgorithmMismatch
        );
    }

    #[test]
    fn test_tampered_context_fails_integrity() {
        let key = a256kw_key();
        let compact = encrypt(
            KeyManagement::A256Kw,
            ContentEncryption::A256Gcm,
            MaterialKeyId::new(),
            &key,
            b"secret",
            Some(&b"a"[..]),
        )
        .unwrap();
        let forged = rewrite_header(&compact, |h| h.ctx = Some(b64_encode(b"b")));
        let message = JweMessage::parse(&forged).unwrap();
        assert_eq!(
            message
                .decrypt(KeyManagement::A256Kw, ContentEncryption::A256Gcm, &key)
                .unwrap_err(),
            CryptoError::DecryptionFailed
        );
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in ["", "a.b.c", "a.b.c.d.e.f", "!!.a.b.c.d", "e30.a.b.c.d"] {
            assert!(JweMessage::parse(bad).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_kid_absent_or_malformed() {
        let key = a256kw_key();
        let compact = encrypt(
            KeyManagement::A256Kw,
            ContentEncryption::A256Gcm,
            MaterialKeyId::new(),
            &key,
            b"x",
            None,
        )
        .unwrap();
        let forged = rewrite_header(&compact, |h| h.kid = Some("not-a-uuid".into()));
        assert_eq!(JweMessage::parse(&forged).unwrap().key_id(), None);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_any_plaintext_and_context_roundtrip(
            plaintext in proptest::collection::vec(any::<u8>(), 0..512),
            context in proptest::option::of(proptest::collection::vec(any::<u8>(), 0..64)),
            direct in any::<bool>(),
        ) {
            let (alg, enc) = if direct {
                (KeyManagement::Dir, ContentEncryption::A128CbcHs256)
            } else {
                (KeyManagement::A256Kw, ContentEncryption::A256Gcm)
            };
            let key = a256kw_key();
            let kid = MaterialKeyId::new();
            let compact = encrypt(alg, enc, kid, &key, &plaintext, context.as_deref()).unwrap();

            let message = JweMessage::parse(&compact).unwrap();
            prop_assert_eq!(message.key_id(), Some(kid));
            prop_assert_eq!(message.context().unwrap(), context);
            let decrypted = message.decrypt(alg, enc, &key).unwrap();
            prop_assert_eq!(decrypted.as_slice(), &plaintext[..]);
        }
    }
}
