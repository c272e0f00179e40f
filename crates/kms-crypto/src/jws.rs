//! # Compact JWS
//!
//! Builds and verifies JWS compact serializations (RFC 7515 §7.1):
//! `BASE64URL(protected) . BASE64URL(payload) . BASE64URL(signature)`.
//!
//! The protected header carries `alg`, `kid`, and an optional `ctx`.
//! Signatures use the JOSE encodings: raw `r || s` for ECDSA, the 64-byte
//! Ed25519 signature, PKCS#1 v1.5 / PSS octets for RSA, and the full HMAC
//! output for `HSxxx`.
//!
//! ## Security Invariant
//!
//! Verification checks the header `alg` against the pool's algorithm first.
//! Any other failure, malformed input included, is
//! [`CryptoError::VerificationFailed`]. HMAC comparison is constant-time.

use hmac::Hmac;
use rand::rngs::OsRng;
use rsa::RsaPrivateKey;
use serde::{Deserialize, Serialize};
use sha2::{Sha256, Sha384, Sha512};
use signature::{RandomizedSigner, SignatureEncoding, Signer, Verifier};
use subtle::ConstantTimeEq;

use kms_core::{CryptoError, MaterialKeyId};

use crate::algorithm::{EcCurve, KeyShape, SignatureAlgorithm};
use crate::content::mac;
use crate::encoding::{b64_decode, b64_encode};
use crate::material::{EcPrivateKey, KeyMaterial};

/// The JWS protected header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    /// Signature algorithm.
    pub alg: String,
    /// Material key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Caller-supplied context, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctx: Option<String>,
}

/// Sign `payload` to a compact JWS with `material`.
pub fn sign(
    alg: SignatureAlgorithm,
    kid: MaterialKeyId,
    material: &KeyMaterial,
    payload: &[u8],
    context: Option<&[u8]>,
) -> Result<String, CryptoError> {
    let header = JwsHeader {
        alg: alg.as_str().to_string(),
        kid: Some(kid.to_string()),
        ctx: context.map(b64_encode),
    };
    let header_json = serde_json::to_vec(&header).map_err(|_| CryptoError::SigningFailed)?;
    let signing_input = format!("{}.{}", b64_encode(header_json), b64_encode(payload));
    let signature = sign_bytes(alg, material, signing_input.as_bytes())?;
    Ok(format!("{signing_input}.{}", b64_encode(signature)))
}

/// A parsed, not yet verified, compact JWS.
#[derive(Debug, Clone)]
pub struct JwsMessage {
    header: JwsHeader,
    signing_input: String,
    payload: Vec<u8>,
    signature: Vec<u8>,
}

impl JwsMessage {
    /// Parse a compact JWS. Any structural problem is a
    /// [`CryptoError::VerificationFailed`].
    pub fn parse(compact: &str) -> Result<Self, CryptoError> {
        let segments: Vec<&str> = compact.split('.').collect();
        let [protected, payload, signature] = segments.as_slice() else {
            return Err(CryptoError::VerificationFailed);
        };
        let decode = |s: &str| b64_decode(s).map_err(|_| CryptoError::VerificationFailed);
        let header: JwsHeader = serde_json::from_slice(&decode(*protected)?)
            .map_err(|_| CryptoError::VerificationFailed)?;
        Ok(Self {
            header,
            signing_input: format!("{protected}.{payload}"),
            payload: decode(*payload)?,
            signature: decode(*signature)?,
        })
    }

    /// The protected header.
    pub fn header(&self) -> &JwsHeader {
        &self.header
    }

    /// Require the header to name exactly `alg`.
    pub fn check_algorithm(&self, alg: SignatureAlgorithm) -> Result<(), CryptoError> {
        if self.header.alg != alg.as_str() {
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
            .map(|c| b64_decode(c).map_err(|_| CryptoError::VerificationFailed))
            .transpose()
    }

    /// Verify the signature with `material` and return the payload.
    pub fn verify(
        &self,
        alg: SignatureAlgorithm,
        material: &KeyMaterial,
    ) -> Result<Vec<u8>, CryptoError> {
        self.check_algorithm(alg)?;
        if verify_bytes(alg, material, self.signing_input.as_bytes(), &self.signature) {
            Ok(self.payload.clone())
        } else {
            Err(CryptoError::VerificationFailed)
        }
    }
}

// ─── Primitives ──────────────────────────────────────────────────────

fn sign_bytes(
    alg: SignatureAlgorithm,
    material: &KeyMaterial,
    input: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    match alg {
        SignatureAlgorithm::Rs256 => rsa_pkcs1_sign::<Sha256>(material, input),
        SignatureAlgorithm::Rs384 => rsa_pkcs1_sign::<Sha384>(material, input),
        SignatureAlgorithm::Rs512 => rsa_pkcs1_sign::<Sha512>(material, input),
        SignatureAlgorithm::Ps256 => rsa_pss_sign::<Sha256>(material, input),
        SignatureAlgorithm::Ps384 => rsa_pss_sign::<Sha384>(material, input),
        SignatureAlgorithm::Ps512 => rsa_pss_sign::<Sha512>(material, input),
        SignatureAlgorithm::Es256
        | SignatureAlgorithm::Es384
        | SignatureAlgorithm::Es512 => {
            let key = material.ec().ok_or(CryptoError::SigningFailed)?;
            if Some(key.curve()) != ecdsa_curve(alg) {
                return Err(CryptoError::SigningFailed);
            }
            ecdsa_sign(key, input)
        }
        SignatureAlgorithm::Hs256 => hmac_tag::<Hmac<Sha256>>(material, input),
        SignatureAlgorithm::Hs384 => hmac_tag::<Hmac<Sha384>>(material, input),
        SignatureAlgorithm::Hs512 => hmac_tag::<Hmac<Sha512>>(material, input),
        SignatureAlgorithm::EdDsa => {
            let key = material.ed25519().ok_or(CryptoError::SigningFailed)?;
            key.try_sign(input)
                .map(|sig| sig.to_bytes().to_vec())
                .map_err(|_| CryptoError::SigningFailed)
        }
    }
}

fn verify_bytes(
    alg: SignatureAlgorithm,
    material: &KeyMaterial,
    input: &[u8],
    signature: &[u8],
) -> bool {
    match alg {
        SignatureAlgorithm::Rs256 => rsa_pkcs1_verify::<Sha256>(material, input, signature),
        SignatureAlgorithm::Rs384 => rsa_pkcs1_verify::<Sha384>(material, input, signature),
        SignatureAlgorithm::Rs512 => rsa_pkcs1_verify::<Sha512>(material, input, signature),
        SignatureAlgorithm::Ps256 => rsa_pss_verify::<Sha256>(material, input, signature),
        SignatureAlgorithm::Ps384 => rsa_pss_verify::<Sha384>(material, input, signature),
        SignatureAlgorithm::Ps512 => rsa_pss_verify::<Sha512>(material, input, signature),
        SignatureAlgorithm::Es256
        | SignatureAlgorithm::Es384
        | SignatureAlgorithm::Es512 => material
            .ec()
            .filter(|key| Some(key.curve()) == ecdsa_curve(alg))
            .is_some_and(|key| ecdsa_verify(key, input, signature)),
        SignatureAlgorithm::Hs256 => hmac_matches::<Hmac<Sha256>>(material, input, signature),
        SignatureAlgorithm::Hs384 => hmac_matches::<Hmac<Sha384>>(material, input, signature),
        SignatureAlgorithm::Hs512 => hmac_matches::<Hmac<Sha512>>(material, input, signature),
        SignatureAlgorithm::EdDsa => {
            let Some(key) = material.ed25519() else {
                return false;
            };
            ed25519_dalek::Signature::from_slice(signature)
                .is_ok_and(|sig| key.verifying_key().verify_strict(input, &sig).is_ok())
        }
    }
}

fn ecdsa_curve(alg: SignatureAlgorithm) -> Option<EcCurve> {
    match alg.key_shape() {
        KeyShape::Ec(curve) => Some(curve),
        KeyShape::Octet { .. } | KeyShape::Rsa { .. } | KeyShape::Ed25519 => None,
    }
}

fn rsa_key(material: &KeyMaterial) -> Option<RsaPrivateKey> {
    material.rsa().cloned()
}

fn rsa_pkcs1_sign<D>(material: &KeyMaterial, input: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    D: sha2::Digest + rsa::pkcs8::AssociatedOid,
{
    let key = rsa_key(material).ok_or(CryptoError::SigningFailed)?;
    rsa::pkcs1v15::SigningKey::<D>::new(key)
        .try_sign(input)
        .map(|sig| sig.to_vec())
        .map_err(|_| CryptoError::SigningFailed)
}

fn rsa_pkcs1_verify<D>(material: &KeyMaterial, input: &[u8], signature: &[u8]) -> bool
where
    D: sha2::Digest + rsa::pkcs8::AssociatedOid,
{
    let Some(key) = material.rsa() else {
        return false;
    };
    let Ok(sig) = rsa::pkcs1v15::Signature::try_from(signature) else {
        return false;
    };
    rsa::pkcs1v15::VerifyingKey::<D>::new(key.to_public_key())
        .verify(input, &sig)
        .is_ok()
}

fn rsa_pss_sign<D>(material: &KeyMaterial, input: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    D: sha2::Digest + sha2::digest::FixedOutputReset,
{
    let key = rsa_key(material).ok_or(CryptoError::SigningFailed)?;
    rsa::pss::BlindedSigningKey::<D>::new(key)
        .try_sign_with_rng(&mut OsRng, input)
        .map(|sig| sig.to_vec())
        .map_err(|_| CryptoError::SigningFailed)
}

fn rsa_pss_verify<D>(material: &KeyMaterial, input: &[u8], signature: &[u8]) -> bool
where
    D: sha2::Digest + sha2::digest::FixedOutputReset,
{
    let Some(key) = material.rsa() else {
        return false;
    };
    let Ok(sig) = rsa::pss::Signature::try_from(signature) else {
        return false;
    };
    rsa::pss::VerifyingKey::<D>::new(key.to_public_key())
        .verify(input, &sig)
        .is_ok()
}

fn ecdsa_sign(key: &EcPrivateKey, input: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let scalar = key.scalar();
    let signature = match key {
        EcPrivateKey::P256(_) => p256::ecdsa::SigningKey::from_slice(&scalar)
            .and_then(|sk| Signer::<p256::ecdsa::Signature>::try_sign(&sk, input))
            .map(|sig| sig.to_bytes().to_vec()),
        EcPrivateKey::P384(_) => p384::ecdsa::SigningKey::from_slice(&scalar)
            .and_then(|sk| Signer::<p384::ecdsa::Signature>::try_sign(&sk, input))
            .map(|sig| sig.to_bytes().to_vec()),
        EcPrivateKey::P521(_) => p521::ecdsa::SigningKey::from_slice(&scalar)
            .and_then(|sk| Signer::<p521::ecdsa::Signature>::try_sign(&sk, input))
            .map(|sig| sig.to_bytes().to_vec()),
    };
    signature.map_err(|_| CryptoError::SigningFailed)
}

fn ecdsa_verify(key: &EcPrivateKey, input: &[u8], signature: &[u8]) -> bool {
    let scalar = key.scalar();
    match key {
        EcPrivateKey::P256(_) => {
            let (Ok(sk), Ok(sig)) = (
                p256::ecdsa::SigningKey::from_slice(&scalar),
                p256::ecdsa::Signature::from_slice(signature),
            ) else {
                return false;
            };
            sk.verifying_key().verify(input, &sig).is_ok()
        }
        EcPrivateKey::P384(_) => {
            let (Ok(sk), Ok(sig)) = (
                p384::ecdsa::SigningKey::from_slice(&scalar),
                p384::ecdsa::Signature::from_slice(signature),
            ) else {
                return false;
            };
            sk.verifying_key().verify(input, &sig).is_ok()
        }
        EcPrivateKey::P521(_) => {
            let (Ok(sk), Ok(sig)) = (
                p521::ecdsa::SigningKey::from_slice(&scalar),
                p521::ecdsa::Signature::from_slice(signature),
            ) else {
                return false;
            };
            p521::ecdsa::VerifyingKey::from(&sk).verify(input, &sig).is_ok()
        }
    }
}

fn hmac_tag<M>(material: &KeyMaterial, input: &[u8]) -> Result<Vec<u8>, CryptoError>
where
    M: hmac::Mac + hmac::digest::KeyInit,
{
    let key = material.octets().ok_or(CryptoError::SigningFailed)?;
    mac::<M>(key, &[input]).map_err(|_| CryptoError::SigningFailed)
}

fn hmac_matches<M>(material: &KeyMaterial, input: &[u8], signature: &[u8]) -> bool
where
    M: hmac::Mac + hmac::digest::KeyInit,
{
    let Some(key) = material.octets() else {
        return false;
    };
    mac::<M>(key, &[input]).is_ok_and(|expected| bool::from(expected.ct_eq(signature)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign_verify(alg: SignatureAlgorithm, material: &KeyMaterial) {
        let kid = MaterialKeyId::new();
        let compact = sign(alg, kid, material, b"payload", Some(&b"ctx"[..])).unwrap();
        let message = JwsMessage::parse(&compact).unwrap();
        assert_eq!(message.key_id(), Some(kid));
        assert_eq!(message.context().unwrap().as_deref(), Some(&b"ctx"[..]));
        assert_eq!(message.verify(alg, material).unwrap(), b"payload");
    }

    #[test]
    fn test_hmac_roundtrip() {
        for (alg, len) in [
            (SignatureAlgorithm::Hs256, 32),
            (SignatureAlgorithm::Hs384, 48),
            (SignatureAlgorithm::Hs512, 64),
        ] {
            sign_verify(alg, &KeyMaterial::generate(KeyShape::Octet { len }).unwrap());
        }
    }

    #[test]
    fn test_ecdsa_roundtrip_and_signature_length() {
        for (alg, curve, sig_len) in [
            (SignatureAlgorithm::Es256, EcCurve::P256, 64),
            (SignatureAlgorithm::Es384, EcCurve::P384, 96),
            (SignatureAlgorithm::Es512, EcCurve::P521, 132),
        ] {
            let material = KeyMaterial::generate(KeyShape::Ec(curve)).unwrap();
            sign_verify(alg, &material);
            let compact = sign(alg, MaterialKeyId::new(), &material, b"x", None).unwrap();
            let sig = compact.rsplit('.').next().unwrap();
            assert_eq!(b64_decode(sig).unwrap().len(), sig_len);
        }
    }

    #[test]
    fn test_eddsa_roundtrip() {
        sign_verify(
            SignatureAlgorithm::EdDsa,
            &KeyMaterial::generate(KeyShape::Ed25519).unwrap(),
        );
    }

    #[test]
    fn test_rsa_roundtrip() {
        let material = KeyMaterial::generate(KeyShape::Rsa { bits: 2048 }).unwrap();
        sign_verify(SignatureAlgorithm::Rs256, &material);
        sign_verify(SignatureAlgorithm::Ps256, &material);
    }

    #[test]
    fn test_tampered_payload_fails() {
        let material = KeyMaterial::generate(KeyShape::Ed25519).unwrap();
        let compact = sign(
            SignatureAlgorithm::EdDsa,
            MaterialKeyId::new(),
            &material,
            b"original",
            None,
        )
        .unwrap();
        let mut parts: Vec<&str> = compact.split('.').collect();
        let forged_payload = b64_encode(b"forged");
        parts[1] = &forged_payload;
        let message = JwsMessage::parse(&parts.join(".")).unwrap();
        assert_eq!(
            message.verify(SignatureAlgorithm::EdDsa, &material).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
        let b = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
        let compact =
            sign(SignatureAlgorithm::Hs256, MaterialKeyId::new(), &a, b"m", None).unwrap();
        let message = JwsMessage::parse(&compact).unwrap();
        assert_eq!(
            message.verify(SignatureAlgorithm::Hs256, &b).unwrap_err(),
            CryptoError::VerificationFailed
        );
    }

    #[test]
    fn test_algorithm_mismatch() {
        let material = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
        let compact =
            sign(SignatureAlgorithm::Hs256, MaterialKeyId::new(), &material, b"m", None).unwrap();
        let message = JwsMessage::parse(&compact).unwrap();
        assert_eq!(
            message.verify(SignatureAlgorithm::Hs384, &material).unwrap_err(),
            CryptoError::AlgorithmMismatch
        );
    }

    #[test]
    fn test_malformed_inputs() {
        for bad in ["", "a.b", "a.b.c.d", "e30.AA.AA"] {
            assert_eq!(
                JwsMessage::parse(bad).unwrap_err(),
                CryptoError::VerificationFailed,
                "{bad:?}"
            );
        }
    }
}
