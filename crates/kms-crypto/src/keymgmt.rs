//! # JWE Key Management
//!
//! Produces and recovers the content-encryption key (CEK) for every JWE
//! `alg` (RFC 7518 §4): AES key wrap, AES-GCM key encryption, direct use,
//! RSA-OAEP / RSA1_5 key transport, and ECDH-ES key agreement with or
//! without a subsequent AES key wrap.
//!
//! ## Security Invariant
//!
//! - RSA1_5 unwrap failures do not surface. A random CEK is substituted so
//!   that the content decryption fails instead, leaving a single
//!   indistinguishable error path (RFC 7516 §11.5).
//! - Agreed secrets and CEKs live in `Zeroizing` buffers.

use aes::cipher::generic_array::GenericArray;
use aes_kw::{KekAes128, KekAes192, KekAes256};
use elliptic_curve::{CurveArithmetic, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey};
use sha2::{Digest, Sha256, Sha384, Sha512};
use zeroize::Zeroizing;

use kms_core::CryptoError;

use crate::algorithm::{ContentEncryption, KeyManagement};
use crate::content::{gcm_open, gcm_seal, random_key, random_vec, GCM_IV_LEN};
use crate::encoding::{b64_decode, b64_encode};
use crate::jwk::Jwk;
use crate::material::{EcPrivateKey, EcPublicKey, KeyMaterial};

/// Header parameters produced by key management that must travel with
/// the message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyParams {
    /// Ephemeral public key (ECDH-ES).
    pub epk: Option<Jwk>,
    /// Key-encryption IV (AES-GCMKW), base64url.
    pub iv: Option<String>,
    /// Key-encryption tag (AES-GCMKW), base64url.
    pub tag: Option<String>,
}

/// A freshly produced CEK with its encrypted form and header parameters.
pub struct ProducedKey {
    /// The content-encryption key.
    pub cek: Zeroizing<Vec<u8>>,
    /// The JWE Encrypted Key segment (empty for `dir` and `ECDH-ES`).
    pub encrypted_key: Vec<u8>,
    /// Header parameters to protect alongside `alg`/`enc`.
    pub params: KeyParams,
}

/// Produce a CEK for `enc` using the pool key `material`.
pub fn produce(
    alg: KeyManagement,
    enc: ContentEncryption,
    material: &KeyMaterial,
) -> Result<ProducedKey, CryptoError> {
    match alg {
        KeyManagement::Dir => {
            let key = material.octets().ok_or(CryptoError::EncryptionFailed)?;
            if key.len() != enc.key_len() {
                return Err(CryptoError::EncryptionFailed);
            }
            Ok(ProducedKey {
                cek: Zeroizing::new(key.to_vec()),
                encrypted_key: Vec::new(),
                params: KeyParams::default(),
            })
        }
        KeyManagement::A256Kw | KeyManagement::A192Kw | KeyManagement::A128Kw => {
            let kek = wrapping_key(alg, material).ok_or(CryptoError::EncryptionFailed)?;
            let cek = random_key(enc.key_len());
            let encrypted_key = aes_wrap(kek, &cek).ok_or(CryptoError::EncryptionFailed)?;
            Ok(ProducedKey {
                cek,
                encrypted_key,
                params: KeyParams::default(),
            })
        }
        KeyManagement::A256GcmKw | KeyManagement::A192GcmKw | KeyManagement::A128GcmKw => {
            let kek = wrapping_key(alg, material).ok_or(CryptoError::EncryptionFailed)?;
            let cek = random_key(enc.key_len());
            let iv = random_vec(GCM_IV_LEN);
            let (encrypted_key, tag) = gcm_seal(kek, &iv, &[], &cek)?;
            Ok(ProducedKey {
                cek,
                encrypted_key,
                params: KeyParams {
                    epk: None,
                    iv: Some(b64_encode(iv)),
                    tag: Some(b64_encode(tag)),
                },
            })
        }
        KeyManagement::RsaOaep512
        | KeyManagement::RsaOaep384
        | KeyManagement::RsaOaep256
        | KeyManagement::RsaOaep
        | KeyManagement::RsaPkcs1v15 => {
            let key = material.rsa().ok_or(CryptoError::EncryptionFailed)?;
            let cek = random_key(enc.key_len());
            let encrypted_key = rsa_encrypt(alg, key, &cek)?;
            Ok(ProducedKey {
                cek,
                encrypted_key,
                params: KeyParams::default(),
            })
        }
        KeyManagement::EcdhEsA256Kw
        | KeyManagement::EcdhEsA192Kw
        | KeyManagement::EcdhEsA128Kw
        | KeyManagement::EcdhEs => {
            let static_key = material.ec().ok_or(CryptoError::EncryptionFailed)?;
            let ephemeral = EcPrivateKey::generate(static_key.curve());
            let epk = ephemeral
                .public_key()
                .to_jwk()
                .ok_or(CryptoError::EncryptionFailed)?;
            let z = shared_secret(&ephemeral, &static_key.public_key())
                .ok_or(CryptoError::EncryptionFailed)?;
            let params = KeyParams {
                epk: Some(epk),
                iv: None,
                tag: None,
            };
            match alg.wrapping_key_len() {
                None => Ok(ProducedKey {
                    cek: concat_kdf(&z, enc.as_str(), enc.key_len()),
                    encrypted_key: Vec::new(),
                    params,
                }),
                Some(kek_len) => {
                    let kek = concat_kdf(&z, alg.as_str(), kek_len);
                    let cek = random_key(enc.key_len());
                    let encrypted_key =
                        aes_wrap(&kek, &cek).ok_or(CryptoError::EncryptionFailed)?;
                    Ok(ProducedKey {
                        cek,
                        encrypted_key,
                        params,
                    })
                }
            }
        }
    }
}

/// Recover the CEK for `enc` from a received message.
pub fn recover(
    alg: KeyManagement,
    enc: ContentEncryption,
    material: &KeyMaterial,
    encrypted_key: &[u8],
    params: &KeyParams,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let cek = match alg {
        KeyManagement::Dir => {
            if !encrypted_key.is_empty() {
                return Err(CryptoError::DecryptionFailed);
            }
            let key = material.octets().ok_or(CryptoError::DecryptionFailed)?;
            Zeroizing::new(key.to_vec())
        }
        KeyManagement::A256Kw | KeyManagement::A192Kw | KeyManagement::A128Kw => {
            let kek = wrapping_key(alg, material).ok_or(CryptoError::DecryptionFailed)?;
            aes_unwrap(kek, encrypted_key).ok_or(CryptoError::DecryptionFailed)?
        }
        KeyManagement::A256GcmKw | KeyManagement::A192GcmKw | KeyManagement::A128GcmKw => {
            let kek = wrapping_key(alg, material).ok_or(CryptoError::DecryptionFailed)?;
            let iv = decode_param(params.iv.as_deref())?;
            let tag = decode_param(params.tag.as_deref())?;
            gcm_open(kek, &iv, &[], encrypted_key, &tag)?
        }
        KeyManagement::RsaOaep512
        | KeyManagement::RsaOaep384
        | KeyManagement::RsaOaep256
        | KeyManagement::RsaOaep => {
            let key = material.rsa().ok_or(CryptoError::DecryptionFailed)?;
            Zeroizing::new(
                key.decrypt(oaep_padding(alg), encrypted_key)
                    .map_err(|_| CryptoError::DecryptionFailed)?,
            )
        }
        KeyManagement::RsaPkcs1v15 => {
            let key = material.rsa().ok_or(CryptoError::DecryptionFailed)?;
            match key.decrypt(Pkcs1v15Encrypt, encrypted_key) {
                Ok(cek) if cek.len() == enc.key_len() => Zeroizing::new(cek),
                _ => random_key(enc.key_len()),
            }
        }
        KeyManagement::EcdhEsA256Kw
        | KeyManagement::EcdhEsA192Kw
        | KeyManagement::EcdhEsA128Kw
        | KeyManagement::EcdhEs => {
            let static_key = material.ec().ok_or(CryptoError::DecryptionFailed)?;
            let epk = params
                .epk
                .as_ref()
                .and_then(EcPublicKey::from_jwk)
                .ok_or(CryptoError::DecryptionFailed)?;
            let z = shared_secret(static_key, &epk).ok_or(CryptoError::DecryptionFailed)?;
            match alg.wrapping_key_len() {
                None => {
                    if !encrypted_key.is_empty() {
                        return Err(CryptoError::DecryptionFailed);
                    }
                    concat_kdf(&z, enc.as_str(), enc.key_len())
                }
                Some(kek_len) => {
                    let kek = concat_kdf(&z, alg.as_str(), kek_len);
                    aes_unwrap(&kek, encrypted_key).ok_or(CryptoError::DecryptionFailed)?
                }
            }
        }
    };
    if cek.len() != enc.key_len() {
        return Err(CryptoError::DecryptionFailed);
    }
    Ok(cek)
}

// ─── AES Key Wrap ────────────────────────────────────────────────────

fn wrapping_key(alg: KeyManagement, material: &KeyMaterial) -> Option<&[u8]> {
    let key = material.octets()?;
    (Some(key.len()) == alg.wrapping_key_len()).then_some(key)
}

fn aes_wrap(kek: &[u8], cek: &[u8]) -> Option<Vec<u8>> {
    match kek.len() {
        16 => KekAes128::new(GenericArray::from_slice(kek)).wrap_vec(cek).ok(),
        24 => KekAes192::new(GenericArray::from_slice(kek)).wrap_vec(cek).ok(),
        32 => KekAes256::new(GenericArray::from_slice(kek)).wrap_vec(cek).ok(),
        _ => None,
    }
}

fn aes_unwrap(kek: &[u8], wrapped: &[u8]) -> Option<Zeroizing<Vec<u8>>> {
    let cek = match kek.len() {
        16 => KekAes128::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped),
        24 => KekAes192::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped),
        32 => KekAes256::new(GenericArray::from_slice(kek)).unwrap_vec(wrapped),
        _ => return None,
    };
    cek.ok().map(Zeroizing::new)
}

// ─── RSA ─────────────────────────────────────────────────────────────

fn oaep_padding(alg: KeyManagement) -> Oaep {
    match alg {
        KeyManagement::RsaOaep512 => Oaep::new::<Sha512>(),
        KeyManagement::RsaOaep384 => Oaep::new::<Sha384>(),
        KeyManagement::RsaOaep256 => Oaep::new::<Sha256>(),
        _ => Oaep::new::<sha1::Sha1>(),
    }
}

fn rsa_encrypt(
    alg: KeyManagement,
    key: &RsaPrivateKey,
    cek: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let public = key.to_public_key();
    let encrypted = if alg == KeyManagement::RsaPkcs1v15 {
        public.encrypt(&mut OsRng, Pkcs1v15Encrypt, cek)
    } else {
        public.encrypt(&mut OsRng, oaep_padding(alg), cek)
    };
    encrypted.map_err(|_| CryptoError::EncryptionFailed)
}

// ─── ECDH-ES ─────────────────────────────────────────────────────────

fn shared_secret(secret: &EcPrivateKey, public: &EcPublicKey) -> Option<Zeroizing<Vec<u8>>> {
    match (secret, public) {
        (EcPrivateKey::P256(s), EcPublicKey::P256(p)) => Some(agree(s, p)),
        (EcPrivateKey::P384(s), EcPublicKey::P384(p)) => Some(agree(s, p)),
        (EcPrivateKey::P521(s), EcPublicKey::P521(p)) => Some(agree(s, p)),
        _ => None,
    }
}

fn agree<C: CurveArithmetic>(secret: &SecretKey<C>, public: &PublicKey<C>) -> Zeroizing<Vec<u8>> {
    let shared =
        elliptic_curve::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
    Zeroizing::new(shared.raw_secret_bytes().to_vec())
}

/// Concat KDF (NIST SP 800-56A §5.8.1) over SHA-256, with the RFC 7518
/// §4.6.2 `OtherInfo`: algorithm id, empty `apu`/`apv`, and the key length
/// in bits.
fn concat_kdf(z: &[u8], algorithm_id: &str, key_len: usize) -> Zeroizing<Vec<u8>> {
    let mut other_info = Vec::new();
    other_info.extend_from_slice(&(algorithm_id.len() as u32).to_be_bytes());
    other_info.extend_from_slice(algorithm_id.as_bytes());
    other_info.extend_from_slice(&0u32.to_be_bytes());
    other_info.extend_from_slice(&0u32.to_be_bytes());
    other_info.extend_from_slice(&((key_len * 8) as u32).to_be_bytes());

    let mut derived = Zeroizing::new(Vec::with_capacity(key_len + 32));
    let mut counter: u32 = 1;
    while derived.len() < key_len {
        let mut hasher = Sha256::new();
        hasher.update(counter.to_be_bytes());
        hasher.update(z);
        hasher.update(&other_info);
        derived.extend_from_slice(&hasher.finalize());
        counter += 1;
    }
    derived.truncate(key_len);
    derived
}

fn decode_param(value: Option<&str>) -> Result<Vec<u8>, CryptoError> {
    value
        .and_then(|v| b64_decode(v).ok())
        .ok_or(CryptoError::DecryptionFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::{EcCurve, KeyShape};

    fn octets(len: usize) -> KeyMaterial {
        KeyMaterial::generate(KeyShape::Octet { len }).unwrap()
    }

    fn roundtrip(alg: KeyManagement, enc: ContentEncryption, material: &KeyMaterial) {
        let produced = produce(alg, enc, material).unwrap();
        let cek = recover(alg, enc, material, &produced.encrypted_key, &produced.params).unwrap();
        assert_eq!(cek.as_slice(), produced.cek.as_slice());
        assert_eq!(cek.len(), enc.key_len());
    }

    #[test]
    fn test_aes_kw_and_gcmkw_roundtrip() {
        for (alg, len) in [
            (KeyManagement::A128Kw, 16),
            (KeyManagement::A192Kw, 24),
            (KeyManagement::A256Kw, 32),
            (KeyManagement::A128GcmKw, 16),
            (KeyManagement::A192GcmKw, 24),
            (KeyManagement::A256GcmKw, 32),
        ] {
            let material = octets(len);
            for enc in ContentEncryption::all() {
                roundtrip(alg, *enc, &material);
            }
        }
    }

    #[test]
    fn test_dir_uses_pool_key() {
        let material = octets(32);
        let produced = produce(KeyManagement::Dir, ContentEncryption::A256Gcm, &material).unwrap();
        assert!(produced.encrypted_key.is_empty());
        assert_eq!(produced.cek.as_slice(), material.octets().unwrap());
    }

    #[test]
    fn test_dir_rejects_encrypted_key() {
        let material = octets(32);
        let err = recover(
            KeyManagement::Dir,
            ContentEncryption::A256Gcm,
            &material,
            b"unexpected",
            &KeyParams::default(),
        )
        .unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);
    }

    #[test]
    fn test_ecdh_es_roundtrip_all_curves() {
        for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521] {
            let material = KeyMaterial::generate(KeyShape::Ec(curve)).unwrap();
            for alg in [
                KeyManagement::EcdhEs,
                KeyManagement::EcdhEsA128Kw,
                KeyManagement::EcdhEsA256Kw,
            ] {
                roundtrip(alg, ContentEncryption::A128CbcHs256, &material);
            }
        }
    }

    #[test]
    fn test_ecdh_es_epk_is_public() {
        let material = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let produced =
            produce(KeyManagement::EcdhEs, ContentEncryption::A256Gcm, &material).unwrap();
        let epk = produced.params.epk.unwrap();
        assert_eq!(epk.kty, "EC");
        assert!(!epk.is_private());
    }

    #[test]
    fn test_ecdh_es_curve_mismatch_fails() {
        let p256 = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let p384 = KeyMaterial::generate(KeyShape::Ec(EcCurve::P384)).unwrap();
        let produced = produce(KeyManagement::EcdhEs, ContentEncryption::A256Gcm, &p256).unwrap();
        let err = recover(
            KeyManagement::EcdhEs,
            ContentEncryption::A256Gcm,
            &p384,
            &produced.encrypted_key,
            &produced.params,
        )
        .unwrap_err();
        assert_eq!(err, CryptoError::DecryptionFailed);
    }

    #[test]
    fn test_rsa_transport_roundtrip() {
        let material = KeyMaterial::generate(KeyShape::Rsa { bits: 2048 }).unwrap();
        for alg in [
            KeyManagement::RsaOaep,
            KeyManagement::RsaOaep256,
            KeyManagement::RsaPkcs1v15,
        ] {
            roundtrip(alg, ContentEncryption::A256CbcHs512, &material);
        }
    }

    #[test]
    fn test_rsa1_5_failure_yields_random_cek() {
        let material = KeyMaterial::generate(KeyShape::Rsa { bits: 2048 }).unwrap();
        let garbage = vec![0x42u8; 256];
        let cek = recover(
            KeyManagement::RsaPkcs1v15,
            ContentEncryption::A128Gcm,
            &material,
            &garbage,
            &KeyParams::default(),
        )
        .unwrap();
        assert_eq!(cek.len(), 16);
    }

    #[test]
    fn test_wrong_wrapping_key_size_rejected() {
        let material = octets(16);
        assert!(produce(KeyManagement::A256Kw, ContentEncryption::A256Gcm, &material).is_err());
    }

    #[test]
    fn test_concat_kdf_lengths_and_separation() {
        let z = [7u8; 32];
        assert_eq!(concat_kdf(&z, "A128GCM", 16).len(), 16);
        assert_eq!(concat_kdf(&z, "A256CBC-HS512", 64).len(), 64);
        assert_ne!(
            concat_kdf(&z, "ECDH-ES+A128KW", 16).as_slice(),
            concat_kdf(&z, "A128GCM", 16).as_slice()
        );
    }
}
