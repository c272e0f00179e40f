//! # Content Encryption
//!
//! The six JWE `enc` algorithms of RFC 7518 §5: AES-GCM with a 96-bit IV,
//! and AES-CBC with HMAC-SHA-2 (`AxxxCBC-HSyyy`, §5.2).
//!
//! ## Security Invariant
//!
//! Every failure maps to a unit [`CryptoError`]. Padding errors, tag
//! mismatches, and malformed lengths are indistinguishable to the caller,
//! and CBC-HS tags are compared in constant time before any decryption.

use aes_gcm::aead::consts::U12;
use aes_gcm::aead::{Aead, AeadCore, KeyInit, Payload};
use aes_gcm::{Aes128Gcm, Aes256Gcm, AesGcm, Nonce};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Sha256, Sha384, Sha512};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use kms_core::CryptoError;

use crate::algorithm::ContentEncryption;

type Aes192Gcm = AesGcm<aes::Aes192, U12>;

/// GCM initialization vector length.
pub(crate) const GCM_IV_LEN: usize = 12;
/// GCM authentication tag length.
pub(crate) const GCM_TAG_LEN: usize = 16;
/// CBC initialization vector length (one AES block).
const CBC_IV_LEN: usize = 16;

/// The output of content encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    /// Initialization vector.
    pub iv: Vec<u8>,
    /// Ciphertext.
    pub ciphertext: Vec<u8>,
    /// Authentication tag.
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` under `cek`, authenticating `aad`.
pub fn seal(
    enc: ContentEncryption,
    cek: &[u8],
    aad: &[u8],
    plaintext: &[u8],
) -> Result<Sealed, CryptoError> {
    if cek.len() != enc.key_len() {
        return Err(CryptoError::EncryptionFailed);
    }
    match enc {
        ContentEncryption::A256Gcm | ContentEncryption::A192Gcm | ContentEncryption::A128Gcm => {
            let iv = random_vec(GCM_IV_LEN);
            let (ciphertext, tag) = gcm_seal(cek, &iv, aad, plaintext)?;
            Ok(Sealed {
                iv,
                ciphertext,
                tag,
            })
        }
        ContentEncryption::A256CbcHs512 => cbc_hs_seal::<Hmac<Sha512>>(cek, aad, plaintext),
        ContentEncryption::A192CbcHs384 => cbc_hs_seal::<Hmac<Sha384>>(cek, aad, plaintext),
        ContentEncryption::A128CbcHs256 => cbc_hs_seal::<Hmac<Sha256>>(cek, aad, plaintext),
    }
}

/// Authenticate and decrypt a sealed payload.
pub fn open(
    enc: ContentEncryption,
    cek: &[u8],
    aad: &[u8],
    sealed: &Sealed,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if cek.len() != enc.key_len() {
        return Err(CryptoError::DecryptionFailed);
    }
    match enc {
        ContentEncryption::A256Gcm | ContentEncryption::A192Gcm | ContentEncryption::A128Gcm => {
            gcm_open(cek, &sealed.iv, aad, &sealed.ciphertext, &sealed.tag)
        }
        ContentEncryption::A256CbcHs512 => cbc_hs_open::<Hmac<Sha512>>(cek, aad, sealed),
        ContentEncryption::A192CbcHs384 => cbc_hs_open::<Hmac<Sha384>>(cek, aad, sealed),
        ContentEncryption::A128CbcHs256 => cbc_hs_open::<Hmac<Sha256>>(cek, aad, sealed),
    }
}

// ─── AES-GCM ─────────────────────────────────────────────────────────

/// AES-GCM encryption keyed by length (16, 24, or 32 bytes). Returns the
/// ciphertext and the detached tag.
pub(crate) fn gcm_seal(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    msg: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    if iv.len() != GCM_IV_LEN {
        return Err(CryptoError::EncryptionFailed);
    }
    let mut combined = match key.len() {
        16 => gcm_encrypt::<Aes128Gcm>(key, iv, aad, msg),
        24 => gcm_encrypt::<Aes192Gcm>(key, iv, aad, msg),
        32 => gcm_encrypt::<Aes256Gcm>(key, iv, aad, msg),
        _ => None,
    }
    .ok_or(CryptoError::EncryptionFailed)?;
    let tag = combined.split_off(combined.len() - GCM_TAG_LEN);
    Ok((combined, tag))
}

/// AES-GCM decryption with a detached tag.
pub(crate) fn gcm_open(
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    ciphertext: &[u8],
    tag: &[u8],
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    if iv.len() != GCM_IV_LEN || tag.len() != GCM_TAG_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let mut combined = Vec::with_capacity(ciphertext.len() + tag.len());
    combined.extend_from_slice(ciphertext);
    combined.extend_from_slice(tag);
    match key.len() {
        16 => gcm_decrypt::<Aes128Gcm>(key, iv, aad, &combined),
        24 => gcm_decrypt::<Aes192Gcm>(key, iv, aad, &combined),
        32 => gcm_decrypt::<Aes256Gcm>(key, iv, aad, &combined),
        _ => None,
    }
    .map(Zeroizing::new)
    .ok_or(CryptoError::DecryptionFailed)
}

fn gcm_encrypt<C>(key: &[u8], iv: &[u8], aad: &[u8], msg: &[u8]) -> Option<Vec<u8>>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).ok()?;
    cipher
        .encrypt(Nonce::from_slice(iv), Payload { msg, aad })
        .ok()
}

fn gcm_decrypt<C>(key: &[u8], iv: &[u8], aad: &[u8], msg: &[u8]) -> Option<Vec<u8>>
where
    C: KeyInit + Aead + AeadCore<NonceSize = U12>,
{
    let cipher = C::new_from_slice(key).ok()?;
    cipher
        .decrypt(Nonce::from_slice(iv), Payload { msg, aad })
        .ok()
}

// ─── AES-CBC + HMAC-SHA-2 ────────────────────────────────────────────

fn cbc_hs_seal<M>(key: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Sealed, CryptoError>
where
    M: Mac + KeyInit,
{
    let (mac_key, enc_key) = key.split_at(key.len() / 2);
    let iv = random_vec(CBC_IV_LEN);
    let ciphertext = cbc_encrypt(enc_key, &iv, plaintext).ok_or(CryptoError::EncryptionFailed)?;
    let tag = cbc_hs_tag::<M>(mac_key, aad, &iv, &ciphertext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    Ok(Sealed {
        iv,
        ciphertext,
        tag,
    })
}

fn cbc_hs_open<M>(
    key: &[u8],
    aad: &[u8],
    sealed: &Sealed,
) -> Result<Zeroizing<Vec<u8>>, CryptoError>
where
    M: Mac + KeyInit,
{
    let (mac_key, enc_key) = key.split_at(key.len() / 2);
    if sealed.iv.len() != CBC_IV_LEN {
        return Err(CryptoError::DecryptionFailed);
    }
    let expected = cbc_hs_tag::<M>(mac_key, aad, &sealed.iv, &sealed.ciphertext)
        .map_err(|_| CryptoError::DecryptionFailed)?;
    if !bool::from(expected.as_slice().ct_eq(sealed.tag.as_slice())) {
        return Err(CryptoError::DecryptionFailed);
    }
    cbc_decrypt(enc_key, &sealed.iv, &sealed.ciphertext)
        .map(Zeroizing::new)
        .ok_or(CryptoError::DecryptionFailed)
}

/// HMAC over `AAD || IV || ciphertext || AL`, truncated to the MAC key length.
fn cbc_hs_tag<M>(
    mac_key: &[u8],
    aad: &[u8],
    iv: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, InvalidLength>
where
    M: Mac + KeyInit,
{
    let al = (aad.len() as u64 * 8).to_be_bytes();
    let mut tag = mac::<M>(mac_key, &[aad, iv, ciphertext, &al])?;
    tag.truncate(mac_key.len());
    Ok(tag)
}

fn cbc_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Option<Vec<u8>> {
    match key.len() {
        16 => cbc::Encryptor::<aes::Aes128>::new_from_slices(key, iv)
            .ok()
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        24 => cbc::Encryptor::<aes::Aes192>::new_from_slices(key, iv)
            .ok()
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        32 => cbc::Encryptor::<aes::Aes256>::new_from_slices(key, iv)
            .ok()
            .map(|c| c.encrypt_padded_vec_mut::<Pkcs7>(plaintext)),
        _ => None,
    }
}

fn cbc_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Option<Vec<u8>> {
    match key.len() {
        16 => cbc::Decryptor::<aes::Aes128>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok(),
        24 => cbc::Decryptor::<aes::Aes192>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok(),
        32 => cbc::Decryptor::<aes::Aes256>::new_from_slices(key, iv)
            .ok()?
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .ok(),
        _ => None,
    }
}

// ─── Shared Helpers ──────────────────────────────────────────────────

/// Compute a MAC over the concatenation of `parts`.
pub(crate) fn mac<M>(key: &[u8], parts: &[&[u8]]) -> Result<Vec<u8>, InvalidLength>
where
    M: Mac + KeyInit,
{
    let mut m = <M as KeyInit>::new_from_slice(key)?;
    for part in parts {
        m.update(part);
    }
    Ok(m.finalize().into_bytes().to_vec())
}

pub(crate) fn random_vec(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

pub(crate) fn random_key(len: usize) -> Zeroizing<Vec<u8>> {
    Zeroizing::new(random_vec(len))
}
