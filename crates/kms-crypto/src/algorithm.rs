//! # Algorithm Catalog: Single Source of Truth
//!
//! Maps every supported algorithm identifier to a typed [`AlgorithmSpec`].
//! Identifiers follow JOSE naming: encryption entries are written
//! `ENC/ALG` (`A256GCM/A256KW`, `A128CBC-HS256/dir`), signature entries are
//! the bare JWS name (`RS256`, `EdDSA`).
//!
//! The table below is the only place identifiers are spelled out. It is
//! indexed once on first use and never mutated afterwards. Resolution is
//! exact and case-sensitive; nothing is normalised or partially matched.
//!
//! ## Families
//!
//! | Family | Key management | Key shape |
//! |--------|----------------|-----------|
//! | `KeyWrap` | AES-KW, AES-GCMKW, RSA-OAEP*, RSA1_5, ECDH-ES[+AxxxKW] | octet / RSA / EC |
//! | `Direct` | `dir` | octet sized to the content cipher |
//! | `Signature` | n/a | RSA / EC / octet / Ed25519 |
//!
//! Dispatch on family is always an exhaustive `match`: adding a family or a
//! variant is a compile-time event for every consumer.
//!
//! ## Consistency
//!
//! [`verify_catalog`] checks the table for duplicate identifiers,
//! identifiers that disagree with their typed algorithm, missing
//! combinations, and family/key-shape incoherence. The service and CLI run
//! it at startup.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use kms_core::ValidationError;

// ─── Content Encryption ──────────────────────────────────────────────

/// JWE content encryption (`enc`) algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryption {
    /// AES-256-GCM.
    A256Gcm,
    /// AES-192-GCM.
    A192Gcm,
    /// AES-128-GCM.
    A128Gcm,
    /// AES-256-CBC with HMAC-SHA-512 (RFC 7518 §5.2.5).
    A256CbcHs512,
    /// AES-192-CBC with HMAC-SHA-384 (RFC 7518 §5.2.4).
    A192CbcHs384,
    /// AES-128-CBC with HMAC-SHA-256 (RFC 7518 §5.2.3).
    A128CbcHs256,
}

impl ContentEncryption {
    /// All content encryption algorithms, strongest first.
    pub fn all() -> &'static [ContentEncryption] {
        &[
            Self::A256Gcm,
            Self::A192Gcm,
            Self::A128Gcm,
            Self::A256CbcHs512,
            Self::A192CbcHs384,
            Self::A128CbcHs256,
        ]
    }

    /// The JOSE `enc` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A256Gcm => "A256GCM",
            Self::A192Gcm => "A192GCM",
            Self::A128Gcm => "A128GCM",
            Self::A256CbcHs512 => "A256CBC-HS512",
            Self::A192CbcHs384 => "A192CBC-HS384",
            Self::A128CbcHs256 => "A128CBC-HS256",
        }
    }

    /// Content-encryption key length in bytes. CBC-HS keys are the MAC key
    /// and the encryption key concatenated.
    pub fn key_len(&self) -> usize {
        match self {
            Self::A256Gcm => 32,
            Self::A192Gcm => 24,
            Self::A128Gcm => 16,
            Self::A256CbcHs512 => 64,
            Self::A192CbcHs384 => 48,
            Self::A128CbcHs256 => 32,
        }
    }
}

// ─── Key Management ──────────────────────────────────────────────────

/// JWE key management (`alg`) algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyManagement {
    /// AES-256 key wrap (RFC 3394).
    A256Kw,
    /// AES-192 key wrap.
    A192Kw,
    /// AES-128 key wrap.
    A128Kw,
    /// AES-256-GCM key encryption.
    A256GcmKw,
    /// AES-192-GCM key encryption.
    A192GcmKw,
    /// AES-128-GCM key encryption.
    A128GcmKw,
    /// The pool key is the content-encryption key.
    Dir,
    /// RSA-OAEP with SHA-512 and MGF1-SHA-512.
    RsaOaep512,
    /// RSA-OAEP with SHA-384 and MGF1-SHA-384.
    RsaOaep384,
    /// RSA-OAEP with SHA-256 and MGF1-SHA-256.
    RsaOaep256,
    /// RSA-OAEP with SHA-1 and MGF1-SHA-1.
    RsaOaep,
    /// RSAES-PKCS1-v1_5.
    RsaPkcs1v15,
    /// ECDH-ES key agreement, then AES-256 key wrap.
    EcdhEsA256Kw,
    /// ECDH-ES key agreement, then AES-192 key wrap.
    EcdhEsA192Kw,
    /// ECDH-ES key agreement, then AES-128 key wrap.
    EcdhEsA128Kw,
    /// ECDH-ES direct key agreement.
    EcdhEs,
}

impl KeyManagement {
    /// All key management algorithms.
    pub fn all() -> &'static [KeyManagement] {
        &[
            Self::A256Kw,
            Self::A192Kw,
            Self::A128Kw,
            Self::A256GcmKw,
            Self::A192GcmKw,
            Self::A128GcmKw,
            Self::Dir,
            Self::RsaOaep512,
            Self::RsaOaep384,
            Self::RsaOaep256,
            Self::RsaOaep,
            Self::RsaPkcs1v15,
            Self::EcdhEsA256Kw,
            Self::EcdhEsA192Kw,
            Self::EcdhEsA128Kw,
            Self::EcdhEs,
        ]
    }

    /// The JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A256Kw => "A256KW",
            Self::A192Kw => "A192KW",
            Self::A128Kw => "A128KW",
            Self::A256GcmKw => "A256GCMKW",
            Self::A192GcmKw => "A192GCMKW",
            Self::A128GcmKw => "A128GCMKW",
            Self::Dir => "dir",
            Self::RsaOaep512 => "RSA-OAEP-512",
            Self::RsaOaep384 => "RSA-OAEP-384",
            Self::RsaOaep256 => "RSA-OAEP-256",
            Self::RsaOaep => "RSA-OAEP",
            Self::RsaPkcs1v15 => "RSA1_5",
            Self::EcdhEsA256Kw => "ECDH-ES+A256KW",
            Self::EcdhEsA192Kw => "ECDH-ES+A192KW",
            Self::EcdhEsA128Kw => "ECDH-ES+A128KW",
            Self::EcdhEs => "ECDH-ES",
        }
    }

    /// Length in bytes of the AES key-wrapping key, for the algorithms that
    /// wrap with AES (directly or after key agreement).
    pub fn wrapping_key_len(&self) -> Option<usize> {
        match self {
            Self::A256Kw | Self::A256GcmKw | Self::EcdhEsA256Kw => Some(32),
            Self::A192Kw | Self::A192GcmKw | Self::EcdhEsA192Kw => Some(24),
            Self::A128Kw | Self::A128GcmKw | Self::EcdhEsA128Kw => Some(16),
            Self::Dir
            | Self::RsaOaep512
            | Self::RsaOaep384
            | Self::RsaOaep256
            | Self::RsaOaep
            | Self::RsaPkcs1v15
            | Self::EcdhEs => None,
        }
    }

    /// The family this key management algorithm belongs to.
    pub fn family(&self) -> AlgorithmFamily {
        match self {
            Self::Dir => AlgorithmFamily::Direct,
            _ => AlgorithmFamily::KeyWrap,
        }
    }

    /// The pool key shape required when combined with `enc`.
    pub fn key_shape(&self, enc: ContentEncryption) -> KeyShape {
        match self {
            Self::A256Kw | Self::A192Kw | Self::A128Kw => KeyShape::Octet {
                len: self.wrapping_key_len().unwrap_or_default(),
            },
            Self::A256GcmKw | Self::A192GcmKw | Self::A128GcmKw => KeyShape::Octet {
                len: self.wrapping_key_len().unwrap_or_default(),
            },
            Self::Dir => KeyShape::Octet { len: enc.key_len() },
            Self::RsaOaep512 => KeyShape::Rsa { bits: 4096 },
            Self::RsaOaep384 => KeyShape::Rsa { bits: 3072 },
            Self::RsaOaep256 | Self::RsaOaep | Self::RsaPkcs1v15 => KeyShape::Rsa { bits: 2048 },
            Self::EcdhEsA256Kw | Self::EcdhEs => KeyShape::Ec(EcCurve::P521),
            Self::EcdhEsA192Kw => KeyShape::Ec(EcCurve::P384),
            Self::EcdhEsA128Kw => KeyShape::Ec(EcCurve::P256),
        }
    }
}

// ─── Signatures ──────────────────────────────────────────────────────

/// JWS signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    Rs256,
    /// RSASSA-PKCS1-v1_5 with SHA-384.
    Rs384,
    /// RSASSA-PKCS1-v1_5 with SHA-512.
    Rs512,
    /// RSASSA-PSS with SHA-256.
    Ps256,
    /// RSASSA-PSS with SHA-384.
    Ps384,
    /// RSASSA-PSS with SHA-512.
    Ps512,
    /// ECDSA P-256 with SHA-256.
    Es256,
    /// ECDSA P-384 with SHA-384.
    Es384,
    /// ECDSA P-521 with SHA-512.
    Es512,
    /// HMAC with SHA-256.
    Hs256,
    /// HMAC with SHA-384.
    Hs384,
    /// HMAC with SHA-512.
    Hs512,
    /// Ed25519.
    EdDsa,
}

impl SignatureAlgorithm {
    /// All signature algorithms.
    pub fn all() -> &'static [SignatureAlgorithm] {
        &[
            Self::Rs256,
            Self::Rs384,
            Self::Rs512,
            Self::Ps256,
            Self::Ps384,
            Self::Ps512,
            Self::Es256,
            Self::Es384,
            Self::Es512,
            Self::Hs256,
            Self::Hs384,
            Self::Hs512,
            Self::EdDsa,
        ]
    }

    /// The JOSE `alg` header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rs256 => "RS256",
            Self::Rs384 => "RS384",
            Self::Rs512 => "RS512",
            Self::Ps256 => "PS256",
            Self::Ps384 => "PS384",
            Self::Ps512 => "PS512",
            Self::Es256 => "ES256",
            Self::Es384 => "ES384",
            Self::Es512 => "ES512",
            Self::Hs256 => "HS256",
            Self::Hs384 => "HS384",
            Self::Hs512 => "HS512",
            Self::EdDsa => "EdDSA",
        }
    }

    /// The pool key shape this algorithm signs with.
    pub fn key_shape(&self) -> KeyShape {
        match self {
            Self::Rs256 | Self::Ps256 => KeyShape::Rsa { bits: 2048 },
            Self::Rs384 | Self::Ps384 => KeyShape::Rsa { bits: 3072 },
            Self::Rs512 | Self::Ps512 => KeyShape::Rsa { bits: 4096 },
            Self::Es256 => KeyShape::Ec(EcCurve::P256),
            Self::Es384 => KeyShape::Ec(EcCurve::P384),
            Self::Es512 => KeyShape::Ec(EcCurve::P521),
            Self::Hs256 => KeyShape::Octet { len: 32 },
            Self::Hs384 => KeyShape::Octet { len: 48 },
            Self::Hs512 => KeyShape::Octet { len: 64 },
            Self::EdDsa => KeyShape::Ed25519,
        }
    }
}

// ─── Key Shapes & Families ───────────────────────────────────────────

/// NIST curves used for ECDSA and ECDH-ES.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EcCurve {
    /// NIST P-256.
    P256,
    /// NIST P-384.
    P384,
    /// NIST P-521.
    P521,
}

impl EcCurve {
    /// The JWK `crv` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
        }
    }

    /// Length in bytes of a field element (coordinate or private scalar).
    pub fn field_len(&self) -> usize {
        match self {
            Self::P256 => 32,
            Self::P384 => 48,
            Self::P521 => 66,
        }
    }
}

/// The kind and size of key material a pool holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyShape {
    /// Symmetric octets of exactly `len` bytes.
    Octet {
        /// Key length in bytes.
        len: usize,
    },
    /// RSA key pair with a modulus of exactly `bits` bits.
    Rsa {
        /// Modulus size in bits.
        bits: usize,
    },
    /// Elliptic-curve key pair on the given curve.
    Ec(EcCurve),
    /// Ed25519 key pair.
    Ed25519,
}

impl KeyShape {
    /// Whether the shape is a public/private key pair.
    pub fn is_asymmetric(&self) -> bool {
        !matches!(self, Self::Octet { .. })
    }
}

impl std::fmt::Display for KeyShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Octet { len } => write!(f, "oct/{}", len * 8),
            Self::Rsa { bits } => write!(f, "RSA/{bits}"),
            Self::Ec(curve) => write!(f, "EC/{}", curve.as_str()),
            Self::Ed25519 => f.write_str("OKP/Ed25519"),
        }
    }
}

/// Algorithm family, which decides how the engine dispatches an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlgorithmFamily {
    /// Content encryption with a wrapped or agreed content-encryption key.
    KeyWrap,
    /// Content encryption with the pool key used directly.
    Direct,
    /// Digital signature or MAC.
    Signature,
}

impl AlgorithmFamily {
    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KeyWrap => "key-wrap",
            Self::Direct => "direct",
            Self::Signature => "signature",
        }
    }
}

impl std::fmt::Display for AlgorithmFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Algorithm ───────────────────────────────────────────────────────

/// A typed catalog algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    /// JWE: content encryption combined with key management.
    Encryption {
        /// Content encryption (`enc`).
        enc: ContentEncryption,
        /// Key management (`alg`).
        alg: KeyManagement,
    },
    /// JWS signature.
    Signature(SignatureAlgorithm),
}

impl Algorithm {
    /// The identifier composed from the typed parts.
    pub fn identifier(&self) -> String {
        match self {
            Self::Encryption { enc, alg } => format!("{}/{}", enc.as_str(), alg.as_str()),
            Self::Signature(sig) => sig.as_str().to_string(),
        }
    }

    /// The algorithm family.
    pub fn family(&self) -> AlgorithmFamily {
        match self {
            Self::Encryption { alg, .. } => alg.family(),
            Self::Signature(_) => AlgorithmFamily::Signature,
        }
    }

    /// The pool key shape.
    pub fn key_shape(&self) -> KeyShape {
        match self {
            Self::Encryption { enc, alg } => alg.key_shape(*enc),
            Self::Signature(sig) => sig.key_shape(),
        }
    }

    fn is_coherent(&self) -> bool {
        match (self.family(), self) {
            (AlgorithmFamily::Direct, Self::Encryption { enc, alg }) => {
                *alg == KeyManagement::Dir
                    && self.key_shape() == KeyShape::Octet { len: enc.key_len() }
            }
            (AlgorithmFamily::KeyWrap, Self::Encryption { alg, .. }) => {
                *alg != KeyManagement::Dir && self.key_shape() != KeyShape::Ed25519
            }
            (AlgorithmFamily::Signature, Self::Signature(_)) => true,
            _ => false,
        }
    }
}

const fn jwe(enc: ContentEncryption, alg: KeyManagement) -> Algorithm {
    Algorithm::Encryption { enc, alg }
}

const fn jws(sig: SignatureAlgorithm) -> Algorithm {
    Algorithm::Signature(sig)
}

// ─── Table ───────────────────────────────────────────────────────────

use ContentEncryption as E;
use KeyManagement as K;
use SignatureAlgorithm as S;

/// Every supported identifier. Order is presentation order.
static TABLE: &[(&str, Algorithm)] = &[
    ("A256GCM/A256KW", jwe(E::A256Gcm, K::A256Kw)),
    ("A256GCM/A192KW", jwe(E::A256Gcm, K::A192Kw)),
    ("A256GCM/A128KW", jwe(E::A256Gcm, K::A128Kw)),
    ("A256GCM/A256GCMKW", jwe(E::A256Gcm, K::A256GcmKw)),
    ("A256GCM/A192GCMKW", jwe(E::A256Gcm, K::A192GcmKw)),
    ("A256GCM/A128GCMKW", jwe(E::A256Gcm, K::A128GcmKw)),
    ("A256GCM/dir", jwe(E::A256Gcm, K::Dir)),
    ("A256GCM/RSA-OAEP-512", jwe(E::A256Gcm, K::RsaOaep512)),
    ("A256GCM/RSA-OAEP-384", jwe(E::A256Gcm, K::RsaOaep384)),
    ("A256GCM/RSA-OAEP-256", jwe(E::A256Gcm, K::RsaOaep256)),
    ("A256GCM/RSA-OAEP", jwe(E::A256Gcm, K::RsaOaep)),
    ("A256GCM/RSA1_5", jwe(E::A256Gcm, K::RsaPkcs1v15)),
    ("A256GCM/ECDH-ES+A256KW", jwe(E::A256Gcm, K::EcdhEsA256Kw)),
    ("A256GCM/ECDH-ES+A192KW", jwe(E::A256Gcm, K::EcdhEsA192Kw)),
    ("A256GCM/ECDH-ES+A128KW", jwe(E::A256Gcm, K::EcdhEsA128Kw)),
    ("A256GCM/ECDH-ES", jwe(E::A256Gcm, K::EcdhEs)),
    ("A192GCM/A256KW", jwe(E::A192Gcm, K::A256Kw)),
    ("A192GCM/A192KW", jwe(E::A192Gcm, K::A192Kw)),
    ("A192GCM/A128KW", jwe(E::A192Gcm, K::A128Kw)),
    ("A192GCM/A256GCMKW", jwe(E::A192Gcm, K::A256GcmKw)),
    ("A192GCM/A192GCMKW", jwe(E::A192Gcm, K::A192GcmKw)),
    ("A192GCM/A128GCMKW", jwe(E::A192Gcm, K::A128GcmKw)),
    ("A192GCM/dir", jwe(E::A192Gcm, K::Dir)),
    ("A192GCM/RSA-OAEP-512", jwe(E::A192Gcm, K::RsaOaep512)),
    ("A192GCM/RSA-OAEP-384", jwe(E::A192Gcm, K::RsaOaep384)),
    ("A192GCM/RSA-OAEP-256", jwe(E::A192Gcm, K::RsaOaep256)),
    ("A192GCM/RSA-OAEP", jwe(E::A192Gcm, K::RsaOaep)),
    ("A192GCM/RSA1_5", jwe(E::A192Gcm, K::RsaPkcs1v15)),
    ("A192GCM/ECDH-ES+A256KW", jwe(E::A192Gcm, K::EcdhEsA256Kw)),
    ("A192GCM/ECDH-ES+A192KW", jwe(E::A192Gcm, K::EcdhEsA192Kw)),
    ("A192GCM/ECDH-ES+A128KW", jwe(E::A192Gcm, K::EcdhEsA128Kw)),
    ("A192GCM/ECDH-ES", jwe(E::A192Gcm, K::EcdhEs)),
    ("A128GCM/A256KW", jwe(E::A128Gcm, K::A256Kw)),
    ("A128GCM/A192KW", jwe(E::A128Gcm, K::A192Kw)),
    ("A128GCM/A128KW", jwe(E::A128Gcm, K::A128Kw)),
    ("A128GCM/A256GCMKW", jwe(E::A128Gcm, K::A256GcmKw)),
    ("A128GCM/A192GCMKW", jwe(E::A128Gcm, K::A192GcmKw)),
    ("A128GCM/A128GCMKW", jwe(E::A128Gcm, K::A128GcmKw)),
    ("A128GCM/dir", jwe(E::A128Gcm, K::Dir)),
    ("A128GCM/RSA-OAEP-512", jwe(E::A128Gcm, K::RsaOaep512)),
    ("A128GCM/RSA-OAEP-384", jwe(E::A128Gcm, K::RsaOaep384)),
    ("A128GCM/RSA-OAEP-256", jwe(E::A128Gcm, K::RsaOaep256)),
    ("A128GCM/RSA-OAEP", jwe(E::A128Gcm, K::RsaOaep)),
    ("A128GCM/RSA1_5", jwe(E::A128Gcm, K::RsaPkcs1v15)),
    ("A128GCM/ECDH-ES+A256KW", jwe(E::A128Gcm, K::EcdhEsA256Kw)),
    ("A128GCM/ECDH-ES+A192KW", jwe(E::A128Gcm, K::EcdhEsA192Kw)),
    ("A128GCM/ECDH-ES+A128KW", jwe(E::A128Gcm, K::EcdhEsA128Kw)),
    ("A128GCM/ECDH-ES", jwe(E::A128Gcm, K::EcdhEs)),
    ("A256CBC-HS512/A256KW", jwe(E::A256CbcHs512, K::A256Kw)),
    ("A256CBC-HS512/A192KW", jwe(E::A256CbcHs512, K::A192Kw)),
    ("A256CBC-HS512/A128KW", jwe(E::A256CbcHs512, K::A128Kw)),
    ("A256CBC-HS512/A256GCMKW", jwe(E::A256CbcHs512, K::A256GcmKw)),
    ("A256CBC-HS512/A192GCMKW", jwe(E::A256CbcHs512, K::A192GcmKw)),
    ("A256CBC-HS512/A128GCMKW", jwe(E::A256CbcHs512, K::A128GcmKw)),
    ("A256CBC-HS512/dir", jwe(E::A256CbcHs512, K::Dir)),
    ("A256CBC-HS512/RSA-OAEP-512", jwe(E::A256CbcHs512, K::RsaOaep512)),
    ("A256CBC-HS512/RSA-OAEP-384", jwe(E::A256CbcHs512, K::RsaOaep384)),
    ("A256CBC-HS512/RSA-OAEP-256", jwe(E::A256CbcHs512, K::RsaOaep256)),
    ("A256CBC-HS512/RSA-OAEP", jwe(E::A256CbcHs512, K::RsaOaep)),
    ("A256CBC-HS512/RSA1_5", jwe(E::A256CbcHs512, K::RsaPkcs1v15)),
    ("A256CBC-HS512/ECDH-ES+A256KW", jwe(E::A256CbcHs512, K::EcdhEsA256Kw)),
    ("A256CBC-HS512/ECDH-ES+A192KW", jwe(E::A256CbcHs512, K::EcdhEsA192Kw)),
    ("A256CBC-HS512/ECDH-ES+A128KW", jwe(E::A256CbcHs512, K::EcdhEsA128Kw)),
    ("A256CBC-HS512/ECDH-ES", jwe(E::A256CbcHs512, K::EcdhEs)),
    ("A192CBC-HS384/A256KW", jwe(E::A192CbcHs384, K::A256Kw)),
    ("A192CBC-HS384/A192KW", jwe(E::A192CbcHs384, K::A192Kw)),
    ("A192CBC-HS384/A128KW", jwe(E::A192CbcHs384, K::A128Kw)),
    ("A192CBC-HS384/A256GCMKW", jwe(E::A192CbcHs384, K::A256GcmKw)),
    ("A192CBC-HS384/A192GCMKW", jwe(E::A192CbcHs384, K::A192GcmKw)),
    ("A192CBC-HS384/A128GCMKW", jwe(E::A192CbcHs384, K::A128GcmKw)),
    ("A192CBC-HS384/dir", jwe(E::A192CbcHs384, K::Dir)),
    ("A192CBC-HS384/RSA-OAEP-512", jwe(E::A192CbcHs384, K::RsaOaep512)),
    ("A192CBC-HS384/RSA-OAEP-384", jwe(E::A192CbcHs384, K::RsaOaep384)),
    ("A192CBC-HS384/RSA-OAEP-256", jwe(E::A192CbcHs384, K::RsaOaep256)),
    ("A192CBC-HS384/RSA-OAEP", jwe(E::A192CbcHs384, K::RsaOaep)),
    ("A192CBC-HS384/RSA1_5", jwe(E::A192CbcHs384, K::RsaPkcs1v15)),
    ("A192CBC-HS384/ECDH-ES+A256KW", jwe(E::A192CbcHs384, K::EcdhEsA256Kw)),
    ("A192CBC-HS384/ECDH-ES+A192KW", jwe(E::A192CbcHs384, K::EcdhEsA192Kw)),
    ("A192CBC-HS384/ECDH-ES+A128KW", jwe(E::A192CbcHs384, K::EcdhEsA128Kw)),
    ("A192CBC-HS384/ECDH-ES", jwe(E::A192CbcHs384, K::EcdhEs)),
    ("A128CBC-HS256/A256KW", jwe(E::A128CbcHs256, K::A256Kw)),
    ("A128CBC-HS256/A192KW", jwe(E::A128CbcHs256, K::A192Kw)),
    ("A128CBC-HS256/A128KW", jwe(E::A128CbcHs256, K::A128Kw)),
    ("A128CBC-HS256/A256GCMKW", jwe(E::A128CbcHs256, K::A256GcmKw)),
    ("A128CBC-HS256/A192GCMKW", jwe(E::A128CbcHs256, K::A192GcmKw)),
    ("A128CBC-HS256/A128GCMKW", jwe(E::A128CbcHs256, K::A128GcmKw)),
    ("A128CBC-HS256/dir", jwe(E::A128CbcHs256, K::Dir)),
    ("A128CBC-HS256/RSA-OAEP-512", jwe(E::A128CbcHs256, K::RsaOaep512)),
    ("A128CBC-HS256/RSA-OAEP-384", jwe(E::A128CbcHs256, K::RsaOaep384)),
    ("A128CBC-HS256/RSA-OAEP-256", jwe(E::A128CbcHs256, K::RsaOaep256)),
    ("A128CBC-HS256/RSA-OAEP", jwe(E::A128CbcHs256, K::RsaOaep)),
    ("A128CBC-HS256/RSA1_5", jwe(E::A128CbcHs256, K::RsaPkcs1v15)),
    ("A128CBC-HS256/ECDH-ES+A256KW", jwe(E::A128CbcHs256, K::EcdhEsA256Kw)),
    ("A128CBC-HS256/ECDH-ES+A192KW", jwe(E::A128CbcHs256, K::EcdhEsA192Kw)),
    ("A128CBC-HS256/ECDH-ES+A128KW", jwe(E::A128CbcHs256, K::EcdhEsA128Kw)),
    ("A128CBC-HS256/ECDH-ES", jwe(E::A128CbcHs256, K::EcdhEs)),
    ("RS256", jws(S::Rs256)),
    ("RS384", jws(S::Rs384)),
    ("RS512", jws(S::Rs512)),
    ("PS256", jws(S::Ps256)),
    ("PS384", jws(S::Ps384)),
    ("PS512", jws(S::Ps512)),
    ("ES256", jws(S::Es256)),
    ("ES384", jws(S::Es384)),
    ("ES512", jws(S::Es512)),
    ("HS256", jws(S::Hs256)),
    ("HS384", jws(S::Hs384)),
    ("HS512", jws(S::Hs512)),
    ("EdDSA", jws(S::EdDsa)),
];

// ─── Catalog ─────────────────────────────────────────────────────────

/// A resolved catalog entry.
///
/// Serializes as its identifier string; deserializing resolves through the
/// catalog, so an `AlgorithmSpec` value is always a real catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AlgorithmSpec {
    identifier: &'static str,
    algorithm: Algorithm,
}

impl AlgorithmSpec {
    /// The exact catalog identifier.
    pub fn identifier(&self) -> &'static str {
        self.identifier
    }

    /// The typed algorithm.
    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// The algorithm family.
    pub fn family(&self) -> AlgorithmFamily {
        self.algorithm.family()
    }

    /// The key shape a pool with this algorithm holds.
    pub fn key_shape(&self) -> KeyShape {
        self.algorithm.key_shape()
    }

    /// Whether the pool holds a key pair (and so has a public JWK).
    pub fn is_asymmetric(&self) -> bool {
        self.key_shape().is_asymmetric()
    }
}

impl std::fmt::Display for AlgorithmSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.identifier)
    }
}

impl Serialize for AlgorithmSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.identifier)
    }
}

impl<'de> Deserialize<'de> for AlgorithmSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = String::deserialize(deserializer)?;
        resolve(&id).map_err(serde::de::Error::custom)
    }
}

/// Inconsistency found in the algorithm table.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two entries share an identifier.
    #[error("duplicate algorithm identifier {0:?}")]
    Duplicate(&'static str),

    /// An identifier disagrees with the typed algorithm it maps to.
    #[error("identifier {identifier:?} does not match its algorithm {expected:?}")]
    Misnamed {
        /// The identifier in the table.
        identifier: &'static str,
        /// The identifier composed from the typed algorithm.
        expected: String,
    },

    /// A combination of typed parts has no entry.
    #[error("algorithm {0:?} is missing from the catalog")]
    Missing(String),

    /// The family and key shape do not fit together.
    #[error("algorithm {0:?} maps to an incoherent family/key shape")]
    Incoherent(&'static str),
}

/// The indexed algorithm table.
#[derive(Debug)]
pub struct AlgorithmCatalog {
    entries: Vec<AlgorithmSpec>,
    index: HashMap<&'static str, usize>,
}

static CATALOG: OnceLock<AlgorithmCatalog> = OnceLock::new();

impl AlgorithmCatalog {
    /// The process-wide catalog, built on first use.
    pub fn global() -> &'static AlgorithmCatalog {
        CATALOG.get_or_init(|| Self::from_table(TABLE))
    }

    fn from_table(table: &[(&'static str, Algorithm)]) -> Self {
        let entries: Vec<AlgorithmSpec> = table
            .iter()
            .map(|(identifier, algorithm)| AlgorithmSpec {
                identifier: *identifier,
                algorithm: *algorithm,
            })
            .collect();
        let mut index = HashMap::with_capacity(entries.len());
        for (i, spec) in entries.iter().enumerate() {
            index.entry(spec.identifier).or_insert(i);
        }
        Self { entries, index }
    }

    /// Resolve an identifier exactly.
    pub fn resolve(&self, identifier: &str) -> Result<AlgorithmSpec, ValidationError> {
        self.index
            .get(identifier)
            .map(|&i| self.entries[i])
            .ok_or_else(|| ValidationError::InvalidAlgorithm(identifier.to_string()))
    }

    /// All entries in table order.
    pub fn entries(&self) -> &[AlgorithmSpec] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check the table for internal consistency.
    pub fn verify(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        for spec in &self.entries {
            if !seen.insert(spec.identifier) {
                return Err(CatalogError::Duplicate(spec.identifier));
            }
            let expected = spec.algorithm.identifier();
            if expected != spec.identifier {
                return Err(CatalogError::Misnamed {
                    identifier: spec.identifier,
                    expected,
                });
            }
            if !spec.algorithm.is_coherent() {
                return Err(CatalogError::Incoherent(spec.identifier));
            }
        }
        for expected in expected_algorithms() {
            let id = expected.identifier();
            match self.index.get(id.as_str()) {
                Some(&i) if self.entries[i].algorithm == expected => {}
                _ => return Err(CatalogError::Missing(id)),
            }
        }
        tracing::debug!(entries = self.entries.len(), "algorithm catalog verified");
        Ok(())
    }
}

/// Every algorithm the typed enums can express.
fn expected_algorithms() -> impl Iterator<Item = Algorithm> {
    let encryption = ContentEncryption::all().iter().flat_map(|enc| {
        KeyManagement::all()
            .iter()
            .map(move |alg| jwe(*enc, *alg))
    });
    let signatures = SignatureAlgorithm::all().iter().map(|sig| jws(*sig));
    encryption.chain(signatures)
}

/// Resolve an identifier against the global catalog.
pub fn resolve(identifier: &str) -> Result<AlgorithmSpec, ValidationError> {
    AlgorithmCatalog::global().resolve(identifier)
}

/// Verify the global catalog.
pub fn verify_catalog() -> Result<(), CatalogError> {
    AlgorithmCatalog::global().verify()
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_catalog_is_consistent() {
        verify_catalog().unwrap();
    }

    #[test]
    fn test_catalog_count() {
        let expected = ContentEncryption::all().len() * KeyManagement::all().len()
            + SignatureAlgorithm::all().len();
        assert_eq!(expected, 109);
        assert_eq!(AlgorithmCatalog::global().len(), expected);
    }

    #[test]
    fn test_every_expected_identifier_resolves() {
        for algorithm in expected_algorithms() {
            let id = algorithm.identifier();
            let spec = resolve(&id).unwrap_or_else(|e| panic!("{id}: {e}"));
            assert_eq!(spec.algorithm(), algorithm);
            assert_eq!(spec.identifier(), id);
        }
    }

    #[test]
    fn test_named_examples() {
        let spec = resolve("A256GCM/A256KW").unwrap();
        assert_eq!(spec.family(), AlgorithmFamily::KeyWrap);
        assert_eq!(spec.key_shape(), KeyShape::Octet { len: 32 });

        let spec = resolve("A128CBC-HS256/dir").unwrap();
        assert_eq!(spec.family(), AlgorithmFamily::Direct);
        assert_eq!(spec.key_shape(), KeyShape::Octet { len: 32 });

        let spec = resolve("A256CBC-HS512/dir").unwrap();
        assert_eq!(spec.key_shape(), KeyShape::Octet { len: 64 });

        let spec = resolve("RS256").unwrap();
        assert_eq!(spec.family(), AlgorithmFamily::Signature);
        assert_eq!(spec.key_shape(), KeyShape::Rsa { bits: 2048 });

        assert_eq!(resolve("ES384").unwrap().key_shape(), KeyShape::Ec(EcCurve::P384));
        assert_eq!(resolve("EdDSA").unwrap().key_shape(), KeyShape::Ed25519);
        assert_eq!(
            resolve("A128GCM/ECDH-ES+A128KW").unwrap().key_shape(),
            KeyShape::Ec(EcCurve::P256)
        );
        assert_eq!(
            resolve("A192GCM/RSA-OAEP-512").unwrap().key_shape(),
            KeyShape::Rsa { bits: 4096 }
        );
    }

    #[test]
    fn test_resolution_is_exact() {
        for bad in [
            "NOT-A-REAL-ALG",
            "a256gcm/a256kw",
            "A256GCM/A256KW ",
            " RS256",
            "A256GCM",
            "A256KW",
            "A256GCM/",
            "eddsa",
            "",
        ] {
            assert_eq!(
                resolve(bad),
                Err(ValidationError::InvalidAlgorithm(bad.to_string())),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn test_verify_detects_duplicates() {
        let table = [
            ("RS256", jws(S::Rs256)),
            ("RS256", jws(S::Rs256)),
        ];
        let catalog = AlgorithmCatalog::from_table(&table);
        assert_eq!(catalog.verify(), Err(CatalogError::Duplicate("RS256")));
    }

    #[test]
    fn test_verify_detects_misnamed_entry() {
        let table = [("RS384", jws(S::Rs256))];
        let catalog = AlgorithmCatalog::from_table(&table);
        assert!(matches!(
            catalog.verify(),
            Err(CatalogError::Misnamed { identifier: "RS384", .. })
        ));
    }

    #[test]
    fn test_verify_detects_missing_entries() {
        let catalog = AlgorithmCatalog::from_table(&TABLE[1..]);
        assert_eq!(
            catalog.verify(),
            Err(CatalogError::Missing("A256GCM/A256KW".to_string()))
        );
    }

    #[test]
    fn test_family_partition() {
        let catalog = AlgorithmCatalog::global();
        let count = |family| catalog.entries().iter().filter(|s| s.family() == family).count();
        assert_eq!(count(AlgorithmFamily::Direct), 6);
        assert_eq!(count(AlgorithmFamily::KeyWrap), 90);
        assert_eq!(count(AlgorithmFamily::Signature), 13);
    }

    #[test]
    fn test_serde_uses_identifier() {
        let spec = resolve("A128CBC-HS256/ECDH-ES+A192KW").unwrap();
        let json = serde_json::to_string(&spec).unwrap();
        assert_eq!(json, "\"A128CBC-HS256/ECDH-ES+A192KW\"");
        let back: AlgorithmSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back, spec);
        assert!(serde_json::from_str::<AlgorithmSpec>("\"A999GCM/dir\"").is_err());
    }

    #[test]
    fn test_exhaustive_family_dispatch_compiles() {
        fn describe(family: AlgorithmFamily) -> &'static str {
            match family {
                AlgorithmFamily::KeyWrap => "wrap",
                AlgorithmFamily::Direct => "direct",
                AlgorithmFamily::Signature => "sign",
            }
        }
        for spec in AlgorithmCatalog::global().entries() {
            assert!(!describe(spec.family()).is_empty());
        }
    }
}
