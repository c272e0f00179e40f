//! # Key Material
//!
//! [`KeyMaterial`] is the secret payload of a material key: symmetric
//! octets, an RSA key pair, an EC key pair, or an Ed25519 key pair. Its
//! shape is fixed by the pool's algorithm ([`KeyShape`]).
//!
//! ## Security Invariant
//!
//! - `KeyMaterial` does not implement `Serialize`. The only way out is an
//!   explicit JWK conversion ([`KeyMaterial::to_private_jwk`]), which the
//!   service uses solely for data-key generation under `export_allowed`.
//! - `Debug` prints the shape, never the key.
//! - Octets are held in `Zeroizing`; the RSA, EC, and Ed25519 key types
//!   zeroize themselves on drop.

use elliptic_curve::sec1::{FromEncodedPoint, ModulusSize, ToEncodedPoint};
use elliptic_curve::{AffinePoint, CurveArithmetic, FieldBytesSize, PublicKey, SecretKey};
use rand::rngs::OsRng;
use rand::RngCore;
use rsa::traits::{PrivateKeyParts, PublicKeyParts};
use rsa::{BigUint, RsaPrivateKey};
use std::str::FromStr;
use zeroize::Zeroizing;

use kms_core::{CryptoError, ValidationError};

use crate::algorithm::{EcCurve, KeyShape};
use crate::encoding::{b64_decode, b64_encode};
use crate::jwk::Jwk;

// ─── EC Keys ─────────────────────────────────────────────────────────

/// An EC private key on one of the supported NIST curves.
#[derive(Clone)]
pub enum EcPrivateKey {
    /// P-256 key.
    P256(p256::SecretKey),
    /// P-384 key.
    P384(p384::SecretKey),
    /// P-521 key.
    P521(p521::SecretKey),
}

/// An EC public key on one of the supported NIST curves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPublicKey {
    /// P-256 key.
    P256(p256::PublicKey),
    /// P-384 key.
    P384(p384::PublicKey),
    /// P-521 key.
    P521(p521::PublicKey),
}

impl EcPrivateKey {
    /// Generate a fresh key on `curve`.
    pub fn generate(curve: EcCurve) -> Self {
        match curve {
            EcCurve::P256 => Self::P256(SecretKey::random(&mut OsRng)),
            EcCurve::P384 => Self::P384(SecretKey::random(&mut OsRng)),
            EcCurve::P521 => Self::P521(SecretKey::random(&mut OsRng)),
        }
    }

    /// Rebuild a key from its big-endian private scalar.
    pub fn from_scalar(curve: EcCurve, d: &[u8]) -> Option<Self> {
        if d.len() != curve.field_len() {
            return None;
        }
        match curve {
            EcCurve::P256 => SecretKey::from_slice(d).ok().map(Self::P256),
            EcCurve::P384 => SecretKey::from_slice(d).ok().map(Self::P384),
            EcCurve::P521 => SecretKey::from_slice(d).ok().map(Self::P521),
        }
    }

    /// The key's curve.
    pub fn curve(&self) -> EcCurve {
        match self {
            Self::P256(_) => EcCurve::P256,
            Self::P384(_) => EcCurve::P384,
            Self::P521(_) => EcCurve::P521,
        }
    }

    /// The big-endian private scalar.
    pub fn scalar(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(match self {
            Self::P256(sk) => sk.to_bytes().to_vec(),
            Self::P384(sk) => sk.to_bytes().to_vec(),
            Self::P521(sk) => sk.to_bytes().to_vec(),
        })
    }

    /// The matching public key.
    pub fn public_key(&self) -> EcPublicKey {
        match self {
            Self::P256(sk) => EcPublicKey::P256(sk.public_key()),
            Self::P384(sk) => EcPublicKey::P384(sk.public_key()),
            Self::P521(sk) => EcPublicKey::P521(sk.public_key()),
        }
    }
}

impl EcPublicKey {
    /// Rebuild a public key from its affine coordinates.
    pub fn from_coordinates(curve: EcCurve, x: &[u8], y: &[u8]) -> Option<Self> {
        if x.len() != curve.field_len() || y.len() != curve.field_len() {
            return None;
        }
        match curve {
            EcCurve::P256 => public_from_coordinates(x, y).map(Self::P256),
            EcCurve::P384 => public_from_coordinates(x, y).map(Self::P384),
            EcCurve::P521 => public_from_coordinates(x, y).map(Self::P521),
        }
    }

    /// The key's curve.
    pub fn curve(&self) -> EcCurve {
        match self {
            Self::P256(_) => EcCurve::P256,
            Self::P384(_) => EcCurve::P384,
            Self::P521(_) => EcCurve::P521,
        }
    }

    /// The affine coordinates `(x, y)`.
    pub fn coordinates(&self) -> Option<(Vec<u8>, Vec<u8>)> {
        match self {
            Self::P256(pk) => coordinates(pk),
            Self::P384(pk) => coordinates(pk),
            Self::P521(pk) => coordinates(pk),
        }
    }

    /// The public key as an `EC` JWK.
    pub fn to_jwk(&self) -> Option<Jwk> {
        let (x, y) = self.coordinates()?;
        let mut jwk = Jwk::new("EC");
        jwk.crv = Some(self.curve().as_str().to_string());
        jwk.x = Some(b64_encode(x));
        jwk.y = Some(b64_encode(y));
        Some(jwk)
    }

    /// Parse an `EC` JWK carrying only public members.
    pub fn from_jwk(jwk: &Jwk) -> Option<Self> {
        if jwk.kty != "EC" {
            return None;
        }
        let curve = curve_from_name(jwk.crv.as_deref()?)?;
        let x = b64_decode(jwk.x.as_deref()?).ok()?;
        let y = b64_decode(jwk.y.as_deref()?).ok()?;
        Self::from_coordinates(curve, &x, &y)
    }
}

fn coordinates<C>(public: &PublicKey<C>) -> Option<(Vec<u8>, Vec<u8>)>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let point = public.to_encoded_point(false);
    Some((point.x()?.to_vec(), point.y()?.to_vec()))
}

fn public_from_coordinates<C>(x: &[u8], y: &[u8]) -> Option<PublicKey<C>>
where
    C: CurveArithmetic,
    AffinePoint<C>: FromEncodedPoint<C> + ToEncodedPoint<C>,
    FieldBytesSize<C>: ModulusSize,
{
    let mut sec1 = Vec::with_capacity(1 + x.len() + y.len());
    sec1.push(0x04);
    sec1.extend_from_slice(x);
    sec1.extend_from_slice(y);
    PublicKey::from_sec1_bytes(&sec1).ok()
}

fn curve_from_name(name: &str) -> Option<EcCurve> {
    [EcCurve::P256, EcCurve::P384, EcCurve::P521]
        .into_iter()
        .find(|c| c.as_str() == name)
}

// ─── Key Material ────────────────────────────────────────────────────

/// Secret key material for one material key.
pub enum KeyMaterial {
    /// Symmetric key bytes.
    Octet(Zeroizing<Vec<u8>>),
    /// RSA key pair.
    Rsa(Box<RsaPrivateKey>),
    /// EC key pair.
    Ec(EcPrivateKey),
    /// Ed25519 key pair.
    Ed25519(Box<ed25519_dalek::SigningKey>),
}

impl KeyMaterial {
    /// Generate fresh material of the given shape from the OS RNG.
    pub fn generate(shape: KeyShape) -> Result<Self, CryptoError> {
        match shape {
            KeyShape::Octet { len } => {
                let mut bytes = Zeroizing::new(vec![0u8; len]);
                OsRng.fill_bytes(&mut bytes);
                Ok(Self::Octet(bytes))
            }
            KeyShape::Rsa { bits } => RsaPrivateKey::new(&mut OsRng, bits)
                .map(|key| Self::Rsa(Box::new(key)))
                .map_err(|_| CryptoError::KeyGenerationFailed),
            KeyShape::Ec(curve) => Ok(Self::Ec(EcPrivateKey::generate(curve))),
            KeyShape::Ed25519 => Ok(Self::Ed25519(Box::new(
                ed25519_dalek::SigningKey::generate(&mut OsRng),
            ))),
        }
    }

    /// The shape of this material.
    pub fn shape(&self) -> KeyShape {
        match self {
            Self::Octet(bytes) => KeyShape::Octet { len: bytes.len() },
            Self::Rsa(key) => KeyShape::Rsa {
                bits: key.n().bits(),
            },
            Self::Ec(key) => KeyShape::Ec(key.curve()),
            Self::Ed25519(_) => KeyShape::Ed25519,
        }
    }

    /// Symmetric key bytes, if this is octet material.
    pub fn octets(&self) -> Option<&[u8]> {
        match self {
            Self::Octet(bytes) => Some(bytes.as_slice()),
            _ => None,
        }
    }

    /// The RSA key pair, if this is RSA material.
    pub fn rsa(&self) -> Option<&RsaPrivateKey> {
        match self {
            Self::Rsa(key) => Some(key),
            _ => None,
        }
    }

    /// The EC key pair, if this is EC material.
    pub fn ec(&self) -> Option<&EcPrivateKey> {
        match self {
            Self::Ec(key) => Some(key),
            _ => None,
        }
    }

    /// The Ed25519 key pair, if this is Ed25519 material.
    pub fn ed25519(&self) -> Option<&ed25519_dalek::SigningKey> {
        match self {
            Self::Ed25519(key) => Some(key),
            _ => None,
        }
    }

    /// The public JWK for asymmetric material; `None` for octets.
    pub fn public_jwk(&self) -> Option<Jwk> {
        match self {
            Self::Octet(_) => None,
            Self::Rsa(key) => {
                let mut jwk = Jwk::new("RSA");
                jwk.n = Some(b64_encode(key.n().to_bytes_be()));
                jwk.e = Some(b64_encode(key.e().to_bytes_be()));
                Some(jwk)
            }
            Self::Ec(key) => key.public_key().to_jwk(),
            Self::Ed25519(key) => {
                let mut jwk = Jwk::new("OKP");
                jwk.crv = Some("Ed25519".to_string());
                jwk.x = Some(b64_encode(key.verifying_key().to_bytes()));
                Some(jwk)
            }
        }
    }

    /// The complete private JWK, including public members.
    pub fn to_private_jwk(&self) -> Jwk {
        match self {
            Self::Octet(bytes) => {
                let mut jwk = Jwk::new("oct");
                jwk.k = Some(b64_encode(bytes.as_slice()));
                jwk
            }
            Self::Rsa(key) => rsa_private_jwk(key),
            Self::Ec(key) => {
                let mut jwk = key.public_key().to_jwk().unwrap_or_else(|| Jwk::new("EC"));
                jwk.crv = Some(key.curve().as_str().to_string());
                jwk.d = Some(b64_encode(key.scalar().as_slice()));
                jwk
            }
            Self::Ed25519(key) => {
                let mut jwk = Jwk::new("OKP");
                jwk.crv = Some("Ed25519".to_string());
                jwk.x = Some(b64_encode(key.verifying_key().to_bytes()));
                jwk.d = Some(b64_encode(key.to_bytes()));
                jwk
            }
        }
    }

    /// Build material from a private JWK, requiring it to have exactly the
    /// `expected` shape.
    pub fn from_jwk(jwk: &Jwk, expected: KeyShape) -> Result<Self, ValidationError> {
        let material = match expected {
            KeyShape::Octet { .. } => {
                require_kty(jwk, "oct")?;
                let k = decode_member(jwk.k.as_deref(), "k")?;
                Self::Octet(k)
            }
            KeyShape::Rsa { .. } => {
                require_kty(jwk, "RSA")?;
                Self::Rsa(Box::new(rsa_from_jwk(jwk)?))
            }
            KeyShape::Ec(curve) => {
                require_kty(jwk, "EC")?;
                require_crv(jwk, curve.as_str())?;
                let d = decode_member(jwk.d.as_deref(), "d")?;
                let key = EcPrivateKey::from_scalar(curve, &d)
                    .ok_or_else(|| invalid("d is not a valid private scalar for the curve"))?;
                if jwk.x.is_some() || jwk.y.is_some() {
                    let stated = EcPublicKey::from_jwk(jwk)
                        .ok_or_else(|| invalid("x/y is not a valid point on the curve"))?;
                    if stated != key.public_key() {
                        return Err(invalid("x/y does not match d"));
                    }
                }
                Self::Ec(key)
            }
            KeyShape::Ed25519 => {
                require_kty(jwk, "OKP")?;
                require_crv(jwk, "Ed25519")?;
                let d = decode_member(jwk.d.as_deref(), "d")?;
                let seed: [u8; 32] = d
                    .as_slice()
                    .try_into()
                    .map_err(|_| invalid("d must be 32 bytes"))?;
                let key = ed25519_dalek::SigningKey::from_bytes(&seed);
                if let Some(x) = jwk.x.as_deref() {
                    let x = b64_decode(x).map_err(|_| invalid("x is not base64url"))?;
                    if x.as_slice() != key.verifying_key().as_bytes() {
                        return Err(invalid("x does not match d"));
                    }
                }
                Self::Ed25519(Box::new(key))
            }
        };
        let actual = material.shape();
        if actual != expected {
            return Err(invalid(&format!("expected {expected}, got {actual}")));
        }
        Ok(material)
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "KeyMaterial({}, [REDACTED])", self.shape())
    }
}

fn invalid(reason: &str) -> ValidationError {
    ValidationError::InvalidKeyMaterial {
        reason: reason.to_string(),
    }
}

fn require_kty(jwk: &Jwk, kty: &str) -> Result<(), ValidationError> {
    if jwk.kty != kty {
        return Err(invalid(&format!("expected kty {kty:?}, got {:?}", jwk.kty)));
    }
    Ok(())
}

fn require_crv(jwk: &Jwk, crv: &str) -> Result<(), ValidationError> {
    match jwk.crv.as_deref() {
        Some(actual) if actual == crv => Ok(()),
        Some(actual) => Err(invalid(&format!("expected crv {crv:?}, got {actual:?}"))),
        None => Err(invalid("missing crv")),
    }
}

fn decode_member(
    value: Option<&str>,
    name: &'static str,
) -> Result<Zeroizing<Vec<u8>>, ValidationError> {
    let value = value.ok_or_else(|| invalid(&format!("missing {name}")))?;
    b64_decode(value)
        .map(Zeroizing::new)
        .map_err(|_| invalid(&format!("{name} is not base64url")))
}

fn rsa_from_jwk(jwk: &Jwk) -> Result<RsaPrivateKey, ValidationError> {
    let component = |value: Option<&str>, name: &'static str| {
        decode_member(value, name).map(|bytes| BigUint::from_bytes_be(&bytes))
    };
    let n = component(jwk.n.as_deref(), "n")?;
    let e = component(jwk.e.as_deref(), "e")?;
    let d = component(jwk.d.as_deref(), "d")?;
    let p = component(jwk.p.as_deref(), "p")?;
    let q = component(jwk.q.as_deref(), "q")?;
    let key = RsaPrivateKey::from_components(n, e, d, vec![p, q])
        .map_err(|_| invalid("RSA components are inconsistent"))?;
    key.validate()
        .map_err(|_| invalid("RSA components are inconsistent"))?;
    Ok(key)
}

fn rsa_private_jwk(key: &RsaPrivateKey) -> Jwk {
    let mut jwk = Jwk::new("RSA");
    jwk.n = Some(b64_encode(key.n().to_bytes_be()));
    jwk.e = Some(b64_encode(key.e().to_bytes_be()));
    jwk.d = Some(b64_encode(Zeroizing::new(key.d().to_bytes_be()).as_slice()));
    if let [p, q] = key.primes() {
        let one = BigUint::from(1u8);
        let two = BigUint::from(2u8);
        let dp = key.d() % &(p - &one);
        let dq = key.d() % &(q - &one);
        // p is prime, so q^(p-2) mod p is the inverse of q.
        let qi = q.modpow(&(p - &two), p);
        jwk.p = Some(b64_encode(Zeroizing::new(p.to_bytes_be()).as_slice()));
        jwk.q = Some(b64_encode(Zeroizing::new(q.to_bytes_be()).as_slice()));
        jwk.dp = Some(b64_encode(Zeroizing::new(dp.to_bytes_be()).as_slice()));
        jwk.dq = Some(b64_encode(Zeroizing::new(dq.to_bytes_be()).as_slice()));
        jwk.qi = Some(b64_encode(Zeroizing::new(qi.to_bytes_be()).as_slice()));
    }
    jwk
}

// ─── Data Keys ───────────────────────────────────────────────────────

/// Key types that can be generated as exportable data keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataKeyAlgorithm {
    /// RSA 4096-bit.
    Rsa4096,
    /// RSA 3072-bit.
    Rsa3072,
    /// RSA 2048-bit.
    Rsa2048,
    /// EC P-521.
    EcP521,
    /// EC P-384.
    EcP384,
    /// EC P-256.
    EcP256,
    /// Ed25519.
    OkpEd25519,
    /// 512-bit symmetric.
    Oct512,
    /// 384-bit symmetric.
    Oct384,
    /// 256-bit symmetric.
    Oct256,
    /// 192-bit symmetric.
    Oct192,
    /// 128-bit symmetric.
    Oct128,
}

impl DataKeyAlgorithm {
    /// All data key algorithms.
    pub fn all() -> &'static [DataKeyAlgorithm] {
        &[
            Self::Rsa4096,
            Self::Rsa3072,
            Self::Rsa2048,
            Self::EcP521,
            Self::EcP384,
            Self::EcP256,
            Self::OkpEd25519,
            Self::Oct512,
            Self::Oct384,
            Self::Oct256,
            Self::Oct192,
            Self::Oct128,
        ]
    }

    /// The identifier, e.g. `RSA/2048` or `oct/256`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa4096 => "RSA/4096",
            Self::Rsa3072 => "RSA/3072",
            Self::Rsa2048 => "RSA/2048",
            Self::EcP521 => "EC/P521",
            Self::EcP384 => "EC/P384",
            Self::EcP256 => "EC/P256",
            Self::OkpEd25519 => "OKP/Ed25519",
            Self::Oct512 => "oct/512",
            Self::Oct384 => "oct/384",
            Self::Oct256 => "oct/256",
            Self::Oct192 => "oct/192",
            Self::Oct128 => "oct/128",
        }
    }

    /// The key shape generated.
    pub fn key_shape(&self) -> KeyShape {
        match self {
            Self::Rsa4096 => KeyShape::Rsa { bits: 4096 },
            Self::Rsa3072 => KeyShape::Rsa { bits: 3072 },
            Self::Rsa2048 => KeyShape::Rsa { bits: 2048 },
            Self::EcP521 => KeyShape::Ec(EcCurve::P521),
            Self::EcP384 => KeyShape::Ec(EcCurve::P384),
            Self::EcP256 => KeyShape::Ec(EcCurve::P256),
            Self::OkpEd25519 => KeyShape::Ed25519,
            Self::Oct512 => KeyShape::Octet { len: 64 },
            Self::Oct384 => KeyShape::Octet { len: 48 },
            Self::Oct256 => KeyShape::Octet { len: 32 },
            Self::Oct192 => KeyShape::Octet { len: 24 },
            Self::Oct128 => KeyShape::Octet { len: 16 },
        }
    }
}

impl std::fmt::Display for DataKeyAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKeyAlgorithm {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidGenerateAlgorithm(s.to_string()))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(shape: KeyShape) {
        let material = KeyMaterial::generate(shape).unwrap();
        assert_eq!(material.shape(), shape);
        let jwk = material.to_private_jwk();
        let restored = KeyMaterial::from_jwk(&jwk, shape).unwrap();
        assert_eq!(restored.shape(), shape);
        assert_eq!(restored.public_jwk(), material.public_jwk());
        assert_eq!(restored.to_private_jwk(), jwk);
    }

    #[test]
    fn test_octet_roundtrip() {
        for len in [16, 24, 32, 48, 64] {
            roundtrip(KeyShape::Octet { len });
        }
    }

    #[test]
    fn test_ec_roundtrip() {
        for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521] {
            roundtrip(KeyShape::Ec(curve));
        }
    }

    #[test]
    fn test_ed25519_roundtrip() {
        roundtrip(KeyShape::Ed25519);
    }

    #[test]
    fn test_rsa_roundtrip_with_crt_members() {
        let material = KeyMaterial::generate(KeyShape::Rsa { bits: 2048 }).unwrap();
        let jwk = material.to_private_jwk();
        for member in [&jwk.p, &jwk.q, &jwk.dp, &jwk.dq, &jwk.qi] {
            assert!(member.is_some());
        }
        let restored = KeyMaterial::from_jwk(&jwk, KeyShape::Rsa { bits: 2048 }).unwrap();
        assert_eq!(restored.public_jwk(), material.public_jwk());
    }

    #[test]
    fn test_rsa_size_mismatch_rejected() {
        let material = KeyMaterial::generate(KeyShape::Rsa { bits: 2048 }).unwrap();
        let err = KeyMaterial::from_jwk(&material.to_private_jwk(), KeyShape::Rsa { bits: 3072 })
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidKeyMaterial { .. }));
    }

    #[test]
    fn test_octet_length_mismatch_rejected() {
        let material = KeyMaterial::generate(KeyShape::Octet { len: 16 }).unwrap();
        let err = KeyMaterial::from_jwk(&material.to_private_jwk(), KeyShape::Octet { len: 32 })
            .unwrap_err();
        assert!(err.to_string().contains("oct/256"), "{err}");
    }

    #[test]
    fn test_wrong_kty_rejected() {
        let material = KeyMaterial::generate(KeyShape::Ed25519).unwrap();
        let err = KeyMaterial::from_jwk(&material.to_private_jwk(), KeyShape::Octet { len: 32 })
            .unwrap_err();
        assert!(err.to_string().contains("kty"), "{err}");
    }

    #[test]
    fn test_wrong_curve_rejected() {
        let material = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let err = KeyMaterial::from_jwk(&material.to_private_jwk(), KeyShape::Ec(EcCurve::P384))
            .unwrap_err();
        assert!(err.to_string().contains("crv"), "{err}");
    }

    #[test]
    fn test_ec_public_mismatch_rejected() {
        let a = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let b = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let mut jwk = a.to_private_jwk();
        let other = b.to_private_jwk();
        jwk.x = other.x.clone();
        jwk.y = other.y.clone();
        assert!(KeyMaterial::from_jwk(&jwk, KeyShape::Ec(EcCurve::P256)).is_err());
    }

    #[test]
    fn test_missing_private_member_rejected() {
        let material = KeyMaterial::generate(KeyShape::Ec(EcCurve::P256)).unwrap();
        let public = material.public_jwk().unwrap();
        let err = KeyMaterial::from_jwk(&public, KeyShape::Ec(EcCurve::P256)).unwrap_err();
        assert!(err.to_string().contains("missing d"), "{err}");
    }

    #[test]
    fn test_public_jwk_has_no_private_members() {
        for shape in [KeyShape::Ec(EcCurve::P384), KeyShape::Ed25519] {
            let material = KeyMaterial::generate(shape).unwrap();
            assert!(!material.public_jwk().unwrap().is_private());
        }
        let octets = KeyMaterial::generate(KeyShape::Octet { len: 32 }).unwrap();
        assert!(octets.public_jwk().is_none());
    }

    #[test]
    fn test_debug_redacts_material() {
        let material = KeyMaterial::generate(KeyShape::Octet { len: 16 }).unwrap();
        let k = material.to_private_jwk().k.clone().unwrap();
        let rendered = format!("{material:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&k));
    }

    #[test]
    fn test_data_key_algorithm_parse() {
        for alg in DataKeyAlgorithm::all() {
            assert_eq!(alg.as_str().parse::<DataKeyAlgorithm>().unwrap(), *alg);
        }
        assert_eq!(
            "RSA/1024".parse::<DataKeyAlgorithm>(),
            Err(ValidationError::InvalidGenerateAlgorithm("RSA/1024".to_string()))
        );
    }
}
