//! # JSON Web Keys
//!
//! [`Jwk`] is the interchange form for key material: imported keys arrive as
//! JWK documents, data keys leave as JWK documents, public keys are published
//! as JWKs, and the ECDH-ES ephemeral key travels as a JWK in the JWE header.
//!
//! ## Security Invariant
//!
//! A `Jwk` may hold private members (`d`, `p`, `q`, `k`, ...). It zeroizes
//! every member on drop and its `Debug` output names only the key type,
//! curve, and which members are present. Key conversion lives in
//! [`crate::material`]; this module is purely the document shape.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use kms_core::ValidationError;

/// A JSON Web Key (RFC 7517) for the `oct`, `RSA`, `EC`, and `OKP` key types.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Jwk {
    /// Key type: `oct`, `RSA`, `EC`, or `OKP`.
    pub kty: String,
    /// Key identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Intended algorithm.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Intended use (`enc` or `sig`).
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Curve (`EC`, `OKP`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// X coordinate (`EC`) or public key (`OKP`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// Y coordinate (`EC`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// Private scalar (`EC`, `OKP`) or private exponent (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
    /// Modulus (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// Public exponent (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
    /// First prime factor (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p: Option<String>,
    /// Second prime factor (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    /// First factor CRT exponent (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dp: Option<String>,
    /// Second factor CRT exponent (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dq: Option<String>,
    /// First CRT coefficient (`RSA`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qi: Option<String>,
    /// Symmetric key value (`oct`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<String>,
}

impl Jwk {
    /// An empty JWK of the given key type.
    pub fn new(kty: &str) -> Self {
        let mut jwk = Self::default();
        jwk.kty = kty.to_string();
        jwk
    }

    /// Parse a JWK document.
    ///
    /// The error reports only the position of the problem, never the input.
    pub fn from_json(text: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(text).map_err(|e| ValidationError::InvalidKeyMaterial {
            reason: format!(
                "not a JWK document (line {}, column {})",
                e.line(),
                e.column()
            ),
        })
    }

    /// Serialize to a JSON document that is wiped when dropped.
    pub fn to_json(&self) -> Result<Zeroizing<String>, serde_json::Error> {
        serde_json::to_string(self).map(Zeroizing::new)
    }

    /// Whether any private member is present.
    pub fn is_private(&self) -> bool {
        self.d.is_some() || self.k.is_some() || self.p.is_some() || self.q.is_some()
    }

    /// The public half of an asymmetric key. `None` for `oct` keys.
    pub fn to_public(&self) -> Option<Jwk> {
        if self.kty == "oct" {
            return None;
        }
        let mut public = Jwk::new(&self.kty);
        public.kid = self.kid.clone();
        public.alg = self.alg.clone();
        public.key_use = self.key_use.clone();
        public.crv = self.crv.clone();
        public.x = self.x.clone();
        public.y = self.y.clone();
        public.n = self.n.clone();
        public.e = self.e.clone();
        Some(public)
    }
}

impl std::fmt::Debug for Jwk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwk")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("alg", &self.alg)
            .field("crv", &self.crv)
            .field("private", &self.is_private())
            .finish_non_exhaustive()
    }
}
