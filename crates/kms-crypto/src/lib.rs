//! # kms-crypto: Algorithms, Key Material, and JOSE Messages
//!
//! Everything that touches key bytes lives here:
//!
//! - **Algorithm catalog.** The static identifier → [`AlgorithmSpec`] table
//!   with its startup consistency check ([`verify_catalog`]).
//! - **Key material.** [`KeyMaterial`] generation, JWK import/export, and
//!   data-key shapes ([`DataKeyAlgorithm`]).
//! - **JWE / JWS.** Compact serialization with `kid` and `ctx` in the
//!   protected header, and the algorithm-substitution check on the way in.
//!
//! ## Crate Policy
//!
//! - Depends only on `kms-core` internally.
//! - No mocking of cryptographic operations in tests. All tests use real
//!   keys and real primitives.
//! - Every failure is a unit `CryptoError`; no key bytes, plaintext, or
//!   integrity intermediates in any error or log line.

pub mod algorithm;
pub mod content;
pub mod encoding;
pub mod jwe;
pub mod jwk;
pub mod jws;
pub mod keymgmt;
pub mod material;

pub use algorithm::{
    resolve, verify_catalog, Algorithm, AlgorithmCatalog, AlgorithmFamily, AlgorithmSpec,
    CatalogError, ContentEncryption, EcCurve, KeyManagement, KeyShape, SignatureAlgorithm,
};
pub use jwe::{JweHeader, JweMessage};
pub use jwk::Jwk;
pub use jws::{JwsHeader, JwsMessage};
pub use material::{DataKeyAlgorithm, KeyMaterial};
