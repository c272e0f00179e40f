//! # kms-service: Elastic Key Pool Service
//!
//! Orchestrates pools, material keys, and JOSE operations over pluggable
//! stores.
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`store`] | `PoolStore` / `MaterialKeyStore` adapter traits |
//! | [`memory`] | In-memory store implementations |
//! | [`context`] | Request deadline and cancellation |
//! | [`locks`] | Per-pool lock arena |
//! | [`pools`] | Pool creation, validation, lifecycle |
//! | [`materials`] | Material key generation, import, revocation |
//! | [`selector`] | Current-key and by-`kid` selection |
//! | [`engine`] | Encrypt, decrypt, sign, verify, data keys |
//! | [`service`] | The [`KeyPoolService`] facade |
//! | [`config`] | [`ServiceConfig`] loading |
//!
//! ## Crate Policy
//!
//! - Stores are reached only through `Arc<dyn PoolStore>` and
//!   `Arc<dyn MaterialKeyStore>`; the only global state is the immutable
//!   algorithm catalog.
//! - Nothing is retried. Storage failures surface as `KmsError::Storage`.
//! - No secret material in any log line or error.

pub mod config;
pub mod context;
pub mod engine;
pub mod locks;
pub mod materials;
pub mod memory;
pub mod pools;
pub mod selector;
pub mod service;
pub mod store;

pub use config::{ConfigError, ServiceConfig};
pub use context::{CancellationToken, RequestContext};
pub use engine::{CryptoEngine, DataKey, Decrypted, Verified};
pub use materials::MaterialKeyManager;
pub use memory::{InMemoryMaterialKeyStore, InMemoryPoolStore};
pub use pools::{CreatePool, PoolManager};
pub use selector::KeySelector;
pub use service::KeyPoolService;
pub use store::{MaterialKeyStore, PoolFilter, PoolStore, StoreError, WriteCondition};
