//! # kms-state: Pool Lifecycle and Material Key Records
//!
//! - **Pool** (`pool.rs`): the elastic key pool entity and its lifecycle
//!   state machine (`PendingImport → Active ⇄ Disabled`, soft deletion),
//!   plus per-status operation gating.
//!
//! - **Material** (`material.rs`): the metadata view of a material key, the
//!   stored record with its secret, and the recency order used to select
//!   the current key.
//!
//! ## Design
//!
//! Pool statuses are a closed enum with validated transitions rather than
//! typestate types: pools are loaded from a store whose status is only known
//! at runtime, so every transition returns `Result` and the store persists
//! the updated entity.

pub mod material;
pub mod pool;

pub use material::{compare_recency, latest_usable, KeyOrigin, MaterialKey, StoredMaterialKey};
pub use pool::{
    ElasticKeyPool, ElasticKeyStatus, PoolDefinition, PoolOperation, PoolTransitionRecord,
};
