//! Block service for Blockhouse.
//!
//! [`BlockService`] is the block access layer: single-item and batched
//! add/get/delete over a [`BlockStore`], with an [`Exchange`] consulted on
//! store misses when [`ServiceConfig::exchange_fallback`] is set.
//!
//! # Batch semantics
//!
//! 1. Items run concurrently as independent tasks, at most
//!    [`ServiceConfig::max_concurrency`] at a time across the service.
//! 2. A batch succeeds only if every item succeeds. Otherwise it fails with
//!    [`ServiceError::Batch`], carrying the lowest-index item error.
//! 3. A failure never cancels siblings and nothing is rolled back.
//! 4. `get_blocks` returns blocks in input order.

mod batch;
pub mod config;
pub mod error;
pub mod service;

pub use config::ServiceConfig;
pub use error::{ServiceError, ServiceResult};
pub use service::BlockService;

// Re-export collaborator types so callers can depend on this crate alone.
pub use bh_exchange::{Exchange, ExchangeError, InMemoryExchange, OfflineExchange};
pub use bh_store::{BlockStore, FsBlockStore, InMemoryBlockStore, StoreError};
pub use bh_types::{Block, Extension, Multihash};

/// A service over type-erased collaborators.
pub type DynBlockService = BlockService<dyn BlockStore, dyn Exchange>;
