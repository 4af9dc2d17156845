//! Block storage for Blockhouse.
//!
//! A store persists block payloads keyed by `(multihash, extension)`. Stores
//! never hash or interpret payloads; they are pure key-value backends.
//!
//! # Storage Backends
//!
//! All backends implement the [`BlockStore`] trait:
//!
//! - [`InMemoryBlockStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsBlockStore`] -- one file per block in a sharded directory tree
//!
//! # Contract
//!
//! 1. A write either lands completely or not at all; readers never see a
//!    partial payload.
//! 2. A missing key is reported as [`StoreError::NotFound`] by `read` and by
//!    `remove`, so removing the same key twice fails the second time.
//! 3. Keys with different extensions are independent entries.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsBlockStore;
pub use memory::InMemoryBlockStore;
pub use traits::{BlockReader, BlockStore};
