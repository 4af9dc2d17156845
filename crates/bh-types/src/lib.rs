//! Foundation types for Blockhouse.
//!
//! Every other Blockhouse crate depends on `bh-types`. It owns the block
//! abstraction, including the hashing that derives a block's identifier:
//! the storage and service layers only ever carry identifiers around.
//!
//! # Key Types
//!
//! - [`Multihash`] — Self-describing content identifier (BLAKE3-256 by default)
//! - [`Extension`] — Format tag selecting how a store encodes a block
//! - [`Block`] — Immutable identifier + optional extension + payload

pub mod block;
pub mod error;
pub mod extension;
pub mod multihash;

pub use block::Block;
pub use error::TypeError;
pub use extension::Extension;
pub use multihash::{Multihash, BLAKE3_256, IDENTITY, SHA2_256};
