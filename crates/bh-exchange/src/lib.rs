//! Remote block exchange for Blockhouse.
//!
//! An [`Exchange`] resolves blocks the local store does not have. Peer
//! discovery, content routing and transfer all live behind this trait; the
//! block service only decides *when* to ask.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{ExchangeError, ExchangeResult};
pub use memory::InMemoryExchange;
pub use traits::{Exchange, OfflineExchange};
