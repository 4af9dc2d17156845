use async_trait::async_trait;
use bh_types::{Block, Multihash};
use bytes::Bytes;

use crate::error::ExchangeResult;

/// Interface to a remote content-exchange network.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// Ask the network for the payload of `key`.
    ///
    /// `Ok(None)` means no reachable peer has the block.
    async fn want(&self, key: &Multihash) -> ExchangeResult<Option<Bytes>>;

    /// Tell the network that `block` is now available locally.
    async fn announce(&self, _block: &Block) -> ExchangeResult<()> {
        Ok(())
    }
}

/// An exchange with no peers: every `want` misses.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineExchange;

#[async_trait]
impl Exchange for OfflineExchange {
    async fn want(&self, _key: &Multihash) -> ExchangeResult<Option<Bytes>> {
        Ok(None)
    }
}
