use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bh_types::{Block, Multihash};
use bytes::Bytes;
use tracing::debug;

use crate::error::{ExchangeError, ExchangeResult};
use crate::traits::Exchange;

/// Exchange backed by a local map, standing in for a set of remote peers.
///
/// Records every `want` and `announce` so callers can observe how the
/// exchange was driven. Can be switched offline to simulate a network outage.
pub struct InMemoryExchange {
    blocks: RwLock<HashMap<Multihash, Bytes>>,
    announced: RwLock<Vec<Multihash>>,
    wants: AtomicUsize,
    online: AtomicBool,
}

impl InMemoryExchange {
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
            announced: RwLock::new(Vec::new()),
            wants: AtomicUsize::new(0),
            online: AtomicBool::new(true),
        }
    }

    /// Make `block` available from the "network".
    pub fn provide(&self, block: &Block) {
        self.blocks
            .write()
            .expect("lock poisoned")
            .insert(block.key().clone(), block.data().clone());
    }

    /// Number of `want` calls served so far.
    pub fn want_count(&self) -> usize {
        self.wants.load(Ordering::SeqCst)
    }

    /// Keys announced so far, in call order.
    pub fn announced(&self) -> Vec<Multihash> {
        self.announced.read().expect("lock poisoned").clone()
    }

    /// Fail every subsequent call with [`ExchangeError::Unavailable`] when `false`.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    fn check_online(&self) -> ExchangeResult<()> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ExchangeError::Unavailable("exchange is offline".into()))
        }
    }
}

impl Default for InMemoryExchange {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Exchange for InMemoryExchange {
    async fn want(&self, key: &Multihash) -> ExchangeResult<Option<Bytes>> {
        self.wants.fetch_add(1, Ordering::SeqCst);
        self.check_online()?;
        let found = self.blocks.read().expect("lock poisoned").get(key).cloned();
        debug!(key = %key.short_hex(), hit = found.is_some(), "exchange want");
        Ok(found)
    }

    async fn announce(&self, block: &Block) -> ExchangeResult<()> {
        self.check_online()?;
        self.announced
            .write()
            .expect("lock poisoned")
            .push(block.key().clone());
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryExchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryExchange")
            .field("block_count", &self.blocks.read().expect("lock poisoned").len())
            .field("wants", &self.want_count())
            .finish()
    }
}
