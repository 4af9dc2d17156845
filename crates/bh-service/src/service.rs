use std::sync::Arc;

use bh_exchange::Exchange;
use bh_store::{BlockStore, StoreError};
use bh_types::{Block, Extension, Multihash};
use bytes::Bytes;
use tokio::io::AsyncReadExt;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::batch::fan_out;
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};

/// Block access layer over a local store and a remote exchange.
///
/// The service keeps no state of its own besides the concurrency limiter:
/// every call goes straight to the store, nothing is cached, and calls do not
/// depend on one another. Cloning is cheap and clones share collaborators and
/// the limiter.
pub struct BlockService<S: BlockStore + ?Sized, E: Exchange + ?Sized> {
    store: Arc<S>,
    exchange: Arc<E>,
    config: ServiceConfig,
    limiter: Option<Arc<Semaphore>>,
}

impl<S, E> BlockService<S, E>
where
    S: BlockStore + ?Sized + 'static,
    E: Exchange + ?Sized + 'static,
{
    /// Create a service with the default configuration.
    pub fn new(store: Arc<S>, exchange: Arc<E>) -> Self {
        Self::with_config(store, exchange, ServiceConfig::default())
    }

    /// Create a service with `config`. A `max_concurrency` above
    /// [`Semaphore::MAX_PERMITS`] is clamped to it; use
    /// [`ServiceConfig::validate`] to reject such values instead.
    pub fn with_config(store: Arc<S>, exchange: Arc<E>, config: ServiceConfig) -> Self {
        let limiter = config
            .concurrency_limit()
            .map(|n| Arc::new(Semaphore::new(n.min(Semaphore::MAX_PERMITS))));
        Self {
            store,
            exchange,
            config,
            limiter,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn exchange(&self) -> &Arc<E> {
        &self.exchange
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    // ---- Single-item operations ----

    /// Persist a block under its identifier and extension.
    pub async fn add_block(&self, block: &Block) -> ServiceResult<()> {
        check_key(block.key())?;
        self.store
            .write(block.key(), block.extension(), block.data().clone())
            .await?;
        debug!(
            key = %block.key().short_hex(),
            ext = Extension::resolve(block.extension()),
            len = block.len(),
            "block added"
        );

        if self.config.announce_blocks {
            // The block is durable at this point; a failed announcement does
            // not undo the add.
            if let Err(e) = self.exchange.announce(block).await {
                warn!(key = %block.key().short_hex(), error = %e, "block announcement failed");
            }
        }
        Ok(())
    }

    /// Fetch a block, buffering the stored payload in full.
    ///
    /// The returned block carries `extension` as requested, not whatever tag
    /// the block was originally added with.
    pub async fn get_block(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> ServiceResult<Block> {
        check_key(key)?;
        let data = match self.read_local(key, extension).await {
            Ok(data) => data,
            Err(e) if e.is_not_found() && self.config.exchange_fallback => {
                match self.fetch_remote(key, extension).await? {
                    Some(data) => data,
                    None => return Err(ServiceError::Store(e)),
                }
            }
            Err(e) => return Err(ServiceError::Store(e)),
        };
        debug!(
            key = %key.short_hex(),
            ext = Extension::resolve(extension),
            len = data.len(),
            "block fetched"
        );
        Ok(Block::with_extension(data, extension.cloned()))
    }

    /// Remove a block from the store.
    pub async fn delete_block(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> ServiceResult<()> {
        check_key(key)?;
        self.store.remove(key, extension).await?;
        debug!(key = %key.short_hex(), ext = Extension::resolve(extension), "block deleted");
        Ok(())
    }

    /// Whether the local store holds the block. Never consults the exchange.
    pub async fn has_block(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> ServiceResult<bool> {
        check_key(key)?;
        Ok(self.store.exists(key, extension).await?)
    }

    // ---- Batch operations ----

    /// Add every block concurrently.
    ///
    /// Fails if any add fails; blocks that were written stay written.
    pub async fn add_blocks(&self, blocks: impl IntoIterator<Item = Block>) -> ServiceResult<()> {
        let blocks: Vec<Block> = blocks.into_iter().collect();
        fan_out("add_blocks", blocks, self.limiter.as_ref(), |block| {
            let this = self.clone();
            async move { this.add_block(&block).await }
        })
        .await
        .map(|_| ())
    }

    /// Fetch every block concurrently. The result is in input order.
    ///
    /// Fails if any fetch fails, discarding the blocks that were fetched.
    pub async fn get_blocks(
        &self,
        keys: impl IntoIterator<Item = Multihash>,
        extension: Option<&Extension>,
    ) -> ServiceResult<Vec<Block>> {
        let keys: Vec<Multihash> = keys.into_iter().collect();
        fan_out("get_blocks", keys, self.limiter.as_ref(), |key| {
            let this = self.clone();
            let extension = extension.cloned();
            async move { this.get_block(&key, extension.as_ref()).await }
        })
        .await
    }

    /// Delete every block concurrently.
    ///
    /// Fails if any delete fails; deletions that went through are not undone.
    pub async fn delete_blocks(
        &self,
        keys: impl IntoIterator<Item = Multihash>,
        extension: Option<&Extension>,
    ) -> ServiceResult<()> {
        let keys: Vec<Multihash> = keys.into_iter().collect();
        fan_out("delete_blocks", keys, self.limiter.as_ref(), |key| {
            let this = self.clone();
            let extension = extension.cloned();
            async move { this.delete_block(&key, extension.as_ref()).await }
        })
        .await
        .map(|_| ())
    }

    // ---- Internals ----

    async fn read_local(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> Result<Bytes, StoreError> {
        let mut reader = self.store.read(key, extension).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(Bytes::from(buf))
    }

    /// Ask the exchange for a block and persist it locally on a hit.
    async fn fetch_remote(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> ServiceResult<Option<Bytes>> {
        let Some(data) = self.exchange.want(key).await? else {
            return Ok(None);
        };
        self.store.write(key, extension, data.clone()).await?;
        info!(key = %key.short_hex(), len = data.len(), "block filled from exchange");
        Ok(Some(data))
    }
}

impl<S: BlockStore + ?Sized, E: Exchange + ?Sized> Clone for BlockService<S, E> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            exchange: Arc::clone(&self.exchange),
            config: self.config.clone(),
            limiter: self.limiter.clone(),
        }
    }
}

impl<S: BlockStore + ?Sized, E: Exchange + ?Sized> std::fmt::Debug for BlockService<S, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockService")
            .field("config", &self.config)
            .finish()
    }
}

fn check_key(key: &Multihash) -> ServiceResult<()> {
    key.validate()
        .map_err(|e| ServiceError::InvalidArgument(format!("invalid multihash: {e}")))
}
