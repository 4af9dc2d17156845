use std::pin::Pin;

use async_trait::async_trait;
use bh_types::{Extension, Multihash};
use bytes::Bytes;
use tokio::io::AsyncRead;

use crate::error::StoreResult;

/// Readable stream over a stored payload.
pub type BlockReader = Pin<Box<dyn AsyncRead + Send>>;

/// Persistent block storage keyed by `(multihash, extension)`.
///
/// `None` for the extension means "unspecified"; implementations map it to
/// [`Extension::DEFAULT`]. Every method is a single request that completes
/// exactly once with either success or an error.
#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Store `data` under the key, replacing any previous payload.
    async fn write(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
        data: Bytes,
    ) -> StoreResult<()>;

    /// Open a stream over the stored payload.
    ///
    /// Returns `StoreError::NotFound` if nothing is stored under the key.
    async fn read(&self, key: &Multihash, extension: Option<&Extension>)
        -> StoreResult<BlockReader>;

    /// Remove the stored payload.
    ///
    /// Returns `StoreError::NotFound` if nothing is stored under the key.
    async fn remove(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<()>;

    /// Check whether a payload is stored under the key.
    async fn exists(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<bool>;
}
