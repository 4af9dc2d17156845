use std::collections::HashMap;
use std::io::Cursor;
use std::sync::RwLock;

use async_trait::async_trait;
use bh_types::{Extension, Multihash};
use bytes::Bytes;

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockReader, BlockStore};

type Key = (Multihash, String);

/// In-memory, HashMap-based block store.
///
/// Intended for tests and embedding. Payloads are held as `Bytes`, so reads
/// hand out cheap clones of the stored buffer.
pub struct InMemoryBlockStore {
    blocks: RwLock<HashMap<Key, Bytes>>,
}

impl InMemoryBlockStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blocks: RwLock::new(HashMap::new()),
        }
    }

    /// Number of entries currently stored.
    pub fn len(&self) -> usize {
        self.blocks.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.blocks.read().expect("lock poisoned").is_empty()
    }

    /// Total payload bytes across all entries.
    pub fn total_bytes(&self) -> u64 {
        self.blocks
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.blocks.write().expect("lock poisoned").clear();
    }

    /// Sorted `(multihash, extension)` pairs of everything stored.
    pub fn keys(&self) -> Vec<(Multihash, String)> {
        let map = self.blocks.read().expect("lock poisoned");
        let mut keys: Vec<Key> = map.keys().cloned().collect();
        keys.sort();
        keys
    }

    fn key_for(key: &Multihash, extension: Option<&Extension>) -> StoreResult<Key> {
        if key.is_null() {
            return Err(StoreError::InvalidKey("null multihash".into()));
        }
        Ok((key.clone(), Extension::resolve(extension).to_string()))
    }
}

impl Default for InMemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for InMemoryBlockStore {
    async fn write(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
        data: Bytes,
    ) -> StoreResult<()> {
        let key = Self::key_for(key, extension)?;
        self.blocks.write().expect("lock poisoned").insert(key, data);
        Ok(())
    }

    async fn read(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> StoreResult<BlockReader> {
        let k = Self::key_for(key, extension)?;
        let data = self
            .blocks
            .read()
            .expect("lock poisoned")
            .get(&k)
            .cloned()
            .ok_or_else(|| StoreError::not_found(key, &k.1))?;
        Ok(Box::pin(Cursor::new(data)))
    }

    async fn remove(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<()> {
        let k = Self::key_for(key, extension)?;
        match self.blocks.write().expect("lock poisoned").remove(&k) {
            Some(_) => Ok(()),
            None => Err(StoreError::not_found(key, &k.1)),
        }
    }

    async fn exists(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<bool> {
        let k = Self::key_for(key, extension)?;
        Ok(self.blocks.read().expect("lock poisoned").contains_key(&k))
    }
}

impl std::fmt::Debug for InMemoryBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlockStore")
            .field("block_count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn read_all(store: &InMemoryBlockStore, key: &Multihash, ext: Option<&Extension>) -> Vec<u8> {
        let mut reader = store.read(key, ext).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        buf
    }

    #[tokio::test]
    async fn write_and_read() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"hello world");
        store
            .write(&key, None, Bytes::from_static(b"hello world"))
            .await
            .unwrap();
        assert_eq!(read_all(&store, &key, None).await, b"hello world");
    }

    #[tokio::test]
    async fn keys_from_other_hash_functions_are_stored() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::wrap(bh_types::SHA2_256, &[0xab; 32]);
        store.write(&key, None, Bytes::from_static(b"sha2")).await.unwrap();
        assert_eq!(read_all(&store, &key, None).await, b"sha2");
        assert!(!store
            .exists(&Multihash::wrap(bh_types::BLAKE3_256, &[0xab; 32]), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn unspecified_extension_is_data() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"x");
        store.write(&key, None, Bytes::from_static(b"x")).await.unwrap();
        let data = Extension::data();
        assert!(store.exists(&key, Some(&data)).await.unwrap());
        assert_eq!(store.keys(), vec![(key, "data".to_string())]);
    }

    #[tokio::test]
    async fn extensions_are_separate_entries() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"shared");
        let raw = Extension::new("raw").unwrap();
        store.write(&key, None, Bytes::from_static(b"one")).await.unwrap();
        store
            .write(&key, Some(&raw), Bytes::from_static(b"two"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(read_all(&store, &key, None).await, b"one");
        assert_eq!(read_all(&store, &key, Some(&raw)).await, b"two");
    }

    #[tokio::test]
    async fn read_missing_is_not_found() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"missing");
        let err = store.read(&key, None).await.err().unwrap();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn remove_twice_fails_second_time() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"to-delete");
        store
            .write(&key, None, Bytes::from_static(b"to-delete"))
            .await
            .unwrap();
        store.remove(&key, None).await.unwrap();
        assert!(!store.exists(&key, None).await.unwrap());
        let err = store.remove(&key, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn null_key_is_rejected() {
        let store = InMemoryBlockStore::new();
        let err = store
            .write(&Multihash::null(), None, Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn overwrite_replaces_payload() {
        let store = InMemoryBlockStore::new();
        let key = Multihash::digest(b"k");
        store.write(&key, None, Bytes::from_static(b"old")).await.unwrap();
        store.write(&key, None, Bytes::from_static(b"new!")).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.total_bytes(), 4);
        assert_eq!(read_all(&store, &key, None).await, b"new!");
    }

    #[test]
    fn clear_and_debug() {
        let store = InMemoryBlockStore::default();
        assert!(store.is_empty());
        store.clear();
        let debug = format!("{store:?}");
        assert!(debug.contains("InMemoryBlockStore"));
        assert!(debug.contains("block_count"));
    }
}
