use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use bh_types::{Extension, Multihash};
use bytes::Bytes;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufReader};
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlockReader, BlockStore};

/// Number of hex characters in a shard directory name.
const SHARD_LEN: usize = 2;

/// Filesystem block store: one file per block.
///
/// Layout: `<root>/<shard>/<hex>.<extension>`, where `<shard>` is the two hex
/// characters just before the last one ("next-to-last/2" sharding). Keys
/// shorter than three hex characters are left-padded with `_` to pick a shard.
///
/// Writes go to a temporary file in the shard directory and are renamed into
/// place once flushed, so a concurrent reader sees either the old payload,
/// the new one, or nothing.
pub struct FsBlockStore {
    root: PathBuf,
    tmp_counter: AtomicU64,
}

impl FsBlockStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "block store opened");
        Ok(Self {
            root,
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// The root directory of this store.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `key` under `extension`.
    pub fn block_path(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<PathBuf> {
        if key.is_null() {
            return Err(StoreError::InvalidKey("null multihash".into()));
        }
        let hex = key.to_hex();
        Ok(self
            .root
            .join(shard_of(&hex))
            .join(format!("{hex}.{}", Extension::resolve(extension))))
    }

    fn tmp_path(&self, target: &Path) -> PathBuf {
        let n = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!(".{name}.tmp-{}-{n}", std::process::id()))
    }
}

/// Next-to-last/2 shard name for a hex key.
fn shard_of(hex: &str) -> String {
    let padded = format!("{hex:_>width$}", width = SHARD_LEN + 1);
    let end = padded.len() - 1;
    padded[end - SHARD_LEN..end].to_string()
}

fn map_not_found(err: std::io::Error, key: &Multihash, extension: Option<&Extension>) -> StoreError {
    if err.kind() == ErrorKind::NotFound {
        StoreError::not_found(key, Extension::resolve(extension))
    } else {
        StoreError::Io(err)
    }
}

#[async_trait]
impl BlockStore for FsBlockStore {
    async fn write(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
        data: Bytes,
    ) -> StoreResult<()> {
        let path = self.block_path(key, extension)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;
        }
        let tmp = self.tmp_path(&path);

        let result = async {
            let mut file = fs::File::create(&tmp).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            drop(file);
            fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = result {
            // Best effort: the temp file may not exist if create failed.
            let _ = fs::remove_file(&tmp).await;
            return Err(StoreError::Io(e));
        }
        debug!(key = %key.short_hex(), path = %path.display(), len = data.len(), "block written");
        Ok(())
    }

    async fn read(
        &self,
        key: &Multihash,
        extension: Option<&Extension>,
    ) -> StoreResult<BlockReader> {
        let path = self.block_path(key, extension)?;
        let file = fs::File::open(&path)
            .await
            .map_err(|e| map_not_found(e, key, extension))?;
        Ok(Box::pin(BufReader::new(file)))
    }

    async fn remove(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<()> {
        let path = self.block_path(key, extension)?;
        fs::remove_file(&path)
            .await
            .map_err(|e| map_not_found(e, key, extension))?;
        debug!(key = %key.short_hex(), path = %path.display(), "block removed");
        Ok(())
    }

    async fn exists(&self, key: &Multihash, extension: Option<&Extension>) -> StoreResult<bool> {
        let path = self.block_path(key, extension)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

impl std::fmt::Debug for FsBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlockStore")
            .field("root", &self.root)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    async fn read_all(store: &FsBlockStore, key: &Multihash, ext: Option<&Extension>) -> StoreResult<Vec<u8>> {
        let mut reader = store.read(key, ext).await?;
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }

    #[test]
    fn shard_is_next_to_last_two() {
        assert_eq!(shard_of("1e20abcdef"), "de");
        assert_eq!(shard_of("abc"), "ab");
        assert_eq!(shard_of("ab"), "_a");
        assert_eq!(shard_of("a"), "__");
    }

    #[tokio::test]
    async fn write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let key = Multihash::digest(b"hello");
        store.write(&key, None, Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(read_all(&store, &key, None).await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn layout_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let key = Multihash::digest(b"layout");
        let pb = Extension::new("protobuf").unwrap();
        store.write(&key, Some(&pb), Bytes::from_static(b"layout")).await.unwrap();

        let hex = key.to_hex();
        let expected = dir
            .path()
            .join(&hex[hex.len() - 3..hex.len() - 1])
            .join(format!("{hex}.protobuf"));
        assert!(expected.is_file());
        assert_eq!(std::fs::read(expected).unwrap(), b"layout");
    }

    #[tokio::test]
    async fn no_temp_files_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let key = Multihash::digest(b"tmp");
        store.write(&key, None, Bytes::from_static(b"tmp")).await.unwrap();
        store.write(&key, None, Bytes::from_static(b"tmp2")).await.unwrap();

        let shard = store.block_path(&key, None).unwrap();
        let entries: Vec<_> = std::fs::read_dir(shard.parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec![format!("{}.data", key.to_hex())]);
        assert_eq!(read_all(&store, &key, None).await.unwrap(), b"tmp2");
    }

    #[tokio::test]
    async fn extensions_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let key = Multihash::digest(b"k");
        let raw = Extension::new("raw").unwrap();
        store.write(&key, Some(&raw), Bytes::from_static(b"raw")).await.unwrap();

        assert!(store.exists(&key, Some(&raw)).await.unwrap());
        assert!(!store.exists(&key, None).await.unwrap());
        let err = read_all(&store, &key, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let key = Multihash::digest(b"gone");
        store.write(&key, None, Bytes::from_static(b"gone")).await.unwrap();
        store.remove(&key, None).await.unwrap();
        let err = store.remove(&key, None).await.unwrap_err();
        match err {
            StoreError::NotFound { key: k, extension } => {
                assert_eq!(k, key);
                assert_eq!(extension, "data");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn null_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        let err = store.exists(&Multihash::null(), None).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }

    #[tokio::test]
    async fn reopen_sees_existing_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let key = Multihash::digest(b"persist");
        {
            let store = FsBlockStore::open(dir.path()).await.unwrap();
            store.write(&key, None, Bytes::from_static(b"persist")).await.unwrap();
        }
        let store = FsBlockStore::open(dir.path()).await.unwrap();
        assert_eq!(read_all(&store, &key, None).await.unwrap(), b"persist");
    }
}
