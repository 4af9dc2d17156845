use bytes::Bytes;

use crate::extension::Extension;
use crate::multihash::Multihash;

/// An immutable content-addressed block.
///
/// The identifier is computed once, at construction, from the payload.
/// Nothing downstream recomputes or checks it: stores and the block service
/// take a `Block` at its word.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Block {
    key: Multihash,
    extension: Option<Extension>,
    data: Bytes,
}

impl Block {
    /// Create a block with an unspecified extension.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self::with_extension(data, None)
    }

    /// Create a block, hashing the payload with BLAKE3-256.
    pub fn with_extension(data: impl Into<Bytes>, extension: Option<Extension>) -> Self {
        let data = data.into();
        Self {
            key: Multihash::digest(&data),
            extension,
            data,
        }
    }

    /// Assemble a block from an identifier the caller vouches for.
    pub fn from_parts(key: Multihash, data: impl Into<Bytes>, extension: Option<Extension>) -> Self {
        Self {
            key,
            extension,
            data: data.into(),
        }
    }

    pub fn key(&self) -> &Multihash {
        &self.key
    }

    pub fn extension(&self) -> Option<&Extension> {
        self.extension.as_ref()
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Payload size in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Consume the block, keeping only the payload.
    pub fn into_data(self) -> Bytes {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_derived_from_data() {
        let block = Block::new(&b"hello"[..]);
        assert_eq!(block.key(), &Multihash::digest(b"hello"));
        assert_eq!(block.data().as_ref(), b"hello");
        assert!(block.extension().is_none());
    }

    #[test]
    fn extension_does_not_change_key() {
        let plain = Block::new(&b"payload"[..]);
        let tagged = Block::with_extension(&b"payload"[..], Some(Extension::new("raw").unwrap()));
        assert_eq!(plain.key(), tagged.key());
        assert_ne!(plain, tagged);
    }

    #[test]
    fn from_parts_trusts_the_key() {
        let key = Multihash::digest(b"something else");
        let block = Block::from_parts(key.clone(), &b"payload"[..], None);
        assert_eq!(block.key(), &key);
    }

    #[test]
    fn empty_payload_still_has_a_key() {
        let block = Block::new(Bytes::new());
        assert!(block.is_empty());
        assert_eq!(block.len(), 0);
        assert!(block.key().validate().is_ok());
    }
}
