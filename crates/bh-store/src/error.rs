use bh_types::Multihash;

/// Errors from block store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No block is stored under this key and extension.
    #[error("block not found: {key} ({extension})")]
    NotFound { key: Multihash, extension: String },

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The key cannot be used by this backend (e.g. the null multihash).
    #[error("invalid key: {0}")]
    InvalidKey(String),
}

impl StoreError {
    pub(crate) fn not_found(key: &Multihash, extension: &str) -> Self {
        Self::NotFound {
            key: key.clone(),
            extension: extension.to_string(),
        }
    }

    /// Returns `true` for [`StoreError::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
