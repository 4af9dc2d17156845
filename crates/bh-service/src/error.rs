use bh_exchange::ExchangeError;
use bh_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Missing or malformed identifier. Raised before any I/O.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Failure reported by the store, passed through unchanged.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("exchange error: {0}")]
    Exchange(#[from] ExchangeError),

    /// At least one operation in a batch failed. `source` is the failure with
    /// the lowest input index.
    #[error("{failed} of {total} batch operations failed; first at index {index}: {source}")]
    Batch {
        index: usize,
        failed: usize,
        total: usize,
        source: Box<ServiceError>,
    },

    /// A per-item task panicked or was cancelled by the runtime.
    #[error("task failed: {0}")]
    TaskFailed(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ServiceError {
    /// Returns `true` if the store reported the block as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_not_found())
    }

    /// For a batch failure, the first item error; otherwise `self`.
    pub fn first_error(&self) -> &ServiceError {
        match self {
            Self::Batch { source, .. } => source,
            other => other,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
