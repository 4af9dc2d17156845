use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("empty multihash")]
    EmptyMultihash,

    #[error("malformed multihash: {0}")]
    MalformedMultihash(String),

    #[error("invalid extension {0:?}: expected ASCII letters, digits, '-' or '_'")]
    InvalidExtension(String),
}
