use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error("exchange unavailable: {0}")]
    Unavailable(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;
