use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{ServiceError, ServiceResult};

/// Configuration for the [`BlockService`](crate::BlockService).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Maximum number of batch item operations in flight across the whole
    /// service. `0` means unbounded.
    pub max_concurrency: usize,
    /// When `true`, `get_block` asks the exchange for blocks the store does
    /// not have, and persists what the exchange returns.
    pub exchange_fallback: bool,
    /// When `true`, `add_block` announces each stored block to the exchange.
    pub announce_blocks: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 64,
            exchange_fallback: false,
            announce_blocks: false,
        }
    }
}

impl ServiceConfig {
    /// No cap on batch fan-out.
    pub fn unbounded() -> Self {
        Self {
            max_concurrency: 0,
            ..Default::default()
        }
    }

    /// The concurrency cap, if any.
    pub fn concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrency > 0).then_some(self.max_concurrency)
    }

    /// Reject settings the service cannot run with.
    pub fn validate(&self) -> ServiceResult<()> {
        if self.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(ServiceError::Config(format!(
                "max_concurrency {} exceeds the limit of {}",
                self.max_concurrency,
                Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> ServiceResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServiceError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ServiceResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServiceError::Config(e.to_string()))
    }
}
