use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("store error: {0}")]
    Store(String),
    #[error("payment gateway rejected collection: {0}")]
    Gateway(String),
    #[error("payment gateway call timed out after {0:?}")]
    GatewayTimeout(Duration),
    #[error("referenced session {0} does not exist")]
    MissingSession(Uuid),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl SettlementError {
    /// Errors worth retrying within the same batch step.
    pub fn is_transient(&self) -> bool {
        matches!(self, SettlementError::Store(_))
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;
