use crate::service::AccountId;
use std::error::Error as StdError;
use thiserror::Error;

/// Errors from the peer/account directories and the connection counter store.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum StoreError {
    #[error("{0}")]
    Other(#[from] Box<dyn StdError + Send + Sync + 'static>),
    #[error("value stored under `{key}` is not a decimal amount: {value}")]
    InvalidAmount { key: String, value: String },
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Other(Box::new(err))
    }
}

/// Errors from the accounting service's transfer contract.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransferError {
    #[error("account `{0}` was not found")]
    UnknownAccount(AccountId),
    #[error("insufficient liquidity in account `{0}`")]
    InsufficientLiquidity(AccountId),
    #[error("transfer amount must be greater than zero")]
    InvalidAmount,
    #[error("{0}")]
    Other(#[from] Box<dyn StdError + Send + Sync + 'static>),
}
