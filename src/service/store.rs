use std::time::Duration;

use async_trait::async_trait;

use super::{Account, AccountId};
use crate::errors::{StoreError, TransferError};
use crate::packet::Address;

/// Directory of peer accounts.
#[async_trait]
pub trait PeerStore: Send + Sync {
    /// Returns the single account whose incoming HTTP token equals `token`.
    /// Zero or multiple matches both yield `None`.
    async fn get_by_incoming_token(&self, token: &str) -> Result<Option<Account>, StoreError>;

    /// Returns the peer with the longest static address that is a prefix of
    /// `destination`.
    async fn get_by_destination_address(
        &self,
        destination: &Address,
    ) -> Result<Option<Account>, StoreError>;

    async fn get_by_account_id(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
}

/// Directory of local accounts (receivers and wallets).
#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferOptions {
    pub source: AccountId,
    pub destination: AccountId,
    pub amount: u64,
    /// How long the transfer may stay pending before it is voided.
    pub timeout: Duration,
}

/// Ledger contract. The packet pipeline holds a handle to it but settles
/// nothing itself.
#[async_trait]
pub trait AccountingService: Send + Sync {
    async fn create_transfer(&self, options: TransferOptions) -> Result<(), TransferError>;
}
