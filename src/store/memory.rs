use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use num_bigint::BigUint;
use parking_lot::{Mutex, RwLock};
use secrecy::ExposeSecret;

use crate::errors::{StoreError, TransferError};
use crate::packet::Address;
use crate::service::{
    Account, AccountId, AccountStore, AccountingService, PeerStore, TransferOptions,
};
use crate::stream::ConnectionCounterStore;

/// A simple in-memory store, seeded with the configured accounts.
///
/// It serves as peer directory, account directory and connection counter
/// store for single-node deployments, and records the transfers handed to it
/// as accounting service.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
    counters: Arc<Mutex<HashMap<String, (BigUint, Instant)>>>,
    transfers: Arc<Mutex<Vec<TransferOptions>>>,
}

impl InMemoryStore {
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Self {
        let store = InMemoryStore::default();
        for account in accounts {
            store.add_account(account);
        }
        store
    }

    pub fn add_account(&self, account: Account) {
        self.accounts.write().insert(account.id, account);
    }

    /// Transfers recorded so far, oldest first.
    pub fn transfers(&self) -> Vec<TransferOptions> {
        self.transfers.lock().clone()
    }

    fn peers(&self) -> Vec<Account> {
        self.accounts
            .read()
            .values()
            .filter(|account| account.is_peer())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PeerStore for InMemoryStore {
    async fn get_by_incoming_token(&self, token: &str) -> Result<Option<Account>, StoreError> {
        let mut matches = self.peers().into_iter().filter(|account| {
            account
                .http_incoming_tokens()
                .iter()
                .any(|candidate| candidate.expose_secret() == token)
        });
        match (matches.next(), matches.next()) {
            (Some(account), None) => Ok(Some(account)),
            _ => Ok(None),
        }
    }

    async fn get_by_destination_address(
        &self,
        destination: &Address,
    ) -> Result<Option<Account>, StoreError> {
        Ok(self
            .peers()
            .into_iter()
            .filter_map(|account| {
                let prefix_len = account
                    .static_ilp_address
                    .as_ref()
                    .filter(|address| address.is_prefix_of(destination))?
                    .len();
                Some((prefix_len, account))
            })
            .max_by_key(|(prefix_len, _)| *prefix_len)
            .map(|(_, account)| account))
    }

    async fn get_by_account_id(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .get(&id)
            .filter(|account| account.is_peer())
            .cloned())
    }
}

#[async_trait]
impl AccountStore for InMemoryStore {
    async fn get_account(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.accounts.read().get(&id).cloned())
    }
}

#[async_trait]
impl AccountingService for InMemoryStore {
    async fn create_transfer(&self, options: TransferOptions) -> Result<(), TransferError> {
        {
            let accounts = self.accounts.read();
            for id in &[options.source, options.destination] {
                if !accounts.contains_key(id) {
                    return Err(TransferError::UnknownAccount(*id));
                }
            }
        }
        if options.amount == 0 {
            return Err(TransferError::InvalidAmount);
        }
        self.transfers.lock().push(options);
        Ok(())
    }
}

#[async_trait]
impl ConnectionCounterStore for InMemoryStore {
    async fn increment_received(
        &self,
        connection_id: &str,
        amount: u64,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let now = Instant::now();
        let mut counters = self.counters.lock();
        counters.retain(|_, (_, expires_at)| *expires_at > now);
        let entry = counters
            .entry(connection_id.to_string())
            .or_insert_with(|| (BigUint::default(), now));
        entry.0 += amount;
        entry.1 = now + ttl;
        Ok(entry.0.to_string())
    }

    async fn get_received(&self, connection_id: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self
            .counters
            .lock()
            .get(connection_id)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(total, _)| total.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{Asset, HttpIncoming};
    use futures::future::join_all;
    use once_cell::sync::Lazy;
    use secrecy::SecretString;
    use std::str::FromStr;

    static TTL: Duration = Duration::from_secs(600);

    fn peer(address: &str, token: &str) -> Account {
        let mut account = Account::new(AccountId::new(), Asset::new("XRP", 9));
        account.static_ilp_address = Some(Address::from_str(address).unwrap());
        account.http.incoming = Some(HttpIncoming {
            auth_tokens: vec![SecretString::new(token.to_string())],
        });
        account
    }

    static ALICE: Lazy<Account> = Lazy::new(|| peer("example.alice", "alice-token"));
    static ALICE_SUB: Lazy<Account> = Lazy::new(|| peer("example.alice.sub", "sub-token"));
    static LOCAL: Lazy<Account> =
        Lazy::new(|| Account::new(AccountId::new(), Asset::new("XRP", 9)));

    fn store() -> InMemoryStore {
        InMemoryStore::from_accounts(vec![ALICE.clone(), ALICE_SUB.clone(), LOCAL.clone()])
    }

    #[tokio::test]
    async fn finds_peer_by_token() {
        let store = store();
        let found = store.get_by_incoming_token("alice-token").await.unwrap();
        assert_eq!(found.unwrap().id, ALICE.id);
        assert!(store.get_by_incoming_token("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ambiguous_token_finds_nobody() {
        let store = store();
        store.add_account(peer("example.carol", "alice-token"));
        assert!(store
            .get_by_incoming_token("alice-token")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn longest_prefix_wins() {
        let store = store();
        let lookup = |address: &str| {
            let store = store.clone();
            let address = Address::from_str(address).unwrap();
            async move { store.get_by_destination_address(&address).await.unwrap() }
        };
        assert_eq!(lookup("example.alice.sub.x").await.unwrap().id, ALICE_SUB.id);
        assert_eq!(lookup("example.alice.x").await.unwrap().id, ALICE.id);
        assert_eq!(lookup("example.alice").await.unwrap().id, ALICE.id);
        // segment boundaries are respected
        assert!(lookup("example.alicex").await.is_none());
        assert!(lookup("example.bob").await.is_none());
    }

    #[tokio::test]
    async fn account_lookups() {
        let store = store();
        assert!(store.get_by_account_id(ALICE.id).await.unwrap().is_some());
        assert!(store.get_by_account_id(LOCAL.id).await.unwrap().is_none());
        assert!(store.get_account(LOCAL.id).await.unwrap().is_some());
        assert!(store.get_account(AccountId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn records_transfers() {
        let store = store();
        let transfer = TransferOptions {
            source: ALICE.id,
            destination: LOCAL.id,
            amount: 100,
            timeout: Duration::from_secs(30),
        };
        store.create_transfer(transfer.clone()).await.unwrap();
        assert_eq!(store.transfers(), vec![transfer.clone()]);

        let unknown = AccountId::new();
        assert!(matches!(
            store
                .create_transfer(TransferOptions {
                    destination: unknown,
                    ..transfer.clone()
                })
                .await,
            Err(TransferError::UnknownAccount(id)) if id == unknown
        ));
        assert!(matches!(
            store
                .create_transfer(TransferOptions {
                    amount: 0,
                    ..transfer
                })
                .await,
            Err(TransferError::InvalidAmount)
        ));
        assert_eq!(store.transfers().len(), 1);
    }

    #[tokio::test]
    async fn counts_beyond_u64() {
        let store = InMemoryStore::default();
        assert_eq!(
            store.increment_received("conn", u64::MAX, TTL).await.unwrap(),
            u64::MAX.to_string()
        );
        assert_eq!(
            store.increment_received("conn", 1, TTL).await.unwrap(),
            "18446744073709551616"
        );
        assert_eq!(
            store.get_received("conn").await.unwrap().as_deref(),
            Some("18446744073709551616")
        );
        assert!(store.get_received("other").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_counters_restart() {
        let store = InMemoryStore::default();
        store
            .increment_received("conn", 5, Duration::from_millis(0))
            .await
            .unwrap();
        assert!(store.get_received("conn").await.unwrap().is_none());
        assert_eq!(
            store.increment_received("conn", 7, TTL).await.unwrap(),
            "7"
        );
    }

    #[tokio::test]
    async fn expired_counters_are_reclaimed() {
        let store = InMemoryStore::default();
        for i in 0..1000 {
            store
                .increment_received(&format!("conn-{}", i), 1, Duration::from_millis(0))
                .await
                .unwrap();
        }
        store.increment_received("fresh", 1, TTL).await.unwrap();
        assert_eq!(store.counters.lock().len(), 1);
        assert_eq!(store.get_received("fresh").await.unwrap().as_deref(), Some("1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() {
        let store = InMemoryStore::default();
        let tasks: Vec<_> = (0..100)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.increment_received("conn", 3, TTL).await })
            })
            .collect();
        for result in join_all(tasks).await {
            result.unwrap().unwrap();
        }
        assert_eq!(store.get_received("conn").await.unwrap().as_deref(), Some("300"));
    }
}
