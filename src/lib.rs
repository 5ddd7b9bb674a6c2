//! # ilp-connector
//!
//! An Interledger connector that accepts ILP-over-HTTP packets from its peers,
//! answers IL-DCP and STREAM packets addressed to itself and forwards
//! everything else to the peer owning the destination.

pub mod errors;
pub mod http;
pub mod ildcp;
pub mod node;
pub mod packet;
pub mod router;
pub mod service;
pub mod service_util;
pub mod store;
pub mod stream;

#[cfg(test)]
pub(crate) mod test_helpers {
    use std::convert::TryFrom;
    use std::str::FromStr;
    use std::sync::Arc;

    use bytes::Bytes;
    use once_cell::sync::Lazy;
    use secrecy::SecretString;
    use uuid::Uuid;

    use crate::packet::fixtures::PREPARE;
    use crate::packet::Address;
    use crate::service::{
        Account, AccountId, Asset, ConnectorServices, HttpIncoming, HttpOutgoing, HttpSettings,
        IlpContext, IlpRequest,
    };
    use crate::store::InMemoryStore;
    use crate::stream::StreamServer;

    pub static SERVER_SECRET: [u8; 32] = [7; 32];
    pub static PEER_TOKEN: &str = "peer-incoming-token";

    pub static CONNECTOR_ADDRESS: Lazy<Address> =
        Lazy::new(|| Address::from_str("example.connector").unwrap());
    pub static RECEIVER_ADDRESS: Lazy<Address> =
        Lazy::new(|| Address::from_str("example.connector.receiver").unwrap());

    pub static PEER_ACCOUNT: Lazy<Account> = Lazy::new(|| {
        let mut account = Account::new(
            AccountId::from_uuid(Uuid::from_u128(0x1111_1111_1111_4111_8111_1111_1111_1111)),
            Asset::new("XRP", 9),
        );
        account.static_ilp_address = Some(Address::from_str("example.peer").unwrap());
        account.http = HttpSettings {
            incoming: Some(HttpIncoming {
                auth_tokens: vec![SecretString::new(PEER_TOKEN.to_string())],
            }),
            outgoing: Some(HttpOutgoing {
                url: "http://127.0.0.1:1/ilp".parse().unwrap(),
                auth_token: SecretString::new("peer-outgoing-token".to_string()),
            }),
        };
        account
    });

    pub static LOCAL_ACCOUNT: Lazy<Account> = Lazy::new(|| {
        Account::new(
            AccountId::from_uuid(Uuid::from_u128(0x2222_2222_2222_4222_8222_2222_2222_2222)),
            Asset::new("XRP", 9),
        )
    });

    pub fn test_store() -> InMemoryStore {
        InMemoryStore::from_accounts(vec![PEER_ACCOUNT.clone(), LOCAL_ACCOUNT.clone()])
    }

    pub fn test_services_with(accounts: Vec<Account>) -> Arc<ConnectorServices> {
        let store = InMemoryStore::from_accounts(accounts);
        Arc::new(ConnectorServices {
            ilp_address: CONNECTOR_ADDRESS.clone(),
            peers: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            accounting: Arc::new(store.clone()),
            counters: Arc::new(store),
            stream: StreamServer::new(&SERVER_SECRET, CONNECTOR_ADDRESS.clone()),
        })
    }

    pub fn test_services() -> Arc<ConnectorServices> {
        test_services_with(vec![PEER_ACCOUNT.clone(), LOCAL_ACCOUNT.clone()])
    }

    /// The expired fixture Prepare, received from the peer.
    pub fn test_context() -> IlpContext {
        let request = IlpRequest::try_from(Bytes::copy_from_slice(PREPARE.as_ref())).unwrap();
        IlpContext::new(test_services(), PEER_ACCOUNT.clone(), request)
    }
}
