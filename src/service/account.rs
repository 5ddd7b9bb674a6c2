use std::fmt;
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use crate::packet::Address;

/// Length of a hyphenated account id, e.g. `a9b8c7d6-...`.
pub const ACCOUNT_ID_LENGTH: usize = 36;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(Uuid);

impl AccountId {
    pub fn new() -> Self {
        AccountId(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        AccountId(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        AccountId::new()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AccountIdError {
    #[error("wrong account id length (expected 36, got {0})")]
    WrongLength(usize),
    #[error("invalid account id: {0}")]
    Invalid(#[from] uuid::Error),
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    /// Only the hyphenated form is accepted.
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if src.len() != ACCOUNT_ID_LENGTH {
            return Err(AccountIdError::WrongLength(src.len()));
        }
        Ok(AccountId(Uuid::parse_str(src)?))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub code: String,
    pub scale: u8,
}

impl Asset {
    pub fn new(code: &str, scale: u8) -> Self {
        Asset {
            code: code.to_string(),
            scale,
        }
    }
}

/// Where and how to send ILP-over-HTTP packets to this account.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpOutgoing {
    pub url: Url,
    pub auth_token: SecretString,
}

/// Bearer tokens this account may present on incoming requests.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct HttpIncoming {
    #[serde(default)]
    pub auth_tokens: Vec<SecretString>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct HttpSettings {
    #[serde(default)]
    pub incoming: Option<HttpIncoming>,
    #[serde(default)]
    pub outgoing: Option<HttpOutgoing>,
}

/// An account as supplied by the peer or account directory.
///
/// Peers are the accounts with a `static_ilp_address`; all other accounts are
/// local receivers addressed beneath the connector's own address.
#[derive(Clone, Debug, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub asset: Asset,
    #[serde(default)]
    pub max_packet_amount: Option<u64>,
    #[serde(default)]
    pub static_ilp_address: Option<Address>,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub disabled: bool,
    /// Set by the account resolver on the outgoing account only.
    #[serde(skip)]
    pub stream_enabled: bool,
}

impl Account {
    pub fn new(id: AccountId, asset: Asset) -> Self {
        Account {
            id,
            asset,
            max_packet_amount: None,
            static_ilp_address: None,
            http: HttpSettings::default(),
            disabled: false,
            stream_enabled: false,
        }
    }

    pub fn with_stream_enabled(mut self, enabled: bool) -> Self {
        self.stream_enabled = enabled;
        self
    }

    pub fn is_peer(&self) -> bool {
        self.static_ilp_address.is_some()
    }

    pub fn http_outgoing(&self) -> Option<&HttpOutgoing> {
        self.http.outgoing.as_ref()
    }

    pub fn http_incoming_tokens(&self) -> &[SecretString] {
        match self.http.incoming {
            Some(ref incoming) => &incoming.auth_tokens,
            None => &[],
        }
    }
}
