//! The per-request context, the handler chain that processes it, and the
//! directory contracts handlers depend on.

mod account;
mod chain;
mod context;
mod error_handler;
mod reply;
mod store;
pub mod trace;

pub use self::account::{
    Account, AccountId, AccountIdError, Asset, HttpIncoming, HttpOutgoing, HttpSettings,
    ACCOUNT_ID_LENGTH,
};
pub use self::chain::{HandlerChain, IlpHandler, Outcome};
pub use self::context::{ConnectorServices, IlpContext, IlpRequest};
pub use self::error_handler::ErrorHandler;
pub use self::reply::{IlpReply, ResponseHolder};
pub use self::store::{AccountStore, AccountingService, PeerStore, TransferOptions};
