//! Receiving side of the STREAM transport protocol.

pub mod crypto;
mod handlers;
mod packet;
mod server;
mod store;

pub use self::handlers::{
    StreamAddressHandler, StreamDestination, StreamReceiptHandler, DEFAULT_CONNECTION_TTL,
};
pub use self::packet::{
    Frame, FrameIterator, FrameType, StreamPacket, StreamPacketBuilder, StreamPacketError,
};
pub use self::server::{CredentialsError, StreamCredentials, StreamReply, StreamServer};
pub use self::store::ConnectionCounterStore;
