//! ILP-over-HTTP: the inbound endpoint and the outbound forwarder.

mod auth;
mod client;
mod server;

pub use self::auth::{authenticate, parse_bearer_token, BEARER_TOKEN_START};
pub use self::client::{ForwardingHandler, DEFAULT_FORWARD_TIMEOUT};
pub use self::server::{HttpServer, MAX_PACKET_SIZE};
