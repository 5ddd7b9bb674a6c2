//! Server side of the Interledger Dynamic Configuration Protocol (IL-DCP),
//! which lets a peer ask for its ILP address and asset details.

mod handler;
mod packet;

pub use self::handler::IldcpHandler;
pub use self::packet::{
    is_ildcp_destination, is_ildcp_request, IldcpRequest, IldcpResponse, IldcpResponseBuilder,
    ILDCP_DESTINATION, PEER_PROTOCOL_CONDITION, PEER_PROTOCOL_FULFILLMENT,
};
