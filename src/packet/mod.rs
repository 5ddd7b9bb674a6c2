//! Interledger packet serialization/deserialization.

mod address;
mod error;
mod errors;
#[cfg(test)]
pub mod fixtures;
pub mod oer;
#[allow(clippy::module_inception)]
mod packet;

pub use self::address::{Address, AddressError};
pub use self::error::{ErrorClass, ErrorCode};
pub use self::errors::ParseError;

pub use self::packet::patch_amount_and_expiry;
pub use self::packet::MaxPacketAmountDetails;
pub use self::packet::{Fulfill, PacketType, Prepare, Reject};
pub use self::packet::{FulfillBuilder, PrepareBuilder, RejectBuilder};
