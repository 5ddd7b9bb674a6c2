//! Small handlers guarding the packet before it is answered or forwarded.

mod expiry_shortener;
mod max_packet_amount;
mod validator;

pub use self::expiry_shortener::{ExpiryShortener, DEFAULT_ROUND_TRIP_TIME};
pub use self::max_packet_amount::MaxPacketAmountHandler;
pub use self::validator::ExpiryValidator;
