//! Chooses the account a packet leaves through.

mod resolver;

pub use self::resolver::AccountResolver;
