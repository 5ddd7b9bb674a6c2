use super::AddressError;
use std::str::Utf8Error;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("I/O Error: {0}")]
    IoErr(#[from] std::io::Error),
    #[error("Invalid timestamp: {0}")]
    ChronoErr(#[from] chrono::ParseError),
    #[error("Unexpected packet type: expected {expected}, found {found}")]
    WrongType { expected: u8, found: u8 },
    #[error("Unknown packet type: {0}")]
    UnknownType(u8),
    #[error("Invalid Address: {0}")]
    InvalidAddress(#[from] AddressError),
    #[error("Invalid Packet: {0}")]
    InvalidPacket(String),
    #[error("UTF-8 Error: {0}")]
    Utf8Err(#[from] Utf8Error),
}
