//! ILP address type.
//!
//! Reference: [ILP Addresses - v2.0.0](https://github.com/interledger/rfcs/blob/master/0015-ilp-addresses/0015-ilp-addresses.md).

// Addresses are never empty.
#![allow(clippy::len_without_is_empty)]

use std::convert::TryFrom;
use std::fmt;
use std::str::{self, FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

const MAX_ADDRESS_LENGTH: usize = 1023;

const SCHEMES: &[&str] = &[
    "g", "private", "example", "peer", "self", "test", "test1", "test2", "test3", "local",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("address is too long ({0} bytes)")]
    TooLong(usize),
    #[error("address must have at least two segments")]
    TooFewSegments,
    #[error("unknown address scheme: {0}")]
    UnknownScheme(String),
    #[error("invalid segment at index {0}")]
    InvalidSegment(usize),
}

/// A validated ILP address.
///
/// Validation guarantees the address is ASCII, so it is stored as a `String`.
#[derive(Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Address(String);

impl Address {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn scheme(&self) -> &str {
        self.segments().next().unwrap_or_default()
    }

    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.0.split('.')
    }

    /// The final segment, which for locally issued STREAM addresses carries the
    /// connection token.
    pub fn last_segment(&self) -> &str {
        self.segments().next_back().unwrap_or_default()
    }

    pub fn with_suffix(&self, suffix: &str) -> Result<Address, AddressError> {
        Address::from_str(&format!("{}.{}", self.0, suffix))
    }

    /// Segment-aware prefix check: `g.alice` is a prefix of `g.alice` and
    /// `g.alice.bob` but not of `g.alicebob`.
    pub fn is_prefix_of(&self, other: &Address) -> bool {
        match other.0.strip_prefix(self.0.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('.'),
            None => false,
        }
    }
}

fn validate(address: &str) -> Result<(), AddressError> {
    if address.len() > MAX_ADDRESS_LENGTH {
        return Err(AddressError::TooLong(address.len()));
    }
    let mut segments = 0;
    for (i, segment) in address.split('.').enumerate() {
        segments += 1;
        if i == 0 && !SCHEMES.contains(&segment) {
            return Err(AddressError::UnknownScheme(segment.to_string()));
        }
        if segment.is_empty() || !segment.bytes().all(is_segment_byte) {
            return Err(AddressError::InvalidSegment(i));
        }
    }
    if segments < 2 {
        return Err(AddressError::TooFewSegments);
    }
    Ok(())
}

/// <https://github.com/interledger/rfcs/blob/master/0015-ilp-addresses/0015-ilp-addresses.md#address-requirements>
#[inline]
fn is_segment_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' || byte == b'~'
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        validate(src)?;
        Ok(Address(src.to_string()))
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = AddressError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let src = str::from_utf8(bytes).map_err(|_| AddressError::InvalidSegment(0))?;
        Address::from_str(src)
    }
}

impl AsRef<[u8]> for Address {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl AsRef<str> for Address {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.debug_tuple("Address").field(&self.0).finish()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Address {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        Address::from_str(&string).map_err(de::Error::custom)
    }
}
