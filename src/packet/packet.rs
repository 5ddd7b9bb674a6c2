use std::convert::TryFrom;
use std::fmt;
use std::io::Read;
use std::ops::Range;
use std::str;
use std::time::SystemTime;

use byteorder::{BigEndian, ReadBytesExt};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

use super::oer::{self, BufOerExt, MutBufOerExt};
use super::{Address, ErrorCode, ParseError};

const AMOUNT_LEN: usize = 8;
const EXPIRY_LEN: usize = 17;
const CONDITION_LEN: usize = 32;
const FULFILLMENT_LEN: usize = 32;
const ERROR_CODE_LEN: usize = 3;

static INTERLEDGER_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketType {
    Prepare = 12,
    Fulfill = 13,
    Reject = 14,
}

impl TryFrom<u8> for PacketType {
    type Error = ParseError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            12 => Ok(PacketType::Prepare),
            13 => Ok(PacketType::Fulfill),
            14 => Ok(PacketType::Reject),
            _ => Err(ParseError::UnknownType(byte)),
        }
    }
}

/// A buffer-backed ILP Prepare.
///
/// The fixed-width amount and expiry fields can be rewritten in place; every
/// other byte of the original buffer is left as received.
#[derive(PartialEq, Clone)]
pub struct Prepare {
    buffer: BytesMut,
    content_offset: usize,
    destination: Address,
    amount: u64,
    expires_at: SystemTime,
    data: Range<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PrepareBuilder<'a> {
    pub amount: u64,
    pub expires_at: SystemTime,
    pub execution_condition: &'a [u8; 32],
    pub destination: Address,
    pub data: &'a [u8],
}

impl TryFrom<BytesMut> for Prepare {
    type Error = ParseError;

    fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
        let (content_offset, mut content) = deserialize_envelope(PacketType::Prepare, &buffer)?;
        let content_len = content.len();
        let amount = content.read_u64::<BigEndian>()?;

        let mut expires_at = [0x00; EXPIRY_LEN];
        content.read_exact(&mut expires_at)?;
        let expires_at = parse_timestamp(&expires_at)?;

        content.skip(CONDITION_LEN)?;
        let destination = Address::try_from(content.read_var_octet_string()?)?;
        let data_offset = content_offset + content_len - content.len();
        let data = read_var_octet_string_range(&mut content, data_offset)?;

        Ok(Prepare {
            buffer,
            content_offset,
            destination,
            amount,
            expires_at,
            data,
        })
    }
}

impl Prepare {
    #[inline]
    pub fn amount(&self) -> u64 {
        self.amount
    }

    #[inline]
    pub fn set_amount(&mut self, amount: u64) {
        self.amount = amount;
        let offset = self.content_offset;
        self.buffer[offset..offset + AMOUNT_LEN].copy_from_slice(&amount.to_be_bytes());
    }

    #[inline]
    pub fn expires_at(&self) -> SystemTime {
        self.expires_at
    }

    pub fn set_expires_at(&mut self, expires_at: SystemTime) {
        self.expires_at = expires_at;
        let offset = self.content_offset + AMOUNT_LEN;
        let timestamp = format_timestamp(expires_at);
        self.buffer[offset..offset + EXPIRY_LEN].copy_from_slice(&timestamp);
    }

    /// The returned value always has a length of 32.
    #[inline]
    pub fn execution_condition(&self) -> &[u8] {
        let begin = self.content_offset + AMOUNT_LEN + EXPIRY_LEN;
        &self.buffer[begin..begin + CONDITION_LEN]
    }

    #[inline]
    pub fn destination(&self) -> &Address {
        &self.destination
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.data.clone()]
    }
}

impl AsRef<[u8]> for Prepare {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl From<Prepare> for BytesMut {
    fn from(prepare: Prepare) -> Self {
        prepare.buffer
    }
}

impl fmt::Debug for Prepare {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Prepare")
            .field("destination", &self.destination)
            .field("amount", &self.amount)
            .field(
                "expires_at",
                &DateTime::<Utc>::from(self.expires_at).to_rfc3339(),
            )
            .field(
                "execution_condition",
                &hex::encode(self.execution_condition()),
            )
            .field("data_length", &self.data().len())
            .finish()
    }
}

impl<'a> PrepareBuilder<'a> {
    pub fn build(&self) -> Prepare {
        const STATIC_LEN: usize = AMOUNT_LEN + EXPIRY_LEN + CONDITION_LEN;
        let destination_size = oer::predict_var_octet_string(self.destination.len());
        let data_size = oer::predict_var_octet_string(self.data.len());
        let content_len = STATIC_LEN + destination_size + data_size;
        let (mut buffer, content_offset) = start_envelope(PacketType::Prepare, content_len);

        buffer.put_u64(self.amount);
        buffer.put_slice(&format_timestamp(self.expires_at));
        buffer.put_slice(&self.execution_condition[..]);
        buffer.put_var_octet_string(&self.destination);
        let data_start = buffer.len() + data_size - self.data.len();
        buffer.put_var_octet_string(self.data);

        Prepare {
            data: data_start..buffer.len(),
            buffer,
            content_offset,
            destination: self.destination.clone(),
            amount: self.amount,
            expires_at: self.expires_at,
        }
    }
}

/// Rewrites the amount and/or expiry of an encoded Prepare, returning a new
/// buffer of the same length in which every other byte is unchanged.
pub fn patch_amount_and_expiry(
    buffer: &[u8],
    amount: Option<u64>,
    expires_at: Option<SystemTime>,
) -> Result<BytesMut, ParseError> {
    let mut prepare = Prepare::try_from(BytesMut::from(buffer))?;
    if let Some(amount) = amount {
        prepare.set_amount(amount);
    }
    if let Some(expires_at) = expires_at {
        prepare.set_expires_at(expires_at);
    }
    Ok(prepare.into())
}

#[derive(PartialEq, Clone)]
pub struct Fulfill {
    buffer: BytesMut,
    content_offset: usize,
    data: Range<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FulfillBuilder<'a> {
    pub fulfillment: &'a [u8; 32],
    pub data: &'a [u8],
}

impl TryFrom<BytesMut> for Fulfill {
    type Error = ParseError;

    fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
        let (content_offset, mut content) = deserialize_envelope(PacketType::Fulfill, &buffer)?;
        content.skip(FULFILLMENT_LEN)?;
        let data = read_var_octet_string_range(&mut content, content_offset + FULFILLMENT_LEN)?;

        Ok(Fulfill {
            buffer,
            content_offset,
            data,
        })
    }
}

impl Fulfill {
    /// The returned value always has a length of 32.
    #[inline]
    pub fn fulfillment(&self) -> &[u8] {
        &self.buffer[self.content_offset..self.content_offset + FULFILLMENT_LEN]
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.data.clone()]
    }
}

impl AsRef<[u8]> for Fulfill {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl From<Fulfill> for BytesMut {
    fn from(fulfill: Fulfill) -> Self {
        fulfill.buffer
    }
}

impl fmt::Debug for Fulfill {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Fulfill")
            .field("fulfillment", &hex::encode(self.fulfillment()))
            .field("data_length", &self.data().len())
            .finish()
    }
}

impl<'a> FulfillBuilder<'a> {
    pub fn build(&self) -> Fulfill {
        let data_size = oer::predict_var_octet_string(self.data.len());
        let content_len = FULFILLMENT_LEN + data_size;
        let (mut buffer, content_offset) = start_envelope(PacketType::Fulfill, content_len);

        buffer.put_slice(&self.fulfillment[..]);
        let data_start = buffer.len() + data_size - self.data.len();
        buffer.put_var_octet_string(self.data);

        Fulfill {
            data: data_start..buffer.len(),
            buffer,
            content_offset,
        }
    }
}

#[derive(PartialEq, Clone)]
pub struct Reject {
    buffer: BytesMut,
    code: ErrorCode,
    triggered_by: Option<Address>,
    message: Range<usize>,
    data: Range<usize>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RejectBuilder<'a> {
    pub code: ErrorCode,
    pub message: &'a [u8],
    pub triggered_by: Option<&'a Address>,
    pub data: &'a [u8],
}

impl TryFrom<BytesMut> for Reject {
    type Error = ParseError;

    fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
        let (content_offset, mut content) = deserialize_envelope(PacketType::Reject, &buffer)?;
        let content_len = content.len();

        let mut code = [0; ERROR_CODE_LEN];
        content.read_exact(&mut code)?;
        let code = ErrorCode::new(code);

        let triggered_by = match content.read_var_octet_string()? {
            [] => None,
            address => Some(Address::try_from(address)?),
        };

        let message_offset = content_offset + content_len - content.len();
        let message = read_var_octet_string_range(&mut content, message_offset)?;
        let data_offset = content_offset + content_len - content.len();
        let data = read_var_octet_string_range(&mut content, data_offset)?;

        Ok(Reject {
            buffer,
            code,
            triggered_by,
            message,
            data,
        })
    }
}

impl Reject {
    #[inline]
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    #[inline]
    pub fn triggered_by(&self) -> Option<&Address> {
        self.triggered_by.as_ref()
    }

    #[inline]
    pub fn message(&self) -> &[u8] {
        &self.buffer[self.message.clone()]
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.buffer[self.data.clone()]
    }
}

impl AsRef<[u8]> for Reject {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        &self.buffer
    }
}

impl From<Reject> for BytesMut {
    fn from(reject: Reject) -> Self {
        reject.buffer
    }
}

impl fmt::Debug for Reject {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("Reject")
            .field("code", &self.code)
            .field("message", &String::from_utf8_lossy(self.message()))
            .field("triggered_by", &self.triggered_by)
            .field("data_length", &self.data().len())
            .finish()
    }
}

impl<'a> RejectBuilder<'a> {
    pub fn build(&self) -> Reject {
        let triggered_by: &[u8] = match self.triggered_by {
            Some(address) => address.as_ref(),
            None => &[],
        };
        let triggered_by_size = oer::predict_var_octet_string(triggered_by.len());
        let message_size = oer::predict_var_octet_string(self.message.len());
        let data_size = oer::predict_var_octet_string(self.data.len());
        let content_len = ERROR_CODE_LEN + triggered_by_size + message_size + data_size;
        let (mut buffer, _) = start_envelope(PacketType::Reject, content_len);

        buffer.put_slice(&<[u8; 3]>::from(self.code)[..]);
        buffer.put_var_octet_string(triggered_by);
        let message_start = buffer.len() + message_size - self.message.len();
        buffer.put_var_octet_string(self.message);
        let message_end = buffer.len();
        let data_start = buffer.len() + data_size - self.data.len();
        buffer.put_var_octet_string(self.data);

        Reject {
            data: data_start..buffer.len(),
            message: message_start..message_end,
            buffer,
            code: self.code,
            triggered_by: self.triggered_by.cloned(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MaxPacketAmountDetails {
    amount_received: u64,
    max_amount: u64,
}

impl MaxPacketAmountDetails {
    #[inline]
    pub fn new(amount_received: u64, max_amount: u64) -> Self {
        MaxPacketAmountDetails {
            amount_received,
            max_amount,
        }
    }

    pub fn from_bytes(mut bytes: &[u8]) -> Result<Self, std::io::Error> {
        let amount_received = bytes.read_u64::<BigEndian>()?;
        let max_amount = bytes.read_u64::<BigEndian>()?;
        Ok(MaxPacketAmountDetails::new(amount_received, max_amount))
    }

    pub fn to_bytes(&self) -> [u8; 16] {
        let mut bytes = [0x00_u8; 16];
        bytes[..8].copy_from_slice(&self.amount_received.to_be_bytes());
        bytes[8..].copy_from_slice(&self.max_amount.to_be_bytes());
        bytes
    }

    #[inline]
    pub fn amount_received(&self) -> u64 {
        self.amount_received
    }

    #[inline]
    pub fn max_amount(&self) -> u64 {
        self.max_amount
    }
}

fn start_envelope(packet_type: PacketType, content_len: usize) -> (BytesMut, usize) {
    let buf_size = 1 + oer::predict_var_octet_string(content_len);
    let mut buffer = BytesMut::with_capacity(buf_size);
    buffer.put_u8(packet_type as u8);
    buffer.put_var_octet_string_length(content_len);
    let content_offset = buffer.len();
    (buffer, content_offset)
}

/// Returns the offset of the envelope contents and the contents themselves.
/// Bytes trailing the envelope are ignored.
fn deserialize_envelope(
    packet_type: PacketType,
    mut reader: &[u8],
) -> Result<(usize, &[u8]), ParseError> {
    let total = reader.len();
    let got_type = reader.read_u8()?;
    if got_type != packet_type as u8 {
        return Err(ParseError::WrongType {
            expected: packet_type as u8,
            found: got_type,
        });
    }
    let content = reader.read_var_octet_string()?;
    let content_offset = total - reader.len() - content.len();
    Ok((content_offset, content))
}

/// Reads the var-octet-string at the head of `content` and returns the range
/// of its contents within the packet buffer, given the buffer `offset` of
/// `content`.
fn read_var_octet_string_range(
    content: &mut &[u8],
    offset: usize,
) -> Result<Range<usize>, ParseError> {
    let before = content.len();
    let contents = content.read_var_octet_string()?;
    let end = offset + (before - content.len());
    Ok(end - contents.len()..end)
}

fn parse_timestamp(bytes: &[u8]) -> Result<SystemTime, ParseError> {
    let timestamp = str::from_utf8(bytes)?;
    let naive = NaiveDateTime::parse_from_str(timestamp, INTERLEDGER_TIMESTAMP_FORMAT)?;
    Ok(SystemTime::from(Utc.from_utc_datetime(&naive)))
}

fn format_timestamp(time: SystemTime) -> [u8; EXPIRY_LEN] {
    let formatted = DateTime::<Utc>::from(time)
        .format(INTERLEDGER_TIMESTAMP_FORMAT)
        .to_string();
    let mut timestamp = [b'0'; EXPIRY_LEN];
    let len = formatted.len().min(EXPIRY_LEN);
    timestamp[..len].copy_from_slice(&formatted.as_bytes()[..len]);
    timestamp
}
