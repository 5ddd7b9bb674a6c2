use std::convert::TryFrom;
use std::ops::Range;
use std::str;
use std::time::{Duration, SystemTime};

use byteorder::ReadBytesExt;
use bytes::{BufMut, Bytes, BytesMut};

use crate::packet::oer::{predict_var_octet_string, BufOerExt, MutBufOerExt};
use crate::packet::{Address, Fulfill, FulfillBuilder, ParseError, Prepare, PrepareBuilder};

pub static ILDCP_DESTINATION: &str = "peer.config";
pub static PEER_PROTOCOL_FULFILLMENT: [u8; 32] = [0; 32];
pub static PEER_PROTOCOL_CONDITION: [u8; 32] = [
    102, 104, 122, 173, 248, 98, 189, 119, 108, 143, 193, 139, 142, 159, 142, 32, 8, 151, 20, 133,
    110, 226, 51, 179, 144, 42, 89, 29, 13, 95, 41, 37,
];
const PEER_PROTOCOL_EXPIRY_DURATION: Duration = Duration::from_secs(60);
const ASSET_SCALE_LEN: usize = 1;

pub fn is_ildcp_destination(prepare: &Prepare) -> bool {
    prepare.destination() == ILDCP_DESTINATION
}

pub fn is_ildcp_request(prepare: &Prepare) -> bool {
    is_ildcp_destination(prepare) && prepare.execution_condition() == PEER_PROTOCOL_CONDITION
}

/// The Prepare a peer sends to ask for its configuration.
#[derive(Debug, Default)]
pub struct IldcpRequest;

impl IldcpRequest {
    pub fn to_prepare(&self) -> Result<Prepare, ParseError> {
        Ok(PrepareBuilder {
            destination: Address::try_from(ILDCP_DESTINATION.as_bytes())?,
            amount: 0,
            execution_condition: &PEER_PROTOCOL_CONDITION,
            expires_at: SystemTime::now() + PEER_PROTOCOL_EXPIRY_DURATION,
            data: &[],
        }
        .build())
    }
}

#[derive(Debug, PartialEq)]
pub struct IldcpResponse {
    buffer: Bytes,
    client_address: Address,
    asset_scale: u8,
    asset_code: Range<usize>,
}

impl TryFrom<Bytes> for IldcpResponse {
    type Error = ParseError;

    fn try_from(buffer: Bytes) -> Result<Self, Self::Error> {
        let mut reader = &buffer[..];
        let client_address = Address::try_from(reader.read_var_octet_string()?)?;
        let asset_scale = reader.read_u8()?;
        let asset_code = reader.read_var_octet_string()?;
        str::from_utf8(asset_code)?;

        let end = buffer.len() - reader.len();
        let asset_code = end - asset_code.len()..end;
        Ok(IldcpResponse {
            buffer,
            client_address,
            asset_scale,
            asset_code,
        })
    }
}

impl IldcpResponse {
    pub fn client_address(&self) -> &Address {
        &self.client_address
    }

    pub fn asset_scale(&self) -> u8 {
        self.asset_scale
    }

    pub fn asset_code(&self) -> &str {
        // validated on construction
        str::from_utf8(&self.buffer[self.asset_code.clone()]).unwrap_or_default()
    }
}

impl From<IldcpResponse> for Bytes {
    fn from(response: IldcpResponse) -> Self {
        response.buffer
    }
}

impl From<IldcpResponse> for Fulfill {
    fn from(response: IldcpResponse) -> Self {
        FulfillBuilder {
            fulfillment: &PEER_PROTOCOL_FULFILLMENT,
            data: &response.buffer[..],
        }
        .build()
    }
}

pub struct IldcpResponseBuilder<'a> {
    pub client_address: &'a Address,
    pub asset_scale: u8,
    pub asset_code: &'a str,
}

impl<'a> IldcpResponseBuilder<'a> {
    pub fn build(&self) -> IldcpResponse {
        let address_size = predict_var_octet_string(self.client_address.len());
        let asset_code_size = predict_var_octet_string(self.asset_code.len());
        let mut buffer = BytesMut::with_capacity(address_size + ASSET_SCALE_LEN + asset_code_size);

        buffer.put_var_octet_string(self.client_address.as_str().as_bytes());
        buffer.put_u8(self.asset_scale);
        buffer.put_var_octet_string(self.asset_code.as_bytes());

        let end = buffer.len();
        IldcpResponse {
            buffer: buffer.freeze(),
            client_address: self.client_address.clone(),
            asset_scale: self.asset_scale,
            asset_code: end - self.asset_code.len()..end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn request_prepare() {
        let prepare = IldcpRequest.to_prepare().unwrap();
        assert!(is_ildcp_request(&prepare));
        assert_eq!(prepare.amount(), 0);
        assert!(prepare.data().is_empty());
    }

    #[test]
    fn response_layout() {
        let address = Address::from_str("example.alice").unwrap();
        let response = IldcpResponseBuilder {
            client_address: &address,
            asset_scale: 9,
            asset_code: "XRP",
        }
        .build();
        assert_eq!(response.asset_code(), "XRP");

        let bytes = Bytes::from(response);
        assert_eq!(&bytes[..], b"\x0dexample.alice\x09\x03XRP");

        let parsed = IldcpResponse::try_from(bytes).unwrap();
        assert_eq!(parsed.client_address(), &address);
        assert_eq!(parsed.asset_scale(), 9);
        assert_eq!(parsed.asset_code(), "XRP");
    }

    #[test]
    fn fulfill_uses_zero_fulfillment() {
        let address = Address::from_str("example.alice").unwrap();
        let fulfill = Fulfill::from(
            IldcpResponseBuilder {
                client_address: &address,
                asset_scale: 2,
                asset_code: "USD",
            }
            .build(),
        );
        assert_eq!(fulfill.fulfillment(), &PEER_PROTOCOL_FULFILLMENT[..]);
        let parsed = IldcpResponse::try_from(Bytes::copy_from_slice(fulfill.data())).unwrap();
        assert_eq!(parsed.asset_code(), "USD");
    }

    #[test]
    fn rejects_truncated_response() {
        assert!(IldcpResponse::try_from(Bytes::from_static(b"\x0dexample.alice")).is_err());
        assert!(IldcpResponse::try_from(Bytes::from_static(b"\x03abc\x09\x00")).is_err());
    }
}
