use std::num::{IntErrorKind, ParseIntError};

use bytes::BytesMut;
use thiserror::Error;
use tracing::{debug, warn};

use super::crypto::{
    decrypt_with_aad, encrypt_with_aad, generate_fulfillment, hash_sha256, hmac_sha256,
    random_bytes, CryptoError,
};
use super::packet::{Frame, StreamPacket, StreamPacketBuilder};
use crate::packet::{
    Address, AddressError, ErrorCode, Fulfill, FulfillBuilder, PacketType, Prepare, Reject,
    RejectBuilder,
};
use crate::service::Asset;

const TOKEN_LENGTH: usize = 18;
// nonce and auth tag added by the AEAD seal
const SEAL_OVERHEAD: usize = 28;
const CONNECTION_ID_LENGTH: usize = 16;

static STREAM_SERVER_SECRET_GENERATOR: &[u8] = b"ilp_stream_secret_generator";
static PAYMENT_TAG_KEY_STRING: &[u8] = b"ilp_stream_payment_tag";

#[derive(Debug, Error)]
pub enum CredentialsError {
    #[error("unable to seal payment tag: {0}")]
    Crypto(#[from] CryptoError),
    #[error("generated address is invalid: {0}")]
    Address(#[from] AddressError),
}

/// The address and shared secret a sender needs to open a STREAM
/// connection to this connector.
#[derive(Clone, PartialEq)]
pub struct StreamCredentials {
    pub ilp_address: Address,
    pub shared_secret: [u8; 32],
}

impl std::fmt::Debug for StreamCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("StreamCredentials")
            .field("ilp_address", &self.ilp_address)
            .field("shared_secret", &"<redacted>")
            .finish()
    }
}

/// Recognizes STREAM destinations issued by this connector and answers
/// the Prepares sent to them.
///
/// Every issued address ends in a segment holding a random token and the
/// payment tag sealed under a key derived from the token. Only the server
/// secret is needed to recover both, so no per-connection state is kept.
#[derive(Clone)]
pub struct StreamServer {
    secret_generator: [u8; 32],
    server_address: Address,
}

struct DecodedDestination {
    payment_tag: String,
    shared_secret: [u8; 32],
    connection_id: String,
}

impl StreamServer {
    pub fn new(server_secret: &[u8; 32], server_address: Address) -> Self {
        StreamServer {
            secret_generator: hmac_sha256(&server_secret[..], STREAM_SERVER_SECRET_GENERATOR),
            server_address,
        }
    }

    pub fn server_address(&self) -> &Address {
        &self.server_address
    }

    /// Issues a fresh connection under `base_address` carrying `payment_tag`.
    pub fn generate_credentials(
        &self,
        base_address: &Address,
        payment_tag: &str,
    ) -> Result<StreamCredentials, CredentialsError> {
        let token = random_bytes::<TOKEN_LENGTH>()?;
        let shared_secret = hmac_sha256(&self.secret_generator, &token);
        let sealed_tag = encrypt_with_aad(
            &payment_tag_key(&shared_secret),
            BytesMut::from(payment_tag.as_bytes()),
            base_address.as_str().as_bytes(),
        )?;

        let mut segment = Vec::with_capacity(TOKEN_LENGTH + sealed_tag.len());
        segment.extend_from_slice(&token);
        segment.extend_from_slice(&sealed_tag);
        let segment = base64::encode_config(&segment, base64::URL_SAFE_NO_PAD);

        Ok(StreamCredentials {
            ilp_address: base_address.with_suffix(&segment)?,
            shared_secret,
        })
    }

    /// Returns the payment tag if `destination` was issued by this server.
    pub fn decode_payment_tag(&self, destination: &Address) -> Option<String> {
        self.decode_destination(destination)
            .map(|decoded| decoded.payment_tag)
    }

    fn decode_destination(&self, destination: &Address) -> Option<DecodedDestination> {
        let last_segment = destination.last_segment();
        let base_address = &destination.as_str()[..destination.len() - last_segment.len() - 1];

        let segment = base64::decode_config(last_segment, base64::URL_SAFE_NO_PAD).ok()?;
        if segment.len() < TOKEN_LENGTH + SEAL_OVERHEAD {
            return None;
        }
        let (token, sealed_tag) = segment.split_at(TOKEN_LENGTH);
        let shared_secret = hmac_sha256(&self.secret_generator, token);
        let payment_tag = decrypt_with_aad(
            &payment_tag_key(&shared_secret),
            BytesMut::from(sealed_tag),
            base_address.as_bytes(),
        )
        .ok()?;
        let payment_tag = String::from_utf8(payment_tag.to_vec()).ok()?;

        Some(DecodedDestination {
            payment_tag,
            shared_secret,
            connection_id: hex::encode(&hash_sha256(token)[..CONNECTION_ID_LENGTH]),
        })
    }

    /// Checks the Prepare against its STREAM packet.
    ///
    /// Returns a reply that fulfills the Prepare once the connection's total
    /// is known, or the Reject to send back when the packet cannot be
    /// fulfilled.
    pub fn create_reply(&self, prepare: &Prepare, asset: &Asset) -> Result<StreamReply, Reject> {
        let decoded = self.decode_destination(prepare.destination()).ok_or_else(|| {
            debug!("Destination was not issued by this server");
            self.reject(ErrorCode::F02_UNREACHABLE, b"Unknown STREAM destination", &[])
        })?;
        let shared_secret = decoded.shared_secret;

        let fulfillment = generate_fulfillment(&shared_secret, prepare.data());
        let is_fulfillable = hash_sha256(&fulfillment)[..] == *prepare.execution_condition();

        let stream_packet =
            StreamPacket::from_encrypted(&shared_secret, BytesMut::from(prepare.data()))
                .map_err(|err| {
                    debug!("Unable to parse STREAM data, rejecting Prepare: {}", err);
                    self.reject(ErrorCode::F06_UNEXPECTED_PAYMENT, b"Could not decrypt data", &[])
                })?;

        let mut stream_ids = Vec::new();
        let mut send_asset_details = false;
        for frame in stream_packet.frames() {
            match frame {
                Frame::StreamMoney { stream_id, .. } => stream_ids.push(stream_id),
                Frame::ConnectionNewAddress { .. } => send_asset_details = true,
                _ => {}
            }
        }

        let reply = StreamReply {
            shared_secret,
            fulfillment,
            connection_id: decoded.connection_id,
            sequence: stream_packet.sequence(),
            amount: prepare.amount(),
            stream_ids,
            asset: if send_asset_details {
                Some(asset.clone())
            } else {
                None
            },
            total_received: None,
        };

        if is_fulfillable && prepare.amount() >= stream_packet.prepare_amount() {
            return Ok(reply);
        }

        if !is_fulfillable {
            debug!("Packet is unfulfillable");
        } else {
            debug!(
                "Received only {} when the sender expected at least {}",
                prepare.amount(),
                stream_packet.prepare_amount()
            );
        }
        let data = match reply.encrypted_packet(PacketType::Reject) {
            Ok(data) => data,
            Err(err) => {
                warn!("Unable to encrypt STREAM reply: {}", err);
                BytesMut::new()
            }
        };
        Err(self.reject(ErrorCode::F99_APPLICATION_ERROR, &[], &data))
    }

    fn reject(&self, code: ErrorCode, message: &[u8], data: &[u8]) -> Reject {
        RejectBuilder {
            code,
            message,
            triggered_by: Some(&self.server_address),
            data,
        }
        .build()
    }
}

fn payment_tag_key(shared_secret: &[u8; 32]) -> [u8; 32] {
    hmac_sha256(&shared_secret[..], PAYMENT_TAG_KEY_STRING)
}

/// A fulfillable STREAM payment waiting for the connection total.
#[derive(Debug)]
pub struct StreamReply {
    shared_secret: [u8; 32],
    fulfillment: [u8; 32],
    connection_id: String,
    sequence: u64,
    amount: u64,
    stream_ids: Vec<u64>,
    asset: Option<Asset>,
    total_received: Option<u64>,
}

impl StreamReply {
    /// Identifies the connection across packets. Safe to use as a store key.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Records the connection's total from its decimal form. Totals beyond
    /// `u64::MAX` are reported as `u64::MAX`.
    pub fn set_total_received(&mut self, total: &str) -> Result<(), ParseIntError> {
        let total = match total.parse::<u64>() {
            Ok(total) => total,
            Err(err) if *err.kind() == IntErrorKind::PosOverflow => u64::MAX,
            Err(err) => return Err(err),
        };
        self.total_received = Some(total);
        Ok(())
    }

    pub fn accept(self) -> Fulfill {
        let data = match self.encrypted_packet(PacketType::Fulfill) {
            Ok(data) => data,
            Err(err) => {
                warn!("Unable to encrypt STREAM reply, fulfilling without data: {}", err);
                BytesMut::new()
            }
        };
        FulfillBuilder {
            fulfillment: &self.fulfillment,
            data: &data,
        }
        .build()
    }

    fn encrypted_packet(&self, ilp_packet_type: PacketType) -> Result<BytesMut, CryptoError> {
        let mut frames = Vec::new();
        if let Some(total_received) = self.total_received {
            frames.extend(self.stream_ids.iter().map(|&stream_id| Frame::StreamMaxMoney {
                stream_id,
                receive_max: u64::MAX,
                total_received,
            }));
        }
        if let Some(ref asset) = self.asset {
            frames.push(Frame::ConnectionAssetDetails {
                source_asset_code: &asset.code,
                source_asset_scale: asset.scale,
            });
        }

        StreamPacketBuilder {
            sequence: self.sequence,
            ilp_packet_type,
            prepare_amount: self.amount,
            frames: &frames,
        }
        .build()
        .into_encrypted(&self.shared_secret)
    }
}
