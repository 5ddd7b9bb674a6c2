//! The STREAM packet carried (encrypted) in the data of ILP packets.

use std::convert::TryFrom;
use std::fmt;
use std::str;

use byteorder::ReadBytesExt;
use bytes::{BufMut, BytesMut};
use thiserror::Error;

use super::crypto::{decrypt, encrypt, CryptoError};
use crate::packet::oer::{BufOerExt, MutBufOerExt};
use crate::packet::{Address, PacketType, ParseError};

const STREAM_VERSION: u8 = 1;

#[derive(Debug, Error)]
pub enum StreamPacketError {
    #[error("unable to decrypt STREAM packet: {0}")]
    Crypto(#[from] CryptoError),
    #[error("invalid STREAM packet: {0}")]
    Parse(#[from] ParseError),
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FrameType {
    ConnectionClose,
    ConnectionNewAddress,
    ConnectionMaxData,
    ConnectionDataBlocked,
    ConnectionMaxStreamId,
    ConnectionStreamIdBlocked,
    ConnectionAssetDetails,
    StreamClose,
    StreamMoney,
    StreamMaxMoney,
    StreamMoneyBlocked,
    StreamData,
    StreamMaxData,
    StreamDataBlocked,
    Unknown(u8),
}

impl From<u8> for FrameType {
    fn from(num: u8) -> Self {
        match num {
            0x01 => FrameType::ConnectionClose,
            0x02 => FrameType::ConnectionNewAddress,
            0x03 => FrameType::ConnectionMaxData,
            0x04 => FrameType::ConnectionDataBlocked,
            0x05 => FrameType::ConnectionMaxStreamId,
            0x06 => FrameType::ConnectionStreamIdBlocked,
            0x07 => FrameType::ConnectionAssetDetails,
            0x10 => FrameType::StreamClose,
            0x11 => FrameType::StreamMoney,
            0x12 => FrameType::StreamMaxMoney,
            0x13 => FrameType::StreamMoneyBlocked,
            0x14 => FrameType::StreamData,
            0x15 => FrameType::StreamMaxData,
            0x16 => FrameType::StreamDataBlocked,
            other => FrameType::Unknown(other),
        }
    }
}

impl From<FrameType> for u8 {
    fn from(frame_type: FrameType) -> Self {
        match frame_type {
            FrameType::ConnectionClose => 0x01,
            FrameType::ConnectionNewAddress => 0x02,
            FrameType::ConnectionMaxData => 0x03,
            FrameType::ConnectionDataBlocked => 0x04,
            FrameType::ConnectionMaxStreamId => 0x05,
            FrameType::ConnectionStreamIdBlocked => 0x06,
            FrameType::ConnectionAssetDetails => 0x07,
            FrameType::StreamClose => 0x10,
            FrameType::StreamMoney => 0x11,
            FrameType::StreamMaxMoney => 0x12,
            FrameType::StreamMoneyBlocked => 0x13,
            FrameType::StreamData => 0x14,
            FrameType::StreamMaxData => 0x15,
            FrameType::StreamDataBlocked => 0x16,
            FrameType::Unknown(num) => num,
        }
    }
}

/// A single STREAM frame. The frames a receiver acts on are decoded into
/// fields; data and flow control frames keep their raw contents.
#[derive(Debug, PartialEq, Clone)]
pub enum Frame<'a> {
    ConnectionClose {
        code: u8,
        message: &'a str,
    },
    ConnectionNewAddress {
        source_account: Address,
    },
    ConnectionAssetDetails {
        source_asset_code: &'a str,
        source_asset_scale: u8,
    },
    StreamClose {
        stream_id: u64,
        code: u8,
        message: &'a str,
    },
    StreamMoney {
        stream_id: u64,
        shares: u64,
    },
    StreamMaxMoney {
        stream_id: u64,
        receive_max: u64,
        total_received: u64,
    },
    StreamMoneyBlocked {
        stream_id: u64,
        send_max: u64,
        total_sent: u64,
    },
    Other {
        frame_type: FrameType,
        contents: &'a [u8],
    },
}

impl<'a> Frame<'a> {
    pub fn frame_type(&self) -> FrameType {
        match self {
            Frame::ConnectionClose { .. } => FrameType::ConnectionClose,
            Frame::ConnectionNewAddress { .. } => FrameType::ConnectionNewAddress,
            Frame::ConnectionAssetDetails { .. } => FrameType::ConnectionAssetDetails,
            Frame::StreamClose { .. } => FrameType::StreamClose,
            Frame::StreamMoney { .. } => FrameType::StreamMoney,
            Frame::StreamMaxMoney { .. } => FrameType::StreamMaxMoney,
            Frame::StreamMoneyBlocked { .. } => FrameType::StreamMoneyBlocked,
            Frame::Other { frame_type, .. } => *frame_type,
        }
    }

    fn read(frame_type: FrameType, contents: &'a [u8]) -> Result<Self, ParseError> {
        let mut reader = contents;
        let reader = &mut reader;
        let frame = match frame_type {
            FrameType::ConnectionClose => Frame::ConnectionClose {
                code: reader.read_u8()?,
                message: str::from_utf8(reader.read_var_octet_string()?)?,
            },
            FrameType::ConnectionNewAddress => Frame::ConnectionNewAddress {
                source_account: Address::try_from(reader.read_var_octet_string()?)?,
            },
            FrameType::ConnectionAssetDetails => Frame::ConnectionAssetDetails {
                source_asset_code: str::from_utf8(reader.read_var_octet_string()?)?,
                source_asset_scale: reader.read_u8()?,
            },
            FrameType::StreamClose => Frame::StreamClose {
                stream_id: reader.read_var_uint()?,
                code: reader.read_u8()?,
                message: str::from_utf8(reader.read_var_octet_string()?)?,
            },
            FrameType::StreamMoney => Frame::StreamMoney {
                stream_id: reader.read_var_uint()?,
                shares: reader.read_var_uint()?,
            },
            FrameType::StreamMaxMoney => Frame::StreamMaxMoney {
                stream_id: reader.read_var_uint()?,
                receive_max: saturating_read_var_uint(reader)?,
                total_received: saturating_read_var_uint(reader)?,
            },
            FrameType::StreamMoneyBlocked => Frame::StreamMoneyBlocked {
                stream_id: reader.read_var_uint()?,
                send_max: saturating_read_var_uint(reader)?,
                total_sent: saturating_read_var_uint(reader)?,
            },
            frame_type => Frame::Other {
                frame_type,
                contents,
            },
        };
        Ok(frame)
    }

    fn put_contents(&self, buf: &mut impl BufMut) {
        match self {
            Frame::ConnectionClose { code, message } => {
                buf.put_u8(*code);
                buf.put_var_octet_string(message.as_bytes());
            }
            Frame::ConnectionNewAddress { source_account } => {
                buf.put_var_octet_string(source_account.as_str().as_bytes());
            }
            Frame::ConnectionAssetDetails {
                source_asset_code,
                source_asset_scale,
            } => {
                buf.put_var_octet_string(source_asset_code.as_bytes());
                buf.put_u8(*source_asset_scale);
            }
            Frame::StreamClose {
                stream_id,
                code,
                message,
            } => {
                buf.put_var_uint(*stream_id);
                buf.put_u8(*code);
                buf.put_var_octet_string(message.as_bytes());
            }
            Frame::StreamMoney { stream_id, shares } => {
                buf.put_var_uint(*stream_id);
                buf.put_var_uint(*shares);
            }
            Frame::StreamMaxMoney {
                stream_id,
                receive_max: first,
                total_received: second,
            }
            | Frame::StreamMoneyBlocked {
                stream_id,
                send_max: first,
                total_sent: second,
            } => {
                buf.put_var_uint(*stream_id);
                buf.put_var_uint(*first);
                buf.put_var_uint(*second);
            }
            Frame::Other { contents, .. } => buf.put_slice(contents),
        }
    }
}

/// Reads a VarUInt, clamping values wider than 8 bytes to `u64::MAX`.
/// Senders use arbitrarily large values to mean "no limit".
fn saturating_read_var_uint(reader: &mut &[u8]) -> Result<u64, ParseError> {
    let length = reader.peek_var_octet_string()?.len();
    if length > 8 {
        reader.skip_var_octet_string()?;
        Ok(u64::MAX)
    } else {
        Ok(reader.read_var_uint()?)
    }
}

/// Iterates over the frames of a [`StreamPacket`]. Frames are validated
/// when the packet is parsed, so iteration cannot fail.
pub struct FrameIterator<'a> {
    buffer: &'a [u8],
}

impl<'a> FrameIterator<'a> {
    fn try_next(&mut self) -> Result<Frame<'a>, ParseError> {
        let frame_type = FrameType::from(self.buffer.read_u8()?);
        let contents = self.buffer.read_var_octet_string()?;
        Frame::read(frame_type, contents)
    }
}

impl<'a> Iterator for FrameIterator<'a> {
    type Item = Frame<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.buffer.is_empty() {
            return None;
        }
        self.try_next().ok()
    }
}

pub struct StreamPacketBuilder<'a> {
    pub sequence: u64,
    pub ilp_packet_type: PacketType,
    pub prepare_amount: u64,
    pub frames: &'a [Frame<'a>],
}

impl<'a> StreamPacketBuilder<'a> {
    pub fn build(&self) -> StreamPacket {
        let mut buffer = BytesMut::with_capacity(64);
        buffer.put_u8(STREAM_VERSION);
        buffer.put_u8(self.ilp_packet_type as u8);
        buffer.put_var_uint(self.sequence);
        buffer.put_var_uint(self.prepare_amount);
        buffer.put_var_uint(self.frames.len() as u64);
        let frames_offset = buffer.len();

        let mut contents = BytesMut::new();
        for frame in self.frames {
            contents.clear();
            frame.put_contents(&mut contents);
            buffer.put_u8(frame.frame_type().into());
            buffer.put_var_octet_string(&contents[..]);
        }

        StreamPacket {
            buffer,
            sequence: self.sequence,
            ilp_packet_type: self.ilp_packet_type,
            prepare_amount: self.prepare_amount,
            frames_offset,
        }
    }
}

/// A decrypted STREAM packet.
#[derive(PartialEq, Clone)]
pub struct StreamPacket {
    buffer: BytesMut,
    sequence: u64,
    ilp_packet_type: PacketType,
    prepare_amount: u64,
    frames_offset: usize,
}

impl StreamPacket {
    pub fn from_encrypted(
        shared_secret: &[u8],
        ciphertext: BytesMut,
    ) -> Result<Self, StreamPacketError> {
        let plaintext = decrypt(shared_secret, ciphertext)?;
        Ok(StreamPacket::from_bytes_unencrypted(plaintext)?)
    }

    pub fn from_bytes_unencrypted(buffer: BytesMut) -> Result<Self, ParseError> {
        let mut reader = &buffer[..];
        let version = reader.read_u8()?;
        if version != STREAM_VERSION {
            return Err(ParseError::InvalidPacket(format!(
                "unsupported STREAM version: {}",
                version
            )));
        }
        let ilp_packet_type = PacketType::try_from(reader.read_u8()?)?;
        let sequence = reader.read_var_uint()?;
        let prepare_amount = reader.read_var_uint()?;
        let num_frames = reader.read_var_uint()?;
        let frames_offset = buffer.len() - reader.len();

        let mut frames = FrameIterator { buffer: reader };
        for _ in 0..num_frames {
            frames.try_next()?;
        }
        // Anything after the announced frames is ignored
        let frames_end = buffer.len() - frames.buffer.len();

        let mut buffer = buffer;
        buffer.truncate(frames_end);
        Ok(StreamPacket {
            buffer,
            sequence,
            ilp_packet_type,
            prepare_amount,
            frames_offset,
        })
    }

    pub fn into_encrypted(self, shared_secret: &[u8]) -> Result<BytesMut, CryptoError> {
        encrypt(shared_secret, self.buffer)
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn ilp_packet_type(&self) -> PacketType {
        self.ilp_packet_type
    }

    pub fn prepare_amount(&self) -> u64 {
        self.prepare_amount
    }

    pub fn frames(&self) -> FrameIterator {
        FrameIterator {
            buffer: &self.buffer[self.frames_offset..],
        }
    }
}

impl fmt::Debug for StreamPacket {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter
            .debug_struct("StreamPacket")
            .field("sequence", &self.sequence)
            .field("ilp_packet_type", &self.ilp_packet_type)
            .field("prepare_amount", &self.prepare_amount)
            .field("frames", &self.frames().collect::<Vec<_>>())
            .finish()
    }
}
