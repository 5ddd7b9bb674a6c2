use std::convert::TryFrom;

use bytes::BytesMut;

use crate::packet::{Fulfill, PacketType, ParseError, Reject};

/// The reply to a Prepare. Both variants are buffer-backed, so the decoded
/// fields and the encoded bytes always describe the same packet.
#[derive(Clone, Debug, PartialEq)]
pub enum IlpReply {
    Fulfill(Fulfill),
    Reject(Reject),
}

impl IlpReply {
    pub fn new_fulfill_reply(fulfill: Fulfill) -> Self {
        IlpReply::Fulfill(fulfill)
    }

    pub fn new_reject_reply(reject: Reject) -> Self {
        IlpReply::Reject(reject)
    }

    pub fn is_fulfill(&self) -> bool {
        matches!(self, IlpReply::Fulfill(_))
    }
}

impl TryFrom<BytesMut> for IlpReply {
    type Error = ParseError;

    /// Decodes a Fulfill or Reject. Prepares are not valid replies.
    fn try_from(buffer: BytesMut) -> Result<Self, Self::Error> {
        match buffer.first().map(|&byte| PacketType::try_from(byte)) {
            Some(Ok(PacketType::Fulfill)) => Ok(IlpReply::Fulfill(Fulfill::try_from(buffer)?)),
            Some(Ok(PacketType::Reject)) => Ok(IlpReply::Reject(Reject::try_from(buffer)?)),
            Some(Ok(PacketType::Prepare)) => Err(ParseError::InvalidPacket(
                "expected a Fulfill or Reject, got a Prepare".to_string(),
            )),
            Some(Err(err)) => Err(err),
            None => Err(ParseError::InvalidPacket("empty reply".to_string())),
        }
    }
}

impl AsRef<[u8]> for IlpReply {
    fn as_ref(&self) -> &[u8] {
        match self {
            IlpReply::Fulfill(fulfill) => fulfill.as_ref(),
            IlpReply::Reject(reject) => reject.as_ref(),
        }
    }
}

impl From<IlpReply> for BytesMut {
    fn from(reply: IlpReply) -> Self {
        match reply {
            IlpReply::Fulfill(fulfill) => fulfill.into(),
            IlpReply::Reject(reject) => reject.into(),
        }
    }
}

impl From<Fulfill> for IlpReply {
    fn from(fulfill: Fulfill) -> Self {
        IlpReply::Fulfill(fulfill)
    }
}

impl From<Reject> for IlpReply {
    fn from(reject: Reject) -> Self {
        IlpReply::Reject(reject)
    }
}

/// Holds at most one reply for the request being processed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResponseHolder {
    reply: Option<IlpReply>,
}

impl ResponseHolder {
    pub fn empty() -> Self {
        ResponseHolder { reply: None }
    }

    pub fn set_fulfill(&mut self, fulfill: Fulfill) {
        self.reply = Some(IlpReply::new_fulfill_reply(fulfill));
    }

    pub fn set_reject(&mut self, reject: Reject) {
        self.reply = Some(IlpReply::new_reject_reply(reject));
    }

    pub fn set(&mut self, reply: IlpReply) {
        self.reply = Some(reply);
    }

    /// Decodes `raw` and stores it. On error the holder is left unchanged.
    pub fn set_raw(&mut self, raw: BytesMut) -> Result<(), ParseError> {
        self.reply = Some(IlpReply::try_from(raw)?);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.reply = None;
    }

    pub fn is_empty(&self) -> bool {
        self.reply.is_none()
    }

    pub fn fulfill(&self) -> Option<&Fulfill> {
        match self.reply {
            Some(IlpReply::Fulfill(ref fulfill)) => Some(fulfill),
            _ => None,
        }
    }

    pub fn reject(&self) -> Option<&Reject> {
        match self.reply {
            Some(IlpReply::Reject(ref reject)) => Some(reject),
            _ => None,
        }
    }

    /// The encoded reply, if one is set.
    pub fn raw(&self) -> Option<&[u8]> {
        self.reply.as_ref().map(AsRef::as_ref)
    }

    pub fn reply(&self) -> Option<&IlpReply> {
        self.reply.as_ref()
    }

    pub fn take(&mut self) -> Option<IlpReply> {
        self.reply.take()
    }
}
