use std::convert::TryFrom;
use std::sync::Arc;
use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use http::Extensions;

use super::{Account, AccountStore, AccountingService, PeerStore, ResponseHolder};
use crate::errors::ConnectorError;
use crate::packet::{patch_amount_and_expiry, Address, ParseError, Prepare};
use crate::stream::{ConnectionCounterStore, StreamServer};

/// Long-lived collaborators shared by every request. Built once at startup
/// and never mutated afterwards.
pub struct ConnectorServices {
    pub ilp_address: Address,
    pub peers: Arc<dyn PeerStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub accounting: Arc<dyn AccountingService>,
    pub counters: Arc<dyn ConnectionCounterStore>,
    pub stream: StreamServer,
}

/// The inbound packet: the bytes exactly as received plus a decoded view.
/// Handlers change amount or expiry through the view; the forwarder patches
/// any such change back onto `raw`.
#[derive(Clone, Debug)]
pub struct IlpRequest {
    raw: Bytes,
    received_amount: u64,
    received_expires_at: SystemTime,
    pub prepare: Prepare,
}

impl IlpRequest {
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// The packet to send onwards: the bytes as received, with amount and
    /// expiry patched only where handlers changed them.
    pub fn outgoing_bytes(&self) -> Result<BytesMut, ParseError> {
        let amount = Some(self.prepare.amount()).filter(|amount| *amount != self.received_amount);
        let expires_at = Some(self.prepare.expires_at())
            .filter(|expires_at| *expires_at != self.received_expires_at);
        patch_amount_and_expiry(&self.raw, amount, expires_at)
    }
}

impl TryFrom<Bytes> for IlpRequest {
    type Error = ParseError;

    fn try_from(raw: Bytes) -> Result<Self, Self::Error> {
        let prepare = Prepare::try_from(BytesMut::from(&raw[..]))?;
        Ok(IlpRequest {
            raw,
            received_amount: prepare.amount(),
            received_expires_at: prepare.expires_at(),
            prepare,
        })
    }
}

/// Per-request state threaded through the handler chain.
pub struct IlpContext {
    services: Arc<ConnectorServices>,
    incoming: Account,
    outgoing: Option<Account>,
    pub request: IlpRequest,
    pub response: ResponseHolder,
    /// Transient state handlers pass along to later handlers.
    pub extensions: Extensions,
}

impl IlpContext {
    pub fn new(services: Arc<ConnectorServices>, incoming: Account, request: IlpRequest) -> Self {
        IlpContext {
            services,
            incoming,
            outgoing: None,
            request,
            response: ResponseHolder::empty(),
            extensions: Extensions::new(),
        }
    }

    pub fn services(&self) -> &ConnectorServices {
        &self.services
    }

    pub fn incoming(&self) -> &Account {
        &self.incoming
    }

    pub fn prepare(&self) -> &Prepare {
        &self.request.prepare
    }

    pub fn outgoing(&self) -> Result<&Account, ConnectorError> {
        self.outgoing
            .as_ref()
            .ok_or(ConnectorError::OutgoingNotResolved)
    }

    /// Binds the outgoing account. May only be called once per request.
    pub fn set_outgoing(&mut self, account: Account) -> Result<(), ConnectorError> {
        if self.outgoing.is_some() {
            return Err(ConnectorError::OutgoingAlreadyResolved);
        }
        self.outgoing = Some(account);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::fixtures::PREPARE;
    use crate::service::{AccountId, Asset};
    use crate::test_helpers::test_services;

    #[test]
    fn request_keeps_original_bytes() {
        let raw = Bytes::copy_from_slice(PREPARE.as_ref());
        let mut request = IlpRequest::try_from(raw.clone()).unwrap();
        request.prepare.set_amount(1);
        assert_eq!(request.raw(), &raw);
        assert_eq!(request.prepare.amount(), 1);

        assert!(IlpRequest::try_from(Bytes::from_static(b"\x0c\x01")).is_err());
    }

    #[test]
    fn outgoing_bytes_patch_only_changes() {
        let raw = Bytes::copy_from_slice(PREPARE.as_ref());
        let mut request = IlpRequest::try_from(raw.clone()).unwrap();
        assert_eq!(&request.outgoing_bytes().unwrap()[..], &raw[..]);

        request.prepare.set_amount(5);
        let patched = Prepare::try_from(request.outgoing_bytes().unwrap()).unwrap();
        assert_eq!(patched.amount(), 5);
        assert_eq!(patched.expires_at(), PREPARE.expires_at());
        assert_eq!(patched.data(), PREPARE.data());
        assert_eq!(patched.destination(), PREPARE.destination());
    }

    #[test]
    fn outgoing_is_bound_exactly_once() {
        let request = IlpRequest::try_from(Bytes::copy_from_slice(PREPARE.as_ref())).unwrap();
        let incoming = Account::new(AccountId::new(), Asset::new("XRP", 9));
        let mut ctx = IlpContext::new(test_services(), incoming, request);

        assert!(matches!(
            ctx.outgoing(),
            Err(ConnectorError::OutgoingNotResolved)
        ));

        let outgoing = Account::new(AccountId::new(), Asset::new("XRP", 9));
        let id = outgoing.id;
        ctx.set_outgoing(outgoing.clone()).unwrap();
        assert_eq!(ctx.outgoing().unwrap().id, id);

        assert!(matches!(
            ctx.set_outgoing(outgoing),
            Err(ConnectorError::OutgoingAlreadyResolved)
        ));
    }
}
