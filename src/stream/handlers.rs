use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::ConnectorError;
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Default lifetime of a connection's received total after its last packet.
pub const DEFAULT_CONNECTION_TTL: Duration = Duration::from_secs(600);

/// Payment tag recovered from a STREAM destination issued by this connector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamDestination(pub String);

/// Recognizes destinations issued by the local STREAM server and records
/// their payment tag for the account resolver.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamAddressHandler;

#[async_trait]
impl IlpHandler for StreamAddressHandler {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let tag = ctx
            .services()
            .stream
            .decode_payment_tag(ctx.prepare().destination());
        if let Some(tag) = tag {
            debug!("Destination carries STREAM payment tag {}", tag);
            ctx.extensions.insert(StreamDestination(tag));
        }
        Ok(Outcome::Next)
    }
}

/// Answers STREAM payments addressed to local accounts and keeps the
/// per-connection total received.
#[derive(Clone, Debug)]
pub struct StreamReceiptHandler {
    connection_ttl: Duration,
}

impl StreamReceiptHandler {
    pub fn new(connection_ttl: Duration) -> Self {
        StreamReceiptHandler { connection_ttl }
    }
}

impl Default for StreamReceiptHandler {
    fn default() -> Self {
        StreamReceiptHandler::new(DEFAULT_CONNECTION_TTL)
    }
}

#[async_trait]
impl IlpHandler for StreamReceiptHandler {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let outgoing = ctx.outgoing()?;
        if !outgoing.stream_enabled || ctx.extensions.get::<StreamDestination>().is_none() {
            return Ok(Outcome::Next);
        }

        let services = ctx.services();
        let mut reply = match services.stream.create_reply(ctx.prepare(), &outgoing.asset) {
            Ok(reply) => reply,
            Err(reject) => {
                ctx.response.set_reject(reject);
                return Ok(Outcome::Done);
            }
        };

        match services
            .counters
            .increment_received(reply.connection_id(), reply.amount(), self.connection_ttl)
            .await
        {
            Ok(total) => {
                if let Err(err) = reply.set_total_received(&total) {
                    warn!(
                        "Counter store returned an invalid total {:?} for connection {}: {}",
                        total,
                        reply.connection_id(),
                        err
                    );
                }
            }
            Err(err) => warn!(
                "Unable to update total received for connection {}: {}",
                reply.connection_id(),
                err
            ),
        }

        debug!("Fulfilling STREAM payment of {}", reply.amount());
        ctx.response.set_fulfill(reply.accept());
        Ok(Outcome::Done)
    }
}
