use async_trait::async_trait;
use tracing::debug;

use crate::errors::ConnectorError;
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Limits the size of each packet sent to an account, for accounts that set
/// a `max_packet_amount`. Oversized packets are rejected with F08 and the
/// limit, so senders can split their payment.
#[derive(Clone, Copy, Debug, Default)]
pub struct MaxPacketAmountHandler;

#[async_trait]
impl IlpHandler for MaxPacketAmountHandler {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let max = match ctx.outgoing()?.max_packet_amount {
            Some(max) => max,
            None => return Ok(Outcome::Next),
        };
        let amount = ctx.prepare().amount();
        if amount <= max {
            Ok(Outcome::Next)
        } else {
            debug!("Prepare amount {} exceeds maximum packet amount {}", amount, max);
            Err(ConnectorError::AmountTooLarge { amount, max })
        }
    }
}
