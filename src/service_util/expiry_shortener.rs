use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ConnectorError;
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Default margin, in milliseconds, taken off the expiry of forwarded packets.
pub const DEFAULT_ROUND_TRIP_TIME: u64 = 500;

/// Shortens the expiry of Prepares about to be forwarded, leaving time for
/// the peer's reply to travel back before the incoming Prepare expires.
#[derive(Clone, Copy, Debug)]
pub struct ExpiryShortener {
    round_trip_time: Duration,
}

impl ExpiryShortener {
    pub fn new(round_trip_time: Duration) -> Self {
        ExpiryShortener { round_trip_time }
    }
}

impl Default for ExpiryShortener {
    fn default() -> Self {
        ExpiryShortener::new(Duration::from_millis(DEFAULT_ROUND_TRIP_TIME))
    }
}

#[async_trait]
impl IlpHandler for ExpiryShortener {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let prepare = &mut ctx.request.prepare;
        if let Some(new_expiry) = prepare.expires_at().checked_sub(self.round_trip_time) {
            prepare.set_expires_at(new_expiry);
        }
        Ok(Outcome::Next)
    }
}
