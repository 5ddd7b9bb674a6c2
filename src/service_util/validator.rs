use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::error;

use crate::errors::ConnectorError;
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Rejects Prepares that have already expired.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpiryValidator;

#[async_trait]
impl IlpHandler for ExpiryValidator {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let expires_at = DateTime::<Utc>::from(ctx.prepare().expires_at());
        let now = Utc::now();
        if expires_at >= now {
            return Ok(Outcome::Next);
        }
        error!(
            "Incoming packet expired {}ms ago at {} (time now: {})",
            now.signed_duration_since(expires_at).num_milliseconds(),
            expires_at.to_rfc3339(),
            now.to_rfc3339(),
        );
        Err(ConnectorError::PacketExpired)
    }
}
