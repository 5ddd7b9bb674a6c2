use async_trait::async_trait;
use tracing::debug;

use super::packet::{is_ildcp_destination, IldcpResponseBuilder, PEER_PROTOCOL_CONDITION};
use crate::errors::ConnectorError;
use crate::packet::{ErrorCode, Fulfill, RejectBuilder};
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Answers `peer.config` requests from peers with their address and asset.
/// Such requests are never forwarded.
#[derive(Clone, Copy, Debug, Default)]
pub struct IldcpHandler;

#[async_trait]
impl IlpHandler for IldcpHandler {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        if !is_ildcp_destination(ctx.prepare()) {
            return Ok(Outcome::Next);
        }

        let from = ctx.incoming();
        let client_address = from
            .static_ilp_address
            .as_ref()
            .ok_or(ConnectorError::NotAPeerAccount)?;

        if ctx.prepare().execution_condition() != PEER_PROTOCOL_CONDITION {
            let reject = RejectBuilder {
                code: ErrorCode::F00_BAD_REQUEST,
                message: b"packet is not an IL-DCP request",
                triggered_by: Some(&ctx.services().ilp_address),
                data: &[],
            }
            .build();
            ctx.response.set_reject(reject);
            return Ok(Outcome::Done);
        }

        debug!("Answering IL-DCP request from {}", client_address);
        let fulfill = Fulfill::from(
            IldcpResponseBuilder {
                client_address,
                asset_scale: from.asset.scale,
                asset_code: &from.asset.code,
            }
            .build(),
        );
        ctx.response.set_fulfill(fulfill);
        Ok(Outcome::Done)
    }
}
