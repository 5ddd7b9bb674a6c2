use std::str::FromStr;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::errors::ConnectorError;
use crate::ildcp::is_ildcp_destination;
use crate::packet::Address;
use crate::service::{
    Account, AccountId, ConnectorServices, IlpContext, IlpHandler, Outcome, ACCOUNT_ID_LENGTH,
};
use crate::stream::StreamDestination;

/// Resolves the outgoing account for the Prepare's destination.
///
/// Lookups are tried in order:
///
/// 1. the local account named by a STREAM payment tag,
/// 2. the peer with the longest static address prefixing the destination,
/// 3. the account whose id is the segment directly under this connector's
///    address (`<connector>.<account id>[.<anything>]`).
///
/// `peer.config` requests are left unresolved for the IL-DCP handler.
#[derive(Clone, Copy, Debug, Default)]
pub struct AccountResolver;

impl AccountResolver {
    async fn resolve(
        services: &ConnectorServices,
        destination: &Address,
        stream_tag: Option<&StreamDestination>,
    ) -> Result<Account, ConnectorError> {
        if let Some(StreamDestination(tag)) = stream_tag {
            match AccountId::from_str(tag) {
                Ok(id) => {
                    if let Some(account) = services.accounts.get_account(id).await? {
                        trace!("Resolved STREAM payment tag to account {}", id);
                        return Ok(account.with_stream_enabled(true));
                    }
                    debug!("No account for STREAM payment tag {}", id);
                }
                Err(err) => debug!("STREAM payment tag is not an account id: {}", err),
            }
        }

        if let Some(peer) = services.peers.get_by_destination_address(destination).await? {
            trace!("Resolved destination to peer {}", peer.id);
            return Ok(peer.with_stream_enabled(false));
        }

        if let Some(segment) = local_segment(&services.ilp_address, destination) {
            let id = AccountId::from_str(segment).map_err(|err| {
                debug!("Invalid account id in destination: {}", err);
                ConnectorError::UnknownDestination
            })?;
            if let Some(account) = services.accounts.get_account(id).await? {
                return Ok(account.with_stream_enabled(true));
            }
            if let Some(peer) = services.peers.get_by_account_id(id).await? {
                return Ok(peer.with_stream_enabled(true));
            }
        }

        Err(ConnectorError::UnknownDestination)
    }
}

/// The segment right below `server` in `destination`, when it has the
/// length of an account id.
fn local_segment<'a>(server: &Address, destination: &'a Address) -> Option<&'a str> {
    if !server.is_prefix_of(destination) || destination == server {
        return None;
    }
    let segment = destination.as_str()[server.len() + 1..].split('.').next()?;
    if segment.len() == ACCOUNT_ID_LENGTH {
        Some(segment)
    } else {
        None
    }
}

#[async_trait]
impl IlpHandler for AccountResolver {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        if ctx.incoming().disabled {
            return Err(ConnectorError::SourceAccountDisabled);
        }
        // answered by the IL-DCP handler, there is no account behind it
        if is_ildcp_destination(ctx.prepare()) {
            return Ok(Outcome::Next);
        }

        let outgoing = AccountResolver::resolve(
            ctx.services(),
            ctx.prepare().destination(),
            ctx.extensions.get::<StreamDestination>(),
        )
        .await?;

        if outgoing.disabled {
            return Err(ConnectorError::DestinationAccountDisabled);
        }
        ctx.set_outgoing(outgoing)?;
        Ok(Outcome::Next)
    }
}
