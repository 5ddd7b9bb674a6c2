use tracing::{debug, error};

use super::{HandlerChain, IlpContext};
use crate::errors::ConnectorError;

/// Outermost wrapper around the handler chain. Whatever happens inside the
/// chain, the request leaves with exactly one reply in its holder.
pub struct ErrorHandler {
    chain: HandlerChain,
}

impl ErrorHandler {
    pub fn new(chain: HandlerChain) -> Self {
        ErrorHandler { chain }
    }

    pub async fn run(&self, ctx: &mut IlpContext) {
        let error = match self.chain.run(ctx).await {
            Ok(()) if !ctx.response.is_empty() => return,
            Ok(()) => {
                error!("Handler chain completed without setting a reply");
                ConnectorError::NoReply
            }
            Err(err) => {
                debug!("Error processing ILP packet: {}", err);
                err
            }
        };
        let reject = error.to_reject(&ctx.services().ilp_address);
        ctx.response.set_reject(reject);
    }
}
