use std::str;

use tracing::{debug_span, error_span, info, info_span, Span};
use uuid::Uuid;

use super::{IlpContext, IlpReply};

/// Spans wrapping the processing of one incoming packet. The second span
/// carries details that can be looked up by account id, so it is only
/// recorded when debugging.
pub fn incoming_spans(ctx: &IlpContext) -> (Span, Span) {
    let prepare = ctx.prepare();
    let from = ctx.incoming();
    let request_span = error_span!(
        "incoming",
        request.id = %Uuid::new_v4(),
        prepare.destination = %prepare.destination(),
        prepare.amount = prepare.amount(),
        from.id = %from.id,
    );
    let details_span = debug_span!(
        parent: &request_span,
        "",
        from.asset_code = %from.asset.code,
        from.asset_scale = from.asset.scale,
    );
    (request_span, details_span)
}

pub fn trace_reply(reply: &IlpReply) {
    match reply {
        IlpReply::Fulfill(fulfill) => {
            debug_span!("", fulfillment = %hex::encode(fulfill.fulfillment())).in_scope(|| {
                info!(result = "fulfill");
            })
        }
        IlpReply::Reject(reject) => {
            let triggered_by = reject
                .triggered_by()
                .map(ToString::to_string)
                .unwrap_or_default();
            info_span!("",
                reject.code = %reject.code(),
                reject.message = %str::from_utf8(reject.message()).unwrap_or_default(),
                reject.triggered_by = %triggered_by,
            )
            .in_scope(|| {
                info!(result = "reject");
            })
        }
    }
}
