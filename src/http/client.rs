use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use bytes::BytesMut;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, ClientBuilder};
use secrecy::ExposeSecret;
use tracing::{debug_span, error, trace};
use tracing_futures::Instrument;

use crate::errors::ConnectorError;
use crate::service::{IlpContext, IlpHandler, Outcome};

/// Default timeout for requests to peers.
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(30);

/// Sends the Prepare to the outgoing account over ILP-over-HTTP and stores
/// the peer's reply. Always the last handler in the chain.
#[derive(Clone)]
pub struct ForwardingHandler {
    client: Client,
}

impl ForwardingHandler {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert(
            HeaderName::from_static("content-type"),
            HeaderValue::from_static("application/octet-stream"),
        );
        let client = ClientBuilder::new()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(ForwardingHandler { client })
    }

    async fn forward(&self, ctx: &mut IlpContext) -> Result<(), ConnectorError> {
        let to = ctx.outgoing()?;
        let http = to
            .http_outgoing()
            .ok_or(ConnectorError::NoOutgoingEndpoint(to.id))?;
        trace!(
            "Sending outgoing ILP over HTTP packet to account: {} (URL: {})",
            to.id,
            http.url.as_str()
        );

        let body = ctx.request.outgoing_bytes()?;
        let deadline = ctx
            .prepare()
            .expires_at()
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        let request = self
            .client
            .post(http.url.clone())
            .bearer_auth(http.auth_token.expose_secret())
            .body(body.freeze())
            .send();

        let response = tokio::time::timeout(deadline, request)
            .await
            .map_err(|_| {
                error!("Peer did not reply before the packet expired");
                ConnectorError::ForwardTimedOut
            })?
            .map_err(|err| {
                error!("Error sending HTTP request: {}", err);
                peer_error(err)
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("HTTP error sending ILP over HTTP packet: {}", status);
            return Err(ConnectorError::PeerHttpStatus(status));
        }

        let body = response.bytes().await.map_err(|err| {
            error!("Error getting HTTP response body: {}", err);
            peer_error(err)
        })?;
        ctx.response
            .set_raw(BytesMut::from(&body[..]))
            .map_err(|err| {
                error!("Peer replied with an invalid ILP packet: {}", err);
                ConnectorError::InvalidPeerResponse(err)
            })
    }
}

/// The client's own timeout counts as the packet timing out.
fn peer_error(err: reqwest::Error) -> ConnectorError {
    if err.is_timeout() {
        ConnectorError::ForwardTimedOut
    } else {
        ConnectorError::PeerUnreachable(err)
    }
}

#[async_trait]
impl IlpHandler for ForwardingHandler {
    async fn handle(&self, ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
        let to = ctx.outgoing()?.id;
        self.forward(ctx)
            .instrument(debug_span!("forwarding", to.id = %to))
            .await?;
        Ok(Outcome::Done)
    }
}
