use std::convert::TryFrom;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use tracing::{error, info};
use tracing_futures::Instrument;
use warp::{Filter, Rejection};

use super::auth::authenticate;
use crate::errors::{default_rejection_handler, ApiError};
use crate::service::trace::{incoming_spans, trace_reply};
use crate::service::{ConnectorServices, ErrorHandler, IlpContext, IlpRequest};

/// Max message size that is allowed to transfer from a request or a message.
pub const MAX_PACKET_SIZE: u64 = 40000;

/// A warp filter that parses incoming ILP-over-HTTP requests, validates the
/// authorization and runs the packet through the handler chain.
#[derive(Clone)]
pub struct HttpServer {
    services: Arc<ConnectorServices>,
    handler: Arc<ErrorHandler>,
}

async fn ilp_over_http(
    authorization: Option<String>,
    body: Bytes,
    services: Arc<ConnectorServices>,
    handler: Arc<ErrorHandler>,
) -> Result<impl warp::Reply, Rejection> {
    let account = authenticate(services.peers.as_ref(), authorization.as_deref()).await?;

    let request = IlpRequest::try_from(body).map_err(|err| -> Rejection {
        error!("Body was not a valid Prepare packet: {}", err);
        ApiError::invalid_ilp_packet().detail(err.to_string()).into()
    })?;

    let mut ctx = IlpContext::new(services, account, request);
    let (request_span, details_span) = incoming_spans(&ctx);
    handler
        .run(&mut ctx)
        .instrument(details_span)
        .instrument(request_span.clone())
        .await;

    let reply = ctx.response.take().ok_or_else(|| -> Rejection {
        error!("Request finished without a reply");
        ApiError::internal_server_error().into()
    })?;
    request_span.in_scope(|| trace_reply(&reply));

    let bytes = BytesMut::from(reply).freeze();
    warp::http::Response::builder()
        .header("Content-Type", "application/octet-stream")
        .status(200)
        .body(bytes)
        .map_err(|err| -> Rejection {
            error!("Unable to build response: {}", err);
            ApiError::internal_server_error().into()
        })
}

impl HttpServer {
    pub fn new(services: Arc<ConnectorServices>, handler: ErrorHandler) -> Self {
        HttpServer {
            services,
            handler: Arc::new(handler),
        }
    }

    pub fn as_filter(
        &self,
    ) -> impl warp::Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
        let services = self.services.clone();
        let handler = self.handler.clone();
        let with_services = warp::any().map(move || services.clone()).boxed();
        let with_handler = warp::any().map(move || handler.clone());
        warp::post()
            .and(warp::path("ilp"))
            .and(warp::path::end())
            .and(warp::header::optional::<String>("authorization"))
            .and(warp::body::content_length_limit(MAX_PACKET_SIZE))
            .and(warp::body::bytes())
            .and(with_services)
            .and(with_handler)
            .and_then(ilp_over_http)
            .recover(default_rejection_handler)
    }

    /// Serves on `addr` until `shutdown` resolves.
    pub async fn bind<F>(self, addr: SocketAddr, shutdown: F) -> Result<(), warp::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (addr, server) =
            warp::serve(self.as_filter()).try_bind_with_graceful_shutdown(addr, shutdown)?;
        info!("ILP over HTTP listening on: {}", addr);
        server.await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConnectorError;
    use crate::packet::fixtures::PREPARE_BUILDER;
    use crate::packet::{Address, ErrorCode, PrepareBuilder};
    use crate::service::{HandlerChain, IlpHandler, IlpReply, Outcome};
    use crate::test_helpers::{test_services, CONNECTOR_ADDRESS, PEER_TOKEN};
    use async_trait::async_trait;
    use std::str::FromStr;
    use std::time::{Duration, SystemTime};

    struct Unroutable;

    #[async_trait]
    impl IlpHandler for Unroutable {
        async fn handle(&self, _ctx: &mut IlpContext) -> Result<Outcome, ConnectorError> {
            Err(ConnectorError::UnknownDestination)
        }
    }

    fn server() -> HttpServer {
        HttpServer::new(
            test_services(),
            ErrorHandler::new(HandlerChain::new().with(Unroutable)),
        )
    }

    fn bearer() -> String {
        format!("Bearer {}", PEER_TOKEN)
    }

    fn prepare_bytes() -> Vec<u8> {
        PrepareBuilder {
            destination: Address::from_str("example.nowhere").unwrap(),
            expires_at: SystemTime::now() + Duration::from_secs(30),
            ..*PREPARE_BUILDER
        }
        .build()
        .as_ref()
        .to_vec()
    }

    async fn post(authorization: Option<&str>, body: Vec<u8>) -> warp::http::Response<Bytes> {
        let mut request = warp::test::request().method("POST").path("/ilp");
        if let Some(authorization) = authorization {
            request = request.header("Authorization", authorization);
        }
        request.body(body).reply(&server().as_filter()).await
    }

    #[tokio::test]
    async fn replies_with_ilp_packet() {
        let response = post(Some(bearer().as_str()), prepare_bytes()).await;
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"],
            "application/octet-stream"
        );
        let reply = IlpReply::try_from(BytesMut::from(&response.body()[..])).unwrap();
        match reply {
            IlpReply::Reject(reject) => {
                assert_eq!(reject.code(), ErrorCode::F02_UNREACHABLE);
                assert_eq!(reject.triggered_by(), Some(&*CONNECTOR_ADDRESS));
            }
            IlpReply::Fulfill(_) => panic!("expected a reject"),
        }
    }

    #[tokio::test]
    async fn unauthorized_without_valid_token() {
        for authorization in &[None, Some("Bearer wrong"), Some("Bearer ")] {
            let response = post(*authorization, prepare_bytes()).await;
            assert_eq!(response.status(), 401);
            assert_eq!(
                response.headers()["content-type"],
                "application/problem+json"
            );
            let problem: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
            assert!(problem["detail"].is_string());
        }
    }

    #[tokio::test]
    async fn invalid_packet_is_server_error() {
        let response = post(Some(bearer().as_str()), b"garbage".to_vec()).await;
        assert_eq!(response.status(), 500);
        let problem: serde_json::Value = serde_json::from_slice(response.body()).unwrap();
        assert_eq!(problem["title"], "Invalid Packet");
        assert!(problem["detail"].is_string());

        // replies are not valid requests
        let reject = ConnectorError::NoReply.to_reject(&CONNECTOR_ADDRESS);
        let response = post(Some(bearer().as_str()), reject.as_ref().to_vec()).await;
        assert_eq!(response.status(), 500);
    }

    #[tokio::test]
    async fn oversized_body_is_refused() {
        let body = vec![0; MAX_PACKET_SIZE as usize + 1];
        let response = post(Some(bearer().as_str()), body).await;
        assert_eq!(response.status(), 413);
    }

    #[tokio::test]
    async fn only_post_ilp_is_served() {
        let response = warp::test::request()
            .method("GET")
            .path("/ilp")
            .reply(&server().as_filter())
            .await;
        assert_eq!(response.status(), 405);

        let response = warp::test::request()
            .method("POST")
            .path("/other")
            .header("Authorization", bearer())
            .body(prepare_bytes())
            .reply(&server().as_filter())
            .await;
        assert_eq!(response.status(), 404);
    }
}
