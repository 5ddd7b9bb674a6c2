use tracing::error;

use crate::errors::ApiError;
use crate::service::{Account, PeerStore};

pub const BEARER_TOKEN_START: usize = 7;

/// Extracts the token from an `Authorization: Bearer <token>` header value.
pub fn parse_bearer_token(header: &str) -> Option<&str> {
    let scheme = header.get(..BEARER_TOKEN_START)?;
    if !scheme.eq_ignore_ascii_case("bearer ") {
        return None;
    }
    let token = header[BEARER_TOKEN_START..].trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Maps the `Authorization` header of an inbound request to the peer it
/// belongs to.
pub async fn authenticate(
    peers: &dyn PeerStore,
    authorization: Option<&str>,
) -> Result<Account, ApiError> {
    let token = authorization
        .and_then(parse_bearer_token)
        .ok_or_else(|| {
            error!("Missing or malformed authorization header");
            ApiError::unauthorized().detail("missing or malformed bearer token")
        })?;
    match peers.get_by_incoming_token(token).await {
        Ok(Some(account)) => Ok(account),
        Ok(None) => {
            error!("No peer found for the provided authorization token");
            Err(ApiError::unauthorized().detail("unknown bearer token"))
        }
        Err(err) => {
            error!("Error looking up peer by token: {}", err);
            Err(ApiError::internal_server_error())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{test_store, PEER_ACCOUNT, PEER_TOKEN};

    #[test]
    fn parses_bearer_tokens() {
        assert_eq!(parse_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("bearer abc"), Some("abc"));
        assert_eq!(parse_bearer_token("Bearer "), None);
        assert_eq!(parse_bearer_token("Bearer    "), None);
        assert_eq!(parse_bearer_token("Basic abcdef"), None);
        assert_eq!(parse_bearer_token("abc"), None);
        assert_eq!(parse_bearer_token(""), None);
    }

    #[tokio::test]
    async fn authenticates_known_tokens() {
        let store = test_store();
        let header = format!("Bearer {}", PEER_TOKEN);
        let account = authenticate(&store, Some(header.as_str())).await.unwrap();
        assert_eq!(account.id, PEER_ACCOUNT.id);
    }

    #[tokio::test]
    async fn refuses_unknown_or_missing_tokens() {
        let store = test_store();
        for header in &[None, Some("Bearer wrong"), Some("Bearer"), Some(PEER_TOKEN)] {
            let err = authenticate(&store, *header).await.unwrap_err();
            assert_eq!(err.status, http::StatusCode::UNAUTHORIZED);
            assert!(err.detail.is_some());
        }
    }

    #[tokio::test]
    async fn tells_missing_and_unknown_tokens_apart() {
        let store = test_store();
        let missing = authenticate(&store, None).await.unwrap_err();
        assert_eq!(
            missing.detail.as_deref(),
            Some("missing or malformed bearer token")
        );
        let unknown = authenticate(&store, Some("Bearer wrong")).await.unwrap_err();
        assert_eq!(unknown.detail.as_deref(), Some("unknown bearer token"));
    }
}
