use super::StoreError;
use crate::packet::{
    Address, ErrorCode, MaxPacketAmountDetails, ParseError, Reject, RejectBuilder,
};
use crate::service::AccountId;
use http::StatusCode;
use thiserror::Error;

/// Everything that can abort the handler chain. Each variant maps onto the
/// ILP error code of the Reject sent back to the sender.
#[derive(Error, Debug)]
pub enum ConnectorError {
    #[error("source account is disabled")]
    SourceAccountDisabled,
    #[error("destination account is disabled")]
    DestinationAccountDisabled,
    #[error("unknown destination account")]
    UnknownDestination,
    #[error("not a peer account")]
    NotAPeerAccount,
    #[error("no outgoing http endpoint configured for account {0}")]
    NoOutgoingEndpoint(AccountId),
    #[error("packet expired")]
    PacketExpired,
    #[error("packet amount {amount} exceeds the maximum of {max}")]
    AmountTooLarge { amount: u64, max: u64 },
    #[error("peer did not reply before the packet expired")]
    ForwardTimedOut,
    #[error("error sending packet to peer: {0}")]
    PeerUnreachable(#[source] reqwest::Error),
    #[error("peer responded with HTTP status {0}")]
    PeerHttpStatus(StatusCode),
    #[error("invalid reply from peer: {0}")]
    InvalidPeerResponse(#[source] ParseError),
    #[error("invalid packet: {0}")]
    InvalidPacket(#[from] ParseError),
    #[error("outgoing account read before it was resolved")]
    OutgoingNotResolved,
    #[error("outgoing account already resolved")]
    OutgoingAlreadyResolved,
    #[error("handler chain completed without setting a reply")]
    NoReply,
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl ConnectorError {
    pub fn code(&self) -> ErrorCode {
        use ConnectorError::*;
        match self {
            SourceAccountDisabled
            | DestinationAccountDisabled
            | UnknownDestination
            | NoOutgoingEndpoint(_) => ErrorCode::F02_UNREACHABLE,
            PacketExpired | ForwardTimedOut => ErrorCode::R00_TRANSFER_TIMED_OUT,
            AmountTooLarge { .. } => ErrorCode::F08_AMOUNT_TOO_LARGE,
            PeerUnreachable(_) | InvalidPeerResponse(_) => ErrorCode::T01_PEER_UNREACHABLE,
            PeerHttpStatus(status) if status.is_client_error() => ErrorCode::F02_UNREACHABLE,
            PeerHttpStatus(_) => ErrorCode::T01_PEER_UNREACHABLE,
            InvalidPacket(_) => ErrorCode::F01_INVALID_PACKET,
            NotAPeerAccount | OutgoingNotResolved | OutgoingAlreadyResolved | NoReply
            | Store(_) => ErrorCode::T00_INTERNAL_ERROR,
        }
    }

    /// Builds the Reject returned to the sender, attributed to `triggered_by`.
    pub fn to_reject(&self, triggered_by: &Address) -> Reject {
        let data = match *self {
            ConnectorError::AmountTooLarge { amount, max } => {
                MaxPacketAmountDetails::new(amount, max).to_bytes().to_vec()
            }
            _ => Vec::new(),
        };
        let message = self.to_string();
        RejectBuilder {
            code: self.code(),
            message: message.as_bytes(),
            triggered_by: Some(triggered_by),
            data: &data,
        }
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn maps_errors_to_codes() {
        assert_eq!(
            ConnectorError::SourceAccountDisabled.code(),
            ErrorCode::F02_UNREACHABLE
        );
        assert_eq!(
            ConnectorError::PeerHttpStatus(StatusCode::NOT_FOUND).code(),
            ErrorCode::F02_UNREACHABLE
        );
        assert_eq!(
            ConnectorError::PeerHttpStatus(StatusCode::BAD_GATEWAY).code(),
            ErrorCode::T01_PEER_UNREACHABLE
        );
        assert_eq!(
            ConnectorError::ForwardTimedOut.code(),
            ErrorCode::R00_TRANSFER_TIMED_OUT
        );
        assert_eq!(
            ConnectorError::NotAPeerAccount.code(),
            ErrorCode::T00_INTERNAL_ERROR
        );
    }

    #[test]
    fn reject_carries_message_and_trigger() {
        let connector = Address::from_str("example.connector").unwrap();
        let reject = ConnectorError::DestinationAccountDisabled.to_reject(&connector);
        assert_eq!(reject.code(), ErrorCode::F02_UNREACHABLE);
        assert_eq!(reject.message(), b"destination account is disabled");
        assert_eq!(reject.triggered_by(), Some(&connector));
        assert!(reject.data().is_empty());
    }

    #[test]
    fn amount_too_large_includes_details() {
        let connector = Address::from_str("example.connector").unwrap();
        let reject = ConnectorError::AmountTooLarge {
            amount: 1000,
            max: 10,
        }
        .to_reject(&connector);
        assert_eq!(reject.code(), ErrorCode::F08_AMOUNT_TOO_LARGE);
        let details = MaxPacketAmountDetails::from_bytes(reject.data()).unwrap();
        assert_eq!(details.amount_received(), 1000);
        assert_eq!(details.max_amount(), 10);
    }
}
