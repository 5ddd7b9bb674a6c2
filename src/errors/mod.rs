//! Error types for the connector: RFC7807 problem details for the HTTP layer,
//! store errors, and the pipeline error that becomes an ILP Reject.

mod api_error;
pub use api_error::*;

mod store_error;
pub use store_error::{StoreError, TransferError};

mod connector_error;
pub use connector_error::ConnectorError;
