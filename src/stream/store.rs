use std::time::Duration;

use async_trait::async_trait;

use crate::errors::StoreError;

/// Running totals of money received per STREAM connection.
///
/// Totals are exchanged as decimal strings so stores are free to count
/// beyond `u64::MAX`.
#[async_trait]
pub trait ConnectionCounterStore: Send + Sync {
    /// Adds `amount` to the connection's total and resets its expiry to
    /// `ttl`, as one atomic step. Returns the new total.
    async fn increment_received(
        &self,
        connection_id: &str,
        amount: u64,
        ttl: Duration,
    ) -> Result<String, StoreError>;

    async fn get_received(&self, connection_id: &str) -> Result<Option<String>, StoreError>;
}
