use std::time::Duration;

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{Client, IntoConnectionInfo, Value};
use tracing::debug;

use crate::errors::StoreError;
use crate::stream::ConnectionCounterStore;

fn total_received_key(connection_id: &str) -> String {
    format!("stream:{}:total_received", connection_id)
}

/// Connection counters kept in Redis so several connector instances can
/// share them.
///
/// Redis integers are signed 64-bit, so a connection whose total would pass
/// `i64::MAX` fails to increment instead of wrapping.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: MultiplexedConnection,
}

impl RedisCounterStore {
    pub async fn connect<R: IntoConnectionInfo>(redis_uri: R) -> Result<Self, StoreError> {
        let client = Client::open(redis_uri)?;
        let connection = client.get_multiplexed_tokio_connection().await?;
        debug!("Connected to Redis: {:?}", client.get_connection_info().addr);
        Ok(RedisCounterStore { connection })
    }
}

fn decimal_from_value(key: &str, value: Value) -> Result<String, StoreError> {
    let invalid = |value: String| StoreError::InvalidAmount {
        key: key.to_string(),
        value,
    };
    match value {
        Value::Int(total) => Ok(total.to_string()),
        Value::Data(bytes) => {
            let total = String::from_utf8(bytes)
                .map_err(|err| invalid(String::from_utf8_lossy(err.as_bytes()).into_owned()))?;
            if !total.is_empty() && total.bytes().all(|byte| byte.is_ascii_digit()) {
                Ok(total)
            } else {
                Err(invalid(total))
            }
        }
        other => Err(invalid(format!("{:?}", other))),
    }
}

#[async_trait]
impl ConnectionCounterStore for RedisCounterStore {
    async fn increment_received(
        &self,
        connection_id: &str,
        amount: u64,
        ttl: Duration,
    ) -> Result<String, StoreError> {
        let key = total_received_key(connection_id);
        let mut connection = self.connection.clone();
        // INCRBY and EXPIRE run as one MULTI/EXEC transaction
        let (total,): (Value,) = redis::pipe()
            .atomic()
            .cmd("INCRBY")
            .arg(&key)
            .arg(amount.to_string())
            .cmd("EXPIRE")
            .arg(&key)
            .arg(ttl.as_secs().max(1))
            .ignore()
            .query_async(&mut connection)
            .await?;
        decimal_from_value(&key, total)
    }

    async fn get_received(&self, connection_id: &str) -> Result<Option<String>, StoreError> {
        let key = total_received_key(connection_id);
        let mut connection = self.connection.clone();
        let total: Value = redis::cmd("GET")
            .arg(&key)
            .query_async(&mut connection)
            .await?;
        match total {
            Value::Nil => Ok(None),
            value => decimal_from_value(&key, value).map(Some),
        }
    }
}
