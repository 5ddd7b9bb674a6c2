use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use hex::FromHex;
use serde::de::Error as DeserializeError;
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{debug, info};

use crate::errors::StoreError;
use crate::http::{ForwardingHandler, HttpServer};
use crate::ildcp::IldcpHandler;
use crate::packet::Address;
use crate::router::AccountResolver;
use crate::service::{Account, ConnectorServices, ErrorHandler, HandlerChain};
use crate::service_util::{ExpiryShortener, ExpiryValidator, MaxPacketAmountHandler};
use crate::store::{InMemoryStore, RedisCounterStore};
use crate::stream::{
    ConnectionCounterStore, StreamAddressHandler, StreamReceiptHandler, StreamServer,
};

/// Keys a configuration source may set, in the order the CLI lists them.
pub const CONFIG_KEYS: &[&str] = &[
    "ilp_address",
    "secret_seed",
    "http_bind_address",
    "redis_url",
    "forward_timeout",
    "stream_connection_ttl",
    "expiry_shortening",
];

fn default_http_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 7770))
}
fn default_forward_timeout() -> u64 {
    30000
}
fn default_stream_connection_ttl() -> u64 {
    600
}
fn default_expiry_shortening() -> u64 {
    500
}

fn deserialize_32_bytes_hex<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
where
    D: Deserializer<'de>,
{
    <[u8; 32]>::from_hex(String::deserialize(deserializer)?).map_err(|err| {
        DeserializeError::custom(format!(
            "Invalid hex value (must be 32 hex-encoded bytes): {:?}",
            err
        ))
    })
}

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("could not connect to the counter store: {0}")]
    Store(#[from] StoreError),
    #[error("could not build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("could not bind the HTTP server: {0}")]
    Bind(#[from] warp::Error),
}

/// Everything needed to run a connector. Loaded with [`load_config`].
#[derive(Deserialize, Clone)]
pub struct ConnectorConfig {
    /// The connector's own ILP address. Local receivers live beneath it.
    pub ilp_address: Address,
    /// Root secret the STREAM server derives its shared secrets from.
    #[serde(deserialize_with = "deserialize_32_bytes_hex")]
    pub secret_seed: [u8; 32],
    #[serde(default = "default_http_bind_address")]
    pub http_bind_address: SocketAddr,
    /// Connection counters go to Redis when set and stay in memory otherwise.
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Milliseconds to wait on a peer before giving up on a forwarded packet.
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout: u64,
    /// Seconds a STREAM connection counter lives after its last increment.
    #[serde(default = "default_stream_connection_ttl")]
    pub stream_connection_ttl: u64,
    /// Milliseconds taken off a Prepare's expiry before it is forwarded.
    #[serde(default = "default_expiry_shortening")]
    pub expiry_shortening: u64,
    /// Peers and local accounts the in-memory directory is seeded with.
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("ilp_address", &self.ilp_address)
            .field("secret_seed", &"[REDACTED]")
            .field("http_bind_address", &self.http_bind_address)
            .field("redis_url", &self.redis_url)
            .field("forward_timeout", &self.forward_timeout)
            .field("stream_connection_ttl", &self.stream_connection_ttl)
            .field("expiry_shortening", &self.expiry_shortening)
            .field("accounts", &self.accounts.len())
            .finish()
    }
}

/// Layers the configuration sources, lowest precedence first: the optional
/// file, environment variables starting with `env_prefix`, then `overrides`
/// (normally the command line). Unset overrides are skipped.
pub fn load_config<I>(
    file: Option<&Path>,
    env_prefix: &str,
    overrides: I,
) -> Result<ConnectorConfig, ConfigError>
where
    I: IntoIterator<Item = (&'static str, Option<String>)>,
{
    let mut builder = Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(
        Environment::with_prefix(env_prefix)
            .prefix_separator("_")
            .separator("__"),
    );
    for (key, value) in overrides {
        builder = builder.set_override_option(key, value)?;
    }
    builder.build()?.try_deserialize()
}

impl ConnectorConfig {
    /// The handlers every Prepare runs through, in order.
    pub fn handler_chain(&self) -> Result<HandlerChain, NodeError> {
        Ok(HandlerChain::new()
            .with(StreamAddressHandler)
            .with(AccountResolver)
            .with(ExpiryValidator)
            .with(IldcpHandler)
            .with(MaxPacketAmountHandler)
            .with(StreamReceiptHandler::new(Duration::from_secs(
                self.stream_connection_ttl,
            )))
            .with(ExpiryShortener::new(Duration::from_millis(
                self.expiry_shortening,
            )))
            .with(ForwardingHandler::new(Duration::from_millis(
                self.forward_timeout,
            ))?))
    }

    /// Seeds the in-memory directory and connects to the counter store.
    pub async fn services(&self) -> Result<Arc<ConnectorServices>, NodeError> {
        let store = InMemoryStore::from_accounts(self.accounts.iter().cloned());
        let counters: Arc<dyn ConnectionCounterStore> = match self.redis_url {
            Some(ref redis_url) => {
                debug!("Using Redis for STREAM connection counters");
                Arc::new(RedisCounterStore::connect(redis_url.as_str()).await?)
            }
            None => Arc::new(store.clone()),
        };
        Ok(Arc::new(ConnectorServices {
            ilp_address: self.ilp_address.clone(),
            peers: Arc::new(store.clone()),
            accounts: Arc::new(store.clone()),
            accounting: Arc::new(store),
            counters,
            stream: StreamServer::new(&self.secret_seed, self.ilp_address.clone()),
        }))
    }

    pub async fn http_server(&self) -> Result<HttpServer, NodeError> {
        let services = self.services().await?;
        let handler = ErrorHandler::new(self.handler_chain()?);
        Ok(HttpServer::new(services, handler))
    }

    /// Runs the connector until `shutdown` resolves.
    pub async fn serve<F>(&self, shutdown: F) -> Result<(), NodeError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        info!(
            "Starting connector {} with {} configured accounts",
            self.ilp_address,
            self.accounts.len()
        );
        let server = self.http_server().await?;
        server.bind(self.http_bind_address, shutdown).await?;
        info!("Connector stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SEED: &str = "0000000000000000000000000000000000000000000000000000000000000001";

    fn write_config(extension: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(extension)
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_file_with_defaults() {
        let file = write_config(
            ".json",
            &format!(
                r#"{{"ilp_address": "example.connector", "secret_seed": "{}"}}"#,
                SEED
            ),
        );
        let config = load_config(Some(file.path()), "ILP_TEST_DEFAULTS", vec![]).unwrap();
        assert_eq!(config.ilp_address.as_str(), "example.connector");
        assert_eq!(config.secret_seed[31], 1);
        assert_eq!(config.http_bind_address, default_http_bind_address());
        assert_eq!(config.redis_url, None);
        assert_eq!(config.forward_timeout, 30000);
        assert_eq!(config.stream_connection_ttl, 600);
        assert_eq!(config.expiry_shortening, 500);
        assert!(config.accounts.is_empty());
    }

    #[test]
    fn loads_accounts_from_yaml() {
        let file = write_config(
            ".yaml",
            &format!(
                r#"
ilp_address: example.connector
secret_seed: "{}"
accounts:
  - id: 11111111-1111-4111-8111-111111111111
    asset:
      code: USD
      scale: 2
    static_ilp_address: example.peer
    max_packet_amount: 1000
    http:
      incoming:
        auth_tokens: ["incoming"]
      outgoing:
        url: "http://localhost:7771/ilp"
        auth_token: outgoing
  - id: 22222222-2222-4222-8222-222222222222
    asset:
      code: USD
      scale: 2
"#,
                SEED
            ),
        );
        let config = load_config(Some(file.path()), "ILP_TEST_YAML", vec![]).unwrap();
        assert_eq!(config.accounts.len(), 2);
        let peer = &config.accounts[0];
        assert!(peer.is_peer());
        assert_eq!(peer.max_packet_amount, Some(1000));
        assert_eq!(peer.http_incoming_tokens().len(), 1);
        assert_eq!(
            peer.http_outgoing().unwrap().url.as_str(),
            "http://localhost:7771/ilp"
        );
        assert!(!config.accounts[1].is_peer());
    }

    #[test]
    fn environment_and_overrides_take_precedence() {
        let file = write_config(
            ".toml",
            &format!(
                "ilp_address = \"example.connector\"\nsecret_seed = \"{}\"\nforward_timeout = 1000\n",
                SEED
            ),
        );
        std::env::set_var("ILP_TEST_LAYERS_FORWARD_TIMEOUT", "2000");
        std::env::set_var("ILP_TEST_LAYERS_EXPIRY_SHORTENING", "100");
        let config = load_config(
            Some(file.path()),
            "ILP_TEST_LAYERS",
            vec![
                ("expiry_shortening", Some("250".to_string())),
                ("redis_url", None),
            ],
        )
        .unwrap();
        assert_eq!(config.forward_timeout, 2000);
        assert_eq!(config.expiry_shortening, 250);
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn rejects_bad_values() {
        let missing_address = load_config(
            None,
            "ILP_TEST_MISSING",
            vec![("secret_seed", Some(SEED.to_string()))],
        );
        assert!(missing_address.is_err());

        let short_seed = load_config(
            None,
            "ILP_TEST_SHORT_SEED",
            vec![
                ("ilp_address", Some("example.connector".to_string())),
                ("secret_seed", Some("abcd".to_string())),
            ],
        );
        assert!(short_seed.is_err());

        let bad_address = load_config(
            None,
            "ILP_TEST_BAD_ADDRESS",
            vec![
                ("ilp_address", Some("nope".to_string())),
                ("secret_seed", Some(SEED.to_string())),
            ],
        );
        assert!(bad_address.is_err());
    }

    #[test]
    fn debug_output_hides_seed() {
        let config = load_config(
            None,
            "ILP_TEST_DEBUG",
            vec![
                ("ilp_address", Some("example.connector".to_string())),
                ("secret_seed", Some(SEED.to_string())),
            ],
        )
        .unwrap();
        let output = format!("{:?}", config);
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains(SEED));
    }

    #[tokio::test]
    async fn builds_in_memory_services() {
        let config = load_config(
            None,
            "ILP_TEST_SERVICES",
            vec![
                ("ilp_address", Some("example.connector".to_string())),
                ("secret_seed", Some(SEED.to_string())),
            ],
        )
        .unwrap();
        let services = config.services().await.unwrap();
        assert_eq!(services.ilp_address.as_str(), "example.connector");
        assert_eq!(services.stream.server_address(), &config.ilp_address);
        assert_eq!(
            services.counters.get_received("nothing").await.unwrap(),
            None
        );
        assert!(config.handler_chain().is_ok());
    }
}
