use std::ffi::OsString;
use std::path::Path;

use clap::{App, Arg, ArgMatches};
use config::ConfigError;
use ilp_connector::node::{load_config, ConnectorConfig, CONFIG_KEYS};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

#[tokio::main]
async fn main() {
    let app = cmdline_configuration(env!("CARGO_PKG_VERSION"));
    let args = std::env::args_os().collect::<Vec<_>>();

    let config = match load_configuration(app, args) {
        Ok(config) => config,
        Err(BadConfig::HelpOrVersion(e)) | Err(BadConfig::BadArguments(e)) => e.exit(),
        Err(BadConfig::LoadFailed(path, e)) => {
            output_config_error(e, path.as_deref());
            std::process::exit(1);
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            error!("Unable to listen for shutdown signal, running until killed");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal");
    };

    if let Err(err) = config.serve(shutdown).await {
        error!("Connector failed: {}", err);
        std::process::exit(1);
    }
}

fn cmdline_configuration(version: &str) -> App<'static, '_> {
    // Arguments are named after the configuration keys they override so the
    // same name works in a config file, as `ILP_<NAME>` and on the command line.
    App::new("ilp-connector")
        .about("Run an Interledger connector speaking ILP over HTTP")
        .version(version)
        .args(&[
            // Positional arguments
            Arg::with_name("config")
                .takes_value(true)
                .index(1)
                .help("Name of config file (in JSON, YAML or TOML format)"),
            // Non-positional arguments
            Arg::with_name("ilp_address")
                .long("ilp_address")
                .takes_value(true)
                .help("ILP address of this connector. Local accounts are addressed beneath it"),
            Arg::with_name("secret_seed")
                .long("secret_seed")
                .takes_value(true)
                .help("Root secret used to derive STREAM shared secrets (32 bytes, hex-encoded)"),
            Arg::with_name("http_bind_address")
                .long("http_bind_address")
                .takes_value(true)
                .help("IP address and port to listen for ILP over HTTP requests on [default: 127.0.0.1:7770]"),
            Arg::with_name("redis_url")
                .long("redis_url")
                .takes_value(true)
                .help("Redis URI for STREAM connection counters. Counters are kept in memory if unset"),
            Arg::with_name("forward_timeout")
                .long("forward_timeout")
                .takes_value(true)
                .help("Milliseconds to wait for a peer to answer a forwarded packet [default: 30000]"),
            Arg::with_name("stream_connection_ttl")
                .long("stream_connection_ttl")
                .takes_value(true)
                .help("Seconds a STREAM connection counter is kept after its last payment [default: 600]"),
            Arg::with_name("expiry_shortening")
                .long("expiry_shortening")
                .takes_value(true)
                .help("Milliseconds taken off the expiry of packets before forwarding [default: 500]"),
        ])
}

#[derive(Debug)]
enum BadConfig {
    HelpOrVersion(clap::Error),
    BadArguments(clap::Error),
    LoadFailed(Option<String>, ConfigError),
}

fn load_configuration(app: App<'_, '_>, args: Vec<OsString>) -> Result<ConnectorConfig, BadConfig> {
    let matches = app.get_matches_from_safe(args).map_err(|err| match err.kind {
        clap::ErrorKind::HelpDisplayed | clap::ErrorKind::VersionDisplayed => {
            BadConfig::HelpOrVersion(err)
        }
        _ => BadConfig::BadArguments(err),
    })?;

    let config_path = matches.value_of("config");
    load_config(
        config_path.map(Path::new),
        "ILP",
        argument_overrides(&matches),
    )
    .map_err(|err| BadConfig::LoadFailed(config_path.map(str::to_string), err))
}

fn argument_overrides(matches: &ArgMatches) -> Vec<(&'static str, Option<String>)> {
    CONFIG_KEYS
        .iter()
        .map(|key| (*key, matches.value_of(key).map(str::to_string)))
        .collect()
}

fn output_config_error(error: ConfigError, config_path: Option<&str>) {
    match (&error, config_path) {
        (ConfigError::Foreign(_), Some(path)) => {
            eprintln!("Error reading config file {}: {}", path, error)
        }
        (ConfigError::NotFound(key), _) | (ConfigError::Type { key: Some(key), .. }, _) => {
            eprintln!("Invalid configuration for {}: {}", key, error)
        }
        _ => eprintln!("Error: {}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::{cmdline_configuration, load_configuration, BadConfig};
    use std::ffi::OsString;
    use std::io::Write;

    const SEED: &str = "8852500887504328225458511465394229327394647958135038836332350604";

    fn args(args: &[&str]) -> Vec<OsString> {
        std::iter::once("ilp-connector")
            .chain(args.iter().copied())
            .map(OsString::from)
            .collect()
    }

    #[test]
    fn loads_configuration_from_cmdline() {
        let config = load_configuration(
            cmdline_configuration("anything"),
            args(&[
                "--ilp_address",
                "example.connector",
                "--secret_seed",
                SEED,
                "--forward_timeout",
                "1500",
            ]),
        )
        .unwrap();
        assert_eq!(config.ilp_address.as_str(), "example.connector");
        assert_eq!(config.forward_timeout, 1500);
        assert_eq!(config.stream_connection_ttl, 600);
    }

    #[test]
    fn cmdline_overrides_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "ilp_address: example.from_file\nsecret_seed: \"{}\"\nhttp_bind_address: \"127.0.0.1:8000\"",
            SEED
        )
        .unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = load_configuration(
            cmdline_configuration("anything"),
            args(&[path.as_str(), "--ilp_address", "example.from_args"]),
        )
        .unwrap();
        assert_eq!(config.ilp_address.as_str(), "example.from_args");
        assert_eq!(config.http_bind_address.port(), 8000);
    }

    #[test]
    fn help_and_bad_arguments() {
        let help = load_configuration(cmdline_configuration("anything"), args(&["--help"]));
        assert!(matches!(help, Err(BadConfig::HelpOrVersion(_))));

        let unknown = load_configuration(cmdline_configuration("anything"), args(&["--nope", "1"]));
        assert!(matches!(unknown, Err(BadConfig::BadArguments(_))));
    }

    #[test]
    fn missing_file_or_values_fail_to_load() {
        let missing = load_configuration(
            cmdline_configuration("anything"),
            args(&["/definitely/not/here.json"]),
        );
        assert!(matches!(missing, Err(BadConfig::LoadFailed(Some(_), _))));

        let bad_timeout = load_configuration(
            cmdline_configuration("anything"),
            args(&[
                "--ilp_address",
                "example.connector",
                "--secret_seed",
                SEED,
                "--forward_timeout",
                "soon",
            ]),
        );
        assert!(matches!(bad_timeout, Err(BadConfig::LoadFailed(None, _))));
    }
}
