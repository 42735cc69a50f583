use clap::Parser;
use relay::config::{
    Config, DEFAULT_ENDPOINT, DEFAULT_LISTEN_HOST, DEFAULT_LISTEN_PORT, ForwarderConfig, Identity,
    Listener,
};
use relay::workload::WorkloadConfig;
use std::time::Duration;
use url::Url;

/// Relay node for synthetic request chains between pods.
///
/// Workloads are toggled with TEST_SLEEP (duration), TEST_CPU (iterations)
/// and TEST_RAM (bytes).
#[derive(Parser, Debug)]
#[command(name = "npods", version)]
pub struct Cli {
    /// URL every hop is relayed to
    #[arg(long, env = "NPODS_NEXT_URI", value_parser = Url::parse)]
    pub next_uri: Url,

    #[arg(long, env = "NPODS_LISTEN_HOST", default_value = DEFAULT_LISTEN_HOST)]
    pub host: String,

    #[arg(long, env = "NPODS_LISTEN_PORT", default_value_t = DEFAULT_LISTEN_PORT)]
    pub port: u16,

    /// Path the relay answers on; a trailing '/' covers the whole subtree
    #[arg(long, env = "NPODS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    #[arg(long, env = "NPODS_ADMIN_HOST", default_value = DEFAULT_LISTEN_HOST)]
    pub admin_host: String,

    /// Serve /health and /ready on this port
    #[arg(long, env = "NPODS_ADMIN_PORT")]
    pub admin_port: Option<u16>,

    /// Timeout for a single delivery attempt to the next hop
    #[arg(long, env = "NPODS_FORWARD_TIMEOUT", default_value = "15s", value_parser = humantime::parse_duration)]
    pub forward_timeout: Duration,

    /// Pause between failed delivery attempts
    #[arg(long, env = "NPODS_RETRY_DELAY", default_value = "1s", value_parser = humantime::parse_duration)]
    pub retry_delay: Duration,

    /// Send metrics to this StatsD host
    #[arg(long, env = "NPODS_STATSD_HOST")]
    pub statsd_host: Option<String>,

    #[arg(long, env = "NPODS_STATSD_PORT", default_value_t = 8125)]
    pub statsd_port: u16,

    #[arg(long, env = "SENTRY_DSN")]
    pub sentry_dsn: Option<String>,
}

impl Cli {
    pub fn into_config(self, hostname: String, workload: WorkloadConfig) -> Config {
        Config {
            listener: Listener {
                host: self.host,
                port: self.port,
            },
            admin_listener: self.admin_port.map(|port| Listener {
                host: self.admin_host,
                port,
            }),
            endpoint: self.endpoint,
            identity: Identity::new(hostname, self.next_uri),
            workload,
            forwarder: ForwarderConfig {
                attempt_timeout: self.forward_timeout,
                retry_delay: self.retry_delay,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["npods", "--next-uri", "http://npods-1.npods:80/"]).unwrap();
        let config = cli.into_config("npods-0".into(), WorkloadConfig::default());

        assert!(config.validate().is_ok());
        assert_eq!(config.listener, Listener::default());
        assert_eq!(config.admin_listener, None);
        assert_eq!(config.endpoint, "/");
        assert_eq!(config.forwarder, ForwarderConfig::default());
        assert_eq!(config.identity.next_hop().as_str(), "http://npods-1.npods/");
        assert_eq!(config.identity.hostname(), "npods-0");
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "npods",
            "--next-uri",
            "http://next:8080/relay",
            "--port",
            "8080",
            "--endpoint",
            "/relay",
            "--admin-port",
            "9090",
            "--forward-timeout",
            "2s",
            "--retry-delay",
            "250ms",
        ])
        .unwrap();
        let config = cli.into_config("me".into(), WorkloadConfig::default());

        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.endpoint, "/relay");
        assert_eq!(
            config.admin_listener,
            Some(Listener {
                host: "0.0.0.0".into(),
                port: 9090
            })
        );
        assert_eq!(config.forwarder.attempt_timeout, Duration::from_secs(2));
        assert_eq!(config.forwarder.retry_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_invalid_values() {
        let err = Cli::try_parse_from(["npods", "--next-uri", "not a url"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
        assert_ne!(err.exit_code(), 0);

        let err = Cli::try_parse_from([
            "npods",
            "--next-uri",
            "http://next/",
            "--retry-delay",
            "soon",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_missing_next_uri() {
        if std::env::var_os("NPODS_NEXT_URI").is_some() {
            return;
        }
        let err = Cli::try_parse_from(["npods"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_ne!(err.exit_code(), 0);
    }
}
