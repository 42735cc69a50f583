use crate::workload::WorkloadConfig;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

pub const DEFAULT_LISTEN_HOST: &str = "0.0.0.0";
pub const DEFAULT_LISTEN_PORT: u16 = 80;
pub const DEFAULT_ENDPOINT: &str = "/";
pub const DEFAULT_FORWARD_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Endpoint must start with '/': {0}")]
    InvalidEndpoint(String),

    #[error("Next hop must be an http or https URL: {0}")]
    UnsupportedScheme(String),

    #[error("Next hop has no host: {0}")]
    MissingHost(String),
}

/// Relay configuration, built once at startup and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    /// Listener for relay traffic
    pub listener: Listener,
    /// Optional listener for health and readiness probes
    pub admin_listener: Option<Listener>,
    /// Path pattern the relay answers on. A trailing `/` matches the whole subtree.
    pub endpoint: String,
    pub identity: Identity,
    pub workload: WorkloadConfig,
    pub forwarder: ForwarderConfig,
}

impl Config {
    pub fn new(next_hop: Url, hostname: String) -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            identity: Identity::new(hostname, next_hop),
            workload: WorkloadConfig::default(),
            forwarder: ForwarderConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin) = &self.admin_listener {
            admin.validate()?;
        }

        if !self.endpoint.starts_with('/') {
            return Err(ValidationError::InvalidEndpoint(self.endpoint.clone()));
        }

        let next_hop = self.identity.next_hop();
        if !matches!(next_hop.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(next_hop.to_string()));
        }
        if next_hop.host_str().is_none_or(str::is_empty) {
            return Err(ValidationError::MissingHost(next_hop.to_string()));
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: DEFAULT_LISTEN_HOST.into(),
            port: DEFAULT_LISTEN_PORT,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Who this node is and where it relays to.
///
/// Cheap to clone; the handler and every forwarding task hold a copy.
#[derive(Clone, Debug, PartialEq)]
pub struct Identity(Arc<IdentityInner>);

#[derive(Debug, PartialEq)]
struct IdentityInner {
    hostname: String,
    next_hop: Url,
}

impl Identity {
    pub fn new(hostname: String, next_hop: Url) -> Self {
        Identity(Arc::new(IdentityInner { hostname, next_hop }))
    }

    pub fn hostname(&self) -> &str {
        &self.0.hostname
    }

    pub fn next_hop(&self) -> &Url {
        &self.0.next_hop
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ForwarderConfig {
    /// Upper bound on a single delivery attempt, connect included
    pub attempt_timeout: Duration,
    /// Fixed pause between failed attempts
    pub retry_delay: Duration,
}

impl Default for ForwarderConfig {
    fn default() -> Self {
        ForwarderConfig {
            attempt_timeout: DEFAULT_FORWARD_TIMEOUT,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}
