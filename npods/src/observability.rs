use metrics_exporter_statsd::{StatsdBuilder, StatsdError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const METRICS_PREFIX: &str = "npods";

#[derive(thiserror::Error, Debug)]
pub enum ObservabilityError {
    #[error("could not build statsd recorder: {0}")]
    Statsd(#[from] StatsdError),
    #[error("a metrics recorder is already installed")]
    RecorderInstalled,
}

/// Installs the global tracing subscriber, reporting to Sentry as well when a
/// DSN is given. The returned guard flushes pending Sentry events on drop.
pub fn init_logging(sentry_dsn: Option<&str>) -> Option<sentry::ClientInitGuard> {
    let dsn = sentry_dsn.and_then(|dsn| match dsn.parse::<sentry::types::Dsn>() {
        Ok(dsn) => Some(dsn),
        Err(e) => {
            eprintln!("Ignoring invalid Sentry DSN: {e}");
            None
        }
    });

    let guard = dsn.map(|dsn| {
        sentry::init(sentry::ClientOptions {
            dsn: Some(dsn),
            ..Default::default()
        })
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(guard.as_ref().map(|_| sentry::integrations::tracing::layer()))
        .init();

    guard
}

/// Exports metrics to StatsD when a host is configured; otherwise metrics are dropped.
pub fn init_metrics(statsd_host: Option<&str>, statsd_port: u16) -> Result<(), ObservabilityError> {
    let Some(host) = statsd_host else {
        return Ok(());
    };

    let recorder = StatsdBuilder::from(host, statsd_port).build(Some(METRICS_PREFIX))?;
    metrics::set_global_recorder(recorder).map_err(|_| ObservabilityError::RecorderInstalled)?;
    shared::metrics_defs::describe_all(relay::metrics_defs::ALL_METRICS);

    tracing::info!(host, port = statsd_port, "exporting metrics to statsd");
    Ok(())
}
