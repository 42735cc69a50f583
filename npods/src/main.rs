mod cli;
mod observability;

use clap::Parser;
use cli::Cli;
use relay::errors::RelayError;
use relay::workload::WorkloadConfig;
use std::process::ExitCode;

#[derive(thiserror::Error, Debug)]
enum NpodsError {
    #[error("could not start runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error(transparent)]
    Observability(#[from] observability::ObservabilityError),
    #[error(transparent)]
    Relay(#[from] RelayError),
}

fn main() -> ExitCode {
    // Exits non-zero with usage help when the next hop is missing or unparseable.
    let cli = Cli::parse();
    let _sentry = observability::init_logging(cli.sentry_dsn.as_deref());

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "npods relay stopped");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), NpodsError> {
    observability::init_metrics(cli.statsd_host.as_deref(), cli.statsd_port)?;

    let hostname = match hostname::get() {
        Ok(name) => name.to_string_lossy().into_owned(),
        Err(e) => {
            tracing::warn!(error = %e, "could not resolve hostname");
            String::new()
        }
    };

    let workload = WorkloadConfig::from_env();
    let config = cli.into_config(hostname, workload);
    tracing::info!(next_hop = %config.identity.next_hop(), workload = ?config.workload, "next URL set");

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(relay::run(config))?;
    Ok(())
}
