//! HTTP relay node for building synthetic request chains across pod replicas.
//!
//! Every hop is answered straight away with a JSON record describing it, and
//! then relayed to the configured next hop with its `pass` counter bumped.
//! Delivery to the next hop is retried at a fixed interval until it succeeds.

pub mod config;
pub mod errors;
pub mod forwarder;
pub mod handler;
pub mod metadata;
pub mod metrics_defs;
pub mod query;
pub mod service;
pub mod workload;

#[cfg(test)]
mod testutils;

use crate::config::Config;
use crate::errors::RelayError;
use crate::service::RelayService;
use shared::admin_service::AdminService;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub async fn run(config: Config) -> Result<(), RelayError> {
    config.validate()?;
    let service = RelayService::from_config(&config)?;
    let ready = Arc::new(AtomicBool::new(false));

    // Admin first, so probes can see the relay listener come up.
    let admin_task = match &config.admin_listener {
        Some(admin) => {
            let listener = shared::http::bind(&admin.host, admin.port).await?;
            tracing::info!(addr = %listener.local_addr()?, "admin listening");
            let ready = ready.clone();
            let admin_service =
                AdminService::<_, RelayError>::new(move || ready.load(Ordering::Relaxed));
            Some(shared::http::serve(listener, admin_service))
        }
        None => None,
    };

    let listener = shared::http::bind(&config.listener.host, config.listener.port).await?;
    ready.store(true, Ordering::Relaxed);
    tracing::info!(
        addr = %listener.local_addr()?,
        endpoint = %config.endpoint,
        next_hop = %config.identity.next_hop(),
        me = config.identity.hostname(),
        "relay listening"
    );

    let relay_task = shared::http::serve(listener, service);
    let admin_task = async {
        match admin_task {
            Some(task) => task.await,
            None => Ok(()),
        }
    };

    tokio::try_join!(relay_task, admin_task)?;
    Ok(())
}
