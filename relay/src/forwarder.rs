use crate::config::{ForwarderConfig, Identity};
use crate::errors::RelayError;
use crate::metrics_defs::{
    FORWARD_ATTEMPTS, FORWARD_DURATION, FORWARD_FAILURES, FORWARDS_INFLIGHT,
};
use http::StatusCode;
use http::header::{CONNECTION, HOST, HeaderValue};
use std::future::Future;
use std::time::Instant;
use tokio::time::sleep;
use url::Url;

/// Delivers hops to the next node, retrying until each one gets through.
///
/// Cloning is cheap and clones share the HTTP client.
#[derive(Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    identity: Identity,
    config: ForwarderConfig,
}

impl Forwarder {
    pub fn new(identity: Identity, config: ForwarderConfig) -> Result<Self, RelayError> {
        // Every attempt opens a fresh connection.
        let client = reqwest::Client::builder()
            .timeout(config.attempt_timeout)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            client,
            identity,
            config,
        })
    }

    /// Starts delivering `target` in the background once `ready` resolves.
    ///
    /// What `ready` resolves to is ignored, so a oneshot receiver whose sender
    /// is simply dropped works as the trigger. No handle is kept; the task ends
    /// on delivery or with the process.
    pub fn spawn<R>(&self, target: Url, ready: R)
    where
        R: Future + Send + 'static,
    {
        let forwarder = self.clone();
        tokio::spawn(async move {
            let _ = ready.await;
            forwarder.deliver(&target).await;
        });
    }

    /// Sends to `target` until an attempt gets any HTTP response back.
    ///
    /// Returns the number of attempts it took.
    pub async fn deliver(&self, target: &Url) -> u32 {
        let started = Instant::now();
        let inflight = shared::gauge!(FORWARDS_INFLIGHT);
        inflight.increment(1);

        let mut attempts = 0;
        loop {
            attempts += 1;
            shared::counter!(FORWARD_ATTEMPTS).increment(1);

            match self.send_once(target).await {
                Ok(status) => {
                    tracing::debug!(%target, %status, attempts, "relayed to next hop");
                    break;
                }
                Err(e) => {
                    shared::counter!(FORWARD_FAILURES).increment(1);
                    tracing::warn!(%target, attempts, error = %e, "could not relay, will try again");
                }
            }

            sleep(self.config.retry_delay).await;
        }

        inflight.decrement(1);
        shared::histogram!(FORWARD_DURATION).record(started.elapsed().as_secs_f64());
        attempts
    }

    /// One GET to `target`. Only transport failures are errors; the status
    /// is returned as is and the body is never read.
    pub async fn send_once(&self, target: &Url) -> Result<StatusCode, RelayError> {
        let identifier = target.host_str().unwrap_or(target.as_str()).to_string();

        let mut request = self
            .client
            .get(target.clone())
            .header(CONNECTION, HeaderValue::from_static("close"));
        let hostname = self.identity.hostname();
        if !hostname.is_empty()
            && let Ok(host) = HeaderValue::from_str(hostname)
        {
            request = request.header(HOST, host);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RelayError::ForwardTimeout(identifier.clone())
            } else {
                RelayError::ForwardFailed(identifier.clone(), e.to_string())
            }
        })?;

        Ok(response.status())
    }
}
