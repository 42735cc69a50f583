use crate::config::Identity;
use crate::forwarder::Forwarder;
use crate::metadata::RelayMetadata;
use crate::metrics_defs::{HOPS_HANDLED, WORKLOAD_DURATION};
use crate::query::HopParams;
use crate::workload::{Workload, WorkloadConfig};
use http::Uri;
use http::header::{CONTENT_TYPE, HeaderValue};
use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::Response;
use hyper::body::Bytes;
use std::time::Instant;
use tokio::sync::oneshot;
use url::Url;

/// A handled hop: the record to answer with and where to relay next.
#[derive(Debug)]
pub struct Hop {
    pub metadata: RelayMetadata,
    pub next: Url,
}

pub struct RelayHandler {
    identity: Identity,
    workload: WorkloadConfig,
    forwarder: Forwarder,
}

impl RelayHandler {
    pub fn new(identity: Identity, workload: WorkloadConfig, forwarder: Forwarder) -> Self {
        Self {
            identity,
            workload,
            forwarder,
        }
    }

    /// Builds the hop's record and next-hop URL, running any configured
    /// workloads first. Never fails: bad input falls back to defaults.
    pub async fn handle_hop(&self, from: String, uri: &Uri) -> Hop {
        let params = HopParams::from_query(uri.query());

        let mut metadata = RelayMetadata::now(self.identity.hostname(), from, uri.to_string());
        metadata.pass = params.pass.to_string();
        metadata.thread = params.thread_or_none().to_string();

        if !self.workload.is_empty() {
            let started = Instant::now();
            for (workload, raw) in self.workload.plan() {
                match workload.run().await {
                    Ok(()) => record_workload(&mut metadata, workload, raw),
                    Err(e) => tracing::error!(workload = workload.key(), error = %e, "workload failed"),
                }
            }
            shared::histogram!(WORKLOAD_DURATION).record(started.elapsed().as_secs_f64());
        }

        let mut next = self.identity.next_hop().clone();
        next.set_query(Some(&params.next_query(uri.query())));

        Hop { metadata, next }
    }

    /// Answers one hop with its JSON record.
    ///
    /// The forward to the next hop is scheduled here but only starts once
    /// the returned body has been dropped, i.e. after hyper has written it
    /// (or given up on the connection).
    pub async fn respond<E: 'static>(
        &self,
        from: String,
        uri: &Uri,
    ) -> Response<BoxBody<Bytes, E>> {
        let hop = self.handle_hop(from, uri).await;

        let json = hop.metadata.to_json().unwrap_or_else(|e| {
            tracing::error!(error = %e, "could not serialize hop metadata");
            b"{}".to_vec()
        });
        tracing::info!(metadata = %String::from_utf8_lossy(&json), "handled hop");
        shared::counter!(HOPS_HANDLED).increment(1);

        let (written, ready) = oneshot::channel::<()>();
        self.forwarder.spawn(hop.next, ready);

        let body = Full::new(Bytes::from(json))
            .map_err(|e| match e {})
            .map_frame(move |frame| {
                let _written = &written;
                frame
            })
            .boxed();

        let mut response = Response::new(body);
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

fn record_workload(metadata: &mut RelayMetadata, workload: Workload, raw: &str) {
    let field = match workload {
        Workload::Sleep(_) => &mut metadata.sleep,
        Workload::Cpu(_) => &mut metadata.cpu,
        Workload::Ram(_) => &mut metadata.ram,
    };
    *field = Some(raw.to_string());
}
