//! Metrics definitions for the relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const HOPS_HANDLED: MetricDef = MetricDef {
    name: "relay.hops",
    metric_type: MetricType::Counter,
    description: "Number of hops answered on the relay endpoint",
};

pub const WORKLOAD_DURATION: MetricDef = MetricDef {
    name: "relay.workload.duration",
    metric_type: MetricType::Histogram,
    description: "Time spent in simulated workloads per hop, in seconds",
};

pub const FORWARD_ATTEMPTS: MetricDef = MetricDef {
    name: "relay.forward.attempts",
    metric_type: MetricType::Counter,
    description: "Number of delivery attempts made to the next hop",
};

pub const FORWARD_FAILURES: MetricDef = MetricDef {
    name: "relay.forward.failures",
    metric_type: MetricType::Counter,
    description: "Number of delivery attempts that failed and will be retried",
};

pub const FORWARDS_INFLIGHT: MetricDef = MetricDef {
    name: "relay.forward.inflight",
    metric_type: MetricType::Gauge,
    description: "Number of forwards not yet delivered, including those waiting to retry",
};

pub const FORWARD_DURATION: MetricDef = MetricDef {
    name: "relay.forward.duration",
    metric_type: MetricType::Histogram,
    description: "Time from scheduling a forward to its delivery, retries included, in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    HOPS_HANDLED,
    WORKLOAD_DURATION,
    FORWARD_ATTEMPTS,
    FORWARD_FAILURES,
    FORWARDS_INFLIGHT,
    FORWARD_DURATION,
];
