//! Observability: runtime counters and the sink boundary they flow through.
//!
//! Engine code records [`MetricsEvent`]s through `sink::record`; it never
//! touches the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, IndexCounters, IndexSummary};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
