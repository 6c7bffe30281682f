//! Metrics sink boundary.
//!
//! Index and cursor logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    ComparatorCompiled {
        keys: u64,
    },
    IndexInsert {
        index: &'a str,
        admitted: bool,
    },
    IndexRemove {
        index: &'a str,
    },
    IndexRebuilt {
        index: &'a str,
        records: u64,
    },
    CursorInvalidated {
        index: &'a str,
    },
    TreeBuilt {
        nodes: u64,
        depth: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink writing into the thread-local counter state.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::ComparatorCompiled { keys } => {
                metrics::with_state_mut(|m| {
                    m.ops.comparators_compiled = m.ops.comparators_compiled.saturating_add(1);
                    m.ops.comparator_keys = m.ops.comparator_keys.saturating_add(keys);
                });
            }

            MetricsEvent::IndexInsert { index, admitted } => {
                metrics::with_state_mut(|m| {
                    if admitted {
                        m.ops.index_inserts = m.ops.index_inserts.saturating_add(1);
                    } else {
                        m.ops.set_rejections = m.ops.set_rejections.saturating_add(1);
                    }

                    let entry = metrics::index_entry(m, index);
                    if admitted {
                        entry.inserts = entry.inserts.saturating_add(1);
                    } else {
                        entry.set_rejections = entry.set_rejections.saturating_add(1);
                    }
                });
            }

            MetricsEvent::IndexRemove { index } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_removes = m.ops.index_removes.saturating_add(1);
                    let entry = metrics::index_entry(m, index);
                    entry.removes = entry.removes.saturating_add(1);
                });
            }

            MetricsEvent::IndexRebuilt { index, records } => {
                metrics::with_state_mut(|m| {
                    m.ops.index_rebuilds = m.ops.index_rebuilds.saturating_add(1);
                    let entry = metrics::index_entry(m, index);
                    entry.rebuilds = entry.rebuilds.saturating_add(1);
                    entry.records_reindexed = entry.records_reindexed.saturating_add(records);
                });
            }

            MetricsEvent::CursorInvalidated { index } => {
                metrics::with_state_mut(|m| {
                    m.ops.cursors_invalidated = m.ops.cursors_invalidated.saturating_add(1);
                    let entry = metrics::index_entry(m, index);
                    entry.cursors_invalidated = entry.cursors_invalidated.saturating_add(1);
                });
            }

            MetricsEvent::TreeBuilt { nodes, depth } => {
                metrics::with_state_mut(|m| {
                    m.ops.trees_built = m.ops.trees_built.saturating_add(1);
                    m.ops.tree_nodes = m.ops.tree_nodes.saturating_add(nodes);
                    m.ops.tree_max_depth = m.ops.tree_max_depth.max(depth);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // - `ptr` came from a live `&dyn MetricsSink` installed by `with_metrics_sink`,
        //   which restores the previous slot on every exit, unwinding included.
        // - `record` is synchronous and never keeps `ptr` past this call.
        // - Only a shared reference is materialized.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - The erased pointer is installed only for this dynamic scope and `Guard`
    //   restores the previous slot on all exits.
    // - `record` dereferences it synchronously and never persists it.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink_ptr));
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
