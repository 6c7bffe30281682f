use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for engine operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub indexes: BTreeMap<String, IndexCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Compilation
    pub comparators_compiled: u64,
    pub comparator_keys: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub set_rejections: u64,
    pub index_removes: u64,
    pub index_rebuilds: u64,

    // Iteration
    pub cursors_invalidated: u64,
    pub trees_built: u64,
    pub tree_nodes: u64,
    pub tree_max_depth: u64,
}

///
/// IndexCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IndexCounters {
    pub inserts: u64,
    pub set_rejections: u64,
    pub removes: u64,
    pub rebuilds: u64,
    pub records_reindexed: u64,
    pub cursors_invalidated: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Per-index counters, created on first use.
pub(crate) fn index_entry<'m>(m: &'m mut EventState, label: &str) -> &'m mut IndexCounters {
    m.indexes.entry(label.to_string()).or_default()
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    pub counters: Option<EventState>,
    /// Per-index counters, busiest first.
    pub index_counters: Vec<IndexSummary>,
}

///
/// IndexSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct IndexSummary {
    pub label: String,
    pub inserts: u64,
    pub set_rejections: u64,
    pub removes: u64,
    pub rebuilds: u64,
    pub cursors_invalidated: u64,
    pub rejection_rate: f64,
}

/// Build a report from the in-memory counters.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut index_counters: Vec<IndexSummary> = snap
        .indexes
        .iter()
        .map(|(label, c)| {
            let attempts = c.inserts.saturating_add(c.set_rejections);
            let rejection_rate = if attempts > 0 {
                c.set_rejections as f64 / attempts as f64
            } else {
                0.0
            };

            IndexSummary {
                label: label.clone(),
                inserts: c.inserts,
                set_rejections: c.set_rejections,
                removes: c.removes,
                rebuilds: c.rebuilds,
                cursors_invalidated: c.cursors_invalidated,
                rejection_rate,
            }
        })
        .collect();

    index_counters.sort_by(|a, b| {
        (b.inserts.saturating_add(b.removes))
            .cmp(&a.inserts.saturating_add(a.removes))
            .then_with(|| a.label.cmp(&b.label))
    });

    EventReport {
        counters: Some(snap),
        index_counters,
    }
}

///
/// TESTS
///
