//! Cross-entity totals. Recomputed from scratch on every change.

use crate::{CounterKinds, CounterName, EntityStore};

/// Sum of displayed values over all entities and counters.
pub fn total(store: &EntityStore) -> i64 {
    store
        .iter()
        .map(|e| e.displayed_total())
        .fold(0, i64::saturating_add)
}

/// Sum of saved values over all entities and counters.
pub fn saved_total(store: &EntityStore) -> i64 {
    store
        .iter()
        .flat_map(|e| e.counters.iter())
        .map(|c| c.value.saved)
        .fold(0, i64::saturating_add)
}

/// Displayed total per counter kind, in configured order.
pub fn counter_totals(store: &EntityStore, kinds: &CounterKinds) -> Vec<(CounterName, i64)> {
    kinds
        .iter()
        .map(|kind| {
            let sum = store
                .iter()
                .filter_map(|e| e.counter(kind))
                .map(|v| v.displayed)
                .fold(0, i64::saturating_add);
            (kind.to_string(), sum)
        })
        .collect()
}
