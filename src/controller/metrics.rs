//! Prometheus metrics for the podstamp controller
//!
//! # Exported metrics
//! The `/metrics` endpoint exports the following metrics:
//! - `podstamp_admitted_events` (counter): pod create events admitted by the filter.
//! - `podstamp_reconcile` (counter): reconcile attempts labeled by outcome.
//! - `podstamp_reconcile_duration_seconds` (histogram): duration of a single reconcile attempt.

use std::sync::atomic::AtomicU64;

use once_cell::sync::Lazy;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Labels for reconcile outcome counts
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    /// "success", "retryable" or "fatal"
    pub outcome: String,
}

/// Counter tracking events admitted by the predicate filter
pub static ADMITTED_EVENTS_TOTAL: Lazy<Counter<u64, AtomicU64>> = Lazy::new(Counter::default);

/// Counter tracking reconcile attempts per outcome
pub static RECONCILE_TOTAL: Lazy<Family<OutcomeLabels, Counter<u64, AtomicU64>>> =
    Lazy::new(Family::default);

/// Histogram tracking reconcile attempt duration
pub static RECONCILE_DURATION_SECONDS: Lazy<Histogram> =
    Lazy::new(|| Histogram::new(exponential_buckets(0.001, 2.0, 12)));

/// Registry backing the `/metrics` endpoint
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let mut registry = Registry::default();
    registry.register(
        "podstamp_admitted_events",
        "Pod create events admitted by the predicate filter",
        ADMITTED_EVENTS_TOTAL.clone(),
    );
    registry.register(
        "podstamp_reconcile",
        "Reconcile attempts by outcome",
        RECONCILE_TOTAL.clone(),
    );
    registry.register(
        "podstamp_reconcile_duration_seconds",
        "Duration of a single reconcile attempt in seconds",
        RECONCILE_DURATION_SECONDS.clone(),
    );
    registry
});
