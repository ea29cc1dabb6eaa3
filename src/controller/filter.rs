//! Predicate filter deciding which pod events get enqueued
//!
//! The controller performs a one-shot action at creation time, so only
//! create events are ever admitted; updates (including the ones produced by
//! this controller's own writes), deletes and resync replays are rejected
//! unconditionally.

use chrono::Utc;
use k8s_openapi::api::core::v1::Pod;
use kube::ResourceExt;
use tracing::info;

use crate::config::FilterConfig;

/// Kind of a pod lifecycle notification delivered by the event source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    Created,
    Updated,
    Deleted,
    /// Replay of an already-known object after a watch restart.
    Resync,
}

/// Evaluates incoming events against the configured admission criteria.
pub struct PodFilter {
    config: FilterConfig,
}

impl PodFilter {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Decide whether an event should be enqueued for reconciliation.
    ///
    /// Checks run in a fixed order (namespace, annotation, freshness); all
    /// are independent AND-conditions, the order only aids deterministic
    /// testing. The admission log line is observability, not control flow.
    pub fn admits(&self, kind: EventKind, pod: &Pod) -> bool {
        if kind != EventKind::Created {
            return false;
        }

        if !self.config.namespaces.is_empty() {
            let namespace = pod.namespace().unwrap_or_default();
            if !self.config.namespaces.contains(&namespace) {
                return false;
            }
        }

        if let Some((key, value)) = &self.config.annotation {
            match pod.annotations().get(key) {
                Some(found) if found == value => {}
                _ => return false,
            }
        }

        // Reject pods created before the freshness window so that a restart
        // of the controller does not reprocess historical objects.
        let Some(created) = pod.metadata.creation_timestamp.as_ref() else {
            return false;
        };
        let age = Utc::now().signed_duration_since(created.0);
        if age.num_seconds() > self.config.freshness_window.as_secs() as i64 {
            return false;
        }

        info!(name = %pod.name_any(), namespace = %pod.namespace().unwrap_or_default(), "Pod created");
        true
    }
}
