//! Timestamp reconciler for admitted pods
//!
//! One invocation runs a single fetch-mutate-write cycle: read the current
//! pod, merge in the timestamp annotation, write it back conditionally on
//! the version that was read. Conflicts and other transient failures come
//! back as a retry decision; the work queue schedules the next attempt.

use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument};

use crate::client::{ClientError, ResourceClient};

use super::ResourceKey;

/// Annotation written onto reconciled pods: wall-clock seconds since epoch,
/// as a decimal string. Deliberately distinct from any admission-trigger
/// annotation so the controller's own write cannot satisfy a same-key
/// filter; update events are never admitted anyway, so the no-re-trigger
/// property holds structurally as well.
pub const TIMESTAMP_ANNOTATION: &str = "podstamp.io/timestamp";

/// Delay before a failed key becomes eligible for another attempt. Fixed
/// for all retryable failures; no exponential growth.
pub const RETRY_DELAY: Duration = Duration::from_secs(10);

/// Brief pause before the fetch, to avoid racing a writer that is still
/// committing the pod that generated the triggering event. Best effort
/// only; the conditional update is the actual safety mechanism.
const SETTLE_DELAY: Duration = Duration::from_millis(2);

/// Result of one reconciliation attempt, consumed by the dispatch loop.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The stamp was written; the key is finished.
    Success,
    /// Transient failure; try again after the given delay.
    Retryable(Duration),
    /// Failure that retrying cannot fix; log and drop the key.
    Fatal(ClientError),
}

/// Stamps pods with the current wall-clock time.
pub struct TimestampReconciler<C> {
    client: C,
}

impl<C: ResourceClient> TimestampReconciler<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }

    #[instrument(skip(self), fields(key = %key))]
    pub async fn reconcile(&self, key: &ResourceKey) -> ReconcileOutcome {
        tokio::time::sleep(SETTLE_DELAY).await;

        let mut pod = match self.client.get(key).await {
            Ok(pod) => pod,
            Err(err) if err.is_transient() => {
                debug!(error = %err, "Fetch failed, will retry");
                return ReconcileOutcome::Retryable(RETRY_DELAY);
            }
            Err(err) => return ReconcileOutcome::Fatal(err),
        };

        let stamp = Utc::now().timestamp().to_string();
        pod.metadata
            .annotations
            .get_or_insert_with(Default::default)
            .insert(TIMESTAMP_ANNOTATION.to_string(), stamp.clone());

        match self.client.update(key, &pod).await {
            Ok(()) => {
                info!(key = %key, time = %stamp, "Pod updated");
                ReconcileOutcome::Success
            }
            Err(err) if err.is_transient() => {
                debug!(error = %err, "Pod update failed, retrying");
                ReconcileOutcome::Retryable(RETRY_DELAY)
            }
            Err(err) => ReconcileOutcome::Fatal(err),
        }
    }
}
