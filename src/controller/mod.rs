//! Controller module for pod timestamp reconciliation
//! This module contains the predicate filter, the deduplicating work queue,
//! the reconciler and the control loop tying them together.

pub mod filter;
pub mod metrics;
pub mod queue;
pub mod reconciler;
pub mod watch;

#[cfg(test)]
mod queue_test;
#[cfg(test)]
pub(crate) mod testsupport;

pub use filter::{EventKind, PodFilter};
pub use queue::{ResourceKey, WorkQueue};
pub use reconciler::{ReconcileOutcome, TimestampReconciler, RETRY_DELAY, TIMESTAMP_ANNOTATION};
pub use watch::pod_events;

use std::future::Future;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use k8s_openapi::api::core::v1::Pod;
use tracing::{debug, error, info};

use crate::client::ResourceClient;
use crate::config::FilterConfig;
use crate::error::Result;

/// Run the event-filter-reconcile loop until `shutdown` resolves.
///
/// One producer task admits events from `events` into the shared work
/// queue; `workers` worker tasks each loop dequeue, reconcile, done. No
/// ordering is guaranteed across keys; per key, the queue's in-flight
/// marker serializes attempts. Workers finish their in-flight
/// reconciliation before exiting.
pub async fn run_controller<C, S, F>(
    events: S,
    client: C,
    config: FilterConfig,
    workers: usize,
    shutdown: F,
) -> Result<()>
where
    C: ResourceClient + 'static,
    S: Stream<Item = (EventKind, Pod)> + Send + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let queue = Arc::new(WorkQueue::new());
    let reconciler = Arc::new(TimestampReconciler::new(client));
    let filter = PodFilter::new(config);

    let (stop_tx, stop_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        info!("Shutdown signal received, stopping controller");
        let _ = stop_tx.send(true);
    });

    let mut tasks = tokio::task::JoinSet::new();

    {
        let queue = Arc::clone(&queue);
        let mut stop = stop_rx.clone();
        tasks.spawn(async move {
            futures::pin_mut!(events);
            loop {
                tokio::select! {
                    _ = stop.changed() => break,
                    event = events.next() => match event {
                        Some((kind, pod)) => {
                            if filter.admits(kind, &pod) {
                                metrics::ADMITTED_EVENTS_TOTAL.inc();
                                queue.enqueue(ResourceKey::from(&pod));
                            }
                        }
                        None => {
                            debug!("Event stream ended");
                            break;
                        }
                    }
                }
            }
        });
    }

    for worker in 0..workers {
        let queue = Arc::clone(&queue);
        let reconciler = Arc::clone(&reconciler);
        let mut stop = stop_rx.clone();
        tasks.spawn(async move {
            loop {
                let (key, attempt) = tokio::select! {
                    _ = stop.changed() => break,
                    item = queue.dequeue() => item,
                };

                let started = std::time::Instant::now();
                let outcome = reconciler.reconcile(&key).await;
                metrics::RECONCILE_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

                match outcome {
                    ReconcileOutcome::Success => {
                        metrics::RECONCILE_TOTAL
                            .get_or_create(&metrics::OutcomeLabels {
                                outcome: "success".to_string(),
                            })
                            .inc();
                    }
                    ReconcileOutcome::Retryable(delay) => {
                        metrics::RECONCILE_TOTAL
                            .get_or_create(&metrics::OutcomeLabels {
                                outcome: "retryable".to_string(),
                            })
                            .inc();
                        debug!(
                            key = %key,
                            attempt,
                            delay_secs = delay.as_secs(),
                            "Requeueing after failed attempt"
                        );
                        queue.requeue(key.clone(), delay);
                    }
                    ReconcileOutcome::Fatal(err) => {
                        metrics::RECONCILE_TOTAL
                            .get_or_create(&metrics::OutcomeLabels {
                                outcome: "fatal".to_string(),
                            })
                            .inc();
                        error!(
                            key = %key,
                            attempt,
                            error = %err,
                            "Dropping key after non-retryable reconcile error"
                        );
                    }
                }

                queue.done(&key);
            }
            debug!(worker, "Worker stopped");
        });
    }

    while tasks.join_next().await.is_some() {}
    Ok(())
}
