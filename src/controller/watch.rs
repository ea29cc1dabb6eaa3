//! Pod event source backed by the Kubernetes watch API
//!
//! Produces the `(EventKind, Pod)` stream consumed by the control loop. The
//! raw watch verbs map directly onto event kinds (ADDED is a create, not an
//! update), which is what lets the filter admit create events only. On
//! watch expiry the loop resumes from the last seen resource version; on
//! desync it re-lists and replays the listed objects as `Resync` events.

use std::time::Duration;

use futures::{Stream, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, ListParams, WatchParams};
use kube::core::WatchEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::filter::EventKind;

/// Server-side watch timeout. The watch is re-established from the last
/// seen resource version when it expires.
const WATCH_TIMEOUT_SECS: u32 = 290;

const LIST_BACKOFF: Duration = Duration::from_secs(5);

/// Infinite stream of pod lifecycle events across all namespaces.
///
/// The stream ends only when the returned handle is dropped; watch errors
/// are handled internally by re-watching or re-listing.
pub fn pod_events(client: kube::Client) -> impl Stream<Item = (EventKind, Pod)> {
    let (tx, rx) = mpsc::channel(64);
    tokio::spawn(watch_pods(Api::all(client), tx));
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|ev| (ev, rx)) })
}

async fn watch_pods(api: Api<Pod>, tx: mpsc::Sender<(EventKind, Pod)>) {
    let wp = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);

    'relist: loop {
        let list = match api.list(&ListParams::default()).await {
            Ok(list) => list,
            Err(err) => {
                warn!(error = %err, "Pod list failed, backing off");
                tokio::time::sleep(LIST_BACKOFF).await;
                continue;
            }
        };

        let mut version = list.metadata.resource_version.clone().unwrap_or_default();
        for pod in list.items {
            if tx.send((EventKind::Resync, pod)).await.is_err() {
                return;
            }
        }

        loop {
            let mut stream = match api.watch(&wp, &version).await {
                Ok(stream) => stream.boxed(),
                Err(err) => {
                    warn!(error = %err, "Pod watch failed, re-listing");
                    tokio::time::sleep(LIST_BACKOFF).await;
                    continue 'relist;
                }
            };

            loop {
                match stream.try_next().await {
                    Ok(Some(WatchEvent::Added(pod))) => {
                        if let Some(rv) = &pod.metadata.resource_version {
                            version = rv.clone();
                        }
                        if tx.send((EventKind::Created, pod)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Some(WatchEvent::Modified(pod))) => {
                        if let Some(rv) = &pod.metadata.resource_version {
                            version = rv.clone();
                        }
                        if tx.send((EventKind::Updated, pod)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Some(WatchEvent::Deleted(pod))) => {
                        if let Some(rv) = &pod.metadata.resource_version {
                            version = rv.clone();
                        }
                        if tx.send((EventKind::Deleted, pod)).await.is_err() {
                            return;
                        }
                    }
                    Ok(Some(WatchEvent::Bookmark(bookmark))) => {
                        version = bookmark.metadata.resource_version;
                    }
                    Ok(Some(WatchEvent::Error(status))) if status.code == 410 => {
                        // Resource version too old, start over from a list.
                        debug!("Watch desynced, re-listing pods");
                        continue 'relist;
                    }
                    Ok(Some(WatchEvent::Error(status))) => {
                        warn!(code = status.code, message = %status.message, "Watch error");
                        continue 'relist;
                    }
                    Ok(None) => {
                        // Server-side timeout; resume from the last version.
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "Watch stream error, resuming");
                        break;
                    }
                }
            }
        }
    }
}
