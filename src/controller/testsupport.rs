//! Shared fixtures for the controller tests: pod builders and an in-memory
//! pod store with optimistic-concurrency semantics.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::api::ObjectMeta;

use crate::client::{ClientError, ResourceClient};

use super::ResourceKey;

/// Build a pod with the given location, age in seconds and annotations.
pub(crate) fn test_pod(
    namespace: &str,
    name: &str,
    age_secs: i64,
    annotations: &[(&str, &str)],
) -> Pod {
    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            creation_timestamp: Some(Time(Utc::now() - ChronoDuration::seconds(age_secs))),
            annotations: if annotations.is_empty() {
                None
            } else {
                Some(
                    annotations
                        .iter()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                )
            },
            resource_version: Some("1".to_string()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// In-memory pod store. `update` is conditional on the resource version the
/// caller read, mirroring the API server's optimistic-concurrency check.
#[derive(Default)]
pub(crate) struct FakePodStore {
    state: Mutex<HashMap<ResourceKey, (u64, Pod)>>,
    denied: AtomicBool,
}

impl FakePodStore {
    pub(crate) fn insert(&self, key: ResourceKey, mut pod: Pod) {
        pod.metadata.resource_version = Some("1".to_string());
        self.state.lock().unwrap().insert(key, (1, pod));
    }

    /// Simulate a concurrent writer: bump the stored version so that any
    /// update based on an earlier read conflicts.
    pub(crate) fn touch(&self, key: &ResourceKey) {
        let mut state = self.state.lock().unwrap();
        if let Some((version, pod)) = state.get_mut(key) {
            *version += 1;
            pod.metadata.resource_version = Some(version.to_string());
        }
    }

    pub(crate) fn get_pod(&self, key: &ResourceKey) -> Option<Pod> {
        self.state.lock().unwrap().get(key).map(|(_, pod)| pod.clone())
    }

    pub(crate) fn deny_access(&self) {
        self.denied.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ResourceClient for FakePodStore {
    async fn get(&self, key: &ResourceKey) -> Result<Pod, ClientError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(ClientError::Forbidden("pods is forbidden".to_string()));
        }
        self.get_pod(key).ok_or(ClientError::NotFound)
    }

    async fn update(&self, key: &ResourceKey, pod: &Pod) -> Result<(), ClientError> {
        if self.denied.load(Ordering::SeqCst) {
            return Err(ClientError::Forbidden("pods is forbidden".to_string()));
        }
        let mut state = self.state.lock().unwrap();
        let (version, stored) = state.get_mut(key).ok_or(ClientError::NotFound)?;
        if pod.metadata.resource_version.as_deref() != Some(version.to_string().as_str()) {
            return Err(ClientError::Conflict);
        }
        *version += 1;
        let mut pod = pod.clone();
        pod.metadata.resource_version = Some(version.to_string());
        *stored = pod;
        Ok(())
    }
}
