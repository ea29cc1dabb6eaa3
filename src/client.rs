//! Read/update access to the authoritative pod store
//!
//! The controller only needs two operations: fetch a pod by key and write it
//! back conditionally on the `resourceVersion` read at fetch time. The trait
//! keeps the reconciler testable against an in-memory store.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, PostParams};
use thiserror::Error;

use crate::controller::ResourceKey;

/// Errors surfaced by a [`ResourceClient`].
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("resource not found")]
    NotFound,

    #[error("conflicting write, resource version is stale")]
    Conflict,

    #[error("access denied: {0}")]
    Forbidden(String),

    #[error("Kubernetes API error: {0}")]
    Api(#[source] kube::Error),
}

impl ClientError {
    /// Whether retrying the operation can ever succeed.
    ///
    /// Not-found covers read-after-write lag (the pod may not be visible
    /// yet) and deletion races; conflicts mean an intervening write; both
    /// resolve with a fresh attempt. Authorization failures do not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, ClientError::Forbidden(_))
    }
}

/// Abstract read/update operations against the pod store.
///
/// `update` is a conditional write: the pod passed in carries the
/// `resourceVersion` observed by the preceding `get`, and the store rejects
/// the write with [`ClientError::Conflict`] if the stored version has moved.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    async fn get(&self, key: &ResourceKey) -> Result<Pod, ClientError>;

    async fn update(&self, key: &ResourceKey, pod: &Pod) -> Result<(), ClientError>;
}

#[async_trait]
impl<T: ResourceClient + ?Sized> ResourceClient for std::sync::Arc<T> {
    async fn get(&self, key: &ResourceKey) -> Result<Pod, ClientError> {
        (**self).get(key).await
    }

    async fn update(&self, key: &ResourceKey, pod: &Pod) -> Result<(), ClientError> {
        (**self).update(key, pod).await
    }
}

/// [`ResourceClient`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubePodClient {
    client: kube::Client,
}

impl KubePodClient {
    pub fn new(client: kube::Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: &str) -> Api<Pod> {
        Api::namespaced(self.client.clone(), namespace)
    }
}

fn classify(err: kube::Error) -> ClientError {
    if let kube::Error::Api(resp) = &err {
        match resp.code {
            404 => return ClientError::NotFound,
            409 => return ClientError::Conflict,
            401 | 403 => return ClientError::Forbidden(resp.message.clone()),
            _ => {}
        }
    }
    ClientError::Api(err)
}

#[async_trait]
impl ResourceClient for KubePodClient {
    async fn get(&self, key: &ResourceKey) -> Result<Pod, ClientError> {
        self.api(&key.namespace)
            .get(&key.name)
            .await
            .map_err(classify)
    }

    async fn update(&self, key: &ResourceKey, pod: &Pod) -> Result<(), ClientError> {
        // replace() carries the object's resourceVersion; the API server
        // answers 409 if the stored version has moved since the read.
        self.api(&key.namespace)
            .replace(&key.name, &PostParams::default(), pod)
            .await
            .map(|_| ())
            .map_err(classify)
    }
}
