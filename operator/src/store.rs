use crate::{Error, Result};
use async_trait::async_trait;
use common::{Paper, PaperStatus};
use k8s_openapi::NamespaceResourceScope;
use kube::{
    api::{Api, DeleteParams, ListParams, PostParams},
    runtime::events::{Event, Recorder, Reporter},
    Client, Resource, ResourceExt,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fmt::Debug, future::Future, time::Duration};

/// Namespaced kinds the reconciler reads and writes
pub trait Child:
    Resource<DynamicType = (), Scope = NamespaceResourceScope>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
}

impl<K> Child for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope>
        + Clone
        + Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static
{
}

/// The cluster as seen by a reconciliation pass
///
/// A missing object is never an error: `get_opt` answers `None` and `delete` answers `false`.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_opt<K: Child>(&self, ns: &str, name: &str) -> Result<Option<K>>;

    async fn create<K: Child>(&self, ns: &str, obj: &K) -> Result<K>;

    async fn replace<K: Child>(&self, ns: &str, name: &str, obj: &K) -> Result<K>;

    /// Answers whether something was actually deleted
    async fn delete<K: Child>(&self, ns: &str, name: &str) -> Result<bool>;

    async fn list_labeled<K: Child>(&self, ns: &str, selector: &str) -> Result<Vec<K>>;

    /// Write `status` only if `paper` is still the latest revision, `Error::Conflict` otherwise
    async fn replace_status(&self, paper: &Paper, status: PaperStatus) -> Result<Paper>;

    /// Publish an event about `paper`, failures are only logged
    async fn record(&self, paper: &Paper, ev: Event);
}

#[derive(Clone)]
pub struct KubeStore {
    client: Client,
    reporter: Reporter,
    timeout: Duration,
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client, reporter: Reporter, timeout: Duration) -> KubeStore {
        KubeStore {
            client,
            reporter,
            timeout,
        }
    }

    fn api<K: Child>(&self, ns: &str) -> Api<K> {
        Api::namespaced(self.client.clone(), ns)
    }

    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, kube::Error>> + Send,
    {
        with_deadline(self.timeout, fut).await
    }
}

/// Run one api call, giving up after `timeout` with the transient `Error::Elapsed`
pub(crate) async fn with_deadline<T, F>(timeout: Duration, fut: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, kube::Error>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(Error::Elapsed)?
        .map_err(Error::from_kube)
}

#[async_trait]
impl Store for KubeStore {
    async fn get_opt<K: Child>(&self, ns: &str, name: &str) -> Result<Option<K>> {
        let api = self.api::<K>(ns);
        self.bounded(api.get_opt(name)).await
    }

    async fn create<K: Child>(&self, ns: &str, obj: &K) -> Result<K> {
        let api = self.api::<K>(ns);
        self.bounded(api.create(&PostParams::default(), obj)).await
    }

    async fn replace<K: Child>(&self, ns: &str, name: &str, obj: &K) -> Result<K> {
        let api = self.api::<K>(ns);
        self.bounded(api.replace(name, &PostParams::default(), obj)).await
    }

    async fn delete<K: Child>(&self, ns: &str, name: &str) -> Result<bool> {
        let api = self.api::<K>(ns);
        match tokio::time::timeout(self.timeout, api.delete(name, &DeleteParams::background()))
            .await
            .map_err(Error::Elapsed)?
        {
            Ok(_) => Ok(true),
            Err(kube::Error::Api(e)) if e.code == 404 || e.code == 410 => Ok(false),
            Err(e) => Err(Error::from_kube(e)),
        }
    }

    async fn list_labeled<K: Child>(&self, ns: &str, selector: &str) -> Result<Vec<K>> {
        let api = self.api::<K>(ns);
        let lp = ListParams::default().labels(selector);
        Ok(self.bounded(api.list(&lp)).await?.items)
    }

    async fn replace_status(&self, paper: &Paper, status: PaperStatus) -> Result<Paper> {
        let api = self.api::<Paper>(&paper.namespace().unwrap_or_default());
        let mut next = paper.clone();
        next.status = Some(status);
        // resourceVersion travels with the object, the api server refuses stale writes
        let data = serde_json::to_vec(&next).map_err(Error::SerializationError)?;
        self.bounded(api.replace_status(&paper.name_any(), &PostParams::default(), data))
            .await
    }

    async fn record(&self, paper: &Paper, ev: Event) {
        let recorder = Recorder::new(self.client.clone(), self.reporter.clone(), paper.object_ref(&()));
        match tokio::time::timeout(self.timeout, recorder.publish(ev)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!("Ignoring {e} while sending an event"),
            Err(_) => tracing::warn!("Sending an event timed out"),
        }
    }
}
