use crate::{config::Config, paper, store::KubeStore, Error, Metrics, Result};
use chrono::{DateTime, Utc};
use common::{
    context::get_reporter,
    labels::{APP_NAME, LABEL_NAME},
    papermc::PaperMcClient,
    Paper,
};
use futures::{future::BoxFuture, FutureExt, StreamExt};
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, Pod, Service};
use kube::{
    api::{Api, ListParams},
    client::Client,
    runtime::{controller::Controller, events::Reporter, watcher},
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;

// Context for our reconciler
#[derive(Clone)]
pub struct Context {
    /// Cluster access used by the reconciliation passes
    pub store: KubeStore,
    /// PaperMC download API
    pub resolver: PaperMcClient,
    pub config: Config,
    /// Diagnostics read by the web server
    pub diagnostics: Arc<RwLock<Diagnostics>>,
    /// Prometheus metrics
    pub metrics: Metrics,
}

/// Diagnostics to be exposed by the web server
#[derive(Clone, Serialize)]
pub struct Diagnostics {
    pub last_event: DateTime<Utc>,
    #[serde(skip)]
    pub reporter: Reporter,
}
impl Default for Diagnostics {
    fn default() -> Self {
        Self {
            last_event: Utc::now(),
            reporter: get_reporter(),
        }
    }
}

/// Data owned by the Manager
#[derive(Clone, Default)]
pub struct Manager {
    /// Diagnostics populated by the reconciler
    diagnostics: Arc<RwLock<Diagnostics>>,
    metrics: Metrics,
}

/// Manager that owns a Controller for Paper
impl Manager {
    /// Lifecycle initialization interface for app
    ///
    /// This returns a `Manager` that drives a `Controller` + a future to be awaited
    /// It is up to `main` to wait for the controller stream.
    pub async fn new(config: Config) -> Result<(Self, BoxFuture<'static, ()>)> {
        let client = Client::try_default().await?;
        let manager = Manager::default();
        let diagnostics = manager.diagnostics.read().await.clone();
        let http = PaperMcClient::transport(config.call_timeout())?;
        let context = Arc::new(Context {
            store: KubeStore::new(client.clone(), diagnostics.reporter, config.call_timeout()),
            resolver: PaperMcClient::new(&config.api_url, http, tracing::info_span!("papermc"))?,
            config,
            metrics: manager.metrics.clone(),
            diagnostics: manager.diagnostics.clone(),
        });

        let papers = Api::<Paper>::all(client.clone());
        // Ensure CRD is installed before loop-watching
        papers.list(&ListParams::default().limit(1)).await.map_err(|e| {
            Error::Other(format!(
                "is the crd installed? please run: cargo run --bin crdgen | kubectl apply -f - ({e})"
            ))
        })?;

        let children = watcher::Config::default().labels(&format!("{LABEL_NAME}={APP_NAME}"));
        // All good. Start controller and return its future.
        let controller = Controller::new(papers, watcher::Config::default().any_semantic())
            .owns(Api::<Pod>::all(client.clone()), children.clone())
            .owns(Api::<PersistentVolumeClaim>::all(client.clone()), children.clone())
            .owns(Api::<ConfigMap>::all(client.clone()), children.clone())
            .owns(Api::<Service>::all(client), children)
            .shutdown_on_signal()
            .run(paper::reconcile, paper::error_policy, context)
            .filter_map(|x| async move { std::result::Result::ok(x) })
            .for_each(|_| futures::future::ready(()))
            .boxed();

        Ok((manager, controller))
    }

    /// Metrics getter
    pub fn metrics(&self) -> String {
        let mut buffer = String::new();
        if let Err(e) = prometheus_client::encoding::text::encode(&mut buffer, &self.metrics.registry) {
            tracing::warn!("Failed to encode metrics: {e}");
        }
        buffer
    }

    /// State getter
    pub async fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.read().await.clone()
    }
}
