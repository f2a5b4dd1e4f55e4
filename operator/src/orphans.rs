use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::{Child, Store},
    Result,
};
use common::labels::orphan_selector;
use k8s_openapi::api::core::v1::{PersistentVolumeClaim, Pod};
use kube::ResourceExt;
use tracing::{info, warn};

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    async fn orphans<K: Child>(&self, selector: &str) -> Result<Vec<String>> {
        Ok(self
            .store
            .list_labeled::<K>(&self.ns, selector)
            .await?
            .into_iter()
            .filter(|o| o.meta().deletion_timestamp.is_none())
            .map(|o| o.name_any())
            .collect())
    }

    async fn reap<K: Child>(&self, kind: &str, names: &[String]) {
        for name in names {
            if let Err(e) = self.delete_child::<K>(kind, name, "left over from a previous version").await {
                warn!("Could not delete {kind} {}/{name}: {e}", self.ns);
            }
        }
    }

    /// Delete the version scoped children that do not belong to the desired version
    pub(crate) async fn reap_orphans(&self) -> StepResult {
        let current = try_step!(self.paper.desired_version_build());
        let selector = try_step!(orphan_selector(&self.name, &current));
        let pods = try_step!(self.orphans::<Pod>(&selector).await);
        let claims = try_step!(self.orphans::<PersistentVolumeClaim>(&selector).await);
        if pods.is_empty() && claims.is_empty() {
            return StepResult::Skipped;
        }
        info!(
            "Reaping {} pods and {} volumes of {}/{} not on {current}",
            pods.len(),
            claims.len(),
            self.ns,
            self.name
        );
        self.reap::<Pod>("Pod", &pods).await;
        self.reap::<PersistentVolumeClaim>("PersistentVolumeClaim", &claims).await;
        StepResult::Updated
    }
}
