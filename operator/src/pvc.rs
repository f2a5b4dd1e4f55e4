use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
    Result,
};
use common::labels::{instance_labels, version_labels, version_object_name};
use k8s_openapi::{
    api::core::v1::PersistentVolumeClaim, apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use std::collections::BTreeMap;

/// Holds one downloaded server jar
pub const VERSION_VOLUME_SIZE: &str = "50M";
/// Holds the world and the server configuration, survives upgrades
pub const INSTANCE_VOLUME_SIZE: &str = "1G";

pub fn claim(
    name: &str,
    labels: &BTreeMap<String, String>,
    owner: &OwnerReference,
    size: &str,
) -> Result<PersistentVolumeClaim> {
    Ok(serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "PersistentVolumeClaim",
        "metadata": {
            "name": name,
            "labels": labels,
            "ownerReferences": [owner],
        },
        "spec": {
            "accessModes": ["ReadWriteOnce"],
            "resources": {
                "requests": {
                    "storage": size
                }
            }
        }
    }))?)
}

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    async fn ensure_claim(&self, name: &str, labels: BTreeMap<String, String>, size: &str) -> StepResult {
        if try_step!(self.store.get_opt::<PersistentVolumeClaim>(&self.ns, name).await).is_some() {
            return StepResult::Skipped;
        }
        let owner = try_step!(self.owner_reference());
        let pvc = try_step!(claim(name, &labels, &owner, size));
        try_step!(self.create_child("PersistentVolumeClaim", &pvc).await);
        StepResult::Updated
    }

    /// Volume receiving the jar of the desired version
    pub(crate) async fn ensure_version_volume(&self) -> StepResult {
        let vb = try_step!(self.paper.desired_version_build());
        let name = version_object_name(&self.name, &vb);
        self.ensure_claim(&name, version_labels(&self.name, &vb), VERSION_VOLUME_SIZE)
            .await
    }

    /// Volume holding the server data, shared by every version
    pub(crate) async fn ensure_instance_volume(&self) -> StepResult {
        self.ensure_claim(&self.name, instance_labels(&self.name), INSTANCE_VOLUME_SIZE)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        k8smock::{paper, t0, FakeStore},
        resolver::MockVersionResolver,
        Error,
    };
    use common::{
        labels::{LABEL_INSTANCE, LABEL_VERSION},
        DesiredState, PaperStatus,
    };
    use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
    use kube::ResourceExt;

    fn store_with_desired() -> FakeStore {
        let store = FakeStore::default();
        let mut p = paper("survival", "1.19.2");
        p.status = Some(PaperStatus {
            desired_state: Some(DesiredState {
                version: "1.19.2".to_string(),
                build: 307,
                artifact_url: "https://example/paper.jar".to_string(),
                last_updated: t0(),
            }),
            ..Default::default()
        });
        store.add_paper(p);
        store
    }

    #[tokio::test]
    async fn version_volume_is_created_once() {
        let store = store_with_desired();
        let resolver = MockVersionResolver::new();
        let config = Config::default();
        let r = PaperReconciler::new(&store, &resolver, &config, store.paper("survival"), t0());

        assert!(r.ensure_version_volume().await.is_updated());
        assert!(r.ensure_version_volume().await.is_skipped());
        assert_eq!(store.created_count::<PersistentVolumeClaim>("survival-1-19-2-307"), 1);

        let pvc = store.get::<PersistentVolumeClaim>("survival-1-19-2-307").unwrap();
        assert_eq!(pvc.labels()[LABEL_VERSION], "1.19.2-307");
        assert_eq!(pvc.owner_references()[0].name, "survival");
        assert_eq!(pvc.owner_references()[0].controller, Some(true));
        let spec = pvc.spec.unwrap();
        assert_eq!(spec.access_modes, Some(vec!["ReadWriteOnce".to_string()]));
        assert_eq!(
            spec.resources.unwrap().requests.unwrap()["storage"],
            Quantity("50M".to_string())
        );
        assert!(store.events().iter().any(|e| e.reason == "Created"));
    }

    #[tokio::test]
    async fn instance_volume_has_no_version_label() {
        let store = store_with_desired();
        let resolver = MockVersionResolver::new();
        let config = Config::default();
        let r = PaperReconciler::new(&store, &resolver, &config, store.paper("survival"), t0());

        assert!(r.ensure_instance_volume().await.is_updated());
        assert!(r.ensure_instance_volume().await.is_skipped());
        let pvc = store.get::<PersistentVolumeClaim>("survival").unwrap();
        assert_eq!(pvc.labels()[LABEL_INSTANCE], "survival");
        assert!(!pvc.labels().contains_key(LABEL_VERSION));
        assert_eq!(
            pvc.spec.unwrap().resources.unwrap().requests.unwrap()["storage"],
            Quantity("1G".to_string())
        );
    }

    #[tokio::test]
    async fn version_volume_needs_desired_state() {
        let store = FakeStore::default();
        store.add_paper(paper("survival", "1.19.2"));
        let resolver = MockVersionResolver::new();
        let config = Config::default();
        let r = PaperReconciler::new(&store, &resolver, &config, store.paper("survival"), t0());
        assert!(matches!(
            r.ensure_version_volume().await,
            StepResult::Failed(Error::InvariantViolation(_))
        ));
        assert_eq!(store.count::<PersistentVolumeClaim>(), 0);
    }
}
