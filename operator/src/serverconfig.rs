use crate::{
    events,
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
    workload::PROPERTIES_FILE,
    Result,
};
use common::labels::instance_labels;
use k8s_openapi::{api::core::v1::ConfigMap, apimachinery::pkg::apis::meta::v1::OwnerReference};
use kube::ResourceExt;
use std::collections::BTreeMap;
use tracing::info;

/// `key=value` lines, sorted by key
pub fn render_properties(properties: &BTreeMap<String, String>) -> String {
    properties.iter().map(|(k, v)| format!("{k}={v}\n")).collect()
}

pub fn config_map(instance: &str, properties: &BTreeMap<String, String>, owner: &OwnerReference) -> Result<ConfigMap> {
    Ok(serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "ConfigMap",
        "metadata": {
            "name": instance,
            "labels": instance_labels(instance),
            "ownerReferences": [owner],
        },
        "data": {
            PROPERTIES_FILE: render_properties(properties),
        }
    }))?)
}

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    pub(crate) async fn reconcile_server_config(&self) -> StepResult {
        let current = try_step!(self.store.get_opt::<ConfigMap>(&self.ns, &self.name).await);
        if current.as_ref().is_some_and(|cm| !self.owns(cm)) {
            return StepResult::Failed(self.not_managed("ConfigMap"));
        }
        let Some(properties) = self.paper.spec.server_properties.as_ref() else {
            if current.is_none() {
                return StepResult::Skipped;
            }
            try_step!(
                self.delete_child::<ConfigMap>("ConfigMap", &self.name, "no more server properties")
                    .await
            );
            return StepResult::Updated;
        };
        let owner = try_step!(self.owner_reference());
        let mut wanted = try_step!(config_map(&self.name, properties, &owner));
        match current {
            None => {
                try_step!(self.create_child("ConfigMap", &wanted).await);
                StepResult::Updated
            }
            Some(cm) if cm.data == wanted.data => StepResult::Skipped,
            Some(cm) => {
                wanted.metadata.resource_version = cm.resource_version();
                try_step!(self.store.replace(&self.ns, &self.name, &wanted).await);
                info!("Updated ConfigMap {}/{}", self.ns, self.name);
                self.store
                    .record(&self.paper, events::from_update(&self.name, "ConfigMap", &self.name))
                    .await;
                StepResult::Updated
            }
        }
    }
}
