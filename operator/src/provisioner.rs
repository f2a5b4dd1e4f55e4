use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    security::{container_security_context, pod_security_context},
    store::Store,
    Result,
};
use common::{
    labels::{version_labels, version_object_name, VersionBuild},
    DesiredState,
};
use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::OwnerReference};
use tracing::debug;

/// Observed state of a one-shot pod
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionerPhase {
    Absent,
    Pending,
    Succeeded,
    Failed,
}

impl ProvisionerPhase {
    pub fn of(pod: Option<&Pod>) -> ProvisionerPhase {
        let Some(pod) = pod else {
            return ProvisionerPhase::Absent;
        };
        match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
            Some("Succeeded") => ProvisionerPhase::Succeeded,
            Some("Failed") => ProvisionerPhase::Failed,
            _ => ProvisionerPhase::Pending,
        }
    }
}

/// Pod fetching the server jar into the version volume
pub fn downloader_pod(
    instance: &str,
    desired: &DesiredState,
    image: &str,
    owner: &OwnerReference,
) -> Result<Pod> {
    let vb = desired.version_build();
    let name = version_object_name(instance, &vb);
    Ok(serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": name,
            "labels": version_labels(instance, &vb),
            "ownerReferences": [owner],
        },
        "spec": {
            "restartPolicy": "Never",
            "securityContext": pod_security_context(),
            "containers": [{
                "name": "download",
                "image": image,
                "imagePullPolicy": "IfNotPresent",
                "workingDir": "/data",
                "command": ["wget", "-O", "paper.jar", desired.artifact_url],
                "securityContext": container_security_context(),
                "volumeMounts": [{
                    "name": "paper",
                    "mountPath": "/data",
                }],
            }],
            "volumes": [{
                "name": "paper",
                "persistentVolumeClaim": {
                    "claimName": name,
                }
            }],
        }
    }))?)
}

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    /// Download the desired jar once, then clean up after it
    pub(crate) async fn reconcile_provisioner(&self) -> StepResult {
        let Some(desired) = self.paper.desired_state() else {
            return StepResult::Failed(crate::Error::InvariantViolation("desired state undefined".to_string()));
        };
        let vb: VersionBuild = desired.version_build();
        let name = version_object_name(&self.name, &vb);

        if self.paper.is_up_to_date() {
            let deleted = try_step!(self.delete_child::<Pod>("Pod", &name, "server jar installed").await);
            return if deleted { StepResult::Updated } else { StepResult::Skipped };
        }

        let pod = try_step!(self.store.get_opt::<Pod>(&self.ns, &name).await);
        match ProvisionerPhase::of(pod.as_ref()) {
            ProvisionerPhase::Absent => {
                let owner = try_step!(self.owner_reference());
                let pod = try_step!(downloader_pod(
                    &self.name,
                    desired,
                    &self.config.downloader_image,
                    &owner
                ));
                try_step!(self.create_child("Pod", &pod).await);
                StepResult::Updated
            }
            ProvisionerPhase::Failed => {
                try_step!(self.delete_child::<Pod>("Pod", &name, "download failed").await);
                StepResult::Updated
            }
            ProvisionerPhase::Succeeded => StepResult::Skipped,
            ProvisionerPhase::Pending => {
                debug!("Waiting for {name} to download {vb}");
                StepResult::Updated
            }
        }
    }
}
