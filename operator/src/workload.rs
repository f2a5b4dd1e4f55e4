use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    security::{container_security_context, pod_security_context},
    store::Store,
    Result,
};
use common::labels::{version_labels, version_object_name, VersionBuild, LABEL_VERSION};
use k8s_openapi::{api::core::v1::Pod, apimachinery::pkg::apis::meta::v1::OwnerReference};
use kube::ResourceExt;
use serde_json::{json, Value};
use tracing::{debug, info};

pub const SERVER_PORT: i32 = 25565;
pub const SERVER_PORT_NAME: &str = "minecraft";
pub const PROPERTIES_FILE: &str = "server.properties";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadPhase {
    Absent,
    Pending,
    Running,
    Failed,
}

impl WorkloadPhase {
    /// A server that exited is as good as a crashed one
    pub fn of(pod: Option<&Pod>) -> WorkloadPhase {
        let Some(pod) = pod else {
            return WorkloadPhase::Absent;
        };
        match pod.status.as_ref().and_then(|s| s.phase.as_deref()) {
            Some("Running") => WorkloadPhase::Running,
            Some("Failed") | Some("Succeeded") => WorkloadPhase::Failed,
            _ => WorkloadPhase::Pending,
        }
    }
}

fn tcp_probe(initial_delay: i32, period: i32, failures: i32) -> Value {
    json!({
        "tcpSocket": { "port": SERVER_PORT_NAME },
        "initialDelaySeconds": initial_delay,
        "periodSeconds": period,
        "failureThreshold": failures,
    })
}

/// The server pod of `instance` running `vb`
///
/// The jar is read from the version volume, the world lives in the instance volume.
/// `config_map` is mounted and copied over `server.properties` before the server starts.
/// The init container needs a shell, so it runs `init_image` rather than the server image.
pub fn server_pod(
    instance: &str,
    vb: &VersionBuild,
    image: &str,
    init_image: &str,
    config_map: Option<&str>,
    owner: &OwnerReference,
) -> Result<Pod> {
    let mut init = String::from("echo 'eula=true' >eula.txt");
    let mut init_mounts = vec![json!({"name": "app-data", "mountPath": "/app/data"})];
    let mut volumes = vec![
        json!({"name": "app-paper", "persistentVolumeClaim": {"claimName": version_object_name(instance, vb), "readOnly": true}}),
        json!({"name": "app-data", "persistentVolumeClaim": {"claimName": instance}}),
        json!({"name": "tmp", "emptyDir": {"sizeLimit": "100M"}}),
    ];
    if let Some(cm) = config_map {
        init.push_str(&format!(" && cp /app/config/{PROPERTIES_FILE} {PROPERTIES_FILE}"));
        init_mounts.push(json!({"name": "config", "mountPath": "/app/config", "readOnly": true}));
        volumes.push(json!({"name": "config", "configMap": {"name": cm}}));
    }

    Ok(serde_json::from_value(json!({
        "apiVersion": "v1",
        "kind": "Pod",
        "metadata": {
            "name": instance,
            "labels": version_labels(instance, vb),
            "ownerReferences": [owner],
        },
        "spec": {
            "restartPolicy": "Never",
            "securityContext": pod_security_context(),
            "initContainers": [{
                "name": "eula",
                "image": init_image,
                "imagePullPolicy": "IfNotPresent",
                "command": ["sh", "-c", init],
                "workingDir": "/app/data",
                "securityContext": container_security_context(),
                "volumeMounts": init_mounts,
            }],
            "containers": [{
                "name": "paper",
                "image": image,
                "imagePullPolicy": "IfNotPresent",
                "args": ["/app/paper/paper.jar"],
                "workingDir": "/app/data",
                "ports": [{
                    "name": SERVER_PORT_NAME,
                    "containerPort": SERVER_PORT,
                    "protocol": "TCP",
                }],
                "startupProbe": tcp_probe(10, 10, 30),
                "readinessProbe": tcp_probe(0, 10, 3),
                "livenessProbe": tcp_probe(0, 20, 3),
                "securityContext": container_security_context(),
                "volumeMounts": [
                    {"name": "app-paper", "mountPath": "/app/paper", "readOnly": true},
                    {"name": "app-data", "mountPath": "/app/data"},
                    {"name": "tmp", "mountPath": "/tmp"},
                ],
            }],
            "volumes": volumes,
        }
    }))?)
}

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    /// Keep one server pod running the desired version
    pub(crate) async fn reconcile_workload(&self) -> StepResult {
        let vb = try_step!(self.paper.desired_version_build());
        let pod = try_step!(self.store.get_opt::<Pod>(&self.ns, &self.name).await);
        match WorkloadPhase::of(pod.as_ref()) {
            WorkloadPhase::Absent => {
                let owner = try_step!(self.owner_reference());
                let config_map = self.paper.spec.server_properties.as_ref().map(|_| self.name.as_str());
                let pod = try_step!(server_pod(
                    &self.name,
                    &vb,
                    &self.config.server_image,
                    &self.config.downloader_image,
                    config_map,
                    &owner
                ));
                try_step!(self.create_child("Pod", &pod).await);
                StepResult::Updated
            }
            WorkloadPhase::Failed => {
                try_step!(self.delete_child::<Pod>("Pod", &self.name, "server stopped").await);
                StepResult::Updated
            }
            WorkloadPhase::Pending => {
                debug!("Waiting for {}/{} to start", self.ns, self.name);
                StepResult::Updated
            }
            WorkloadPhase::Running => {
                let running = pod
                    .as_ref()
                    .and_then(|p| p.labels().get(LABEL_VERSION).cloned())
                    .unwrap_or_default();
                if running == vb.to_string() {
                    return StepResult::Skipped;
                }
                info!("Replacing {}/{} running {running} with {vb}", self.ns, self.name);
                try_step!(
                    self.delete_child::<Pod>("Pod", &self.name, &format!("upgrading to {vb}"))
                        .await
                );
                StepResult::Updated
            }
        }
    }
}
