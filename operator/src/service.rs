use crate::{
    events,
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
    workload::{SERVER_PORT, SERVER_PORT_NAME},
    Result,
};
use common::{
    labels::{instance_labels, instance_selector},
    paper::ServiceEndpoint,
};
use k8s_openapi::{
    api::core::v1::{Service, ServicePort},
    apimachinery::pkg::apis::meta::v1::OwnerReference,
};
use tracing::info;

/// Service exposing the server of `instance`, whatever version it runs
pub fn service(instance: &str, endpoint: &ServiceEndpoint, owner: &OwnerReference) -> Result<Service> {
    Ok(serde_json::from_value(serde_json::json!({
        "apiVersion": "v1",
        "kind": "Service",
        "metadata": {
            "name": instance,
            "labels": instance_labels(instance),
            "ownerReferences": [owner],
        },
        "spec": {
            "type": endpoint.service_type.clone().unwrap_or_default().as_str(),
            "selector": instance_selector(instance),
            "ports": [{
                "name": SERVER_PORT_NAME,
                "port": endpoint.port.unwrap_or(SERVER_PORT),
                "targetPort": SERVER_PORT_NAME,
                "protocol": "TCP",
            }],
        }
    }))?)
}

/// The fields this operator sets on a Service, allocated ones like nodePort left out
fn exposed(svc: &Service) -> (Option<String>, Vec<ServicePort>) {
    let spec = svc.spec.clone().unwrap_or_default();
    let ports = spec
        .ports
        .unwrap_or_default()
        .into_iter()
        .map(|p| ServicePort {
            name: p.name,
            port: p.port,
            target_port: p.target_port,
            protocol: p.protocol,
            ..Default::default()
        })
        .collect();
    (spec.type_, ports)
}

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    pub(crate) async fn reconcile_service(&self) -> StepResult {
        let current = try_step!(self.store.get_opt::<Service>(&self.ns, &self.name).await);
        if current.as_ref().is_some_and(|svc| !self.owns(svc)) {
            return StepResult::Failed(self.not_managed("Service"));
        }
        match (self.paper.spec.service.as_ref(), current) {
            (None, None) => StepResult::Skipped,
            (None, Some(_)) => {
                try_step!(
                    self.delete_child::<Service>("Service", &self.name, "service no longer requested")
                        .await
                );
                StepResult::Updated
            }
            (Some(endpoint), None) => {
                let owner = try_step!(self.owner_reference());
                let svc = try_step!(service(&self.name, endpoint, &owner));
                try_step!(self.create_child("Service", &svc).await);
                StepResult::Updated
            }
            (Some(endpoint), Some(live)) => {
                let owner = try_step!(self.owner_reference());
                let wanted = try_step!(service(&self.name, endpoint, &owner));
                let (type_, ports) = exposed(&wanted);
                if exposed(&live) == (type_.clone(), ports) {
                    return StepResult::Skipped;
                }
                // clusterIP is immutable, so the live object is patched rather than rebuilt
                let mut next = live;
                let spec = next.spec.get_or_insert_with(Default::default);
                spec.type_ = type_;
                spec.ports = wanted.spec.and_then(|s| s.ports);
                try_step!(self.store.replace(&self.ns, &self.name, &next).await);
                info!("Updated Service {}/{}", self.ns, self.name);
                self.store
                    .record(&self.paper, events::from_update(&self.name, "Service", &self.name))
                    .await;
                StepResult::Updated
            }
        }
    }
}
