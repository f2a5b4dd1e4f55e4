use crate::{
    config::Config,
    events,
    resolver::VersionResolver,
    result::{Outcome, Step, StepResult},
    store::{Child, Store},
    Error, Result,
};
use chrono::{DateTime, Utc};
use common::{Paper, PaperStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};
use tracing::{debug, info, warn};

/// One reconciliation pass over a single `Paper`
///
/// `paper` is the snapshot fetched at the start of the pass. Steps never mutate it:
/// a step that changes the status builds the next status from a copy and writes it
/// in one conditional call, then the pass ends.
pub struct PaperReconciler<'a, S: Store, R: VersionResolver> {
    pub(crate) store: &'a S,
    pub(crate) resolver: &'a R,
    pub(crate) config: &'a Config,
    pub(crate) paper: Paper,
    pub(crate) ns: String,
    pub(crate) name: String,
    pub(crate) now: DateTime<Utc>,
}

impl<'a, S: Store, R: VersionResolver> PaperReconciler<'a, S, R> {
    pub fn new(store: &'a S, resolver: &'a R, config: &'a Config, paper: Paper, now: DateTime<Utc>) -> Self {
        let ns = paper.namespace().unwrap_or_default();
        let name = paper.name_any();
        PaperReconciler {
            store,
            resolver,
            config,
            paper,
            ns,
            name,
            now,
        }
    }

    pub async fn run_step(&self, step: Step) -> StepResult {
        match step {
            Step::InitializeConditions => self.initialize_conditions().await,
            Step::DesiredVersion => self.reconcile_desired_version().await,
            Step::VersionVolume => self.ensure_version_volume().await,
            Step::Provisioner => self.reconcile_provisioner().await,
            Step::InstanceVolume => self.ensure_instance_volume().await,
            Step::ServerConfig => self.reconcile_server_config().await,
            Step::Workload => self.reconcile_workload().await,
            Step::ServiceEndpoint => self.reconcile_service().await,
            Step::Status => self.reconcile_status().await,
            Step::Orphans => self.reap_orphans().await,
        }
    }

    /// Run the steps in order until one of them changes something or fails
    pub async fn drive(&self) -> Outcome {
        for step in Step::ORDER {
            match self.run_step(step).await {
                StepResult::Skipped => debug!("{step} has nothing to do for {}/{}", self.ns, self.name),
                StepResult::Updated => {
                    info!("Reconciled {step} for Paper {}/{}", self.ns, self.name);
                    return Outcome::Changed(step);
                }
                StepResult::Failed(e) => {
                    warn!("Step {step} failed for Paper {}/{}: {e}", self.ns, self.name);
                    self.store
                        .record(&self.paper, events::from_failure(&self.name, step.as_str(), &e.to_string()))
                        .await;
                    return Outcome::Failed(step, e);
                }
            }
        }
        info!("Paper {}/{} is up to date", self.ns, self.name);
        Outcome::Settled
    }

    /// The single status write of a step
    pub(crate) async fn persist(&self, mut status: PaperStatus) -> Result<()> {
        status.updated_timestamp = Some(self.now);
        self.store.replace_status(&self.paper, status).await.map(|_| ())
    }

    pub(crate) fn owner_reference(&self) -> Result<OwnerReference> {
        self.paper
            .controller_owner_ref(&())
            .ok_or_else(|| Error::InvariantViolation(format!("Paper {}/{} has no uid", self.ns, self.name)))
    }

    /// Whether this Paper is the controller of `obj`
    pub(crate) fn owns<K: Child>(&self, obj: &K) -> bool {
        let Some(uid) = self.paper.uid() else {
            return false;
        };
        obj.owner_references()
            .iter()
            .any(|o| o.uid == uid && o.controller == Some(true))
    }

    /// A same named object this Paper does not control is left alone
    pub(crate) fn not_managed(&self, kind: &str) -> Error {
        Error::Other(format!(
            "{kind} {}/{} exists and is not managed by this Paper",
            self.ns, self.name
        ))
    }

    pub(crate) async fn create_child<K: Child>(&self, kind: &str, obj: &K) -> Result<()> {
        let created = self.store.create(&self.ns, obj).await?;
        info!("Created {kind} {}/{}", self.ns, created.name_any());
        self.store
            .record(&self.paper, events::from_create(&self.name, kind, &created.name_any()))
            .await;
        Ok(())
    }

    /// Delete a child, a missing one is fine. Answers whether something was deleted.
    pub(crate) async fn delete_child<K: Child>(&self, kind: &str, name: &str, why: &str) -> Result<bool> {
        let deleted = self.store.delete::<K>(&self.ns, name).await?;
        if deleted {
            info!("Deleted {kind} {}/{name}: {why}", self.ns);
            self.store
                .record(&self.paper, events::from_delete(&self.name, kind, name, why))
                .await;
        }
        Ok(deleted)
    }
}
