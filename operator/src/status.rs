use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
};
use common::{ActualState, ApplicationCondition};
use tracing::info;

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    /// Record the desired version as running once every earlier step settled
    pub(crate) async fn reconcile_status(&self) -> StepResult {
        let desired = try_step!(self.paper.desired_version_build());
        if self.paper.actual_version_build().as_ref() == Some(&desired) {
            return StepResult::Skipped;
        }
        info!("Paper {}/{} is now running {desired}", self.ns, self.name);
        let mut status = self.paper.status_or_default();
        status.actual_state = Some(ActualState::from(desired));
        status.set_condition(ApplicationCondition::available(self.now));
        try_step!(self.persist(status).await);
        StepResult::Updated
    }
}
