use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
};
use common::ApplicationCondition;

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    /// Give a brand new Paper its first condition
    pub(crate) async fn initialize_conditions(&self) -> StepResult {
        let mut status = self.paper.status_or_default();
        if !status.conditions.is_empty() {
            return StepResult::Skipped;
        }
        status.set_condition(ApplicationCondition::starting(self.now));
        try_step!(self.persist(status).await);
        StepResult::Updated
    }
}
