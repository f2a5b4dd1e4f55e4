use crate::{
    manager::Context,
    reconciler::PaperReconciler,
    result::Outcome,
    store::Store,
    telemetry, Error, Result,
};
use chrono::Utc;
use common::Paper;
use kube::{runtime::controller::Action, ResourceExt};
use std::sync::Arc;
use tracing::{field, info, instrument, warn, Span};

/// Run one pass over a Paper, starting from the latest revision
#[instrument(skip(ctx, paper), fields(trace_id))]
pub async fn reconcile(paper: Arc<Paper>, ctx: Arc<Context>) -> Result<Action> {
    let trace_id = telemetry::get_trace_id();
    if trace_id != opentelemetry::trace::TraceId::INVALID {
        Span::current().record("trace_id", field::display(&trace_id));
    }
    let _mes = ctx.metrics.reconcile.count_and_measure(&trace_id);
    ctx.diagnostics.write().await.last_event = Utc::now();

    let ns = paper.namespace().unwrap_or_default();
    let name = paper.name_any();
    let Some(current) = ctx.store.get_opt::<Paper>(&ns, &name).await? else {
        info!("Paper {ns}/{name} is gone");
        return Ok(Action::await_change());
    };

    let outcome = PaperReconciler::new(&ctx.store, &ctx.resolver, &ctx.config, current, Utc::now())
        .drive()
        .await;
    ctx.metrics.reconcile.pass_outcome(&outcome);
    match outcome {
        Outcome::Changed(_) => Ok(Action::requeue(ctx.config.prompt_requeue())),
        Outcome::Settled => Ok(Action::requeue(ctx.config.idle_requeue())),
        Outcome::Failed(_, e) => Err(e),
    }
}

/// Conflicts are retried right away, other transient failures after a while
#[must_use]
pub fn error_policy(paper: Arc<Paper>, error: &Error, ctx: Arc<Context>) -> Action {
    warn!("reconcile failed for {:?}: {:?}", paper.metadata.name, error);
    ctx.metrics.reconcile.reconcile_failure(&paper, error);
    requeue_after(error, &ctx.config)
}

fn requeue_after(error: &Error, config: &crate::config::Config) -> Action {
    match error {
        Error::Conflict(_) => Action::requeue(config.prompt_requeue()),
        e if e.is_transient() => Action::requeue(config.error_requeue()),
        _ => Action::requeue(config.idle_requeue()),
    }
}
