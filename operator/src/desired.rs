use crate::{
    reconciler::PaperReconciler,
    resolver::VersionResolver,
    result::{try_step, StepResult},
    store::Store,
    Error,
};
use common::{ApplicationCondition, DesiredState};
use tracing::{debug, info, warn};

impl<S: Store, R: VersionResolver> PaperReconciler<'_, S, R> {
    /// Resolve the requested version into a build and artifact url, at most once per refresh window
    pub(crate) async fn reconcile_desired_version(&self) -> StepResult {
        let version = self.paper.spec.version.as_str();
        try_step!(semver::Version::parse(version).map_err(|e| Error::InvalidVersion(version.to_string(), e)));

        let current = self.paper.desired_state();
        if let Some(desired) = current {
            if desired.version == version && self.now < desired.last_updated + self.config.refresh_window() {
                return StepResult::Skipped;
            }
        }

        let build = try_step!(self.resolver.resolve_build(version).await);
        let mut status = self.paper.status_or_default();
        match current {
            Some(desired) if desired.version == version && build <= desired.build => {
                if build < desired.build {
                    warn!(
                        "Ignoring build {build} for {version}, {} is already the desired one",
                        desired.build
                    );
                } else {
                    debug!("{version} is still at build {build}");
                }
                if let Some(d) = status.desired_state.as_mut() {
                    d.last_updated = self.now;
                }
            }
            _ => {
                let url = try_step!(self.resolver.resolve_artifact_url(version, build).await);
                info!("Paper {}/{} now wants {version} build {build}", self.ns, self.name);
                status.desired_state = Some(DesiredState {
                    version: version.to_string(),
                    build,
                    artifact_url: url,
                    last_updated: self.now,
                });
                status.set_condition(ApplicationCondition::resolved(self.now));
            }
        }
        try_step!(self.persist(status).await);
        StepResult::Updated
    }
}
