use crate::Error;
use std::fmt;

/// What a single reconciliation step did
#[derive(Debug)]
pub enum StepResult {
    /// Something changed in the cluster, the pass has to start over
    Updated,
    /// Nothing to do, move on to the next step
    Skipped,
    /// The step could not complete
    Failed(Error),
}

impl StepResult {
    pub fn is_updated(&self) -> bool {
        matches!(self, StepResult::Updated)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepResult::Skipped)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepResult::Failed(_))
    }

    pub fn outcome_label(&self) -> &'static str {
        match self {
            StepResult::Updated => "updated",
            StepResult::Skipped => "skipped",
            StepResult::Failed(_) => "failed",
        }
    }
}

/// Unwrap a `Result` inside a step, turning the error into `StepResult::Failed`
macro_rules! try_step {
    ($expr:expr) => {
        match $expr {
            Ok(v) => v,
            Err(e) => return $crate::result::StepResult::Failed(e.into()),
        }
    };
}
pub(crate) use try_step;

/// The steps of a pass, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    InitializeConditions,
    DesiredVersion,
    VersionVolume,
    Provisioner,
    InstanceVolume,
    ServerConfig,
    Workload,
    ServiceEndpoint,
    Status,
    Orphans,
}

impl Step {
    pub const ORDER: [Step; 10] = [
        Step::InitializeConditions,
        Step::DesiredVersion,
        Step::VersionVolume,
        Step::Provisioner,
        Step::InstanceVolume,
        Step::ServerConfig,
        Step::Workload,
        Step::ServiceEndpoint,
        Step::Status,
        Step::Orphans,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::InitializeConditions => "initialize_conditions",
            Step::DesiredVersion => "desired_version",
            Step::VersionVolume => "version_volume",
            Step::Provisioner => "provisioner",
            Step::InstanceVolume => "instance_volume",
            Step::ServerConfig => "server_config",
            Step::Workload => "workload",
            Step::ServiceEndpoint => "service_endpoint",
            Step::Status => "status",
            Step::Orphans => "orphans",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a whole pass ended
#[derive(Debug)]
pub enum Outcome {
    /// `Step` changed something: run again soon
    Changed(Step),
    /// `Step` failed, nothing after it ran
    Failed(Step, Error),
    /// Every step was skipped
    Settled,
}

impl Outcome {
    pub fn step(&self) -> Option<Step> {
        match self {
            Outcome::Changed(s) | Outcome::Failed(s, _) => Some(*s),
            Outcome::Settled => None,
        }
    }
}
