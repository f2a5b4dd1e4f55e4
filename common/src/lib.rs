use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("SerializationError: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("K8s error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Status of {0} changed since it was read")]
    Conflict(String),

    #[error("Elapsed wait error: {0}")]
    Elapsed(#[from] tokio::time::error::Elapsed),

    #[error("Reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Json decoding error: {0}")]
    JsonError(#[source] serde_json::Error),

    #[error("{0} query failed: {1} {2}")]
    MethodFailed(String, u16, String),

    #[error("no build found for version {0}")]
    NoBuildFound(String),

    #[error("Invalid version {0}: {1}")]
    InvalidVersion(String, #[source] semver::Error),

    #[error("Invalid url {0}: {1}")]
    InvalidUrl(String, #[source] url::ParseError),

    #[error("Invalid label selector: {0}")]
    InvalidSelector(String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Error: {0}")]
    Other(String),
}

impl Error {
    pub fn metric_label(&self) -> String {
        let full = format!("{self:?}").to_lowercase();
        full.split('(').next().unwrap_or_default().to_string()
    }

    /// Sorts kube errors apart: an optimistic concurrency failure is its own variant
    pub fn from_kube(e: kube::Error) -> Error {
        match e {
            kube::Error::Api(ref resp) if resp.code == 409 && resp.reason == "Conflict" => {
                Error::Conflict(resp.message.clone())
            }
            e => Error::KubeError(e),
        }
    }

    /// Errors that go away by themselves when the pass is simply run again later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::KubeError(_)
                | Error::Conflict(_)
                | Error::Elapsed(_)
                | Error::ReqwestError(_)
                | Error::MethodFailed(..)
                | Error::NoBuildFound(_)
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub mod context;
pub mod labels;
pub mod paper;
pub mod papermc;
pub use context::get_client_name;
pub use labels::VersionBuild;
pub use paper::{ActualState, ApplicationCondition, ConditionsStatus, ConditionsType, DesiredState, Paper, PaperSpec, PaperStatus};
