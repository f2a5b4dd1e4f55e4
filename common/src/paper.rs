use crate::{labels::VersionBuild, Error, Result};
use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Describe a single PaperMC server and the version it should run
#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, PartialEq, JsonSchema)]
#[kube(
    kind = "Paper",
    status = "PaperStatus",
    shortname = "paper",
    group = "papermc.io",
    version = "v1",
    namespaced
)]
#[kube(
    doc = "Custom resource representing a PaperMC server instance",
    printcolumn = r#"
    {"name":"version", "type":"string", "description":"Requested version", "jsonPath":".spec.version"},
    {"name":"build",   "type":"integer", "description":"Desired build", "jsonPath":".status.desiredState.build"},
    {"name":"running", "type":"string", "description":"Running version", "jsonPath":".status.actualState.version"},
    {"name":"available", "type":"string", "description":"Available", "jsonPath":".status.conditions[?(@.type == 'Available')].status"},
    {"name":"last_updated", "type":"date", "description":"Last update date", "format": "date-time", "jsonPath":".status.updatedTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PaperSpec {
    /// The PaperMC version (major.minor.patch)
    #[schemars(regex(pattern = r"^\d+\.\d+\.\d+$"))]
    pub version: String,
    /// Entries written to server.properties
    pub server_properties: Option<BTreeMap<String, String>>,
    /// Expose the server through a Service
    pub service: Option<ServiceEndpoint>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum ServiceType {
    #[default]
    ClusterIP,
    NodePort,
    LoadBalancer,
}

impl ServiceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceType::ClusterIP => "ClusterIP",
            ServiceType::NodePort => "NodePort",
            ServiceType::LoadBalancer => "LoadBalancer",
        }
    }
}

/// Network endpoint in front of the server
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEndpoint {
    /// Kind of Service (ClusterIP by default)
    #[serde(rename = "type")]
    pub service_type: Option<ServiceType>,
    /// Port exposed by the Service (25565 by default)
    pub port: Option<i32>,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum ConditionsType {
    #[default]
    Available,
}

#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema, Default)]
pub enum ConditionsStatus {
    True,
    False,
    #[default]
    Unknown,
}

/// ApplicationCondition contains details about the state of the server
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationCondition {
    /// LastTransitionTime is the last time the status changed value
    pub last_transition_time: Option<DateTime<Utc>>,
    /// Reason is a machine readable CamelCase word
    pub reason: String,
    /// Message contains human-readable message indicating details about condition
    pub message: String,
    /// Type is an application condition type
    #[serde(rename = "type")]
    pub condition_type: ConditionsType,
    /// Status ("True", "False" or "Unknown")
    pub status: ConditionsStatus,
}

impl ApplicationCondition {
    #[must_use]
    pub fn new(
        reason: &str,
        message: &str,
        status: ConditionsStatus,
        condition_type: ConditionsType,
        now: DateTime<Utc>,
    ) -> ApplicationCondition {
        ApplicationCondition {
            last_transition_time: Some(now),
            reason: reason.to_string(),
            message: message.to_string(),
            condition_type,
            status,
        }
    }

    pub fn starting(now: DateTime<Utc>) -> ApplicationCondition {
        ApplicationCondition::new(
            "Reconciling",
            "Starting reconciliation",
            ConditionsStatus::Unknown,
            ConditionsType::Available,
            now,
        )
    }

    pub fn resolved(now: DateTime<Utc>) -> ApplicationCondition {
        ApplicationCondition::new(
            "Reconciling",
            "Version, build, and url available",
            ConditionsStatus::False,
            ConditionsType::Available,
            now,
        )
    }

    pub fn available(now: DateTime<Utc>) -> ApplicationCondition {
        ApplicationCondition::new(
            "Done",
            "Server is running the desired version",
            ConditionsStatus::True,
            ConditionsType::Available,
            now,
        )
    }
}

/// Target of the reconciliation as resolved upstream
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DesiredState {
    pub version: String,
    pub build: i64,
    #[serde(rename = "artifactURL")]
    pub artifact_url: String,
    pub last_updated: DateTime<Utc>,
}

impl DesiredState {
    pub fn version_build(&self) -> VersionBuild {
        VersionBuild::new(&self.version, self.build)
    }
}

/// What the running server was confirmed to be on
#[derive(Serialize, Deserialize, Eq, PartialEq, Clone, Debug, JsonSchema)]
pub struct ActualState {
    pub version: String,
    pub build: i64,
}

impl ActualState {
    pub fn version_build(&self) -> VersionBuild {
        VersionBuild::new(&self.version, self.build)
    }
}

impl From<VersionBuild> for ActualState {
    fn from(vb: VersionBuild) -> Self {
        ActualState {
            version: vb.version,
            build: vb.build,
        }
    }
}

/// The status object of `Paper`
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct PaperStatus {
    /// Paper conditions, at most one per type
    #[serde(default)]
    pub conditions: Vec<ApplicationCondition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_state: Option<DesiredState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_state: Option<ActualState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_timestamp: Option<DateTime<Utc>>,
}

impl PaperStatus {
    pub fn condition(&self, condition_type: &ConditionsType) -> Option<&ApplicationCondition> {
        self.conditions.iter().find(|c| &c.condition_type == condition_type)
    }

    /// Upsert a condition by type. The transition time is only moved when the status value changes.
    pub fn set_condition(&mut self, cond: ApplicationCondition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.condition_type == cond.condition_type)
        {
            Some(existing) => {
                if existing.status != cond.status {
                    existing.status = cond.status;
                    existing.last_transition_time = cond.last_transition_time;
                }
                existing.reason = cond.reason;
                existing.message = cond.message;
            }
            None => self.conditions.push(cond),
        }
    }
}

impl Paper {
    pub fn status_or_default(&self) -> PaperStatus {
        self.status.clone().unwrap_or_default()
    }

    pub fn desired_state(&self) -> Option<&DesiredState> {
        self.status.as_ref().and_then(|s| s.desired_state.as_ref())
    }

    pub fn actual_state(&self) -> Option<&ActualState> {
        self.status.as_ref().and_then(|s| s.actual_state.as_ref())
    }

    /// Every step after the desired version resolution relies on it being there
    pub fn desired_version_build(&self) -> Result<VersionBuild> {
        self.desired_state()
            .map(DesiredState::version_build)
            .ok_or_else(|| Error::InvariantViolation("desired state undefined".to_string()))
    }

    pub fn actual_version_build(&self) -> Option<VersionBuild> {
        self.actual_state().map(ActualState::version_build)
    }

    /// True once the confirmed running version is the desired one
    pub fn is_up_to_date(&self) -> bool {
        match (self.desired_state(), self.actual_state()) {
            (Some(d), Some(a)) => d.version_build() == a.version_build(),
            _ => false,
        }
    }
}
