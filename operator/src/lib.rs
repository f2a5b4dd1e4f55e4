pub use common::{Error, Result};

/// Reconciliation of a Paper resource
pub mod paper;
pub mod reconciler;
pub mod result;

mod conditions;
mod desired;
mod orphans;
mod provisioner;
mod pvc;
mod serverconfig;
mod service;
mod status;
mod workload;

pub mod events;
pub mod resolver;
pub mod security;
pub mod store;

/// Command line and environment settings
pub mod config;
pub use config::Config;

/// State machinery for kube, as exposeable to actix
pub mod manager;
pub use manager::Manager;

/// Generated type, for crdgen
pub use common::Paper;

/// Log and trace integrations
pub mod telemetry;

/// Metrics
mod metrics;
pub use metrics::Metrics;

#[cfg(test)]
mod k8smock;
