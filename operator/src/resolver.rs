use crate::Result;
use async_trait::async_trait;
use common::papermc::PaperMcClient;

#[cfg(test)]
use mockall::automock;

/// Turns a requested version into a concrete build and its download location
///
/// No retry happens here: a failure is reported and the pass is run again later.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait VersionResolver: Send + Sync {
    async fn resolve_build(&self, version: &str) -> Result<i64>;

    async fn resolve_artifact_url(&self, version: &str, build: i64) -> Result<String>;
}

#[async_trait]
impl VersionResolver for PaperMcClient {
    async fn resolve_build(&self, version: &str) -> Result<i64> {
        PaperMcClient::resolve_build(self, version).await
    }

    async fn resolve_artifact_url(&self, version: &str, build: i64) -> Result<String> {
        PaperMcClient::resolve_artifact_url(self, version, build).await
    }
}
