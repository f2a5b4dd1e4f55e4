use crate::{get_client_name, Error, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize};
use std::time::Duration;
use tracing::{debug, Span};
use url::Url;

pub static PAPERMC_API_URL: &str = "https://api.papermc.io";
static PROJECT_PATH: &str = "v2/projects/paper";

#[derive(Deserialize, Debug)]
struct VersionDetails {
    builds: Vec<i64>,
}

#[derive(Deserialize, Debug)]
struct Artifact {
    name: String,
}

#[derive(Deserialize, Debug)]
struct Downloads {
    application: Artifact,
}

#[derive(Deserialize, Debug)]
struct BuildDetails {
    downloads: Downloads,
}

/// Client of the PaperMC download API
///
/// The transport and the span its requests are logged under are handed in by the caller.
#[derive(Clone, Debug)]
pub struct PaperMcClient {
    baseurl: String,
    http: Client,
    span: Span,
}

impl PaperMcClient {
    pub fn new(base: &str, http: Client, span: Span) -> Result<Self> {
        Url::parse(base).map_err(|e| Error::InvalidUrl(base.to_string(), e))?;
        Ok(Self {
            baseurl: base.trim_end_matches('/').to_string(),
            http,
            span,
        })
    }

    /// A reqwest client with our user agent and a per request deadline
    pub fn transport(timeout: Duration) -> Result<Client> {
        Client::builder()
            .user_agent(get_client_name())
            .timeout(timeout)
            .build()
            .map_err(Error::ReqwestError)
    }

    fn version_url(&self, version: &str) -> String {
        format!("{}/{PROJECT_PATH}/versions/{version}", self.baseurl)
    }

    fn build_url(&self, version: &str, build: i64) -> String {
        format!("{}/builds/{build}", self.version_url(version))
    }

    pub fn download_url(&self, version: &str, build: i64, artifact: &str) -> String {
        format!("{}/downloads/{artifact}", self.build_url(version, build))
    }

    async fn body_get(&self, url: &str) -> Result<String> {
        debug!(parent: &self.span, "PaperMC API request {url}");
        let response = self.http.get(url).send().await.map_err(Error::ReqwestError)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::MethodFailed(
                "Get".to_string(),
                status.as_u16(),
                format!(
                    "The server returned the error: {} {}",
                    status.as_str(),
                    status.canonical_reason().unwrap_or("unknown")
                ),
            ));
        }
        response.text().await.map_err(Error::ReqwestError)
    }

    async fn json_get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let text = self.body_get(url).await?;
        serde_json::from_str(&text).map_err(Error::JsonError)
    }

    /// Latest build published for `version`
    pub async fn resolve_build(&self, version: &str) -> Result<i64> {
        let details: VersionDetails = self.json_get(&self.version_url(version)).await?;
        let build = details
            .builds
            .into_iter()
            .max()
            .ok_or_else(|| Error::NoBuildFound(version.to_string()))?;
        debug!(parent: &self.span, "PaperMC {version} latest build is {build}");
        Ok(build)
    }

    /// Download location of the server jar of `version`/`build`
    pub async fn resolve_artifact_url(&self, version: &str, build: i64) -> Result<String> {
        let details: BuildDetails = self.json_get(&self.build_url(version, build)).await?;
        Ok(self.download_url(version, build, &details.downloads.application.name))
    }
}
