use clap::Parser;
use common::papermc::PAPERMC_API_URL;
use std::time::Duration;

pub static DOWNLOADER_IMAGE: &str = "docker.io/busybox:latest";
pub static SERVER_IMAGE: &str = "gcr.io/distroless/java17-debian11:nonroot";

/// Operator settings, every flag can also be given through the environment
#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Run PaperMC servers declared as Paper resources")]
pub struct Config {
    /// Base url of the PaperMC download API
    #[arg(long, env = "PAPERMC_API_URL", default_value = PAPERMC_API_URL)]
    pub api_url: String,

    /// Image used to download the server jar (needs sh and wget)
    #[arg(long, env = "DOWNLOADER_IMAGE", default_value = DOWNLOADER_IMAGE)]
    pub downloader_image: String,

    /// Image running the server jar (java as entrypoint)
    #[arg(long, env = "SERVER_IMAGE", default_value = SERVER_IMAGE)]
    pub server_image: String,

    /// Seconds before the desired build is resolved again
    #[arg(long, env = "REFRESH_INTERVAL", default_value_t = 3600)]
    pub refresh_interval: u64,

    /// Seconds to wait once everything is in place
    #[arg(long, env = "IDLE_REQUEUE", default_value_t = 2 * 3600)]
    pub idle_requeue: u64,

    /// Seconds to wait after a step changed something
    #[arg(long, env = "PROMPT_REQUEUE", default_value_t = 5)]
    pub prompt_requeue: u64,

    /// Seconds to wait after a failed pass
    #[arg(long, env = "ERROR_REQUEUE", default_value_t = 60)]
    pub error_requeue: u64,

    /// Deadline in seconds of every call to the cluster or to the PaperMC API
    #[arg(long, env = "CALL_TIMEOUT", default_value_t = 20)]
    pub call_timeout: u64,

    /// Address of the health and metrics endpoint
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:9000")]
    pub listen: String,

    /// Log as json lines
    #[arg(long, env = "LOG_JSON", default_value_t = false)]
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config::parse_from(["operator"])
    }
}

impl Config {
    pub fn refresh_window(&self) -> chrono::Duration {
        i64::try_from(self.refresh_interval)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::hours(1))
    }

    pub fn idle_requeue(&self) -> Duration {
        Duration::from_secs(self.idle_requeue)
    }

    pub fn prompt_requeue(&self) -> Duration {
        Duration::from_secs(self.prompt_requeue)
    }

    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_refresh_and_idle_windows() {
        let config = Config::default();
        assert_eq!(config.refresh_window(), chrono::Duration::hours(1));
        assert_eq!(config.idle_requeue(), Duration::from_secs(7200));
        assert_eq!(config.api_url, "https://api.papermc.io");
        assert_eq!(config.listen, "0.0.0.0:9000");
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::parse_from(["operator", "--refresh-interval", "600", "--server-image", "java:21"]);
        assert_eq!(config.refresh_window(), chrono::Duration::minutes(10));
        assert_eq!(config.server_image, "java:21");
    }

    #[test]
    fn oversized_refresh_interval_falls_back_to_an_hour() {
        let config = Config {
            refresh_interval: u64::MAX,
            ..Config::default()
        };
        assert_eq!(config.refresh_window(), chrono::Duration::hours(1));
    }
}
