//! Configuration module for repodrive.

use serde::Deserialize;
use std::path::Path;

use crate::{RepoDriveError, Result};

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the Web API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Upper bound on one details request in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Path used when a details request does not name one.
    #[serde(default = "default_path")]
    pub default_path: String,
}

fn default_web_host() -> String {
    "0.0.0.0".to_string()
}

fn default_web_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    60
}

fn default_path() -> String {
    "storage".to_string()
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            request_timeout_secs: default_request_timeout(),
            default_path: default_path(),
        }
    }
}

/// Upstream content store configuration.
///
/// Passed by value into the upstream client at construction; nothing reads
/// these settings from ambient state afterwards.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL of the GitHub REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Repository owner (user or organisation).
    #[serde(default)]
    pub owner: String,
    /// Repository name.
    #[serde(default)]
    pub repo: String,
    /// Branch all reads are pinned to.
    #[serde(default = "default_branch")]
    pub branch: String,
    /// API token. Empty means anonymous access.
    #[serde(default)]
    pub token: String,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Connect timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Total timeout for a single upstream call in seconds.
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,
    /// Maximum number of upstream calls in flight across all requests.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_user_agent() -> String {
    format!("repodrive/{}", env!("CARGO_PKG_VERSION"))
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_total_timeout() -> u64 {
    30
}

fn default_max_concurrent_requests() -> usize {
    16
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            owner: String::new(),
            repo: String::new(),
            branch: default_branch(),
            token: String::new(),
            user_agent: default_user_agent(),
            connect_timeout_secs: default_connect_timeout(),
            total_timeout_secs: default_total_timeout(),
            max_concurrent_requests: default_max_concurrent_requests(),
        }
    }
}

/// Details aggregation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregationConfig {
    /// Maximum number of lookups one details request keeps in flight.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

fn default_max_in_flight() -> usize {
    8
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_in_flight: default_max_in_flight(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/repodrive.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
    /// Upstream content store configuration.
    #[serde(default)]
    pub upstream: UpstreamConfig,
    /// Aggregation configuration.
    #[serde(default)]
    pub aggregation: AggregationConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(RepoDriveError::Io)?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s)
            .map_err(|e| RepoDriveError::Validation(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `GITHUB_TOKEN`: API token
    /// - `GITHUB_OWNER`: repository owner
    /// - `GITHUB_REPO`: repository name
    /// - `GITHUB_BRANCH`: branch to read from
    /// - `PORT`: Web API port
    ///
    /// Empty values are ignored. Values that cannot be applied are left out
    /// and returned as messages, so the caller can report them once logging
    /// is up.
    pub fn apply_env_overrides(&mut self) -> Vec<String> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut rejected = Vec::new();
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(token) = get("GITHUB_TOKEN") {
            self.upstream.token = token;
        }
        if let Some(owner) = get("GITHUB_OWNER") {
            self.upstream.owner = owner;
        }
        if let Some(repo) = get("GITHUB_REPO") {
            self.upstream.repo = repo;
        }
        if let Some(branch) = get("GITHUB_BRANCH") {
            self.upstream.branch = branch;
        }
        if let Some(port) = get("PORT") {
            match port.parse() {
                Ok(port) => self.web.port = port,
                Err(_) => rejected.push(format!("Ignoring invalid PORT value: {}", port)),
            }
        }

        rejected
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - the repository owner, name or token is not set
    /// - the API base is not an http(s) URL
    /// - a concurrency bound is zero
    pub fn validate(&self) -> Result<()> {
        let upstream = &self.upstream;

        if upstream.owner.is_empty() || upstream.repo.is_empty() {
            return Err(RepoDriveError::Validation(
                "upstream owner and repo must be set. \
                 Set them in config.toml or via GITHUB_OWNER / GITHUB_REPO."
                    .to_string(),
            ));
        }
        if upstream.token.is_empty() {
            return Err(RepoDriveError::Validation(
                "upstream token is not set. \
                 Set it in config.toml or via the GITHUB_TOKEN environment variable."
                    .to_string(),
            ));
        }
        if upstream.branch.is_empty() {
            return Err(RepoDriveError::Validation(
                "upstream branch must not be empty".to_string(),
            ));
        }

        match url::Url::parse(&upstream.api_base) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(RepoDriveError::Validation(format!(
                    "unsupported api_base scheme: {}",
                    url.scheme()
                )));
            }
            Err(e) => {
                return Err(RepoDriveError::Validation(format!("invalid api_base: {e}")));
            }
        }

        if upstream.max_concurrent_requests == 0 {
            return Err(RepoDriveError::Validation(
                "upstream.max_concurrent_requests must be at least 1".to_string(),
            ));
        }
        if self.aggregation.max_in_flight == 0 {
            return Err(RepoDriveError::Validation(
                "aggregation.max_in_flight must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
