//! GitHub REST API content store.
//!
//! Reads entries, listings and commit history of a single repository branch
//! through the contents and commits endpoints. All calls pass through one
//! semaphore so the number of simultaneous upstream requests stays bounded
//! regardless of how many details requests are running.

use std::sync::Arc;
use std::time::Duration;

use axum::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use tokio::sync::Semaphore;
use tracing::debug;
use url::Url;

use super::types::{CommitInfo, CommitRecord, ContentsBody, Entry};
use super::ContentStore;
use crate::config::UpstreamConfig;
use crate::error::{RepoDriveError, Result};

/// Media type requested from the GitHub API.
const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";

/// Content store backed by the GitHub REST API.
pub struct GitHubClient {
    client: Client,
    base: Url,
    owner: String,
    repo: String,
    branch: String,
    token: String,
    gate: Arc<Semaphore>,
}

impl GitHubClient {
    /// Create a client from its upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let base = Url::parse(&config.api_base)
            .map_err(|e| RepoDriveError::Config(format!("invalid api_base: {}", e)))?;
        if base.cannot_be_a_base() {
            return Err(RepoDriveError::Config(format!(
                "api_base cannot be used as a base URL: {}",
                config.api_base
            )));
        }

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.total_timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| RepoDriveError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base,
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            branch: config.branch.clone(),
            token: config.token.clone(),
            gate: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
        })
    }

    /// Number of upstream calls that may start right now.
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Build `{base}/repos/{owner}/{repo}/{endpoint}/{path...}`.
    fn repo_url(&self, endpoint: &str, path: Option<&str>) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                RepoDriveError::Config("api_base cannot be used as a base URL".to_string())
            })?;
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str(), endpoint]);
            if let Some(path) = path {
                segments.extend(path.split('/').filter(|s| !s.is_empty()));
            }
        }
        Ok(url)
    }

    fn contents_url(&self, path: &str) -> Result<Url> {
        let mut url = self.repo_url("contents", Some(path))?;
        url.query_pairs_mut().append_pair("ref", &self.branch);
        Ok(url)
    }

    fn commits_url(&self, path: &str, limit: usize) -> Result<Url> {
        let mut url = self.repo_url("commits", None)?;
        {
            let mut query = url.query_pairs_mut();
            if !path.is_empty() {
                query.append_pair("path", path);
            }
            query
                .append_pair("sha", &self.branch)
                .append_pair("per_page", &limit.max(1).to_string());
        }
        Ok(url)
    }

    /// Issue a GET through the gate and return the body of a 2xx response.
    async fn fetch(&self, url: Url, path: &str) -> Result<Vec<u8>> {
        let _permit = self.gate.acquire().await.map_err(|_| {
            RepoDriveError::UpstreamUnavailable {
                status: None,
                reason: "upstream gate closed".to_string(),
            }
        })?;

        debug!(%url, "upstream request");

        let mut request = self.client.get(url).header(ACCEPT, GITHUB_MEDIA_TYPE);
        if !self.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("token {}", self.token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RepoDriveError::UpstreamUnavailable {
                status: e.status().map(|s| s.as_u16()),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(RepoDriveError::NotFound(path.to_string()));
        }
        if let Some(err) =
            rate_limit_error(status, response.headers(), chrono::Utc::now().timestamp())
        {
            return Err(err);
        }
        if !status.is_success() {
            return Err(RepoDriveError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                reason: status.canonical_reason().unwrap_or("unknown").to_string(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RepoDriveError::UpstreamUnavailable {
                status: Some(status.as_u16()),
                reason: format!("failed to read response: {}", e),
            })?;
        Ok(body.to_vec())
    }

    async fn fetch_contents(&self, path: &str) -> Result<ContentsBody> {
        let url = self.contents_url(path)?;
        let bytes = self.fetch(url, path).await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            RepoDriveError::UnexpectedResponse(format!("contents of '{}': {}", path, e))
        })
    }

    fn directory_entry(&self, path: &str) -> Entry {
        let mut entry = Entry::directory(path);
        if path.is_empty() {
            entry.name = self.repo.clone();
        }
        entry
    }
}

#[async_trait]
impl ContentStore for GitHubClient {
    async fn get_entry(&self, path: &str) -> Result<Entry> {
        match self.fetch_contents(path).await? {
            ContentsBody::Single(item) => Ok(Entry::from(item)),
            ContentsBody::Listing(_) => Ok(self.directory_entry(path)),
        }
    }

    async fn list_children(&self, path: &str) -> Result<Vec<Entry>> {
        match self.fetch_contents(path).await? {
            ContentsBody::Listing(items) => Ok(items.into_iter().map(Entry::from).collect()),
            ContentsBody::Single(item) => Err(RepoDriveError::UnexpectedResponse(format!(
                "'{}' is a {}, not a directory",
                path, item.item_type
            ))),
        }
    }

    async fn get_entry_with_children(&self, path: &str) -> Result<(Entry, Option<Vec<Entry>>)> {
        match self.fetch_contents(path).await? {
            ContentsBody::Single(item) => Ok((Entry::from(item), None)),
            ContentsBody::Listing(items) => Ok((
                self.directory_entry(path),
                Some(items.into_iter().map(Entry::from).collect()),
            )),
        }
    }

    async fn commit_history(&self, path: &str, limit: usize) -> Result<Vec<CommitInfo>> {
        let url = self.commits_url(path, limit)?;
        let bytes = match self.fetch(url, path).await {
            Ok(bytes) => bytes,
            // An empty repository answers 409 Conflict; it has no history at all.
            Err(RepoDriveError::UpstreamUnavailable {
                status: Some(409), ..
            }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let records: Vec<CommitRecord> = serde_json::from_slice(&bytes).map_err(|e| {
            RepoDriveError::UnexpectedResponse(format!("history of '{}': {}", path, e))
        })?;

        Ok(records
            .into_iter()
            .filter_map(CommitRecord::into_info)
            .take(limit)
            .collect())
    }
}

/// Classify a rate-limit rejection.
///
/// GitHub signals exhaustion with 429, or with 403 plus either
/// `x-ratelimit-remaining: 0` (primary limit) or `retry-after` (secondary
/// limit). The retry hint comes from `retry-after` when present, otherwise
/// from `x-ratelimit-reset` relative to `now` (unix seconds).
fn rate_limit_error(status: StatusCode, headers: &HeaderMap, now: i64) -> Option<RepoDriveError> {
    let header_u64 = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
    };

    let retry_after = header_u64("retry-after");
    let exhausted = header_u64("x-ratelimit-remaining") == Some(0);

    let limited = status == StatusCode::TOO_MANY_REQUESTS
        || (status == StatusCode::FORBIDDEN && (exhausted || retry_after.is_some()));
    if !limited {
        return None;
    }

    let retry_after_secs = retry_after.or_else(|| {
        header_u64("x-ratelimit-reset").map(|reset| (reset as i64 - now).max(0) as u64)
    });

    Some(RepoDriveError::UpstreamRateLimited { retry_after_secs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn test_config(api_base: &str) -> UpstreamConfig {
        UpstreamConfig {
            api_base: api_base.to_string(),
            owner: "octo".to_string(),
            repo: "drive".to_string(),
            branch: "main".to_string(),
            token: "t".to_string(),
            ..UpstreamConfig::default()
        }
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_contents_url() {
        let client = GitHubClient::new(&test_config("https://api.github.com")).unwrap();
        let url = client.contents_url("storage/my notes/a#1.txt").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/drive/contents/storage/my%20notes/a%231.txt?ref=main"
        );
    }

    #[test]
    fn test_contents_url_root_and_prefix() {
        let client =
            GitHubClient::new(&test_config("https://ghe.example.com/api/v3/")).unwrap();
        let url = client.contents_url("").unwrap();
        assert_eq!(
            url.as_str(),
            "https://ghe.example.com/api/v3/repos/octo/drive/contents?ref=main"
        );
    }

    #[test]
    fn test_commits_url() {
        let client = GitHubClient::new(&test_config("https://api.github.com")).unwrap();
        let url = client.commits_url("storage/a b.txt", 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/drive/commits?path=storage%2Fa+b.txt&sha=main&per_page=1"
        );

        let url = client.commits_url("", 1).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octo/drive/commits?sha=main&per_page=1"
        );
    }

    #[test]
    fn test_new_rejects_bad_base() {
        assert!(GitHubClient::new(&test_config("not a url")).is_err());
        assert!(GitHubClient::new(&test_config("mailto:someone@example.com")).is_err());
    }

    #[test]
    fn test_directory_entry_name() {
        let client = GitHubClient::new(&test_config("https://api.github.com")).unwrap();
        assert_eq!(client.directory_entry("").name, "drive");
        assert_eq!(client.directory_entry("storage/docs").name, "docs");
    }

    #[test]
    fn test_gate_size() {
        let mut config = test_config("https://api.github.com");
        config.max_concurrent_requests = 3;
        let client = GitHubClient::new(&config).unwrap();
        assert_eq!(client.available_permits(), 3);
    }

    #[test]
    fn test_rate_limit_429_with_retry_after() {
        let err = rate_limit_error(
            StatusCode::TOO_MANY_REQUESTS,
            &headers(&[("retry-after", "30")]),
            0,
        );
        assert!(matches!(
            err,
            Some(RepoDriveError::UpstreamRateLimited {
                retry_after_secs: Some(30)
            })
        ));
    }

    #[test]
    fn test_rate_limit_403_exhausted_uses_reset() {
        let err = rate_limit_error(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "1060")]),
            1000,
        );
        assert!(matches!(
            err,
            Some(RepoDriveError::UpstreamRateLimited {
                retry_after_secs: Some(60)
            })
        ));
    }

    #[test]
    fn test_rate_limit_reset_in_past_clamps_to_zero() {
        let err = rate_limit_error(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "0"), ("x-ratelimit-reset", "10")]),
            1000,
        );
        assert!(matches!(
            err,
            Some(RepoDriveError::UpstreamRateLimited {
                retry_after_secs: Some(0)
            })
        ));
    }

    #[test]
    fn test_plain_403_is_not_rate_limit() {
        assert!(rate_limit_error(
            StatusCode::FORBIDDEN,
            &headers(&[("x-ratelimit-remaining", "4999")]),
            0
        )
        .is_none());
        assert!(rate_limit_error(StatusCode::OK, &HeaderMap::new(), 0).is_none());
    }
}
