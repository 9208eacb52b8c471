pub mod types;

pub use types::{PullRequest, PullRequestRef};

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::GitHubConfig;

const API_VERSION_HEADER: &str = "X-GitHub-Api-Version";
const API_VERSION: &str = "2022-11-28";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const DIFF_MEDIA_TYPE: &str = "application/vnd.github.v3.diff";
const CLIENT_NAME: &str = "ai-assist";

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Failed to {action}: {status}: {body}")]
    Api {
        action: &'static str,
        status: StatusCode,
        body: String,
    },
}

/// Thin GitHub REST client: reads a pull request and its diff, posts
/// issue comments. One attempt per call, no retries.
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig, token: &str) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// GET /repos/{owner}/{repo}/pulls/{number}
    #[instrument(skip(self), fields(pr = %pr_ref))]
    pub async fn fetch_pull_request(
        &self,
        pr_ref: &PullRequestRef,
    ) -> Result<PullRequest, GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_url, pr_ref.owner, pr_ref.repo, pr_ref.number
        );

        debug!("fetching PR metadata from GitHub API");
        let response = self
            .http
            .get(&url)
            .header(USER_AGENT, CLIENT_NAME)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = ensure_success(response, "fetch PR").await?;

        let pr = response.json::<PullRequest>().await?;
        debug!(number = pr.number, title = %pr.title, "received PR metadata");
        Ok(pr)
    }

    /// GET the PR's `diff_url` as raw unified diff text.
    #[instrument(skip(self, pr), fields(pr = pr.number))]
    pub async fn fetch_diff(&self, pr: &PullRequest) -> Result<String, GitHubError> {
        debug!(url = %pr.diff_url, "fetching PR diff");
        let response = self
            .http
            .get(&pr.diff_url)
            .header(USER_AGENT, CLIENT_NAME)
            .header(ACCEPT, DIFF_MEDIA_TYPE)
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = ensure_success(response, "fetch diff").await?;

        let diff = response.text().await?;
        debug!(diff_bytes = diff.len(), "received PR diff");
        Ok(diff)
    }

    /// POST /repos/{owner}/{repo}/issues/{number}/comments
    #[instrument(skip(self, body), fields(pr = %pr_ref, body_len = body.len()))]
    pub async fn post_comment(&self, pr_ref: &PullRequestRef, body: &str) -> Result<(), GitHubError> {
        let url = format!(
            "{}/repos/{}/{}/issues/{}/comments",
            self.api_url, pr_ref.owner, pr_ref.repo, pr_ref.number
        );

        let response = self
            .http
            .post(&url)
            .header(USER_AGENT, CLIENT_NAME)
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .header(API_VERSION_HEADER, API_VERSION)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "body": body }))
            .send()
            .await?;
        ensure_success(response, "post comment").await?;

        debug!("comment created");
        Ok(())
    }
}

/// Turn a non-2xx response into `GitHubError::Api`, keeping the body.
async fn ensure_success(
    response: reqwest::Response,
    action: &'static str,
) -> Result<reqwest::Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    error!(%status, %body, "failed to {action}");
    Err(GitHubError::Api {
        action,
        status,
        body,
    })
}
