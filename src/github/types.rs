use serde::Deserialize;
use std::fmt;

use crate::config::ConfigError;

/// Identifies the pull request a review is posted to.
/// Built once from REPO_FULL and PR_NUMBER.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestRef {
    /// Parse `"owner/repo"` plus a decimal PR number.
    pub fn parse(repo_full: &str, number: &str) -> Result<Self, ConfigError> {
        let (owner, repo) = repo_full
            .trim()
            .split_once('/')
            .filter(|(owner, repo)| !owner.is_empty() && !repo.is_empty() && !repo.contains('/'))
            .ok_or_else(|| ConfigError::InvalidRepo(repo_full.to_string()))?;

        let number = number
            .trim()
            .parse::<u64>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| ConfigError::InvalidPrNumber(number.to_string()))?;

        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
            number,
        })
    }

    /// `owner/repo`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.owner, self.repo, self.number)
    }
}

/// The subset of GitHub's pull request payload the review prompt uses.
#[derive(Debug, Clone, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// PR description; GitHub sends null when it is empty
    #[serde(default)]
    pub body: Option<String>,
    /// Where the raw unified diff can be downloaded
    pub diff_url: String,
}
