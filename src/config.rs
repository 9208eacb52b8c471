use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::github::PullRequestRef;

pub const DEFAULT_CONFIG_FILE: &str = ".ai-assist.toml";

pub const PERPLEXITY_API_KEY_ENV: &str = "PERPLEXITY_API_KEY";
pub const GITHUB_TOKEN_ENV: &str = "GITHUB_TOKEN";
pub const REPO_FULL_ENV: &str = "REPO_FULL";
pub const PR_NUMBER_ENV: &str = "PR_NUMBER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Missing {0}")]
    MissingValue(&'static str),

    #[error("Invalid REPO_FULL {0:?}: expected \"owner/repo\"")]
    InvalidRepo(String),

    #[error("Invalid PR_NUMBER {0:?}: expected a positive integer")]
    InvalidPrNumber(String),

    /// No task words, or only whitespace (stricter than an empty-string check).
    #[error("Missing task argument")]
    MissingTask,
}

/// Top-level configuration, loaded once at startup from `.ai-assist.toml`
/// (optional) and overlaid with environment variables.
///
/// Every field has a default, so the tool runs with zero config as long as
/// the required secrets are present in the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub perplexity: PerplexityConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    /// Which files the generate flow feeds to the model
    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub generate: GenerateConfig,

    #[serde(default)]
    pub review: ReviewConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerplexityConfig {
    /// API key. Overridden by PERPLEXITY_API_KEY.
    pub api_key: Option<String>,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Whole-request timeout for completion calls
    pub timeout_secs: u64,
}

impl Default for PerplexityConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.perplexity.ai".to_string(),
            model: "sonar-reasoning-pro".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. Overridden by GITHUB_TOKEN.
    pub token: Option<String>,
    pub api_url: String,
    /// "owner/repo". Overridden by REPO_FULL.
    pub repo: Option<String>,
    /// Pull request number as text. Overridden by PR_NUMBER.
    pub pr_number: Option<String>,
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
            repo: None,
            pr_number: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Files or directories, visited in order
    pub roots: Vec<PathBuf>,
    /// Soft ceiling on the collected context, in characters
    pub max_chars: usize,
    /// Case-sensitive file name suffixes included from directories
    pub suffixes: Vec<String>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            roots: vec![
                PathBuf::from("src/main/java"),
                PathBuf::from("src/main/resources"),
                PathBuf::from("docker-compose.yml"),
                PathBuf::from("pom.xml"),
            ],
            max_chars: 25_000,
            suffixes: vec![".java".to_string(), ".yml".to_string(), ".yaml".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerateConfig {
    pub max_tokens: u32,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self { max_tokens: 2400 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReviewConfig {
    pub max_tokens: u32,
    /// Diff text beyond this many characters is dropped from the prompt
    pub max_diff_chars: usize,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1200,
            max_diff_chars: 25_000,
        }
    }
}

impl Config {
    /// Load configuration and overlay the process environment.
    ///
    /// An explicit `path` must exist. Without one, `.ai-assist.toml` in the
    /// current directory is used if present, otherwise defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without touching the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.is_empty());

        if let Some(key) = get(PERPLEXITY_API_KEY_ENV) {
            self.perplexity.api_key = Some(key);
        }
        if let Some(token) = get(GITHUB_TOKEN_ENV) {
            self.github.token = Some(token);
        }
        if let Some(repo) = get(REPO_FULL_ENV) {
            self.github.repo = Some(repo);
        }
        if let Some(number) = get(PR_NUMBER_ENV) {
            self.github.pr_number = Some(number);
        }
    }

    pub fn perplexity_api_key(&self) -> Result<&str, ConfigError> {
        self.perplexity
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingValue(PERPLEXITY_API_KEY_ENV))
    }

    pub fn github_token(&self) -> Result<&str, ConfigError> {
        self.github
            .token
            .as_deref()
            .filter(|token| !token.is_empty())
            .ok_or(ConfigError::MissingValue(GITHUB_TOKEN_ENV))
    }

    /// Resolve the pull request under review from `repo` and `pr_number`.
    pub fn pull_request_ref(&self) -> Result<PullRequestRef, ConfigError> {
        let repo_full = self
            .github
            .repo
            .as_deref()
            .ok_or(ConfigError::MissingValue(REPO_FULL_ENV))?;
        let number = self
            .github
            .pr_number
            .as_deref()
            .ok_or(ConfigError::MissingValue(PR_NUMBER_ENV))?;
        PullRequestRef::parse(repo_full, number)
    }
}
