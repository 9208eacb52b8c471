use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::changes::{self, ApplyError, FileChange, ValidationError};
use crate::config::{Config, ConfigError};
use crate::context::{ContextCollector, ContextError};
use crate::github::{GitHubClient, GitHubError, PullRequestRef};
use crate::llm::{ChatModel, ChatRequest, LlmClient, LlmError};
use crate::prompt;
use crate::report::ReportError;

pub const REVIEW_COMMENT_HEADER: &str = "### 🤖 AI PR Review (Perplexity)\n\n";
pub const REVIEW_FALLBACK: &str = "No review generated.";
pub const GENERATE_FALLBACK: &str = "No changes generated.";

/// Every way a flow can end early. All of them exit the process with 1.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Apply(#[from] ApplyError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl FlowError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// Credentials check, then collect → prompt → model → validate.
pub async fn run_generate(config: &Config, task: &str) -> Result<Vec<FileChange>, FlowError> {
    let api_key = config.perplexity_api_key()?;
    if task.trim().is_empty() {
        return Err(ConfigError::MissingTask.into());
    }

    let client = LlmClient::new(&config.perplexity, api_key)?;
    generate_changes(&client, config, task)
        .instrument(info_span!("generate"))
        .await
}

pub async fn generate_changes(
    model: &dyn ChatModel,
    config: &Config,
    task: &str,
) -> Result<Vec<FileChange>, FlowError> {
    info!("collecting project context");
    let context = ContextCollector::from_config(&config.context).collect()?;
    info!(files = context.files, chars = context.chars, "context collected");

    let request = ChatRequest {
        model: model.model().to_string(),
        messages: prompt::generate_messages(&context.text, task),
        max_tokens: config.generate.max_tokens,
    };

    info!("requesting changes from model");
    let output = model.complete_or(&request, GENERATE_FALLBACK).await?;
    debug!(output_len = output.len(), "model answered");

    let changes = changes::parse_changes(&output)?;
    info!(changes = changes.len(), "validated model output");
    Ok(changes)
}

/// Credentials and PR reference check, then fetch → prompt → model → comment.
pub async fn run_review(config: &Config) -> Result<(), FlowError> {
    let github_token = config.github_token()?;
    let api_key = config.perplexity_api_key()?;
    let pr_ref = config.pull_request_ref()?;

    let github = GitHubClient::new(&config.github, github_token)?;
    let model = LlmClient::new(&config.perplexity, api_key)?;

    review_pull_request(&github, &model, config, &pr_ref)
        .instrument(info_span!("review", pr = %pr_ref))
        .await?;
    Ok(())
}

/// Returns the comment body that was posted.
pub async fn review_pull_request(
    github: &GitHubClient,
    model: &dyn ChatModel,
    config: &Config,
    pr_ref: &PullRequestRef,
) -> Result<String, FlowError> {
    info!("fetching pull request");
    let pr = github.fetch_pull_request(pr_ref).await?;
    let diff = github.fetch_diff(&pr).await?;
    info!(diff_chars = diff.chars().count(), "fetched diff");

    let request = ChatRequest {
        model: model.model().to_string(),
        messages: prompt::review_messages(pr_ref, &pr, &diff, config.review.max_diff_chars),
        max_tokens: config.review.max_tokens,
    };

    info!("requesting review from model");
    let review = model.complete_or(&request, REVIEW_FALLBACK).await?;

    let comment = format!("{REVIEW_COMMENT_HEADER}{review}");
    github.post_comment(pr_ref, &comment).await?;
    info!("review comment posted");
    Ok(comment)
}
