mod changes;
mod config;
mod context;
mod github;
mod llm;
mod pipeline;
mod prompt;
mod report;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use pipeline::FlowError;

/// ai-assist — asks Perplexity to generate project changes for a task,
/// or to review a GitHub Pull Request and post the review as a comment.
#[derive(Parser, Debug)]
#[command(name = "ai-assist", version, about)]
struct Cli {
    /// Config file (defaults to .ai-assist.toml in the current directory, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate file changes for a task from the project's sources.
    ///
    /// Needs PERPLEXITY_API_KEY.
    Generate {
        /// Write the validated changes (JSON) to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write each change into the working tree
        #[arg(long)]
        apply: bool,

        /// Task description; all words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        task: Vec<String>,
    },

    /// Review a pull request and post the result as a PR comment.
    ///
    /// Needs PERPLEXITY_API_KEY, GITHUB_TOKEN, REPO_FULL ("owner/repo") and PR_NUMBER.
    Review,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let flow = match cli.command {
        Command::Generate { .. } => "AI change generation",
        Command::Review => "AI PR review",
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "{flow} failed");
            eprintln!("{flow} failed: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), FlowError> {
    info!("loading configuration");
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Generate {
            output,
            apply,
            task,
        } => {
            let task = task.join(" ");
            let changes = pipeline::run_generate(&config, &task).await?;

            if apply {
                let written = changes::apply_changes(std::path::Path::new("."), &changes)?;
                report::print_applied(&changes, &written);
            }
            if output.is_some() || !apply {
                report::output(&changes, output.as_deref())?;
            }
            info!(changes = changes.len(), "done");
        }
        Command::Review => {
            pipeline::run_review(&config).await?;
            println!("AI PR review posted.");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_joins_task_words() {
        let cli = Cli::parse_from(["ai-assist", "generate", "add", "a", "--verbose-looking", "word"]);
        match cli.command {
            Command::Generate { task, apply, output } => {
                assert_eq!(task.join(" "), "add a --verbose-looking word");
                assert!(!apply);
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_generate_flags_before_task() {
        let cli = Cli::parse_from(["ai-assist", "generate", "--apply", "-o", "out.json", "add", "cache"]);
        match cli.command {
            Command::Generate { task, apply, output } => {
                assert_eq!(task, vec!["add", "cache"]);
                assert!(apply);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_review_takes_no_arguments() {
        let cli = Cli::parse_from(["ai-assist", "review"]);
        assert!(matches!(cli.command, Command::Review));
        assert!(Cli::try_parse_from(["ai-assist", "review", "extra"]).is_err());
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::parse_from(["ai-assist", "review", "--config", "ci.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("ci.toml")));
    }
}
