//! Prompt templates for both flows.
//!
//! The wording is part of the output contract with the model (strict JSON
//! array for generate, sectioned markdown for review) and must not drift.

use crate::github::{PullRequest, PullRequestRef};
use crate::llm::ChatMessage;

pub const GENERATE_SYSTEM_PROMPT: &str =
    "You are a precise code generation agent that outputs only valid JSON.";

const GENERATE_PROJECT_PREAMBLE: &str = "\
You are working in a Java Spring Boot project called \"Unified Log Analytics & Monitoring Platform\". \
It uses Spring Boot (REST, Security, MongoDB, Redis), Elasticsearch, Kibana, MongoDB, Redis, and Docker.\n\n";

const GENERATE_OUTPUT_RULES: &str = "\
Generate a JSON array of file changes. Each item MUST be:\n\
{\"path\": \"relative/path/File.java\", \"content\": \"FULL FILE CONTENT\"}\n\n\
Rules:\n\
- Use correct package names based on existing structure (e.g. com.logplatform.controller, service, config, etc.).\n\
- For new code, include full compilable files (imports, package, class, etc.).\n\
- You MAY update existing files (e.g. docker-compose.yml, application.properties) by outputting the full updated content.\n\
- Prefer adding:\n\
\x20 * New controllers/services for the task\n\
\x20 * Elasticsearch index mappings and queries\n\
\x20 * Redis caching logic where appropriate\n\
\x20 * MongoDB entities/repositories if the task implies persistence\n\
\x20 * Docker / config updates needed for new components\n\
- Respond with ONLY a valid JSON array (no markdown, no comments, no explanations).";

pub const REVIEW_SYSTEM_PROMPT: &str = "\
You are a senior backend engineer reviewing a pull request in a Spring Boot + ELK + Redis + MongoDB project. \
Review code quality, architecture, error handling, testing, logging, and Docker/configuration changes. \
Respond in markdown with sections: Summary, Strengths, Issues, Suggestions, Tests to Add.";

const NO_DESCRIPTION: &str = "No description.";

/// User prompt asking for a JSON array of full-file changes.
pub fn build_generate_prompt(context: &str, task: &str) -> String {
    format!(
        "{GENERATE_PROJECT_PREAMBLE}Current project files (truncated):\n{context}\n\nTASK: {task}\n\n{GENERATE_OUTPUT_RULES}"
    )
}

pub fn generate_messages(context: &str, task: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(GENERATE_SYSTEM_PROMPT),
        ChatMessage::user(build_generate_prompt(context, task)),
    ]
}

/// User prompt carrying PR metadata and the first `max_diff_chars` of the diff.
pub fn build_review_prompt(
    pr_ref: &PullRequestRef,
    pr: &PullRequest,
    diff: &str,
    max_diff_chars: usize,
) -> String {
    let description = pr
        .body
        .as_deref()
        .filter(|body| !body.is_empty())
        .unwrap_or(NO_DESCRIPTION);
    format!(
        "Repository: {}\nPR #{}: {}\n\nPR description:\n{}\n\nDiff:\n{}",
        pr_ref.full_name(),
        pr.number,
        pr.title,
        description,
        truncate_chars(diff, max_diff_chars)
    )
}

pub fn review_messages(
    pr_ref: &PullRequestRef,
    pr: &PullRequest,
    diff: &str,
    max_diff_chars: usize,
) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(REVIEW_SYSTEM_PROMPT),
        ChatMessage::user(build_review_prompt(pr_ref, pr, diff, max_diff_chars)),
    ]
}

/// The first `max_chars` characters of `text`, never splitting a char.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::Role;

    fn sample_pr(body: Option<&str>) -> PullRequest {
        PullRequest {
            number: 5,
            title: "t".to_string(),
            body: body.map(str::to_string),
            diff_url: "https://example.com/d".to_string(),
        }
    }

    fn sample_ref() -> PullRequestRef {
        PullRequestRef::parse("acme/widgets", "5").unwrap()
    }

    #[test]
    fn test_generate_prompt_is_deterministic() {
        let a = build_generate_prompt("FILE: pom.xml\n<project/>\n\n", "add health endpoint");
        let b = build_generate_prompt("FILE: pom.xml\n<project/>\n\n", "add health endpoint");
        assert_eq!(a, b);
    }

    #[test]
    fn test_generate_prompt_layout() {
        let prompt = build_generate_prompt("CTX", "add health endpoint");
        assert!(prompt.starts_with(
            "You are working in a Java Spring Boot project called \"Unified Log Analytics & Monitoring Platform\". It uses"
        ));
        assert!(prompt.contains("Docker.\n\nCurrent project files (truncated):\nCTX\n\nTASK: add health endpoint\n\nGenerate a JSON array"));
        assert!(prompt.contains("{\"path\": \"relative/path/File.java\", \"content\": \"FULL FILE CONTENT\"}\n\nRules:\n"));
        assert!(prompt.contains("- Prefer adding:\n  * New controllers/services for the task\n"));
        assert!(prompt.ends_with(
            "- Respond with ONLY a valid JSON array (no markdown, no comments, no explanations)."
        ));
    }

    #[test]
    fn test_generate_messages_roles() {
        let messages = generate_messages("CTX", "task");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, GENERATE_SYSTEM_PROMPT);
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn test_review_prompt_exact() {
        let prompt = build_review_prompt(&sample_ref(), &sample_pr(Some("Fixes #3")), "diff --git a b", 25_000);
        assert_eq!(
            prompt,
            "Repository: acme/widgets\nPR #5: t\n\nPR description:\nFixes #3\n\nDiff:\ndiff --git a b"
        );
    }

    #[test]
    fn test_review_prompt_missing_description() {
        for body in [None, Some("")] {
            let prompt = build_review_prompt(&sample_ref(), &sample_pr(body), "d", 25_000);
            assert!(prompt.contains("PR description:\nNo description.\n\n"));
        }
    }

    #[test]
    fn test_review_prompt_truncates_diff() {
        let diff = format!("{}{}", "a".repeat(25_000), "b".repeat(5_000));
        let prompt = build_review_prompt(&sample_ref(), &sample_pr(None), &diff, 25_000);
        assert!(prompt.ends_with(&format!("Diff:\n{}", "a".repeat(25_000))));
        assert!(!prompt.contains('b'));
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }
}
