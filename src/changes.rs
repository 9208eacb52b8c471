use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument, warn};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Model output is not valid JSON: {0}")]
    NotJson(#[from] serde_json::Error),

    #[error("Model output is not a JSON array (got {0})")]
    NotArray(&'static str),

    #[error("Change #{index} is invalid: {reason}")]
    InvalidEntry { index: usize, reason: String },

    #[error("Change #{index} has an unsafe path {path:?}: paths must be relative and stay inside the project")]
    UnsafePath { index: usize, path: String },
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One full-file replacement proposed by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    pub content: String,
}

/// Parse the generate flow's model output into validated changes.
///
/// Reasoning models prefix their answer with a `<think>` block and some
/// wrap it in a code fence despite the prompt, so both are stripped first.
/// Each element must be an object with a non-empty relative `path` and a
/// string `content`; unknown keys are ignored.
pub fn parse_changes(output: &str) -> Result<Vec<FileChange>, ValidationError> {
    let json = strip_code_fences(strip_think_block(output));
    let value: Value = serde_json::from_str(json)?;

    let items = match value {
        Value::Array(items) => items,
        other => return Err(ValidationError::NotArray(json_kind(&other))),
    };

    let mut changes = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        let object = item.as_object().ok_or_else(|| ValidationError::InvalidEntry {
            index,
            reason: format!("expected an object, got {}", json_kind(&item)),
        })?;

        let path = match object.get("path") {
            Some(Value::String(path)) if !path.trim().is_empty() => path.clone(),
            Some(Value::String(_)) => {
                return Err(ValidationError::InvalidEntry {
                    index,
                    reason: "\"path\" is empty".to_string(),
                })
            }
            _ => {
                return Err(ValidationError::InvalidEntry {
                    index,
                    reason: "missing string field \"path\"".to_string(),
                })
            }
        };

        let content = match object.get("content") {
            Some(Value::String(content)) => content.clone(),
            _ => {
                return Err(ValidationError::InvalidEntry {
                    index,
                    reason: "missing string field \"content\"".to_string(),
                })
            }
        };

        if !is_safe_relative(&path) {
            return Err(ValidationError::UnsafePath { index, path });
        }

        changes.push(FileChange { path, content });
    }

    if changes.is_empty() {
        warn!("model returned an empty change list");
    }
    Ok(changes)
}

/// Write every change below `root`, creating parent directories.
#[instrument(skip(changes), fields(root = %root.display(), changes = changes.len()))]
pub fn apply_changes(root: &Path, changes: &[FileChange]) -> Result<Vec<PathBuf>, ApplyError> {
    let mut written = Vec::with_capacity(changes.len());
    for change in changes {
        let target = root.join(&change.path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|source| ApplyError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&target, &change.content).map_err(|source| ApplyError::Write {
            path: target.clone(),
            source,
        })?;
        debug!(path = %target.display(), bytes = change.content.len(), "wrote file");
        written.push(target);
    }
    Ok(written)
}

fn strip_think_block(s: &str) -> &str {
    let trimmed = s.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<think>") {
        if let Some(end) = rest.find("</think>") {
            return &rest[end + "</think>".len()..];
        }
    }
    trimmed
}

fn strip_code_fences(s: &str) -> &str {
    let trimmed = s.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        if let Some(inner) = rest.strip_suffix("```") {
            // drop the info string (`json`, `JSON`, `jsonc`, ...) on the opening line
            let body = match inner.split_once('\n') {
                Some((info, body)) if !info.trim_start().starts_with(['[', '{']) => body,
                _ => inner,
            };
            return body.trim();
        }
    }
    trimmed
}

fn is_safe_relative(path: &str) -> bool {
    let path = Path::new(path);
    path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
