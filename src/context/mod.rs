pub mod types;

pub use types::{CollectedContext, FileChunk};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::config::ContextConfig;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Gathers project files into one `FILE: <path>` blob for the generate prompt.
///
/// A file root is always included. Directory roots are walked recursively in
/// OS listing order and only files whose name ends in one of `suffixes` are
/// taken. Once the running total passes `max_chars`, the rest of the
/// directory holding the file that crossed it is skipped; parent directories
/// and later roots carry on, so the result can overshoot by the chunks added
/// after that point (at most one per directory still being walked).
#[derive(Debug, Clone)]
pub struct ContextCollector {
    roots: Vec<PathBuf>,
    max_chars: usize,
    suffixes: Vec<String>,
}

impl ContextCollector {
    pub fn new(roots: Vec<PathBuf>, max_chars: usize, suffixes: Vec<String>) -> Self {
        Self {
            roots,
            max_chars,
            suffixes,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(
            config.roots.clone(),
            config.max_chars,
            config.suffixes.clone(),
        )
    }

    #[instrument(skip(self), fields(roots = self.roots.len(), max_chars = self.max_chars))]
    pub fn collect(&self) -> Result<CollectedContext, ContextError> {
        let mut collected = CollectedContext::default();

        for root in &self.roots {
            let metadata = match fs::metadata(root) {
                Ok(metadata) => metadata,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    debug!(root = %root.display(), "root does not exist, skipping");
                    continue;
                }
                Err(source) => {
                    return Err(ContextError::Read {
                        path: root.clone(),
                        source,
                    })
                }
            };

            if metadata.is_dir() {
                self.collect_dir(root, &mut collected)?;
            } else {
                collected.push(&read_chunk(root)?);
            }
        }

        debug!(files = collected.files, chars = collected.chars, "collected context");
        Ok(collected)
    }

    fn collect_dir(&self, root: &Path, collected: &mut CollectedContext) -> Result<(), ContextError> {
        let mut walker = WalkDir::new(root).follow_links(true).min_depth(1).into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry?;
            if !entry.file_type().is_file() || !self.matches(&entry.file_name().to_string_lossy()) {
                continue;
            }

            collected.push(&read_chunk(entry.path())?);

            if collected.chars > self.max_chars {
                // Only the directory containing this file stops here.
                let dir = entry.path().parent().unwrap_or(root);
                debug!(dir = %dir.display(), chars = collected.chars, "context budget exceeded, skipping rest of directory");
                walker.skip_current_dir();
            }
        }

        Ok(())
    }

    fn matches(&self, file_name: &str) -> bool {
        self.suffixes.iter().any(|suffix| file_name.ends_with(suffix.as_str()))
    }
}

fn read_chunk(path: &Path) -> Result<FileChunk, ContextError> {
    let bytes = fs::read(path).map_err(|source| ContextError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(FileChunk {
        path: path.to_path_buf(),
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suffixes() -> Vec<String> {
        ContextConfig::default().suffixes
    }

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_directory_filter_by_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("src");
        write(&root.join("A.java"), "class A {}");
        write(&root.join("B.yml"), "b: 1");
        write(&root.join("C.txt"), "nope");
        write(&root.join("nested/D.yaml"), "d: 2");
        write(&root.join("nested/E.JAVA"), "upper case suffix");

        let collector = ContextCollector::new(vec![root.clone()], 25_000, suffixes());
        let collected = collector.collect().unwrap();

        assert_eq!(collected.files, 3);
        assert!(collected.text.contains(&format!("FILE: {}\nclass A {{}}\n\n", root.join("A.java").display())));
        assert!(collected.text.contains(&format!("FILE: {}\nb: 1\n\n", root.join("B.yml").display())));
        assert!(collected.text.contains("d: 2"));
        assert!(!collected.text.contains("nope"));
        assert!(!collected.text.contains("upper case suffix"));
    }

    #[test]
    fn test_file_root_always_included() {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        write(&pom, "<project/>");

        let collector = ContextCollector::new(vec![pom.clone()], 25_000, suffixes());
        let collected = collector.collect().unwrap();
        assert_eq!(collected.text, format!("FILE: {}\n<project/>\n\n", pom.display()));
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let pom = dir.path().join("pom.xml");
        write(&pom, "<project/>");

        let with_missing = ContextCollector::new(
            vec![dir.path().join("does-not-exist"), pom.clone()],
            25_000,
            suffixes(),
        );
        let without = ContextCollector::new(vec![pom], 25_000, suffixes());
        assert_eq!(
            with_missing.collect().unwrap().text,
            without.collect().unwrap().text
        );
    }

    #[test]
    fn test_roots_keep_their_order() {
        let dir = tempfile::tempdir().unwrap();
        let compose = dir.path().join("docker-compose.yml");
        let pom = dir.path().join("pom.xml");
        write(&compose, "services: {}");
        write(&pom, "<project/>");

        let collector = ContextCollector::new(vec![pom, compose], 25_000, suffixes());
        let text = collector.collect().unwrap().text;
        let pom_at = text.find("<project/>").unwrap();
        let compose_at = text.find("services: {}").unwrap();
        assert!(pom_at < compose_at);
    }

    #[test]
    fn test_budget_stops_directory_but_not_later_roots() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first");
        let second = dir.path().join("second");
        for name in ["A.java", "B.java", "C.java"] {
            write(&first.join(name), &"x".repeat(200));
            write(&second.join(name), &"y".repeat(200));
        }

        let collector = ContextCollector::new(vec![first, second], 100, suffixes());
        let collected = collector.collect().unwrap();

        // one chunk from each directory: the one that crossed the budget
        assert_eq!(collected.files, 2);
        assert_eq!(collected.text.matches("FILE: ").count(), 2);
        assert!(collected.text.contains(&"x".repeat(200)));
        assert!(collected.text.contains(&"y".repeat(200)));
    }

    #[test]
    fn test_budget_stops_subdirectory_but_not_its_sibling() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("java");
        for name in ["A.java", "B.java", "C.java"] {
            write(&root.join("a").join(name), &"x".repeat(200));
            write(&root.join("b").join(name), &"y".repeat(200));
        }

        let collector = ContextCollector::new(vec![root.clone()], 100, suffixes());
        let collected = collector.collect().unwrap();

        // the walk returns to the parent after `a/` (or `b/`) stops
        assert_eq!(collected.files, 2);
        let a_prefix = format!("FILE: {}", root.join("a").display());
        let b_prefix = format!("FILE: {}", root.join("b").display());
        assert_eq!(collected.text.matches(a_prefix.as_str()).count(), 1);
        assert_eq!(collected.text.matches(b_prefix.as_str()).count(), 1);
    }

    #[test]
    fn test_file_root_after_budget_still_included() {
        let dir = tempfile::tempdir().unwrap();
        let java = dir.path().join("java");
        write(&java.join("Big.java"), &"z".repeat(500));
        let pom = dir.path().join("pom.xml");
        write(&pom, "<project/>");

        let collector = ContextCollector::new(vec![java, pom], 100, suffixes());
        let collected = collector.collect().unwrap();
        assert_eq!(collected.files, 2);
        assert!(collected.text.ends_with("<project/>\n\n"));
    }

    #[test]
    fn test_overshoot_is_bounded_by_one_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("flat");
        for i in 0..20 {
            write(&root.join(format!("F{i}.java")), &"a".repeat(40));
        }

        let max_chars = 300;
        let collector = ContextCollector::new(vec![root.clone()], max_chars, suffixes());
        let collected = collector.collect().unwrap();

        let largest_chunk = (0..20)
            .map(|i| {
                FileChunk {
                    path: root.join(format!("F{i}.java")),
                    content: "a".repeat(40),
                }
                .to_string()
                .chars()
                .count()
            })
            .max()
            .unwrap();
        assert!(collected.chars > max_chars);
        assert!(collected.chars <= max_chars + largest_chunk);
        assert!(collected.files < 20);
    }

    #[test]
    fn test_non_utf8_content_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bin.java");
        fs::write(&path, [0x63, 0xff, 0x64]).unwrap();

        let collector = ContextCollector::new(vec![dir.path().to_path_buf()], 25_000, suffixes());
        let collected = collector.collect().unwrap();
        assert!(collected.text.contains("c\u{FFFD}d"));
    }
}
