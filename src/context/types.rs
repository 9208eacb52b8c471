use std::fmt;
use std::path::PathBuf;

/// One file's contribution to the prompt context.
#[derive(Debug, Clone)]
pub struct FileChunk {
    /// Root joined with the entry's relative path, as visited
    pub path: PathBuf,
    pub content: String,
}

impl fmt::Display for FileChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FILE: {}\n{}\n\n", self.path.display(), self.content)
    }
}

/// Rendered chunks plus their running length in characters.
#[derive(Debug, Default)]
pub struct CollectedContext {
    pub text: String,
    pub chars: usize,
    pub files: usize,
}

impl CollectedContext {
    pub fn push(&mut self, chunk: &FileChunk) {
        let rendered = chunk.to_string();
        self.chars += rendered.chars().count();
        self.files += 1;
        self.text.push_str(&rendered);
    }
}
