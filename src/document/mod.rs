// file: src/document/mod.rs
// description: document references, loaded content, and preprocessing helpers
// reference: internal module structure

pub mod inspect;
pub mod loader;
pub mod normalizer;

pub use inspect::{DocumentInspection, inspect};
pub use loader::DocumentLoader;
pub use normalizer::TextNormalizer;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// A resolved pointer to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentRef {
    path: PathBuf,
}

impl DocumentRef {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DocumentContent {
    pub name: String,
    pub text: String,
    pub content_hash: String,
}

impl DocumentContent {
    pub fn new(name: String, text: String) -> Self {
        let content_hash = Self::compute_hash(&text);
        Self {
            name,
            text,
            content_hash,
        }
    }

    fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_name() {
        let doc = DocumentRef::new(PathBuf::from("/uploads/abc/tender notice.txt"));
        assert_eq!(doc.name(), "tender notice.txt");
    }

    #[test]
    fn test_hash_consistency() {
        let a = DocumentContent::new("a".into(), "same text".into());
        let b = DocumentContent::new("b".into(), "same text".into());
        assert_eq!(a.content_hash, b.content_hash);
        assert_eq!(a.char_count(), 9);
    }
}
