// file: src/document/loader.rs
// description: resolves document references and reads their text content
// reference: async file access with tokio::fs

use crate::document::{DocumentContent, DocumentRef, TextNormalizer};
use crate::error::{AnalysisError, Result};
use crate::utils::Validator;
use std::path::Path;
use tracing::debug;

#[derive(Default)]
pub struct DocumentLoader {
    normalizer: TextNormalizer,
}

impl DocumentLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirms that `path` points at an existing, non-empty regular file.
    pub async fn resolve(&self, path: &Path) -> Result<DocumentRef> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|_| AnalysisError::NotFound(format!("document {}", path.display())))?;

        if !metadata.is_file() {
            return Err(AnalysisError::NotFound(format!(
                "document {} is not a file",
                path.display()
            )));
        }

        if metadata.len() == 0 {
            return Err(AnalysisError::NotFound(format!(
                "document {} is empty",
                path.display()
            )));
        }

        let canonical = tokio::fs::canonicalize(path)
            .await
            .map_err(|source| AnalysisError::FileOperation {
                path: path.to_path_buf(),
                source,
            })?;

        Ok(DocumentRef::new(canonical))
    }

    pub async fn load(&self, document: &DocumentRef) -> Result<DocumentContent> {
        let bytes = tokio::fs::read(document.path()).await.map_err(|source| {
            AnalysisError::FileOperation {
                path: document.path().to_path_buf(),
                source,
            }
        })?;

        let raw = String::from_utf8_lossy(&bytes);
        let text = self.normalizer.normalize(&raw);
        Validator::validate_content_not_empty(&text)?;

        debug!(
            "Loaded {} ({} chars)",
            document.path().display(),
            text.chars().count()
        );

        Ok(DocumentContent::new(document.name(), text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_resolve_existing_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tender.txt");
        fs::write(&path, "Tender notice").unwrap();

        let doc = DocumentLoader::new().resolve(&path).await.unwrap();
        assert_eq!(doc.name(), "tender.txt");
    }

    #[tokio::test]
    async fn test_resolve_rejects_missing_and_empty() {
        let temp = TempDir::new().unwrap();
        let loader = DocumentLoader::new();

        let missing = loader.resolve(&temp.path().join("nope.txt")).await;
        assert!(matches!(missing, Err(AnalysisError::NotFound(_))));

        let empty_path = temp.path().join("empty.txt");
        fs::write(&empty_path, "").unwrap();
        let empty = loader.resolve(&empty_path).await;
        assert!(matches!(empty, Err(AnalysisError::NotFound(_))));

        let dir = loader.resolve(temp.path()).await;
        assert!(matches!(dir, Err(AnalysisError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_load_normalizes_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("tender.txt");
        fs::write(&path, "Chapter 1\r\n\r\n\r\n* budget\r\n").unwrap();

        let loader = DocumentLoader::new();
        let doc = loader.resolve(&path).await.unwrap();
        let content = loader.load(&doc).await.unwrap();
        assert_eq!(content.text, "Chapter 1\n\n- budget");
        assert_eq!(content.name, "tender.txt");
    }

    #[tokio::test]
    async fn test_load_rejects_whitespace_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("blank.txt");
        fs::write(&path, "   \n\n  ").unwrap();

        let loader = DocumentLoader::new();
        let doc = loader.resolve(&path).await.unwrap();
        assert!(matches!(
            loader.load(&doc).await,
            Err(AnalysisError::Validation(_))
        ));
    }
}
