// file: src/utils/validation.rs
// description: input validation and text sanitizing helpers
// reference: input validation patterns

use crate::error::{AnalysisError, Result};
use std::path::Path;

/// Extensions accepted as plain-text tender documents.
pub const SUPPORTED_EXTENSIONS: [&str; 3] = ["txt", "md", "text"];

pub struct Validator;

impl Validator {
    pub fn validate_directory(path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(AnalysisError::Validation(format!(
                "Directory does not exist: {}",
                path.display()
            )));
        }

        if !path.is_dir() {
            return Err(AnalysisError::Validation(format!(
                "Path is not a directory: {}",
                path.display()
            )));
        }

        Ok(())
    }

    pub fn is_supported_document(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                SUPPORTED_EXTENSIONS
                    .iter()
                    .any(|supported| ext.eq_ignore_ascii_case(supported))
            })
            .unwrap_or(false)
    }

    pub fn validate_content_not_empty(content: &str) -> Result<()> {
        if content.trim().is_empty() {
            return Err(AnalysisError::Validation("Content is empty".to_string()));
        }
        Ok(())
    }

    pub fn validate_url(url: &str) -> Result<()> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AnalysisError::Validation(format!(
                "Invalid URL format: {}",
                url
            )));
        }
        Ok(())
    }

    /// Character-safe truncation with a trailing ellipsis.
    pub fn truncate_text(text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let head: String = text.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }

    /// Replaces characters that are unsafe in file names and trims the
    /// result to a reasonable length.
    pub fn sanitize_file_name(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();

        let trimmed = cleaned.trim().trim_matches('.');
        let limited: String = trimmed.chars().take(100).collect();

        if limited.is_empty() {
            "document".to_string()
        } else {
            limited
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_validate_directory() {
        let temp = TempDir::new().unwrap();
        assert!(Validator::validate_directory(temp.path()).is_ok());
        assert!(Validator::validate_directory(Path::new("/nonexistent")).is_err());
    }

    #[test]
    fn test_supported_document() {
        assert!(Validator::is_supported_document(Path::new("tender.txt")));
        assert!(Validator::is_supported_document(Path::new("tender.MD")));
        assert!(!Validator::is_supported_document(Path::new("tender.pdf")));
        assert!(!Validator::is_supported_document(Path::new("tender")));
    }

    #[test]
    fn test_validate_content_not_empty() {
        assert!(Validator::validate_content_not_empty("content").is_ok());
        assert!(Validator::validate_content_not_empty("").is_err());
        assert!(Validator::validate_content_not_empty("   ").is_err());
    }

    #[test]
    fn test_validate_url() {
        assert!(Validator::validate_url("https://api.openai.com/v1").is_ok());
        assert!(Validator::validate_url("http://localhost:11434/v1").is_ok());
        assert!(Validator::validate_url("api.openai.com").is_err());
    }

    #[test]
    fn test_truncate_text() {
        assert_eq!(Validator::truncate_text("short", 10), "short");
        assert_eq!(
            Validator::truncate_text("this is a very long text", 10),
            "this is a ..."
        );
        assert_eq!(Validator::truncate_text("招标文件评分标准", 4), "招标文件...");
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(
            Validator::sanitize_file_name("road/repair: phase 2?"),
            "road_repair_ phase 2_"
        );
        assert_eq!(Validator::sanitize_file_name("  ..  "), "document");
    }
}
