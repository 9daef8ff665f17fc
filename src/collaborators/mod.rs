// file: src/collaborators/mod.rs
// description: external service seams used by the pipeline and their default implementations
// reference: https://docs.rs/async-trait

//! Traits for the services the pipeline depends on but does not own.
//!
//! Each trait has one default implementation in this module tree:
//! [`KeywordIndex`] for retrieval, [`ChatCompletionClient`] for text
//! understanding and [`MarkdownReportRenderer`] for report output.

pub mod index;
pub mod llm;
pub mod report;

#[cfg(test)]
pub mod fakes;

pub use index::KeywordIndex;
pub use llm::ChatCompletionClient;
pub use report::MarkdownReportRenderer;

use crate::document::DocumentContent;
use crate::error::Result;
use crate::models::AnalysisResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque handle to an indexed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexHandle {
    pub id: Uuid,
    pub chunk_count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub index: usize,
    pub text: String,
    pub score: f32,
}

/// Where a rendered report ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactLocation(String);

impl ArtifactLocation {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[async_trait]
pub trait Indexer: Send + Sync {
    async fn index(&self, content: &DocumentContent) -> Result<IndexHandle>;

    /// Safe to call concurrently on the same handle.
    async fn query(&self, handle: &IndexHandle, text: &str, k: usize) -> Result<Vec<TextChunk>>;

    async fn release(&self, _handle: &IndexHandle) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
pub trait TextModel: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

#[async_trait]
pub trait ReportRenderer: Send + Sync {
    async fn render(&self, result: &AnalysisResult) -> Result<ArtifactLocation>;
}
