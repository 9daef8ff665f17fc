// file: src/collaborators/index.rs
// description: in-memory keyword overlap index over overlapping text chunks
// reference: term-frequency scoring with read-mostly shared state

use crate::collaborators::{IndexHandle, Indexer, TextChunk};
use crate::config::IndexConfig;
use crate::document::DocumentContent;
use crate::error::{AnalysisError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

struct IndexedChunk {
    text: String,
    terms: HashMap<String, usize>,
}

pub struct KeywordIndex {
    chunk_size: usize,
    chunk_overlap: usize,
    documents: RwLock<HashMap<Uuid, Vec<IndexedChunk>>>,
}

impl KeywordIndex {
    pub fn new(config: &IndexConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
            documents: RwLock::new(HashMap::new()),
        }
    }

    pub async fn document_count(&self) -> usize {
        self.documents.read().await.len()
    }

    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let step = self.chunk_size - self.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = (start + self.chunk_size).min(chars.len());
            let chunk: String = chars[start..end].iter().collect();
            if !chunk.trim().is_empty() {
                chunks.push(chunk);
            }
            if end == chars.len() {
                break;
            }
            start += step;
        }

        chunks
    }
}

fn is_cjk(c: char) -> bool {
    matches!(c, '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}')
}

/// Lowercased words for alphabetic scripts, character bigrams for CJK runs.
fn terms(text: &str) -> Vec<String> {
    let mut out = Vec::new();

    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }

        if word.chars().any(is_cjk) {
            let chars: Vec<char> = word.chars().collect();
            if chars.len() == 1 {
                out.push(chars[0].to_string());
            }
            for pair in chars.windows(2) {
                out.push(pair.iter().collect());
            }
        } else if word.chars().count() > 1 {
            out.push(word.to_lowercase());
        }
    }

    out
}

fn term_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for term in terms(text) {
        *counts.entry(term).or_insert(0) += 1;
    }
    counts
}

#[async_trait]
impl Indexer for KeywordIndex {
    async fn index(&self, content: &DocumentContent) -> Result<IndexHandle> {
        let chunks: Vec<IndexedChunk> = self
            .split(&content.text)
            .into_iter()
            .map(|text| IndexedChunk {
                terms: term_counts(&text),
                text,
            })
            .collect();

        if chunks.is_empty() {
            return Err(AnalysisError::Indexing(format!(
                "document {} produced no chunks",
                content.name
            )));
        }

        let handle = IndexHandle {
            id: Uuid::new_v4(),
            chunk_count: chunks.len(),
        };

        self.documents.write().await.insert(handle.id, chunks);
        debug!(
            "Indexed {} into {} chunks ({})",
            content.name, handle.chunk_count, handle.id
        );

        Ok(handle)
    }

    async fn query(&self, handle: &IndexHandle, text: &str, k: usize) -> Result<Vec<TextChunk>> {
        let documents = self.documents.read().await;
        let chunks = documents
            .get(&handle.id)
            .ok_or_else(|| AnalysisError::Indexing(format!("unknown index handle {}", handle.id)))?;

        let query_terms: HashSet<String> = terms(text).into_iter().collect();

        let mut scored: Vec<TextChunk> = chunks
            .iter()
            .enumerate()
            .map(|(index, chunk)| {
                let distinct = query_terms
                    .iter()
                    .filter(|term| chunk.terms.contains_key(*term))
                    .count();
                let frequency: usize = query_terms
                    .iter()
                    .filter_map(|term| chunk.terms.get(term))
                    .sum();
                TextChunk {
                    index,
                    text: chunk.text.clone(),
                    score: distinct as f32 + (frequency as f32 / 100.0).min(0.99),
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.index.cmp(&b.index))
        });
        scored.truncate(k);

        Ok(scored)
    }

    async fn release(&self, handle: &IndexHandle) -> Result<()> {
        self.documents.write().await.remove(&handle.id);
        Ok(())
    }
}
