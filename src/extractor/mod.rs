// file: src/extractor/mod.rs
// description: section extractors run concurrently during the parallel phase
// reference: internal module structure

pub mod basic_info;
pub mod contract;
pub mod response;
pub mod scoring;

pub use basic_info::BasicInfoExtractor;
pub use contract::ContractInfoExtractor;
pub use scoring::ScoringAnalyzer;

use crate::collaborators::{IndexHandle, Indexer, TextModel};
use crate::error::{AnalysisError, Result};
use crate::pipeline::{ProgressReporter, StepContext};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// The three extraction agents, in fan-out order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Agent {
    BasicInfo,
    Scoring,
    Contract,
}

impl Agent {
    pub const ALL: [Agent; 3] = [Agent::BasicInfo, Agent::Scoring, Agent::Contract];

    pub fn name(&self) -> &'static str {
        match self {
            Agent::BasicInfo => "basic_info_extractor",
            Agent::Scoring => "scoring_analyzer",
            Agent::Contract => "contract_info_extractor",
        }
    }
}

impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Everything one extraction step may touch.
#[derive(Clone)]
pub struct ExtractionScope {
    pub agent: Agent,
    pub indexer: Arc<dyn Indexer>,
    pub handle: IndexHandle,
    pub model: Arc<dyn TextModel>,
    pub ctx: StepContext,
    pub reporter: ProgressReporter,
    pub retrieval_k: usize,
    pub max_chunks: usize,
}

impl ExtractionScope {
    /// Queries the index once per query and joins the distinct hits, in
    /// document order, capped at `max_chunks`.
    pub async fn retrieve(&self, queries: &[&str]) -> Result<String> {
        let mut seen = BTreeSet::new();
        let mut texts = Vec::new();

        for query in queries {
            if seen.len() >= self.max_chunks {
                break;
            }
            let chunks = self
                .ctx
                .guard(
                    "index query",
                    self.indexer.query(&self.handle, query, self.retrieval_k),
                )
                .await
                .map_err(|e| self.wrap(e))?;

            for chunk in chunks {
                if seen.len() >= self.max_chunks {
                    break;
                }
                if seen.insert(chunk.index) {
                    texts.push((chunk.index, chunk.text));
                }
            }
        }

        texts.sort_by_key(|(index, _)| *index);
        debug!(
            "{} retrieved {} chunks for {} queries",
            self.agent,
            texts.len(),
            queries.len()
        );

        Ok(texts
            .into_iter()
            .map(|(_, text)| text)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }

    /// Sends `prompt` to the model and returns the JSON object in its answer.
    pub async fn ask(&self, prompt: &str) -> Result<Map<String, Value>> {
        let answer = self
            .ctx
            .guard("model completion", self.model.complete(prompt))
            .await
            .map_err(|e| self.wrap(e))?;

        response::extract_json(&answer).ok_or_else(|| {
            AnalysisError::extraction(self.agent.name(), "model answer contained no valid JSON object")
        })
    }

    pub fn checkpoint(&self, percent: i64) {
        self.reporter.checkpoint(self.agent.name(), percent);
    }

    fn wrap(&self, error: AnalysisError) -> AnalysisError {
        match error {
            AnalysisError::Cancelled | AnalysisError::ExtractionFailure { .. } => error,
            other => AnalysisError::extraction(self.agent.name(), other.to_string()),
        }
    }
}

/// One extraction step. Implementations write only into their own section
/// and leave whatever they managed to fill in place when they fail.
#[async_trait]
pub trait SectionExtractor: Send + Sync + 'static {
    type Section: Default + Send + 'static;

    fn agent(&self) -> Agent;

    async fn extract(&self, scope: &ExtractionScope, section: &mut Self::Section) -> Result<()>;
}

pub(crate) fn prompt(instructions: &str, schema: &str, context: &str) -> String {
    format!(
        "{}\n\nReturn a single JSON object with exactly these keys:\n{}\n\n\
         Each field is an object {{\"value\": string, \"source_text\": short verbatim quote}} \
         or null when the document does not say.\n\nDocument excerpts:\n{}",
        instructions, schema, context
    )
}
