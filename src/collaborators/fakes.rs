// file: src/collaborators/fakes.rs
// description: scripted in-memory collaborators for tests
// reference: trait-object test doubles

use crate::collaborators::{
    ArtifactLocation, IndexHandle, Indexer, ReportRenderer, TextChunk, TextModel,
};
use crate::document::DocumentContent;
use crate::error::{AnalysisError, Result};
use crate::models::AnalysisResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uuid::Uuid;

/// Substrings that identify each extraction prompt.
pub mod markers {
    pub const BASIC_CORE: &str = "\"project_name\"";
    pub const QUALIFICATION: &str = "\"company_certifications\"";
    pub const SCORING_OVERVIEW: &str = "\"evaluation_method\"";
    pub const SCORING_ITEMS: &str = "\"detailed_scoring\"";
    pub const CONTRACT_TERMS: &str = "\"payment_terms\"";
    pub const RISKS: &str = "\"risk_warnings\"";
}

pub const BASIC_CORE_JSON: &str = r#"Here is the result:
```json
{
  "project_name": {"value": "City road repair", "source_text": "Project name: City road repair"},
  "tender_number": {"value": "ZB-2024-017", "source_text": "Tender No. ZB-2024-017"},
  "budget_amount": {"value": "1,200,000 CNY", "source_text": "Budget: 1,200,000 CNY"},
  "bid_deadline": {"value": "2024-05-03 09:30"},
  "purchaser_name": {"value": "City Roads Bureau"},
  "agent_contact": null
}
```"#;

pub const QUALIFICATION_JSON: &str = r#"{
  "company_certifications": [
    {"value": "Class A municipal works licence", "source_text": "bidder shall hold Class A"},
    {"value": "ISO 9001", "source_text": "quality system ISO 9001"}
  ],
  "project_experience": [{"value": "Two similar road projects since 2020"}],
  "team_requirements": [],
  "other_requirements": []
}"#;

pub const SCORING_OVERVIEW_JSON: &str = r#"{
  "evaluation_method": {"value": "Comprehensive scoring", "source_text": "comprehensive scoring method"},
  "technical_score": {"value": "50"},
  "commercial_score": {"value": "20"},
  "price_score": {"value": "30"},
  "preliminary_review": [{"value": "Bid bond paid on time"}],
  "bonus_points": [],
  "disqualification_clauses": [{"value": "Bid below cost is rejected", "source_text": "below cost"}]
}"#;

pub const SCORING_ITEMS_JSON: &str = r#"{
  "detailed_scoring": [
    {"category": "technical", "item_name": "construction plan", "max_score": 20, "criteria": "complete and feasible", "source_text": "plan: 20 points"},
    {"category": "price", "item_name": "bid price", "max_score": "30", "criteria": "lowest valid price scores full marks"}
  ]
}"#;

pub const CONTRACT_TERMS_JSON: &str = r#"{
  "contract_terms": [{"value": "Warranty period of two years"}],
  "payment_terms": {"value": "30% advance, 70% on acceptance", "source_text": "Payment: 30% advance"},
  "delivery_requirements": {"value": "Complete within 120 days"},
  "bid_validity": {"value": "90 days"},
  "intellectual_property": null,
  "confidentiality": {"value": ""}
}"#;

pub const RISKS_JSON: &str = r#"{
  "risk_warnings": [{"value": "Liquidated damages of 0.1% per day", "source_text": "0.1% per day"}]
}"#;

pub const TENDER_TEXT: &str = "第一章 招标公告\n\
Project name: City road repair\n\
Tender No. ZB-2024-017\n\
Budget: 1,200,000 CNY\n\
Chapter 2 Evaluation\n\
The purchaser uses the comprehensive scoring method for this tender. plan: 20 points\n\
Chapter 3 Contract\n\
Payment: 30% advance, 70% on acceptance. Liquidated damages 0.1% per day.\n";

pub fn write_tender(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, TENDER_TEXT).unwrap();
    path
}

#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail(String),
    Delayed(Duration, String),
    Panic,
}

/// Answers prompts by the first route whose marker the prompt contains.
#[derive(Default)]
pub struct ScriptedModel {
    routes: Vec<(&'static str, Reply)>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A model that answers every extraction prompt successfully.
    pub fn complete_tender() -> Self {
        Self::new()
            .on(markers::BASIC_CORE, Reply::Text(BASIC_CORE_JSON.into()))
            .on(markers::QUALIFICATION, Reply::Text(QUALIFICATION_JSON.into()))
            .on(markers::SCORING_OVERVIEW, Reply::Text(SCORING_OVERVIEW_JSON.into()))
            .on(markers::SCORING_ITEMS, Reply::Text(SCORING_ITEMS_JSON.into()))
            .on(markers::CONTRACT_TERMS, Reply::Text(CONTRACT_TERMS_JSON.into()))
            .on(markers::RISKS, Reply::Text(RISKS_JSON.into()))
    }

    /// Routes added later take precedence over earlier ones.
    pub fn on(mut self, marker: &'static str, reply: Reply) -> Self {
        self.routes.insert(0, (marker, reply));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextModel for ScriptedModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let reply = self
            .routes
            .iter()
            .find(|(marker, _)| prompt.contains(marker))
            .map(|(_, reply)| reply.clone())
            .unwrap_or_else(|| Reply::Fail("no scripted reply".into()));

        match reply {
            Reply::Text(text) => Ok(text),
            Reply::Fail(message) => Err(AnalysisError::Model(message)),
            Reply::Delayed(delay, text) => {
                tokio::time::sleep(delay).await;
                Ok(text)
            }
            Reply::Panic => panic!("scripted model panic"),
        }
    }
}

#[derive(Default)]
pub struct FakeIndexer {
    documents: Mutex<HashMap<Uuid, String>>,
    fail_index: bool,
    queries: AtomicUsize,
    releases: AtomicUsize,
}

impl FakeIndexer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_index: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Indexer for FakeIndexer {
    async fn index(&self, content: &DocumentContent) -> Result<IndexHandle> {
        if self.fail_index {
            return Err(AnalysisError::Indexing("embedding service unavailable".into()));
        }
        let handle = IndexHandle {
            id: Uuid::new_v4(),
            chunk_count: 1,
        };
        self.documents
            .lock()
            .unwrap()
            .insert(handle.id, content.text.clone());
        Ok(handle)
    }

    async fn query(&self, handle: &IndexHandle, _text: &str, _k: usize) -> Result<Vec<TextChunk>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let documents = self.documents.lock().unwrap();
        let text = documents
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| AnalysisError::Indexing("unknown handle".into()))?;
        Ok(vec![TextChunk {
            index: 0,
            text,
            score: 1.0,
        }])
    }

    async fn release(&self, handle: &IndexHandle) -> Result<()> {
        self.documents.lock().unwrap().remove(&handle.id);
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Renders to a fake location; fails the first `failures` calls.
#[derive(Default)]
pub struct FakeRenderer {
    failures: AtomicUsize,
    calls: AtomicUsize,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(failures: usize) -> Self {
        Self {
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReportRenderer for FakeRenderer {
    async fn render(&self, result: &AnalysisResult) -> Result<ArtifactLocation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(AnalysisError::FormattingFailure("disk full".into()));
        }
        Ok(ArtifactLocation::new(format!(
            "memory://{}",
            result.document_name
        )))
    }
}
