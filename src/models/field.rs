// file: src/models/field.rs
// description: extracted field and source citation models
// reference: internal data structures

use serde::{Deserialize, Serialize};

/// Where in the document a value was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentSource {
    pub page_number: Option<u32>,
    pub section: Option<String>,
    pub source_text: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedField {
    pub value: Option<String>,
    pub source: Option<DocumentSource>,
    pub confidence: Option<f64>,
    pub notes: Option<String>,
}

impl ExtractedField {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::default()
        }
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        let source = self.source.get_or_insert_with(DocumentSource::default);
        source.source_text = Some(snippet.into());
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence.clamp(0.0, 1.0));
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// A field is filled when its value holds something other than whitespace.
    pub fn is_filled(&self) -> bool {
        self.value
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }

    pub fn snippet(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|source| source.source_text.as_deref())
    }
}

/// Identity used when collapsing duplicate list entries.
pub trait DedupKey {
    fn dedup_key(&self) -> (String, String);
}

impl DedupKey for ExtractedField {
    fn dedup_key(&self) -> (String, String) {
        (
            self.value.clone().unwrap_or_default(),
            self.snippet().unwrap_or_default().to_string(),
        )
    }
}

impl DedupKey for String {
    fn dedup_key(&self) -> (String, String) {
        (self.clone(), String::new())
    }
}
