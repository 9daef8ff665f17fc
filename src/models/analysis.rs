// file: src/models/analysis.rs
// description: structured analysis result tree for a tender document
// reference: internal data structures

use super::field::{DedupKey, DocumentSource, ExtractedField};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    BasicInformation,
    ScoringCriteria,
    ContractInformation,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [
        SectionKind::BasicInformation,
        SectionKind::ScoringCriteria,
        SectionKind::ContractInformation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKind::BasicInformation => "basic_information",
            SectionKind::ScoringCriteria => "scoring_criteria",
            SectionKind::ContractInformation => "contract_information",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualificationCriteria {
    pub company_certifications: Vec<ExtractedField>,
    pub project_experience: Vec<ExtractedField>,
    pub team_requirements: Vec<ExtractedField>,
    pub other_requirements: Vec<ExtractedField>,
}

impl QualificationCriteria {
    pub fn is_populated(&self) -> bool {
        [
            &self.company_certifications,
            &self.project_experience,
            &self.team_requirements,
            &self.other_requirements,
        ]
        .iter()
        .any(|list| !list.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BasicInformation {
    pub project_name: ExtractedField,
    pub tender_number: ExtractedField,
    pub budget_amount: ExtractedField,
    pub bid_deadline: ExtractedField,
    pub bid_opening_time: ExtractedField,
    pub bid_bond_amount: ExtractedField,
    pub bid_bond_account: ExtractedField,
    pub purchaser_name: ExtractedField,
    pub purchaser_contact: ExtractedField,
    pub agent_name: ExtractedField,
    pub agent_contact: ExtractedField,
    pub qualification_criteria: QualificationCriteria,
}

impl BasicInformation {
    pub fn scalar_fields(&self) -> [(&'static str, &ExtractedField); 11] {
        [
            ("project_name", &self.project_name),
            ("tender_number", &self.tender_number),
            ("budget_amount", &self.budget_amount),
            ("bid_deadline", &self.bid_deadline),
            ("bid_opening_time", &self.bid_opening_time),
            ("bid_bond_amount", &self.bid_bond_amount),
            ("bid_bond_account", &self.bid_bond_account),
            ("purchaser_name", &self.purchaser_name),
            ("purchaser_contact", &self.purchaser_contact),
            ("agent_name", &self.agent_name),
            ("agent_contact", &self.agent_contact),
        ]
    }

    pub fn scalar_field_mut(&mut self, name: &str) -> Option<&mut ExtractedField> {
        let field = match name {
            "project_name" => &mut self.project_name,
            "tender_number" => &mut self.tender_number,
            "budget_amount" => &mut self.budget_amount,
            "bid_deadline" => &mut self.bid_deadline,
            "bid_opening_time" => &mut self.bid_opening_time,
            "bid_bond_amount" => &mut self.bid_bond_amount,
            "bid_bond_account" => &mut self.bid_bond_account,
            "purchaser_name" => &mut self.purchaser_name,
            "purchaser_contact" => &mut self.purchaser_contact,
            "agent_name" => &mut self.agent_name,
            "agent_contact" => &mut self.agent_contact,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_populated(&self) -> bool {
        self.scalar_fields().iter().any(|(_, field)| field.is_filled())
            || self.qualification_criteria.is_populated()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreComposition {
    pub technical_score: ExtractedField,
    pub commercial_score: ExtractedField,
    pub price_score: ExtractedField,
    pub other_scores: Vec<ExtractedField>,
}

impl ScoreComposition {
    pub fn is_populated(&self) -> bool {
        self.technical_score.is_filled()
            || self.commercial_score.is_filled()
            || self.price_score.is_filled()
            || !self.other_scores.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringItem {
    pub category: String,
    pub item_name: String,
    pub max_score: Option<f64>,
    pub criteria: Option<String>,
    pub source: Option<DocumentSource>,
}

impl DedupKey for ScoringItem {
    fn dedup_key(&self) -> (String, String) {
        let snippet = self
            .source
            .as_ref()
            .and_then(|source| source.source_text.clone())
            .unwrap_or_default();
        (format!("{}::{}", self.category, self.item_name), snippet)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringCriteria {
    pub preliminary_review: Vec<ExtractedField>,
    pub evaluation_method: ExtractedField,
    pub score_composition: ScoreComposition,
    pub detailed_scoring: Vec<ScoringItem>,
    pub bonus_points: Vec<ExtractedField>,
    pub disqualification_clauses: Vec<ExtractedField>,
}

impl ScoringCriteria {
    pub fn is_populated(&self) -> bool {
        self.evaluation_method.is_filled()
            || self.score_composition.is_populated()
            || !self.preliminary_review.is_empty()
            || !self.detailed_scoring.is_empty()
            || !self.bonus_points.is_empty()
            || !self.disqualification_clauses.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContractInformation {
    pub contract_terms: Vec<ExtractedField>,
    pub payment_terms: ExtractedField,
    pub delivery_requirements: ExtractedField,
    pub bid_validity: ExtractedField,
    pub intellectual_property: ExtractedField,
    pub confidentiality: ExtractedField,
    pub risk_warnings: Vec<ExtractedField>,
}

impl ContractInformation {
    pub fn scalar_fields(&self) -> [(&'static str, &ExtractedField); 5] {
        [
            ("payment_terms", &self.payment_terms),
            ("delivery_requirements", &self.delivery_requirements),
            ("bid_validity", &self.bid_validity),
            ("intellectual_property", &self.intellectual_property),
            ("confidentiality", &self.confidentiality),
        ]
    }

    pub fn scalar_field_mut(&mut self, name: &str) -> Option<&mut ExtractedField> {
        let field = match name {
            "payment_terms" => &mut self.payment_terms,
            "delivery_requirements" => &mut self.delivery_requirements,
            "bid_validity" => &mut self.bid_validity,
            "intellectual_property" => &mut self.intellectual_property,
            "confidentiality" => &mut self.confidentiality,
            _ => return None,
        };
        Some(field)
    }

    pub fn is_populated(&self) -> bool {
        self.scalar_fields().iter().any(|(_, field)| field.is_filled())
            || !self.contract_terms.is_empty()
            || !self.risk_warnings.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub document_name: String,
    pub analysis_time: DateTime<Utc>,
    pub basic_information: BasicInformation,
    pub scoring_criteria: ScoringCriteria,
    pub contract_information: ContractInformation,
    pub processing_notes: Vec<String>,
}

impl AnalysisResult {
    pub fn new(document_name: impl Into<String>) -> Self {
        Self {
            document_name: document_name.into(),
            analysis_time: Utc::now(),
            basic_information: BasicInformation::default(),
            scoring_criteria: ScoringCriteria::default(),
            contract_information: ContractInformation::default(),
            processing_notes: Vec::new(),
        }
    }

    pub fn is_section_populated(&self, kind: SectionKind) -> bool {
        match kind {
            SectionKind::BasicInformation => self.basic_information.is_populated(),
            SectionKind::ScoringCriteria => self.scoring_criteria.is_populated(),
            SectionKind::ContractInformation => self.contract_information.is_populated(),
        }
    }

    pub fn populated_sections(&self) -> Vec<SectionKind> {
        SectionKind::ALL
            .into_iter()
            .filter(|kind| self.is_section_populated(*kind))
            .collect()
    }

    pub fn has_content(&self) -> bool {
        !self.populated_sections().is_empty()
    }

    pub fn add_note(&mut self, note: impl Into<String>) {
        self.processing_notes.push(note.into());
    }
}
