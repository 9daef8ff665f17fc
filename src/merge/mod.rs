// file: src/merge/mod.rs
// description: pure merge rules combining two partial analysis results
// reference: field-level structural recursion with keyed deduplication

//! Combining partial [`AnalysisResult`] snapshots.
//!
//! Two rules cover every leaf:
//!
//! * scalar fields take the newer value when it is non-blank, otherwise keep
//!   the existing one;
//! * list fields keep every existing entry in order, then append newer
//!   entries whose [`DedupKey`] has not been seen yet.
//!
//! Everything above the leaves is structural recursion, so
//! `merge(a, a) == a` and `merge(merge(a, b), b) == merge(a, b)` hold for any
//! pair of results.

use crate::models::{
    AnalysisResult, BasicInformation, ContractInformation, DedupKey, ExtractedField,
    QualificationCriteria, ScoreComposition, ScoringCriteria,
};
use std::collections::HashSet;

pub trait Merge {
    fn merge(&self, new: &Self) -> Self;
}

impl Merge for ExtractedField {
    fn merge(&self, new: &Self) -> Self {
        if new.is_filled() {
            new.clone()
        } else {
            self.clone()
        }
    }
}

impl<T> Merge for Vec<T>
where
    T: DedupKey + Clone,
{
    fn merge(&self, new: &Self) -> Self {
        let mut seen: HashSet<(String, String)> = self.iter().map(DedupKey::dedup_key).collect();
        let mut merged = self.clone();

        for item in new {
            if seen.insert(item.dedup_key()) {
                merged.push(item.clone());
            }
        }

        merged
    }
}

/// Scalar rule for plain strings.
pub fn merge_text(existing: &str, new: &str) -> String {
    if new.trim().is_empty() {
        existing.to_string()
    } else {
        new.to_string()
    }
}

impl Merge for QualificationCriteria {
    fn merge(&self, new: &Self) -> Self {
        Self {
            company_certifications: self
                .company_certifications
                .merge(&new.company_certifications),
            project_experience: self.project_experience.merge(&new.project_experience),
            team_requirements: self.team_requirements.merge(&new.team_requirements),
            other_requirements: self.other_requirements.merge(&new.other_requirements),
        }
    }
}

impl Merge for BasicInformation {
    fn merge(&self, new: &Self) -> Self {
        Self {
            project_name: self.project_name.merge(&new.project_name),
            tender_number: self.tender_number.merge(&new.tender_number),
            budget_amount: self.budget_amount.merge(&new.budget_amount),
            bid_deadline: self.bid_deadline.merge(&new.bid_deadline),
            bid_opening_time: self.bid_opening_time.merge(&new.bid_opening_time),
            bid_bond_amount: self.bid_bond_amount.merge(&new.bid_bond_amount),
            bid_bond_account: self.bid_bond_account.merge(&new.bid_bond_account),
            purchaser_name: self.purchaser_name.merge(&new.purchaser_name),
            purchaser_contact: self.purchaser_contact.merge(&new.purchaser_contact),
            agent_name: self.agent_name.merge(&new.agent_name),
            agent_contact: self.agent_contact.merge(&new.agent_contact),
            qualification_criteria: self
                .qualification_criteria
                .merge(&new.qualification_criteria),
        }
    }
}

impl Merge for ScoreComposition {
    fn merge(&self, new: &Self) -> Self {
        Self {
            technical_score: self.technical_score.merge(&new.technical_score),
            commercial_score: self.commercial_score.merge(&new.commercial_score),
            price_score: self.price_score.merge(&new.price_score),
            other_scores: self.other_scores.merge(&new.other_scores),
        }
    }
}

impl Merge for ScoringCriteria {
    fn merge(&self, new: &Self) -> Self {
        Self {
            preliminary_review: self.preliminary_review.merge(&new.preliminary_review),
            evaluation_method: self.evaluation_method.merge(&new.evaluation_method),
            score_composition: self.score_composition.merge(&new.score_composition),
            detailed_scoring: self.detailed_scoring.merge(&new.detailed_scoring),
            bonus_points: self.bonus_points.merge(&new.bonus_points),
            disqualification_clauses: self
                .disqualification_clauses
                .merge(&new.disqualification_clauses),
        }
    }
}

impl Merge for ContractInformation {
    fn merge(&self, new: &Self) -> Self {
        Self {
            contract_terms: self.contract_terms.merge(&new.contract_terms),
            payment_terms: self.payment_terms.merge(&new.payment_terms),
            delivery_requirements: self.delivery_requirements.merge(&new.delivery_requirements),
            bid_validity: self.bid_validity.merge(&new.bid_validity),
            intellectual_property: self.intellectual_property.merge(&new.intellectual_property),
            confidentiality: self.confidentiality.merge(&new.confidentiality),
            risk_warnings: self.risk_warnings.merge(&new.risk_warnings),
        }
    }
}

impl Merge for AnalysisResult {
    fn merge(&self, new: &Self) -> Self {
        Self {
            document_name: merge_text(&self.document_name, &new.document_name),
            analysis_time: self.analysis_time.min(new.analysis_time),
            basic_information: self.basic_information.merge(&new.basic_information),
            scoring_criteria: self.scoring_criteria.merge(&new.scoring_criteria),
            contract_information: self.contract_information.merge(&new.contract_information),
            processing_notes: self.processing_notes.merge(&new.processing_notes),
        }
    }
}

/// Merges `new` into `existing`.
pub fn merge_results(existing: &AnalysisResult, new: &AnalysisResult) -> AnalysisResult {
    existing.merge(new)
}
