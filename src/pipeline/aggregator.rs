// file: src/pipeline/aggregator.rs
// description: fan-in of the three extracted sections into the accumulated result
// reference: completeness check followed by a deterministic merge

use crate::error::{AnalysisError, Result};
use crate::merge::merge_results;
use crate::models::{
    AnalysisResult, BasicInformation, ContractInformation, ScoringCriteria, SectionKind,
};
use crate::pipeline::state::{ExtractionOutcome, PipelineState, PipelineStep, StepEvent};
use tracing::{info, warn};

/// What the parallel phase produced, one section per agent.
#[derive(Debug, Clone, Default)]
pub struct ExtractedSections {
    pub basic_information: BasicInformation,
    pub scoring_criteria: ScoringCriteria,
    pub contract_information: ContractInformation,
}

pub fn determine_outcome(populated: usize, errors: usize) -> ExtractionOutcome {
    match populated {
        0 => ExtractionOutcome::Empty,
        n if n == SectionKind::ALL.len() && errors == 0 => ExtractionOutcome::Complete,
        _ => ExtractionOutcome::Partial,
    }
}

#[derive(Debug, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn new() -> Self {
        Self
    }

    /// Merges `sections` into the run's result and moves the run to the
    /// step matching the outcome. Must be called from the parallel phase.
    pub fn aggregate(
        &self,
        state: &mut PipelineState,
        sections: ExtractedSections,
    ) -> Result<ExtractionOutcome> {
        if state.current_step != PipelineStep::ParallelExtraction {
            return Err(AnalysisError::AggregationFailure(format!(
                "cannot aggregate from step {}",
                state.current_step
            )));
        }

        let candidate = AnalysisResult {
            basic_information: sections.basic_information,
            scoring_criteria: sections.scoring_criteria,
            contract_information: sections.contract_information,
            processing_notes: Vec::new(),
            ..state.result.clone()
        };
        let merged = merge_results(&state.result, &candidate);

        let populated = merged.populated_sections();
        let errors = state.errors.len();
        let outcome = determine_outcome(populated.len(), errors);

        state.result = merged;
        state.advance(StepEvent::Aggregated(outcome))?;

        self.log_summary(&populated, errors, outcome);
        Ok(outcome)
    }

    fn log_summary(&self, populated: &[SectionKind], errors: usize, outcome: ExtractionOutcome) {
        info!("=== Aggregation Summary ===");
        for kind in SectionKind::ALL {
            let mark = if populated.contains(&kind) { "present" } else { "missing" };
            info!("{}: {}", kind, mark);
        }
        info!("Outcome: {}", outcome.step());
        if errors > 0 {
            warn!("{} extraction error(s) recorded", errors);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentRef;
    use crate::models::{ExtractedField, TaskId};
    use std::path::PathBuf;

    fn running_state() -> PipelineState {
        let mut state = PipelineState::new(
            TaskId::new(),
            DocumentRef::new(PathBuf::from("/tmp/tender.txt")),
        );
        state.result.add_note("Document indexed into 3 chunks");
        state.advance(StepEvent::Preprocessed).unwrap();
        state.advance(StepEvent::FannedOut).unwrap();
        state
    }

    fn full_sections() -> ExtractedSections {
        let mut sections = ExtractedSections::default();
        sections.basic_information.project_name = ExtractedField::new("Road repair");
        sections.scoring_criteria.evaluation_method = ExtractedField::new("Lowest price");
        sections.contract_information.payment_terms = ExtractedField::new("Monthly");
        sections
    }

    #[test]
    fn test_outcome_table() {
        assert_eq!(determine_outcome(3, 0), ExtractionOutcome::Complete);
        assert_eq!(determine_outcome(3, 1), ExtractionOutcome::Partial);
        assert_eq!(determine_outcome(2, 0), ExtractionOutcome::Partial);
        assert_eq!(determine_outcome(1, 2), ExtractionOutcome::Partial);
        assert_eq!(determine_outcome(0, 3), ExtractionOutcome::Empty);
    }

    #[test]
    fn test_aggregate_all_sections() {
        let mut state = running_state();
        let outcome = Aggregator::new().aggregate(&mut state, full_sections()).unwrap();

        assert_eq!(outcome, ExtractionOutcome::Complete);
        assert_eq!(state.current_step, PipelineStep::ParallelExtractionCompleted);
        assert_eq!(state.result.populated_sections().len(), 3);
        assert_eq!(
            state.result.processing_notes,
            vec!["Document indexed into 3 chunks".to_string()]
        );
    }

    #[test]
    fn test_aggregate_with_recorded_error_is_partial() {
        let mut state = running_state();
        let mut sections = full_sections();
        sections.scoring_criteria = ScoringCriteria::default();
        state.errors.push("Extraction failed in scoring_analyzer: boom");

        let outcome = Aggregator::new().aggregate(&mut state, sections).unwrap();
        assert_eq!(outcome, ExtractionOutcome::Partial);
        assert!(!state.result.is_section_populated(SectionKind::ScoringCriteria));
    }

    #[test]
    fn test_aggregate_nothing() {
        let mut state = running_state();
        let outcome = Aggregator::new()
            .aggregate(&mut state, ExtractedSections::default())
            .unwrap();
        assert_eq!(outcome, ExtractionOutcome::Empty);
        assert_eq!(state.current_step, PipelineStep::ExtractionFailed);
    }

    #[test]
    fn test_aggregate_outside_parallel_phase_fails() {
        let mut state = PipelineState::new(
            TaskId::new(),
            DocumentRef::new(PathBuf::from("/tmp/tender.txt")),
        );
        let err = Aggregator::new()
            .aggregate(&mut state, full_sections())
            .unwrap_err();
        assert!(matches!(err, AnalysisError::AggregationFailure(_)));
        assert_eq!(state.current_step, PipelineStep::Start);
    }
}
