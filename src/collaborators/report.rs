// file: src/collaborators/report.rs
// description: markdown report rendering for analysis results
// reference: https://docs.rs/tokio/latest/tokio/fs

use crate::collaborators::{ArtifactLocation, ReportRenderer};
use crate::error::{AnalysisError, Result};
use crate::models::{AnalysisResult, ExtractedField};
use crate::utils::Validator;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Write;
use std::path::PathBuf;
use tracing::info;

const NOT_MENTIONED: &str = "Not mentioned in the tender document";
const SOURCE_UNKNOWN: &str = "Source unknown";
const SNIPPET_CHARS: usize = 50;

pub struct MarkdownReportRenderer {
    output_dir: PathBuf,
}

impl MarkdownReportRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    fn file_name(document_name: &str) -> String {
        let stem = document_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(document_name);
        format!(
            "analysis_report_{}_{}.md",
            Validator::sanitize_file_name(stem),
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        )
    }
}

fn value_of(field: &ExtractedField) -> String {
    match field.value.as_deref() {
        Some(value) if !value.trim().is_empty() => escape_cell(value),
        _ => NOT_MENTIONED.to_string(),
    }
}

fn source_of(field: &ExtractedField) -> String {
    match field.snippet() {
        Some(snippet) if !snippet.trim().is_empty() => {
            format!("Source: {}", escape_cell(&Validator::truncate_text(snippet, SNIPPET_CHARS)))
        }
        _ => SOURCE_UNKNOWN.to_string(),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

fn label(name: &str) -> String {
    let spaced = name.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn write_list(out: &mut String, title: &str, items: &[ExtractedField]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "{}\n", title);
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "{}. {} *({})*", i + 1, value_of(item), source_of(item));
    }
    out.push('\n');
}

/// Renders the full report body.
pub fn render_markdown(result: &AnalysisResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "# Tender Analysis Report\n");
    let _ = writeln!(out, "## Document\n");
    let _ = writeln!(out, "- **Document name**: {}", result.document_name);
    let _ = writeln!(
        out,
        "- **Analysis time**: {}\n",
        result.analysis_time.format("%Y-%m-%d %H:%M:%S")
    );
    out.push_str("---\n\n## 1. Basic Information\n\n");
    out.push_str("| Item | Value | Source |\n|------|-------|--------|\n");

    let basic = &result.basic_information;
    for (name, field) in basic.scalar_fields() {
        let _ = writeln!(out, "| {} | {} | {} |", label(name), value_of(field), source_of(field));
    }
    out.push('\n');

    let qualification = &basic.qualification_criteria;
    if qualification.is_populated() {
        out.push_str("### Qualification Requirements\n\n");
        write_list(&mut out, "#### Company certifications", &qualification.company_certifications);
        write_list(&mut out, "#### Similar project experience", &qualification.project_experience);
        write_list(&mut out, "#### Team requirements", &qualification.team_requirements);
        write_list(&mut out, "#### Other requirements", &qualification.other_requirements);
    }

    out.push_str("---\n\n## 2. Scoring Criteria\n\n");
    let scoring = &result.scoring_criteria;
    write_list(&mut out, "### Preliminary review", &scoring.preliminary_review);

    if scoring.evaluation_method.is_filled() {
        let _ = writeln!(
            out,
            "### Evaluation method\n\n{} *({})*\n",
            value_of(&scoring.evaluation_method),
            source_of(&scoring.evaluation_method)
        );
    }

    let composition = &scoring.score_composition;
    if composition.is_populated() {
        out.push_str("### Score composition\n\n| Category | Weight | Source |\n|----------|--------|--------|\n");
        for (name, field) in [
            ("Technical", &composition.technical_score),
            ("Commercial", &composition.commercial_score),
            ("Price", &composition.price_score),
        ] {
            if field.is_filled() {
                let _ = writeln!(out, "| {} | {} | {} |", name, value_of(field), source_of(field));
            }
        }
        for other in composition.other_scores.iter().filter(|f| f.is_filled()) {
            let _ = writeln!(out, "| Other | {} | {} |", value_of(other), source_of(other));
        }
        out.push('\n');
    }

    if !scoring.detailed_scoring.is_empty() {
        out.push_str("### Detailed scoring\n\n| Category | Item | Max score | Criteria |\n|----------|------|-----------|----------|\n");
        for item in &scoring.detailed_scoring {
            let max_score = item
                .max_score
                .map(|score| score.to_string())
                .unwrap_or_else(|| "Unspecified".to_string());
            let _ = writeln!(
                out,
                "| {} | {} | {} | {} |",
                escape_cell(&item.category),
                escape_cell(&item.item_name),
                max_score,
                item.criteria
                    .as_deref()
                    .map(escape_cell)
                    .unwrap_or_else(|| "Unspecified".to_string())
            );
        }
        out.push('\n');
    }

    write_list(&mut out, "### Bonus points", &scoring.bonus_points);
    write_list(&mut out, "### Disqualification clauses (important)", &scoring.disqualification_clauses);

    out.push_str("---\n\n## 3. Contract Information\n\n");
    let contract = &result.contract_information;
    write_list(&mut out, "### Contract terms", &contract.contract_terms);
    for (name, field) in contract.scalar_fields() {
        if field.is_filled() {
            let _ = writeln!(
                out,
                "### {}\n\n{} *({})*\n",
                label(name),
                value_of(field),
                source_of(field)
            );
        }
    }
    write_list(&mut out, "### Risk warnings", &contract.risk_warnings);

    if !result.processing_notes.is_empty() {
        out.push_str("---\n\n## Processing Notes\n\n");
        for note in &result.processing_notes {
            let _ = writeln!(out, "- {}", note);
        }
    }

    out
}

#[async_trait]
impl ReportRenderer for MarkdownReportRenderer {
    async fn render(&self, result: &AnalysisResult) -> Result<ArtifactLocation> {
        let body = render_markdown(result);

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| {
                AnalysisError::FormattingFailure(format!(
                    "cannot create output directory {}: {}",
                    self.output_dir.display(),
                    e
                ))
            })?;

        let path = self.output_dir.join(Self::file_name(&result.document_name));
        tokio::fs::write(&path, body).await.map_err(|e| {
            AnalysisError::FormattingFailure(format!("cannot write {}: {}", path.display(), e))
        })?;

        info!("Report written to {}", path.display());
        Ok(ArtifactLocation::new(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ScoringItem;
    use tempfile::TempDir;

    fn result() -> AnalysisResult {
        let mut result = AnalysisResult::new("road repair.txt");
        result.basic_information.project_name =
            ExtractedField::new("Road repair").with_snippet("Project name: Road repair | phase 1");
        result.scoring_criteria.detailed_scoring.push(ScoringItem {
            category: "technical".into(),
            item_name: "plan".into(),
            max_score: Some(20.0),
            criteria: None,
            source: None,
        });
        result.add_note("Found 3 possible chapter structure lines");
        result
    }

    #[test]
    fn test_markdown_contains_tables_and_notes() {
        let body = render_markdown(&result());
        assert!(body.contains("| Project name | Road repair | Source: Project name: Road repair \\| phase 1 |"));
        assert!(body.contains(&format!("| Tender number | {} | {} |", NOT_MENTIONED, SOURCE_UNKNOWN)));
        assert!(body.contains("| technical | plan | 20 | Unspecified |"));
        assert!(body.contains("- Found 3 possible chapter structure lines"));
    }

    #[test]
    fn test_long_snippet_is_truncated() {
        let field = ExtractedField::new("x").with_snippet("a".repeat(80));
        assert_eq!(source_of(&field), format!("Source: {}...", "a".repeat(50)));
    }

    #[tokio::test]
    async fn test_render_writes_file() {
        let temp = TempDir::new().unwrap();
        let renderer = MarkdownReportRenderer::new(temp.path().join("reports"));

        let location = renderer.render(&result()).await.unwrap();
        let written = std::fs::read_to_string(location.as_str()).unwrap();
        assert!(written.starts_with("# Tender Analysis Report"));
        assert!(location.as_str().contains("analysis_report_road repair_"));
    }

    #[tokio::test]
    async fn test_unwritable_output_is_formatting_failure() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let renderer = MarkdownReportRenderer::new(blocker.join("reports"));

        let err = renderer.render(&result()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::FormattingFailure(_)));
    }
}
