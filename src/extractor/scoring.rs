// file: src/extractor/scoring.rs
// description: evaluation method, score weights and detailed scoring items
// reference: retrieval-augmented two-pass prompting

use crate::error::Result;
use crate::extractor::response::{parse_field, parse_field_list, parse_scoring_items};
use crate::extractor::{Agent, ExtractionScope, SectionExtractor, prompt};
use crate::models::ScoringCriteria;
use async_trait::async_trait;
use serde_json::Value;

const OVERVIEW_QUERIES: [&str; 4] = [
    "evaluation method comprehensive scoring lowest price 评标办法 综合评分法",
    "technical commercial price score weight 技术分 商务分 价格分",
    "preliminary review compliance 初步评审 符合性审查",
    "bonus points disqualification invalid bid 加分项 否决 无效投标",
];

const ITEMS_QUERIES: [&str; 2] = [
    "scoring criteria table points 评分标准 评分细则 分值",
    "maximum score evaluation factor 评分因素 最高得分",
];

const OVERVIEW_INSTRUCTIONS: &str = "Summarize how bids are evaluated. List keys hold arrays of \
field objects; score keys hold the weight or points as text.";

const OVERVIEW_SCHEMA: &str = "\"evaluation_method\", \"technical_score\", \
\"commercial_score\", \"price_score\", \"other_scores\", \"preliminary_review\", \
\"bonus_points\", \"disqualification_clauses\"";

const ITEMS_INSTRUCTIONS: &str = "List every scoring item. Each entry of the array is \
{\"category\", \"item_name\", \"max_score\", \"criteria\", \"source_text\"}.";

const ITEMS_SCHEMA: &str = "\"detailed_scoring\"";

pub struct ScoringAnalyzer;

#[async_trait]
impl SectionExtractor for ScoringAnalyzer {
    type Section = ScoringCriteria;

    fn agent(&self) -> Agent {
        Agent::Scoring
    }

    async fn extract(&self, scope: &ExtractionScope, section: &mut ScoringCriteria) -> Result<()> {
        let context = scope.retrieve(&OVERVIEW_QUERIES).await?;
        let answer = scope
            .ask(&prompt(OVERVIEW_INSTRUCTIONS, OVERVIEW_SCHEMA, &context))
            .await?;

        let get = |key: &str| answer.get(key).unwrap_or(&Value::Null);
        if let Some(method) = parse_field(get("evaluation_method")) {
            section.evaluation_method = method;
        }
        let composition = &mut section.score_composition;
        if let Some(score) = parse_field(get("technical_score")) {
            composition.technical_score = score;
        }
        if let Some(score) = parse_field(get("commercial_score")) {
            composition.commercial_score = score;
        }
        if let Some(score) = parse_field(get("price_score")) {
            composition.price_score = score;
        }
        composition.other_scores = parse_field_list(get("other_scores"));
        section.preliminary_review = parse_field_list(get("preliminary_review"));
        section.bonus_points = parse_field_list(get("bonus_points"));
        section.disqualification_clauses = parse_field_list(get("disqualification_clauses"));

        scope.checkpoint(50);

        let context = scope.retrieve(&ITEMS_QUERIES).await?;
        let answer = scope
            .ask(&prompt(ITEMS_INSTRUCTIONS, ITEMS_SCHEMA, &context))
            .await?;
        section.detailed_scoring =
            parse_scoring_items(answer.get("detailed_scoring").unwrap_or(&Value::Null));

        Ok(())
    }
}
