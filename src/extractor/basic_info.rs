// file: src/extractor/basic_info.rs
// description: project, schedule, party and qualification extraction
// reference: retrieval-augmented two-pass prompting

use crate::error::Result;
use crate::extractor::response::{parse_field, parse_field_list};
use crate::extractor::{Agent, ExtractionScope, SectionExtractor, prompt};
use crate::models::BasicInformation;
use async_trait::async_trait;
use serde_json::Value;

const CORE_QUERIES: [&str; 4] = [
    "project name tender number budget amount 项目名称 招标编号 采购预算",
    "bid deadline bid opening time 投标截止时间 开标时间",
    "bid bond amount bank account 投标保证金 账户",
    "purchaser agent contact phone 采购人 代理机构 联系人 联系方式",
];

const QUALIFICATION_QUERIES: [&str; 3] = [
    "bidder qualification certification licence 资格要求 资质",
    "similar project experience performance 类似项目业绩",
    "project manager team staff requirements 项目负责人 团队人员",
];

const CORE_INSTRUCTIONS: &str =
    "Extract the basic project information of this tender from the excerpts below.";

const CORE_SCHEMA: &str = "\"project_name\", \"tender_number\", \"budget_amount\", \
\"bid_deadline\", \"bid_opening_time\", \"bid_bond_amount\", \"bid_bond_account\", \
\"purchaser_name\", \"purchaser_contact\", \"agent_name\", \"agent_contact\"";

const QUALIFICATION_INSTRUCTIONS: &str = "List the mandatory bidder qualification requirements. \
Each key holds an array of field objects.";

const QUALIFICATION_SCHEMA: &str = "\"company_certifications\", \"project_experience\", \
\"team_requirements\", \"other_requirements\"";

pub struct BasicInfoExtractor;

#[async_trait]
impl SectionExtractor for BasicInfoExtractor {
    type Section = BasicInformation;

    fn agent(&self) -> Agent {
        Agent::BasicInfo
    }

    async fn extract(&self, scope: &ExtractionScope, section: &mut BasicInformation) -> Result<()> {
        let context = scope.retrieve(&CORE_QUERIES).await?;
        let answer = scope
            .ask(&prompt(CORE_INSTRUCTIONS, CORE_SCHEMA, &context))
            .await?;

        for (name, value) in &answer {
            if let (Some(slot), Some(field)) = (section.scalar_field_mut(name), parse_field(value)) {
                *slot = field;
            }
        }

        scope.checkpoint(50);

        let context = scope.retrieve(&QUALIFICATION_QUERIES).await?;
        let answer = scope
            .ask(&prompt(
                QUALIFICATION_INSTRUCTIONS,
                QUALIFICATION_SCHEMA,
                &context,
            ))
            .await?;

        let list = |key: &str| parse_field_list(answer.get(key).unwrap_or(&Value::Null));
        let qualification = &mut section.qualification_criteria;
        qualification.company_certifications = list("company_certifications");
        qualification.project_experience = list("project_experience");
        qualification.team_requirements = list("team_requirements");
        qualification.other_requirements = list("other_requirements");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::fakes::{FakeIndexer, Reply, ScriptedModel, TENDER_TEXT, markers};
    use crate::collaborators::Indexer;
    use crate::document::DocumentContent;
    use crate::pipeline::{ProgressReporter, StepContext};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    async fn scope(model: ScriptedModel) -> ExtractionScope {
        let indexer = Arc::new(FakeIndexer::new());
        let handle = indexer
            .index(&DocumentContent::new("tender.txt".into(), TENDER_TEXT.into()))
            .await
            .unwrap();
        ExtractionScope {
            agent: Agent::BasicInfo,
            indexer,
            handle,
            model: Arc::new(model),
            ctx: StepContext::new(CancellationToken::new(), Duration::from_secs(5)),
            reporter: ProgressReporter::detached(),
            retrieval_k: 3,
            max_chunks: 10,
        }
    }

    #[tokio::test]
    async fn test_extracts_core_and_qualification() {
        let scope = scope(ScriptedModel::complete_tender()).await;
        let mut section = BasicInformation::default();
        BasicInfoExtractor.extract(&scope, &mut section).await.unwrap();

        assert_eq!(section.project_name.value.as_deref(), Some("City road repair"));
        assert_eq!(section.tender_number.snippet(), Some("Tender No. ZB-2024-017"));
        assert!(!section.agent_contact.is_filled());
        assert_eq!(section.qualification_criteria.company_certifications.len(), 2);
        assert_eq!(section.qualification_criteria.project_experience.len(), 1);
        assert_eq!(scope.reporter.registry().snapshot()["basic_info_extractor"], 50);
    }

    #[tokio::test]
    async fn test_second_call_failure_keeps_core_fields() {
        let model = ScriptedModel::complete_tender()
            .on(markers::QUALIFICATION, Reply::Fail("rate limited".into()));
        let scope = scope(model).await;
        let mut section = BasicInformation::default();

        let err = BasicInfoExtractor.extract(&scope, &mut section).await.unwrap_err();
        assert!(err.to_string().contains("basic_info_extractor"));
        assert!(section.project_name.is_filled());
        assert!(!section.qualification_criteria.is_populated());
    }
}
