// file: src/extractor/contract.rs
// description: contract terms and risk warning extraction
// reference: retrieval-augmented two-pass prompting

use crate::error::Result;
use crate::extractor::response::{parse_field, parse_field_list};
use crate::extractor::{Agent, ExtractionScope, SectionExtractor, prompt};
use crate::models::ContractInformation;
use async_trait::async_trait;
use serde_json::Value;

const TERMS_QUERIES: [&str; 4] = [
    "contract terms special conditions 合同条款 特殊约定",
    "payment terms advance acceptance 付款方式 支付",
    "delivery period completion bid validity 交货期 工期 投标有效期",
    "intellectual property confidentiality 知识产权 保密",
];

const RISK_QUERIES: [&str; 3] = [
    "penalty liquidated damages breach 违约责任 违约金",
    "termination warranty liability 解除合同 质保",
    "risk deposit forfeiture 风险 保证金不予退还",
];

const TERMS_INSTRUCTIONS: &str = "Extract the key contract conditions. \
\"contract_terms\" holds an array of field objects.";

const TERMS_SCHEMA: &str = "\"contract_terms\", \"payment_terms\", \"delivery_requirements\", \
\"bid_validity\", \"intellectual_property\", \"confidentiality\"";

const RISK_INSTRUCTIONS: &str = "Identify clauses that pose a risk to the bidder, such as \
penalties, unusual liabilities or forfeiture conditions. Return an array of field objects.";

const RISK_SCHEMA: &str = "\"risk_warnings\"";

pub struct ContractInfoExtractor;

#[async_trait]
impl SectionExtractor for ContractInfoExtractor {
    type Section = ContractInformation;

    fn agent(&self) -> Agent {
        Agent::Contract
    }

    async fn extract(
        &self,
        scope: &ExtractionScope,
        section: &mut ContractInformation,
    ) -> Result<()> {
        let context = scope.retrieve(&TERMS_QUERIES).await?;
        let answer = scope
            .ask(&prompt(TERMS_INSTRUCTIONS, TERMS_SCHEMA, &context))
            .await?;

        section.contract_terms =
            parse_field_list(answer.get("contract_terms").unwrap_or(&Value::Null));
        for (name, value) in &answer {
            if let (Some(slot), Some(field)) = (section.scalar_field_mut(name), parse_field(value)) {
                *slot = field;
            }
        }

        scope.checkpoint(50);

        let context = scope.retrieve(&RISK_QUERIES).await?;
        let answer = scope
            .ask(&prompt(RISK_INSTRUCTIONS, RISK_SCHEMA, &context))
            .await?;
        section.risk_warnings =
            parse_field_list(answer.get("risk_warnings").unwrap_or(&Value::Null));

        Ok(())
    }
}
