use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use super::{field_list, require, LeadAdapter, LeadOptions, PlanContext};
use crate::core::classifier::{ClassifyRule, PayloadCheck, STATUS_OK};
use crate::core::dispatcher::{form_post, Auth, DispatchPlan};
use crate::core::mapper::{FieldSpec, Schema, Standard};
use crate::domain::model::LeadRecord;
use crate::utils::error::Result;

pub const ENDPOINT: &str = "https://api.marlimar.com/OutboundMessage/Send/";

/// 只送出這幾個欄位
const SENT_FIELDS: [&str; 4] = ["first_name", "last_name", "mobile_number", "repeat"];

static SUCCESS_MESSAGE: Lazy<Regex> = Lazy::new(|| Regex::new("(?i)success").unwrap());

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MalimarConfig {
    pub api_key: Option<String>,
    #[serde(flatten)]
    pub options: LeadOptions,
}

impl LeadAdapter for MalimarConfig {
    fn name(&self) -> &'static str {
        "Malimar"
    }

    fn options(&self) -> &LeadOptions {
        &self.options
    }

    fn check_config(&self) -> Result<()> {
        require(self.name(), "API key", &self.api_key).map(|_| ())
    }

    fn schema(&self) -> Result<Schema> {
        Schema::new(vec![
            FieldSpec::new("first_name")
                .aliases(&["firstname"])
                .from(Standard::FirstName)
                .keep_empty(),
            FieldSpec::new("last_name")
                .aliases(&["lastname"])
                .from(Standard::LastName)
                .keep_empty(),
            FieldSpec::new("mobile_number")
                .aliases(&["phone"])
                .from(Standard::Phone)
                .keep_empty(),
            FieldSpec::new("repeat").literal("foo"),
        ])
    }

    fn identity_field(&self) -> Option<&'static str> {
        Some("first_name")
    }

    fn protected_fields(&self) -> Vec<String> {
        field_list(&["mobile_number", "last_name"])
    }

    fn prepare(&self, mut record: LeadRecord) -> LeadRecord {
        record.retain(|key, _| SENT_FIELDS.iter().any(|field| *field == key));
        record
    }

    /// `hash_key` 在此才加入，不會出現在測試模式的記錄輸出中
    fn plan(&self, record: &LeadRecord, context: &PlanContext) -> Result<DispatchPlan> {
        let api_key = require(self.name(), "API key", &self.api_key)?;
        let pattern = SUCCESS_MESSAGE.clone();

        let mut body = record.clone();
        body.insert("hash_key", api_key);

        let request = form_post(
            &self.options.endpoint_or(ENDPOINT),
            &body,
            false,
            &Auth::None,
            context.timeout,
        )
        .header("Accept", "application/json")
        .follow_redirects();
        Ok(DispatchPlan::single(
            request,
            ClassifyRule::status(STATUS_OK).with(PayloadCheck::FieldMatching {
                field: "message".to_string(),
                pattern,
            }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::classifier::{classify, decode_payload};
    use crate::domain::model::DispatchResult;

    #[test]
    fn test_only_known_fields_are_sent() -> anyhow::Result<()> {
        let config = MalimarConfig {
            api_key: Some("hash".to_string()),
            ..MalimarConfig::default()
        };
        let record = config.prepare(LeadRecord::from_pairs([
            ("first_name", "Jane"),
            ("last_name", "Doe"),
            ("mobile_number", "5551234567"),
            ("repeat", "foo"),
            ("email", "jane@example.com"),
        ]));
        assert!(!record.contains_key("email"));

        let DispatchPlan::Single { request, .. } = config.plan(&record, &PlanContext::default())? else {
            panic!("expected a single request");
        };
        assert_eq!(
            request.body.as_deref(),
            Some("first_name=Jane&last_name=Doe&mobile_number=5551234567&repeat=foo&hash_key=hash")
        );
        Ok(())
    }

    #[test]
    fn test_quoted_success_message() -> anyhow::Result<()> {
        let config = MalimarConfig {
            api_key: Some("hash".to_string()),
            ..MalimarConfig::default()
        };
        let DispatchPlan::Single { rule, .. } = config.plan(&LeadRecord::new(), &PlanContext::default())? else {
            panic!("expected a single request");
        };

        let body = r#""{"message":"Message sent successfully"}""#;
        let result = DispatchResult {
            status: Some(200),
            body: body.to_string(),
            payload: decode_payload(body),
            ..DispatchResult::default()
        };
        assert!(classify(&result, &rule).success);

        let result = DispatchResult {
            status: Some(200),
            payload: decode_payload(r#"{"message":"Invalid hash"}"#),
            ..DispatchResult::default()
        };
        assert!(!classify(&result, &rule).success);
        Ok(())
    }
}
